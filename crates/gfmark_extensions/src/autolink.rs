//! autolink extension: links without angle brackets.
//!
//! Recognizes `www.` hosts, `http://`, `https://` and `ftp://` URLs in
//! running text, plus email addresses. Trailing punctuation, an unbalanced
//! closing parenthesis and a trailing entity-like `&name;` are left out of
//! the link. `www.` links get an `http://` destination.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | email | boolean | true | Link bare email addresses as `mailto:` |
//!
//! # Example
//!
//! ```json
//! {
//!   "extensions": [
//!     { "name": "autolink", "options": { "email": false } }
//!   ]
//! }
//! ```

use gfmark_ast::{Document, NodeId, NodeLink, NodeValue, Position, SourcePos};
use gfmark_parser::{Extension, ExtensionError, InlineContext, ParseOptions};
use serde::Deserialize;
use tracing::trace;

pub const EXTENSION_NAME: &str = "autolink";

const URL_SCHEMES: &[&str] = &["http://", "https://", "ftp://"];

/// Characters trimmed from the end of a link.
const TRAILING_PUNCTUATION: &[u8] = b"?!.,:*_~'\"";

/// Configuration for the autolink extension.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutolinkOptions {
    /// Link email addresses (default: true).
    #[serde(default = "default_true")]
    pub email: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AutolinkOptions {
    fn default() -> Self {
        Self { email: true }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Autolink {
    options: AutolinkOptions,
}

impl Autolink {
    pub fn new(options: AutolinkOptions) -> Self {
        Self { options }
    }
}

fn starts_with_ignore_case(s: &[u8], prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Length of the host name at the start of `data`, or `None` when it is
/// not a valid host.
fn domain_len(data: &[u8]) -> Option<usize> {
    if !data.first().is_some_and(|b| b.is_ascii_alphanumeric() || *b >= 0x80) {
        return None;
    }
    // Underscores in the last two labels make the host invalid.
    let (mut underscores_last, mut underscores_prev) = (0, 0);
    let mut len = 1;
    while let Some(&b) = data.get(len) {
        match b {
            b'_' => underscores_last += 1,
            b'.' => {
                underscores_prev = underscores_last;
                underscores_last = 0;
            }
            b'-' => {}
            b if b.is_ascii_alphanumeric() || b >= 0x80 => {}
            _ => break,
        }
        len += 1;
    }
    if underscores_last > 0 || underscores_prev > 0 {
        return None;
    }
    Some(len)
}

/// Trims trailing punctuation, entity-like suffixes and unbalanced `)`
/// from a link candidate `data[..end]`.
fn link_end(data: &[u8], mut end: usize) -> usize {
    if let Some(lt) = data[..end].iter().position(|&b| b == b'<') {
        end = lt;
    }
    while end > 0 {
        let last = data[end - 1];
        if TRAILING_PUNCTUATION.contains(&last) {
            end -= 1;
        } else if last == b';' {
            let name_start = data[..end - 1]
                .iter()
                .rposition(|b| !b.is_ascii_alphanumeric())
                .map_or(0, |i| i + 1);
            if name_start > 0 && name_start < end - 1 && data[name_start - 1] == b'&' {
                end = name_start - 1;
            } else {
                end -= 1;
            }
        } else if last == b')' {
            let opening = data[..end].iter().filter(|&&b| b == b'(').count();
            let closing = data[..end].iter().filter(|&&b| b == b')').count();
            if closing <= opening {
                break;
            }
            end -= 1;
        } else {
            break;
        }
    }
    end
}

/// Matches a URL autolink at the start of `text`. Returns the link length
/// and its destination.
fn match_url(text: &str, preceding: Option<char>) -> Option<(usize, String)> {
    let data = text.as_bytes();
    // The host of a `www.` link is the part after the prefix.
    let (host_start, www) = if starts_with_ignore_case(data, "www.") {
        if preceding.is_some_and(|c| !c.is_whitespace() && !"*_~(".contains(c)) {
            return None;
        }
        (4, true)
    } else {
        if preceding.is_some_and(|c| c.is_alphanumeric()) {
            return None;
        }
        let scheme = URL_SCHEMES
            .iter()
            .find(|scheme| starts_with_ignore_case(data, scheme))?;
        (scheme.len(), false)
    };

    let host = domain_len(&data[host_start..])?;
    let raw_end = data
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = link_end(data, raw_end);
    if end <= host_start || host == 0 {
        return None;
    }

    let matched = &text[..end];
    let url = if www {
        format!("http://{matched}")
    } else {
        matched.to_string()
    };
    Some((end, url))
}

fn is_local_part_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'+' | b'-' | b'_')
}

/// Finds the next email address in `text` at or after byte `from`.
fn find_email(text: &str, from: usize) -> Option<(usize, usize)> {
    let data = text.as_bytes();
    let mut search = from;
    while let Some(at) = data[search..].iter().position(|&b| b == b'@').map(|i| i + search) {
        search = at + 1;
        let start = data[from..at]
            .iter()
            .rposition(|&b| !is_local_part_byte(b))
            .map_or(from, |i| from + i + 1);
        if start == at {
            continue;
        }

        let mut end = at + 1;
        let mut dots = 0;
        while let Some(&b) = data.get(end) {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                end += 1;
            } else if b == b'.' && data.get(end + 1).is_some_and(u8::is_ascii_alphanumeric) {
                dots += 1;
                end += 1;
            } else {
                break;
            }
        }
        if dots == 0 || !data[end - 1].is_ascii_alphabetic() {
            continue;
        }
        return Some((start, end));
    }
    None
}

/// Splits text nodes around email addresses they contain.
fn link_emails(doc: &mut Document) -> usize {
    let candidates: Vec<NodeId> = doc
        .arena
        .descendants(doc.root)
        .filter(|&id| {
            doc.value(id).text().is_some_and(|text| text.contains('@'))
                && !doc
                    .arena
                    .ancestors(id)
                    .any(|a| matches!(doc.value(a), NodeValue::Link(_) | NodeValue::Image(_)))
        })
        .collect();

    let mut count = 0;
    for id in candidates {
        let mut current = id;
        loop {
            let Some(text) = doc.value(current).text() else {
                break;
            };
            let Some((start, end)) = find_email(text, 0) else {
                break;
            };
            let email = text[start..end].to_string();
            let suffix = text[end..].to_string();
            let base = doc.arena[current].sourcepos.start;
            let at = |offset: usize| Position::new(base.line, base.column + offset as u32);

            if let Some(text) = doc.value_mut(current).text_mut() {
                text.truncate(start);
            }
            let link_pos = SourcePos::new(at(start), at(end - 1));
            let link = doc.create(
                NodeValue::Link(NodeLink {
                    url: format!("mailto:{email}"),
                    title: String::new(),
                }),
                link_pos,
            );
            let label = doc.create(NodeValue::Text(email), link_pos);
            doc.arena.append_child(link, label);
            doc.arena.insert_after(current, link);

            let prefix_empty = doc.value(current).text().is_some_and(str::is_empty);
            if prefix_empty {
                doc.arena.detach(current);
            } else {
                doc.arena[current].sourcepos.end = at(start.max(1) - 1);
            }
            count += 1;

            if suffix.is_empty() {
                break;
            }
            let end_pos = doc.arena[id].sourcepos.end.max(at(end));
            let rest = doc.create(NodeValue::Text(suffix), SourcePos::new(at(end), end_pos));
            doc.arena.insert_after(link, rest);
            current = rest;
        }
    }
    count
}

impl Extension for Autolink {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn special_inline_chars(&self) -> &[u8] {
        b"wWhHfF"
    }

    fn match_inline(&self, ctx: &mut InlineContext<'_, '_>) -> Option<NodeId> {
        if ctx.in_bracket() {
            return None;
        }
        let (len, url) = match_url(ctx.rest(), ctx.preceding_char())?;
        let start = ctx.pos();
        let label = ctx.rest()[..len].to_string();

        let link = ctx.make_node(
            NodeValue::Link(NodeLink {
                url,
                title: String::new(),
            }),
            start,
            start + len,
        );
        let text = ctx.make_node(NodeValue::Text(label), start, start + len);
        ctx.append(link, text);
        ctx.advance(len);
        Some(link)
    }

    fn postprocess(&self, doc: &mut Document, _options: &ParseOptions) -> Result<(), ExtensionError> {
        if self.options.email {
            let linked = link_emails(doc);
            trace!("Linked {} email addresses", linked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::render_with;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;

    fn render(input: &str) -> String {
        render_with(vec![Arc::new(Autolink::default())], input)
    }

    #[rstest]
    #[case::www("www.commonmark.org", Some((18, "http://www.commonmark.org")))]
    #[case::https("https://x.org/a?b=c", Some((19, "https://x.org/a?b=c")))]
    #[case::trailing_period("www.x.org.", Some((9, "http://www.x.org")))]
    #[case::balanced_parens("www.x.org/a(b)", Some((14, "http://www.x.org/a(b)")))]
    #[case::unbalanced_paren("www.x.org/a)", Some((11, "http://www.x.org/a")))]
    #[case::entity_suffix("www.x.org/a&amp;", Some((11, "http://www.x.org/a")))]
    #[case::stops_at_angle("www.x.org<b>", Some((9, "http://www.x.org")))]
    #[case::www_needs_dot("www", None)]
    #[case::bare_www_prefix("www.", None)]
    #[case::www_prefix_then_dot("www..", None)]
    #[case::www_short_host("www.x", Some((5, "http://www.x")))]
    #[case::bad_host("www._x", None)]
    #[case::underscore_in_host("www.a_b.org", None)]
    #[case::no_host("http:// x", None)]
    #[case::other_scheme("gopher://x.org", None)]
    fn test_match_url(#[case] text: &str, #[case] expected: Option<(usize, &str)>) {
        let actual = match_url(text, None);
        assert_eq!(
            actual.as_ref().map(|(len, url)| (*len, url.as_str())),
            expected
        );
    }

    #[test]
    fn test_match_url_preceding_char() {
        assert!(match_url("www.x.org", Some('(')).is_some());
        assert!(match_url("www.x.org", Some('a')).is_none());
        assert!(match_url("http://x.org", Some('a')).is_none());
        assert!(match_url("http://x.org", Some('<')).is_some());
    }

    #[rstest]
    #[case::simple("mail foo@bar.baz now", Some((5, 16)))]
    #[case::plus("a.b+c@x.io", Some((0, 10)))]
    #[case::trailing_dot("foo@bar.baz.", Some((0, 11)))]
    #[case::no_dot("foo@bar", None)]
    #[case::no_local_part("@bar.baz", None)]
    #[case::digit_end("foo@bar.b2", None)]
    fn test_find_email(#[case] text: &str, #[case] expected: Option<(usize, usize)>) {
        assert_eq!(find_email(text, 0), expected);
    }

    #[test]
    fn test_render_www() {
        assert_eq!(
            render("Visit www.commonmark.org/help for more."),
            "<p>Visit <a href=\"http://www.commonmark.org/help\">www.commonmark.org/help</a> for more.</p>\n"
        );
    }

    #[test]
    fn test_bare_www_prefix_stays_text() {
        assert_eq!(render("see www. and www"), "<p>see www. and www</p>\n");
    }

    #[test]
    fn test_render_url_in_parens() {
        assert_eq!(
            render("(see https://x.org/a)"),
            "<p>(see <a href=\"https://x.org/a\">https://x.org/a</a>)</p>\n"
        );
    }

    #[test]
    fn test_render_email() {
        assert_eq!(
            render("write foo@bar.baz."),
            "<p>write <a href=\"mailto:foo@bar.baz\">foo@bar.baz</a>.</p>\n"
        );
    }

    #[test]
    fn test_email_option_off() {
        let ext = Autolink::new(AutolinkOptions { email: false });
        let html = render_with(vec![Arc::new(ext)], "foo@bar.baz");
        assert_eq!(html, "<p>foo@bar.baz</p>\n");
    }

    #[test]
    fn test_no_autolink_inside_links() {
        assert_eq!(
            render("[www.x.org a@b.cd](/u)"),
            "<p><a href=\"/u\">www.x.org a@b.cd</a></p>\n"
        );
    }

    #[test]
    fn test_words_with_special_letters_are_untouched() {
        assert_eq!(render("what the haff"), "<p>what the haff</p>\n");
    }
}
