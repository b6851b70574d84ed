//! Line scanners for block starts, link syntax and raw HTML.
//!
//! Every scanner takes the input from the position to scan at and returns
//! the length of the longest match, or `None`. None of them allocate or
//! look behind the given slice.

use gfmark_ast::{ListDelimType, ListType, NodeList, TableAlignment};
use gfmark_text::ctype::{is_line_end, is_space, is_space_or_tab};

/// Tags that open an HTML block of kind 6.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "base",
    "basefont",
    "blockquote",
    "body",
    "caption",
    "center",
    "col",
    "colgroup",
    "dd",
    "details",
    "dialog",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frame",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "head",
    "header",
    "hr",
    "html",
    "iframe",
    "legend",
    "li",
    "link",
    "main",
    "menu",
    "menuitem",
    "nav",
    "noframes",
    "ol",
    "optgroup",
    "option",
    "p",
    "param",
    "search",
    "section",
    "summary",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "title",
    "tr",
    "track",
    "ul",
];

/// Tags whose HTML block (kind 1) runs until the matching end tag.
const RAW_TAGS: &[&str] = &["pre", "script", "style", "textarea"];

const MAX_SCHEME_LEN: usize = 32;
const MAX_LIST_DIGITS: usize = 9;

/// Underline character of a setext heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetextChar {
    Equals,
    Hyphen,
}

impl SetextChar {
    /// Heading level produced by this underline.
    pub const fn level(self) -> u8 {
        match self {
            SetextChar::Equals => 1,
            SetextChar::Hyphen => 2,
        }
    }
}

#[inline]
fn at(s: &[u8], i: usize) -> u8 {
    s.get(i).copied().unwrap_or(0)
}

#[inline]
fn ends_line(s: &[u8], i: usize) -> bool {
    i >= s.len() || is_line_end(s[i])
}

fn skip_spaces_tabs(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && is_space_or_tab(s[i]) {
        i += 1;
    }
    i
}

fn run_of(s: &[u8], c: u8) -> usize {
    s.iter().take_while(|&&b| b == c).count()
}

fn contains_ignore_case(s: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    s.windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

fn contains(s: &[u8], needle: &[u8]) -> bool {
    s.windows(needle.len()).any(|window| window == needle)
}

/// `#` to `######` followed by whitespace or the end of the line.
///
/// The match includes the spaces after the hashes.
pub fn atx_heading_start(s: &[u8]) -> Option<usize> {
    let hashes = run_of(s, b'#');
    if hashes == 0 || hashes > 6 {
        return None;
    }
    if !ends_line(s, hashes) && !is_space_or_tab(s[hashes]) {
        return None;
    }
    Some(skip_spaces_tabs(s, hashes))
}

/// A run of `=` or `-` with only trailing spaces on the line.
pub fn setext_heading_line(s: &[u8]) -> Option<SetextChar> {
    let kind = match at(s, 0) {
        b'=' => SetextChar::Equals,
        b'-' => SetextChar::Hyphen,
        _ => return None,
    };
    let run = run_of(s, s[0]);
    let end = skip_spaces_tabs(s, run);
    ends_line(s, end).then_some(kind)
}

/// Three or more `*`, `-` or `_`, optionally separated by spaces or tabs.
///
/// Returns the length up to the line end.
pub fn thematic_break(s: &[u8]) -> Option<usize> {
    let c = at(s, 0);
    if !matches!(c, b'*' | b'-' | b'_') {
        return None;
    }
    let mut count = 0;
    let mut i = 0;
    while i < s.len() && !is_line_end(s[i]) {
        if s[i] == c {
            count += 1;
        } else if !is_space_or_tab(s[i]) {
            return None;
        }
        i += 1;
    }
    (count >= 3).then_some(i)
}

/// An opening code fence. Returns the number of fence characters.
///
/// Backtick fences may not have backticks in their info string.
pub fn open_code_fence(s: &[u8]) -> Option<usize> {
    let c = at(s, 0);
    if c != b'`' && c != b'~' {
        return None;
    }
    let run = run_of(s, c);
    if run < 3 {
        return None;
    }
    if c == b'`' {
        let rest = &s[run..];
        let line_end = rest
            .iter()
            .position(|&b| is_line_end(b))
            .unwrap_or(rest.len());
        if rest[..line_end].contains(&b'`') {
            return None;
        }
    }
    Some(run)
}

/// A closing code fence. Returns the number of fence characters.
pub fn close_code_fence(s: &[u8]) -> Option<usize> {
    let c = at(s, 0);
    if c != b'`' && c != b'~' {
        return None;
    }
    let run = run_of(s, c);
    if run < 3 {
        return None;
    }
    let end = skip_spaces_tabs(s, run);
    ends_line(s, end).then_some(run)
}

fn tag_name_len(s: &[u8]) -> usize {
    if !at(s, 0).is_ascii_alphabetic() {
        return 0;
    }
    s.iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
        .count()
}

/// Start condition of an HTML block of kinds 1 to 6.
pub fn html_block_start(s: &[u8]) -> Option<u8> {
    if at(s, 0) != b'<' {
        return None;
    }
    let rest = &s[1..];

    if rest.starts_with(b"!--") {
        return Some(2);
    }
    if rest.starts_with(b"?") {
        return Some(3);
    }
    if rest.starts_with(b"![CDATA[") {
        return Some(5);
    }
    if at(rest, 0) == b'!' && at(rest, 1).is_ascii_alphabetic() {
        return Some(4);
    }

    let name_len = tag_name_len(rest);
    if name_len > 0 {
        let name = &rest[..name_len];
        let after = at(rest, name_len);
        if RAW_TAGS.iter().any(|tag| name.eq_ignore_ascii_case(tag.as_bytes()))
            && (ends_line(rest, name_len) || is_space(after) || after == b'>')
        {
            return Some(1);
        }
    }

    let tag = rest.strip_prefix(b"/").unwrap_or(rest);
    let name_len = tag_name_len(tag);
    if name_len == 0 {
        return None;
    }
    let name = &tag[..name_len];
    if !BLOCK_TAGS
        .iter()
        .any(|block| name.eq_ignore_ascii_case(block.as_bytes()))
    {
        return None;
    }
    let after = &tag[name_len..];
    let ok = after.is_empty()
        || is_space(after[0])
        || after.starts_with(b">")
        || after.starts_with(b"/>");
    ok.then_some(6)
}

/// Start condition of an HTML block of kind 7: a complete open or closing
/// tag alone on its line.
pub fn html_block_start_7(s: &[u8]) -> Option<u8> {
    if at(s, 0) != b'<' {
        return None;
    }
    let rest = &s[1..];
    if at(rest, 0) != b'/' {
        let name_len = tag_name_len(rest);
        if RAW_TAGS
            .iter()
            .any(|tag| rest[..name_len].eq_ignore_ascii_case(tag.as_bytes()))
        {
            return None;
        }
    }
    let len = html_tag(rest)?;
    let mut i = 1 + len;
    while i < s.len() && matches!(s[i], b' ' | b'\t' | 0x0b | 0x0c) {
        i += 1;
    }
    ends_line(s, i).then_some(7)
}

/// Whether `s` satisfies the end condition of an HTML block of the given
/// kind. Kinds 6 and 7 end at a blank line instead.
pub fn html_block_end(kind: u8, s: &[u8]) -> bool {
    match kind {
        1 => RAW_TAGS
            .iter()
            .any(|tag| contains_ignore_case(s, &format!("</{tag}>"))),
        2 => contains(s, b"-->"),
        3 => contains(s, b"?>"),
        4 => s.contains(&b'>'),
        5 => contains(s, b"]]>"),
        _ => false,
    }
}

/// A list marker at the start of `s`.
///
/// Returns the marker length and the list data with `marker_offset` and
/// `padding` left for the caller to fill in. When the marker would
/// interrupt a paragraph, ordered lists must start at 1 and the item may
/// not be empty.
pub fn list_marker(s: &[u8], interrupts_paragraph: bool) -> Option<(usize, NodeList)> {
    let c = at(s, 0);
    if matches!(c, b'*' | b'-' | b'+') {
        if !is_space(at(s, 1)) && !ends_line(s, 1) {
            return None;
        }
        if interrupts_paragraph && ends_line(s, skip_spaces_tabs(s, 1)) {
            return None;
        }
        return Some((
            1,
            NodeList {
                list_type: ListType::Bullet,
                start: 1,
                delimiter: ListDelimType::Period,
                bullet_char: c,
                ..NodeList::default()
            },
        ));
    }

    let digits = s.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > MAX_LIST_DIGITS {
        return None;
    }
    let start = s[..digits]
        .iter()
        .fold(0usize, |acc, b| acc * 10 + (b - b'0') as usize);
    if interrupts_paragraph && start != 1 {
        return None;
    }
    let delimiter = match at(s, digits) {
        b'.' => ListDelimType::Period,
        b')' => ListDelimType::Paren,
        _ => return None,
    };
    let len = digits + 1;
    if !is_space(at(s, len)) && !ends_line(s, len) {
        return None;
    }
    if interrupts_paragraph && ends_line(s, skip_spaces_tabs(s, len)) {
        return None;
    }
    Some((
        len,
        NodeList {
            list_type: ListType::Ordered,
            start,
            delimiter,
            bullet_char: 0,
            ..NodeList::default()
        },
    ))
}

/// A link title in double quotes, single quotes or parentheses.
///
/// Titles may span lines but not contain a blank line.
pub fn link_title(s: &[u8]) -> Option<usize> {
    let close = match at(s, 0) {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = 1;
    while i < s.len() {
        match s[i] {
            b'\\' if i + 1 < s.len() => i += 2,
            b if b == close => return Some(i + 1),
            b'(' if close == b')' => return None,
            b'\n' => {
                let next = skip_spaces_tabs(s, i + 1);
                if at(s, next) == b'\n' || (at(s, next) == b'\r') {
                    return None;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Whitespace including line endings.
pub fn spacechars(s: &[u8]) -> Option<usize> {
    let len = s.iter().take_while(|&&b| is_space(b)).count();
    (len > 0).then_some(len)
}

/// An absolute URI autolink body, after the `<`. The match includes `>`.
pub fn autolink_uri(s: &[u8]) -> Option<usize> {
    if !at(s, 0).is_ascii_alphabetic() {
        return None;
    }
    let scheme = s
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
        .count();
    if !(2..=MAX_SCHEME_LEN).contains(&scheme) || at(s, scheme) != b':' {
        return None;
    }
    let mut i = scheme + 1;
    while i < s.len() {
        match s[i] {
            b'>' => return Some(i + 1),
            b'<' => return None,
            b if b <= 0x20 => return None,
            _ => i += 1,
        }
    }
    None
}

fn is_email_local(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b)
}

fn email_label_len(s: &[u8]) -> usize {
    if !at(s, 0).is_ascii_alphanumeric() {
        return 0;
    }
    let run = s
        .iter()
        .take(63)
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
        .count();
    // A label may not end with a hyphen.
    let mut len = run;
    while len > 0 && s[len - 1] == b'-' {
        len -= 1;
    }
    len
}

/// An email autolink body, after the `<`. The match includes `>`.
pub fn autolink_email(s: &[u8]) -> Option<usize> {
    let local = s.iter().take_while(|&&b| is_email_local(b)).count();
    if local == 0 || at(s, local) != b'@' {
        return None;
    }
    let mut i = local + 1;
    loop {
        let label = email_label_len(&s[i..]);
        if label == 0 {
            return None;
        }
        i += label;
        match at(s, i) {
            b'.' => i += 1,
            b'>' => return Some(i + 1),
            _ => return None,
        }
    }
}

fn attribute_value_len(s: &[u8]) -> Option<usize> {
    match at(s, 0) {
        q @ (b'"' | b'\'') => s[1..].iter().position(|&b| b == q).map(|end| end + 2),
        _ => {
            let len = s
                .iter()
                .take_while(|&&b| !is_space(b) && !b"\"'=<>`".contains(&b))
                .count();
            (len > 0).then_some(len)
        }
    }
}

fn attribute_len(s: &[u8]) -> Option<usize> {
    let ws = spacechars(s)?;
    let name_start = &s[ws..];
    let first = at(name_start, 0);
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b':') {
        return None;
    }
    let name = name_start
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'))
        .count();
    let mut i = ws + name;
    let spec_start = i + spacechars(&s[i..]).unwrap_or(0);
    if at(s, spec_start) == b'=' {
        let value_start = spec_start + 1 + spacechars(&s[spec_start + 1..]).unwrap_or(0);
        if let Some(value) = attribute_value_len(&s[value_start..]) {
            i = value_start + value;
        } else {
            return None;
        }
    }
    Some(i)
}

/// An open or closing tag, after the `<`. The match includes `>`.
pub fn html_tag(s: &[u8]) -> Option<usize> {
    if let Some(rest) = s.strip_prefix(b"/") {
        let name = tag_name_len(rest);
        if name == 0 {
            return None;
        }
        let i = 1 + name + spacechars(&rest[name..]).unwrap_or(0);
        return (at(s, i) == b'>').then_some(i + 1);
    }

    let name = tag_name_len(s);
    if name == 0 {
        return None;
    }
    let mut i = name;
    while let Some(len) = attribute_len(&s[i..]) {
        i += len;
    }
    i += spacechars(&s[i..]).unwrap_or(0);
    if at(s, i) == b'/' {
        i += 1;
    }
    (at(s, i) == b'>').then_some(i + 1)
}

/// An HTML comment, after the `<`. The match includes the final `>`.
pub fn html_comment(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"!--")?;
    if body.starts_with(b">") {
        return Some(4);
    }
    if body.starts_with(b"->") {
        return Some(5);
    }
    body.windows(3)
        .position(|w| w == b"-->")
        .map(|end| 3 + end + 3)
}

/// A processing instruction, after the `<`. The match includes `?>`.
pub fn html_processing_instruction(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"?")?;
    body.windows(2)
        .position(|w| w == b"?>")
        .map(|end| 1 + end + 2)
}

/// A declaration such as `<!DOCTYPE html>`, after the `<`.
pub fn html_declaration(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"!")?;
    if !at(body, 0).is_ascii_alphabetic() {
        return None;
    }
    body.iter().position(|&b| b == b'>').map(|end| 1 + end + 1)
}

/// A CDATA section, after the `<`. The match includes `]]>`.
pub fn html_cdata(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"![CDATA[")?;
    body.windows(3)
        .position(|w| w == b"]]>")
        .map(|end| 8 + end + 3)
}

/// A footnote definition label `[^label]:` plus trailing spaces.
pub fn footnote_definition(s: &[u8]) -> Option<usize> {
    let body = s.strip_prefix(b"[^")?;
    let label = body
        .iter()
        .take_while(|&&b| !matches!(b, b']' | b' ' | b'\t' | b'\r' | b'\n' | 0))
        .count();
    if label == 0 || !body[label..].starts_with(b"]:") {
        return None;
    }
    Some(skip_spaces_tabs(s, 2 + label + 2))
}

/// A table delimiter row such as `| :-- | --: |`.
///
/// The row needs at least one pipe. Returns the alignment of each column.
pub fn table_delimiter_row(s: &[u8]) -> Option<Vec<TableAlignment>> {
    let end = s.iter().position(|&b| is_line_end(b)).unwrap_or(s.len());
    let line = s[..end].trim_ascii();
    if !line.contains(&b'|') {
        return None;
    }
    let line = line.strip_prefix(b"|").unwrap_or(line);
    let line = line.strip_suffix(b"|").unwrap_or(line);

    line.split(|&b| b == b'|')
        .map(|cell| {
            let cell = cell.trim_ascii();
            let left = cell.first() == Some(&b':');
            let right = cell.len() > 1 && cell.last() == Some(&b':');
            let dashes = &cell[usize::from(left)..cell.len() - usize::from(right)];
            if dashes.is_empty() || dashes.iter().any(|&b| b != b'-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => TableAlignment::Center,
                (true, false) => TableAlignment::Left,
                (false, true) => TableAlignment::Right,
                (false, false) => TableAlignment::None,
            })
        })
        .collect()
}

/// Whether a core block would start at `s`, the first non-space character
/// of a line indented less than four columns.
pub fn starts_block(s: &[u8]) -> bool {
    at(s, 0) == b'>'
        || atx_heading_start(s).is_some()
        || open_code_fence(s).is_some()
        || html_block_start(s).is_some()
        || thematic_break(s).is_some()
        || list_marker(s, true).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::h1(b"# foo\n", Some(2))]
    #[case::h6(b"###### foo\n", Some(7))]
    #[case::h7(b"####### foo\n", None)]
    #[case::no_space(b"#5 bolt\n", None)]
    #[case::empty(b"#\n", Some(1))]
    #[case::tab(b"##\tfoo\n", Some(3))]
    fn test_atx_heading_start(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(atx_heading_start(input), expected);
    }

    #[rstest]
    #[case::equals(b"===\n", Some(SetextChar::Equals))]
    #[case::hyphen(b"---  \n", Some(SetextChar::Hyphen))]
    #[case::interior_space(b"= =\n", None)]
    #[case::mixed(b"=-\n", None)]
    fn test_setext_heading_line(#[case] input: &[u8], #[case] expected: Option<SetextChar>) {
        assert_eq!(setext_heading_line(input), expected);
    }

    #[rstest]
    #[case::stars(b"***\n", Some(3))]
    #[case::spaced(b"- - -\n", Some(5))]
    #[case::two(b"--\n", None)]
    #[case::mixed(b"*-*\n", None)]
    #[case::text_after(b"---a\n", None)]
    fn test_thematic_break(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(thematic_break(input), expected);
    }

    #[rstest]
    #[case::backticks(b"```rust\n", Some(3))]
    #[case::tildes(b"~~~~ info ` ok\n", Some(4))]
    #[case::backtick_in_info(b"``` a`b\n", None)]
    #[case::short(b"``\n", None)]
    fn test_open_code_fence(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(open_code_fence(input), expected);
    }

    #[test]
    fn test_close_code_fence() {
        assert_eq!(close_code_fence(b"```  \n"), Some(3));
        assert_eq!(close_code_fence(b"```` x\n"), None);
    }

    #[rstest]
    #[case::script(b"<script>\n", Some(1))]
    #[case::pre_attrs(b"<PRE class=\"x\">\n", Some(1))]
    #[case::comment(b"<!-- c\n", Some(2))]
    #[case::pi(b"<?php\n", Some(3))]
    #[case::decl(b"<!DOCTYPE html>\n", Some(4))]
    #[case::cdata(b"<![CDATA[\n", Some(5))]
    #[case::div(b"<div>\n", Some(6))]
    #[case::closing_table(b"</table>\n", Some(6))]
    #[case::self_closing(b"<hr/>\n", Some(6))]
    #[case::inline_tag(b"<span>\n", None)]
    #[case::prefix_tag(b"<divx>\n", None)]
    fn test_html_block_start(#[case] input: &[u8], #[case] expected: Option<u8>) {
        assert_eq!(html_block_start(input), expected);
    }

    #[rstest]
    #[case::open(b"<a href=\"foo\">\n", Some(7))]
    #[case::close(b"</ins>\n", Some(7))]
    #[case::trailing_text(b"<a> text\n", None)]
    #[case::raw_tag(b"<pre x>\n", None)]
    #[case::broken(b"<a href=>\n", None)]
    fn test_html_block_start_7(#[case] input: &[u8], #[case] expected: Option<u8>) {
        assert_eq!(html_block_start_7(input), expected);
    }

    #[test]
    fn test_html_block_end() {
        assert!(html_block_end(1, b"x </SCRIPT> y\n"));
        assert!(html_block_end(2, b"end -->\n"));
        assert!(!html_block_end(3, b"no\n"));
        assert!(html_block_end(5, b"]]>\n"));
        assert!(!html_block_end(6, b">\n"));
    }

    #[test]
    fn test_list_marker() {
        let (len, list) = list_marker(b"- item\n", false).unwrap();
        assert_eq!(len, 1);
        assert_eq!(list.list_type, ListType::Bullet);
        assert_eq!(list.bullet_char, b'-');

        let (len, list) = list_marker(b"12) item\n", false).unwrap();
        assert_eq!(len, 3);
        assert_eq!(list.start, 12);
        assert_eq!(list.delimiter, ListDelimType::Paren);

        assert!(list_marker(b"-item\n", false).is_none());
        assert!(list_marker(b"1234567890. x\n", false).is_none());
        assert!(list_marker(b"2. x\n", true).is_none());
        assert!(list_marker(b"-   \n", true).is_none());
        assert!(list_marker(b"-\n", false).is_some());
    }

    #[rstest]
    #[case::double(b"\"title\" rest", Some(7))]
    #[case::single(b"'a \\' b'", Some(8))]
    #[case::paren(b"(x)", Some(3))]
    #[case::nested_paren(b"(a(b)", None)]
    #[case::unterminated(b"\"open", None)]
    #[case::blank_line(b"\"a\n\nb\"", None)]
    fn test_link_title(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(link_title(input), expected);
    }

    #[rstest]
    #[case::http(b"http://foo.bar.baz>", Some(19))]
    #[case::irc(b"irc://foo.bar:2233/baz>", Some(23))]
    #[case::space(b"http://foo bar>", None)]
    #[case::one_letter_scheme(b"m:abc>", None)]
    fn test_autolink_uri(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(autolink_uri(input), expected);
    }

    #[rstest]
    #[case::simple(b"foo@bar.example.com>", Some(20))]
    #[case::plus(b"foo+special@Bar.baz-bar0.com>", Some(29))]
    #[case::backslash(b"foo\\+@bar.example.com>", None)]
    #[case::trailing_dash(b"a@b->", None)]
    fn test_autolink_email(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(autolink_email(input), expected);
    }

    #[rstest]
    #[case::simple(b"a>", Some(2))]
    #[case::attrs(b"a href=\"x\" title='y' data-z=w />", Some(32))]
    #[case::closing(b"/em >", Some(5))]
    #[case::newline_in_attrs(b"a\nb=\"c\">", Some(8))]
    #[case::bad_attr(b"a 1x>", None)]
    #[case::unclosed(b"a href=\"x", None)]
    fn test_html_tag(#[case] input: &[u8], #[case] expected: Option<usize>) {
        assert_eq!(html_tag(input), expected);
    }

    #[test]
    fn test_html_special_forms() {
        assert_eq!(html_comment(b"!-- x -->"), Some(9));
        assert_eq!(html_comment(b"!-->"), Some(4));
        assert_eq!(html_comment(b"!-- never"), None);
        assert_eq!(html_processing_instruction(b"?php echo ?>"), Some(12));
        assert_eq!(html_declaration(b"!DOCTYPE html>"), Some(14));
        assert_eq!(html_cdata(b"![CDATA[x]]>"), Some(12));
    }

    #[test]
    fn test_footnote_definition() {
        assert_eq!(footnote_definition(b"[^1]: text"), Some(6));
        assert_eq!(footnote_definition(b"[^a b]: text"), None);
        assert_eq!(footnote_definition(b"[^]: text"), None);
    }

    #[rstest]
    #[case::aligned(b"| :-- | :-: | --: | --- |\n", Some(vec![
        TableAlignment::Left,
        TableAlignment::Center,
        TableAlignment::Right,
        TableAlignment::None,
    ]))]
    #[case::no_outer_pipes(b"--- | ---\n", Some(vec![TableAlignment::None, TableAlignment::None]))]
    #[case::no_pipe(b"---\n", None)]
    #[case::text(b"| a | b |\n", None)]
    fn test_table_delimiter_row(
        #[case] input: &[u8],
        #[case] expected: Option<Vec<TableAlignment>>,
    ) {
        assert_eq!(table_delimiter_row(input), expected);
    }

    #[test]
    fn test_starts_block() {
        assert!(starts_block(b"> quote\n"));
        assert!(starts_block(b"- item\n"));
        assert!(starts_block(b"```\n"));
        assert!(!starts_block(b"| a | b |\n"));
        assert!(!starts_block(b"2. item\n"));
    }
}
