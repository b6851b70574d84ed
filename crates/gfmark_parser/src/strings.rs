//! String cleanup shared by the block and inline parsers.

use gfmark_text::{decode_entity, unescape};

/// Trims a link destination and resolves escapes and entities.
pub(crate) fn clean_url(url: &str) -> String {
    let url = url.trim_matches(|c: char| c.is_ascii_whitespace());
    if url.is_empty() {
        return String::new();
    }
    unescape(url)
}

/// Strips the delimiters of a link title and resolves escapes and entities.
pub(crate) fn clean_title(title: &str) -> String {
    let bytes = title.as_bytes();
    let inner = match (bytes.first(), bytes.last()) {
        (Some(b'"'), Some(b'"')) | (Some(b'\''), Some(b'\'')) | (Some(b'('), Some(b')'))
            if bytes.len() >= 2 =>
        {
            &title[1..title.len() - 1]
        }
        _ => title,
    };
    unescape(inner)
}

/// Resolves entities but keeps backslashes, as autolinks do.
pub(crate) fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        match decode_entity(&rest[amp + 1..]) {
            Some((decoded, used)) => {
                out.push_str(&decoded);
                rest = &rest[amp + 1 + used..];
            }
            None => {
                out.push('&');
                rest = &rest[amp + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Destination of an autolink. Email addresses get a `mailto:` scheme.
pub(crate) fn clean_autolink(url: &str, email: bool) -> String {
    let url = decode_entities(url.trim());
    if email {
        format!("mailto:{url}")
    } else {
        url
    }
}

/// Normalizes code span content: line endings become spaces and one
/// leading and trailing space is stripped when both are present and the
/// content is not all spaces.
pub(crate) fn normalize_code(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push(' ');
                }
            }
            '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    if out.len() >= 2
        && out.starts_with(' ')
        && out.ends_with(' ')
        && out.bytes().any(|b| b != b' ')
    {
        out.pop();
        out.remove(0);
    }
    out
}

/// Removes the closing sequence of an ATX heading line.
pub(crate) fn chop_trailing_hashes(line: &str) -> &str {
    let content = line.trim_end_matches(['\n', '\r']);
    let trimmed = content.trim_end_matches([' ', '\t']);
    let without = trimmed.trim_end_matches('#');
    if without.len() == trimmed.len() {
        return trimmed;
    }
    if without.is_empty() || without.ends_with([' ', '\t']) {
        return without.trim_end_matches([' ', '\t']);
    }
    trimmed
}

/// Drops trailing lines that contain only spaces and tabs.
pub(crate) fn remove_trailing_blank_lines(text: &mut String) {
    let bytes = text.as_bytes();
    let Some(last) = bytes
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
    else {
        text.clear();
        return;
    };
    if let Some(eol) = bytes[last..].iter().position(|&b| b == b'\n' || b == b'\r') {
        text.truncate(last + eol);
    }
}

/// Whether the text has nothing but whitespace.
pub(crate) fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_whitespace())
}
