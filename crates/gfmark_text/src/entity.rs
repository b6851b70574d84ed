//! Entity and numeric character reference decoding.

use crate::ctype::is_punct;

const MAX_ENTITY_NAME: usize = 32;

/// Decodes a character reference starting right after an `&`.
///
/// Returns the decoded text and the number of bytes consumed (the `;`
/// included, the `&` excluded). Invalid code points and `&#0;` decode to
/// U+FFFD.
pub fn decode_entity(s: &str) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() == Some(&b'#') {
        return decode_numeric(bytes);
    }

    let name_len = bytes
        .iter()
        .take(MAX_ENTITY_NAME + 1)
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if name_len == 0 || name_len > MAX_ENTITY_NAME || bytes.get(name_len) != Some(&b';') {
        return None;
    }

    let name = &s[..name_len];
    let reference = format!("&{name};");
    let decoded = html_escape::decode_html_entities(&reference);
    // A prefix decode of a longer unknown name leaves the tail and `;` behind.
    if decoded == reference || (decoded.ends_with(';') && name != "semi") {
        return None;
    }
    Some((decoded.into_owned(), name_len + 1))
}

fn decode_numeric(bytes: &[u8]) -> Option<(String, usize)> {
    let (radix, start, max_digits) = match bytes.get(1) {
        Some(b'x' | b'X') => (16, 2, 6),
        _ => (10, 1, 7),
    };
    let digits = bytes[start..]
        .iter()
        .take_while(|b| {
            if radix == 16 {
                b.is_ascii_hexdigit()
            } else {
                b.is_ascii_digit()
            }
        })
        .count();
    if digits == 0 || digits > max_digits || bytes.get(start + digits) != Some(&b';') {
        return None;
    }

    let text = std::str::from_utf8(&bytes[start..start + digits]).ok()?;
    let code = u32::from_str_radix(text, radix).ok()?;
    let ch = match code {
        0 => char::REPLACEMENT_CHARACTER,
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    };
    Some((ch.to_string(), start + digits + 1))
}

/// Resolves backslash escapes and character references.
///
/// Used for link destinations, titles and code block info strings.
pub fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut copied = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(|&b| is_punct(b)) => {
                out.push_str(&s[copied..i]);
                out.push(bytes[i + 1] as char);
                i += 2;
                copied = i;
            }
            b'&' => match decode_entity(&s[i + 1..]) {
                Some((decoded, used)) => {
                    out.push_str(&s[copied..i]);
                    out.push_str(&decoded);
                    i += used + 1;
                    copied = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.push_str(&s[copied..]);
    out
}
