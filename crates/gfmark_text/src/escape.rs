//! HTML and URL escaping.

/// Escapes `&`, `<`, `>` and `"` for HTML text and attribute values.
pub fn escape_html(out: &mut String, text: &str) {
    html_escape::encode_double_quoted_attribute_to_string(text, out);
}

/// Returns `text` escaped for HTML.
pub fn escape_html_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_html(&mut out, text);
    out
}

// Bytes left untouched inside an `href`. Everything else is percent-encoded,
// except `&` and `'` which become HTML references.
fn is_href_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'_'
                | b'.'
                | b'+'
                | b'!'
                | b'*'
                | b'('
                | b')'
                | b','
                | b'%'
                | b'#'
                | b'@'
                | b'?'
                | b'='
                | b';'
                | b':'
                | b'/'
                | b'$'
                | b'~'
        )
}

/// Escapes a URL for use in an `href` or `src` attribute.
///
/// Existing `%XX` sequences are kept, so already-encoded URLs are not
/// double-encoded.
pub fn escape_href(out: &mut String, url: &str) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let bytes = url.as_bytes();
    let mut copied = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if is_href_safe(b) {
            continue;
        }
        if copied < i {
            out.push_str(&url[copied..i]);
        }
        match b {
            b'&' => out.push_str("&amp;"),
            b'\'' => out.push_str("&#x27;"),
            _ => {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0x0f) as usize] as char);
            }
        }
        copied = i + 1;
    }
    // Every byte of a multi-byte character is encoded, so `copied` only
    // ever points at a character boundary here.
    out.push_str(&url[copied..]);
}
