//! URL safety checks.

const DANGEROUS_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "file:"];

/// Image types still allowed behind a `data:` scheme.
const SAFE_DATA_TYPES: [&str; 4] = ["image/png", "image/gif", "image/jpeg", "image/webp"];

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Returns true for URLs that are emptied unless unsafe output is enabled.
pub fn is_dangerous_url(url: &str) -> bool {
    if starts_with_ignore_case(url, "data:") {
        let rest = &url["data:".len()..];
        return !SAFE_DATA_TYPES
            .iter()
            .any(|ty| starts_with_ignore_case(rest, ty));
    }
    DANGEROUS_SCHEMES
        .iter()
        .any(|scheme| starts_with_ignore_case(url, scheme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::javascript("javascript:alert(1)", true)]
    #[case::mixed_case("JaVaScRiPt:alert(1)", true)]
    #[case::vbscript("vbscript:msgbox", true)]
    #[case::file("file:///etc/passwd", true)]
    #[case::data_html("data:text/html;base64,xyz", true)]
    #[case::data_png("data:image/png;base64,xyz", false)]
    #[case::data_webp_upper("DATA:IMAGE/WEBP;base64,xyz", false)]
    #[case::https("https://example.com", false)]
    #[case::relative("/javascript:", false)]
    #[case::short("java", false)]
    fn test_is_dangerous_url(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_dangerous_url(url), expected);
    }
}
