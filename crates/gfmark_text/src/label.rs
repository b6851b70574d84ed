//! Link label normalization.

use crate::ctype::is_whitespace_char;

/// Normalizes a link or footnote label for matching.
///
/// Strips the surrounding whitespace, collapses inner whitespace runs to a
/// single space and applies Unicode case folding, approximated by
/// lower-casing then upper-casing so that e.g. `ẞ` and `SS` match.
pub fn normalize_label(label: &str) -> String {
    let mut collapsed = String::with_capacity(label.len());
    let mut pending_space = false;
    for c in label.trim_matches(is_whitespace_char).chars() {
        if is_whitespace_char(c) {
            pending_space = true;
            continue;
        }
        if pending_space {
            collapsed.push(' ');
            pending_space = false;
        }
        collapsed.push(c);
    }
    collapsed.to_lowercase().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::case_insensitive("Foo Bar", "foo bar")]
    #[case::whitespace_runs("foo \t\n bar", "foo bar")]
    #[case::outer_whitespace("  foo  ", "FOO")]
    #[case::sharp_s("\u{1e9e}", "SS")]
    #[case::greek("\u{391}\u{3b3}\u{3c9}", "\u{3b1}\u{393}\u{3a9}")]
    fn test_labels_match(#[case] a: &str, #[case] b: &str) {
        assert_eq!(normalize_label(a), normalize_label(b));
    }

    #[test]
    fn test_distinct_labels() {
        assert_ne!(normalize_label("foo"), normalize_label("fo o"));
    }
}
