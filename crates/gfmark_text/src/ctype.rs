//! Character classes used by the scanners and the inline parser.

/// Space, tab, line feed, line tabulation, form feed or carriage return.
#[inline]
pub const fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

/// Line feed or carriage return.
#[inline]
pub const fn is_line_end(b: u8) -> bool {
    matches!(b, b'\n' | b'\r')
}

/// Space or tab.
#[inline]
pub const fn is_space_or_tab(b: u8) -> bool {
    matches!(b, b' ' | b'\t')
}

/// ASCII punctuation as defined by CommonMark (backslash-escapable).
#[inline]
pub const fn is_punct(b: u8) -> bool {
    b.is_ascii_punctuation()
}

/// Unicode whitespace for flanking rules.
#[inline]
pub fn is_whitespace_char(c: char) -> bool {
    c.is_whitespace()
}

/// Unicode punctuation for flanking rules.
///
/// Covers ASCII punctuation plus any non-ASCII character that is neither
/// alphanumeric, whitespace nor a control character, which includes the
/// general categories P* and S*.
#[inline]
pub fn is_punct_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control()
}

/// Returns true if the line contains nothing but spaces and tabs.
pub fn is_blank(line: &[u8]) -> bool {
    line.iter()
        .take_while(|&&b| !is_line_end(b))
        .all(|&b| is_space_or_tab(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ascii_bang('!', true)]
    #[case::ascii_tilde('~', true)]
    #[case::letter('a', false)]
    #[case::digit('7', false)]
    #[case::space(' ', false)]
    #[case::em_dash('\u{2014}', true)]
    #[case::euro('\u{20ac}', true)]
    #[case::cjk_period('\u{3002}', true)]
    #[case::accented('\u{e9}', false)]
    #[case::nbsp('\u{a0}', false)]
    fn test_punct_char(#[case] c: char, #[case] expected: bool) {
        assert_eq!(is_punct_char(c), expected);
    }

    #[test]
    fn test_blank_lines() {
        assert!(is_blank(b""));
        assert!(is_blank(b"  \t\n"));
        assert!(!is_blank(b"  x\n"));
        assert!(is_blank(b"\nfoo"));
    }

    #[test]
    fn test_space_class() {
        assert!(is_space(0x0c));
        assert!(!is_space(b'x'));
        assert!(is_space_or_tab(b'\t'));
        assert!(!is_space_or_tab(b'\n'));
    }
}
