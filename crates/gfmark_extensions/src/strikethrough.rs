//! strikethrough extension: `~text~` and `~~text~~`.
//!
//! Tilde runs go on the delimiter stack next to `*` and `_`. An opener
//! and closer only pair up when both runs have the same length of one or
//! two tildes; anything else stays literal.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | double_tilde | boolean | false | Only `~~` runs strike through |
//!
//! # Example
//!
//! ```json
//! {
//!   "extensions": [
//!     { "name": "strikethrough", "options": { "double_tilde": true } }
//!   ]
//! }
//! ```

use gfmark_ast::NodeValue;
use gfmark_parser::Extension;
use serde::Deserialize;

pub const EXTENSION_NAME: &str = "strikethrough";

/// Configuration for the strikethrough extension.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrikethroughOptions {
    /// Require two tildes on each side.
    pub double_tilde: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Strikethrough {
    options: StrikethroughOptions,
}

impl Strikethrough {
    pub fn new(options: StrikethroughOptions) -> Self {
        Self { options }
    }

    fn accepts(&self, len: usize) -> bool {
        if self.options.double_tilde {
            len == 2
        } else {
            (1..=2).contains(&len)
        }
    }
}

impl Extension for Strikethrough {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn delimiter_chars(&self) -> &[u8] {
        b"~"
    }

    fn resolve_delimiters(
        &self,
        delim: u8,
        opener_len: usize,
        closer_len: usize,
    ) -> Option<(NodeValue, usize)> {
        if delim != b'~' || opener_len != closer_len || !self.accepts(opener_len) {
            return None;
        }
        Some((NodeValue::Strikethrough, opener_len))
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
        render_with(vec![Arc::new(Strikethrough::default())], input)
    }

    #[rstest]
    #[case::double("~~Hi~~ Hello", "<p><del>Hi</del> Hello</p>\n")]
    #[case::single("a ~b~ c", "<p>a <del>b</del> c</p>\n")]
    #[case::triple_stays_literal("a ~~~b~~~", "<p>a ~~~b~~~</p>\n")]
    #[case::unequal_runs("~~a~ b", "<p>~~a~ b</p>\n")]
    #[case::nested_emphasis("~~*a*~~", "<p><del><em>a</em></del></p>\n")]
    #[case::unclosed("~~a", "<p>~~a</p>\n")]
    fn test_strikethrough(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(render(input), expected);
    }

    #[test]
    fn test_double_tilde_option() {
        let ext = Strikethrough::new(StrikethroughOptions { double_tilde: true });
        let html = render_with(vec![Arc::new(ext)], "~a~ ~~b~~");
        assert_eq!(html, "<p>~a~ <del>b</del></p>\n");
    }

    #[test]
    fn test_without_extension_tildes_are_text() {
        assert_eq!(render_with(Vec::new(), "~~a~~"), "<p>~~a~~</p>\n");
    }

    #[test]
    fn test_resolve_rejects_other_delimiters() {
        assert_eq!(Strikethrough::default().resolve_delimiters(b'*', 1, 1), None);
    }
}
