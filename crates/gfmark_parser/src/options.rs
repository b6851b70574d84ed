//! Parse and render options.

use serde::{Deserialize, Serialize};

/// Default limit on nested containers (block quotes, lists, footnotes).
pub const DEFAULT_MAX_NESTING: usize = 100;

/// Options controlling how Markdown is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Convert straight quotes to curly quotes, `---` to em dashes, `--` to
    /// en dashes and `...` to ellipses.
    pub smart: bool,

    /// Parse footnote definitions `[^label]: ...` and references `[^label]`.
    pub footnotes: bool,

    /// Accept `<` followed by a tag name as raw HTML even when the rest of
    /// the tag is not well formed.
    pub liberal_html_tag: bool,

    /// Info string given to fenced code blocks that have none.
    pub default_info_string: Option<String>,

    /// Maximum depth of nested containers. Deeper block starts are treated
    /// as paragraph text.
    pub max_nesting: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            smart: false,
            footnotes: false,
            liberal_html_tag: false,
            default_info_string: None,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// Options controlling how a document is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Emit `data-sourcepos` attributes on block elements.
    pub sourcepos: bool,

    /// Render soft breaks as hard breaks.
    pub hardbreaks: bool,

    /// Render soft breaks as spaces.
    pub nobreaks: bool,

    /// Pass raw HTML and dangerous URLs through untouched.
    #[serde(rename = "unsafe")]
    pub unsafe_html: bool,

    /// Use `<pre lang="x">` instead of `<code class="language-x">`.
    pub github_pre_lang: bool,

    /// Keep everything after the first word of the info string in a
    /// `data-meta` attribute.
    pub full_info_string: bool,

    /// Use `style="text-align: ..."` instead of `align="..."` on table cells.
    pub table_prefer_style_attributes: bool,
}
