//! Output sink for HTML renderers.

use std::fmt;

use crate::escape::{escape_href, escape_html};

/// Accumulates rendered HTML.
///
/// Extension render callbacks receive a `&mut HtmlWriter`, so everything
/// they produce goes through the same escaping helpers as the core
/// renderer.
#[derive(Debug, Default, Clone)]
pub struct HtmlWriter {
    out: String,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
        }
    }

    /// Writes a newline unless the output is empty or already ends with one.
    pub fn cr(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Writes markup verbatim.
    pub fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// Writes text with HTML escaping.
    pub fn text(&mut self, s: &str) {
        escape_html(&mut self.out, s);
    }

    /// Writes a URL escaped for an attribute.
    pub fn href(&mut self, url: &str) {
        escape_href(&mut self.out, url);
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Drops everything written after `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.out.truncate(len);
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

impl fmt::Write for HtmlWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }
}
