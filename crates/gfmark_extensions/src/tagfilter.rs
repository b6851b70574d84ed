//! tagfilter extension: neutralizes dangerous raw HTML tags.
//!
//! When raw HTML output is enabled, the `<` of every opening or closing
//! tag in the filtered set is written as `&lt;`, so browsers show the tag
//! as text. Everything else in the raw HTML passes through unchanged.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | allow | string[] | [] | Tag names removed from the filtered set |
//! | deny | string[] | [] | Extra tag names to filter |
//!
//! The default set is `title`, `textarea`, `style`, `xmp`, `iframe`,
//! `noembed`, `noframes`, `script` and `plaintext`.
//!
//! # Example
//!
//! ```json
//! {
//!   "extensions": [
//!     { "name": "tagfilter", "options": { "allow": ["style"], "deny": ["object"] } }
//!   ]
//! }
//! ```

use std::borrow::Cow;

use gfmark_parser::Extension;
use serde::Deserialize;

pub const EXTENSION_NAME: &str = "tagfilter";

const DEFAULT_TAGS: &[&str] = &[
    "title",
    "textarea",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "script",
    "plaintext",
];

/// Configuration for the tagfilter extension.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagfilterOptions {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Tagfilter {
    /// Lowercase tag names.
    tags: Vec<String>,
}

impl Default for Tagfilter {
    fn default() -> Self {
        Self::new(TagfilterOptions::default())
    }
}

impl Tagfilter {
    pub fn new(options: TagfilterOptions) -> Self {
        let mut tags: Vec<String> = DEFAULT_TAGS
            .iter()
            .filter(|tag| !options.allow.iter().any(|a| a.eq_ignore_ascii_case(tag)))
            .map(|tag| (*tag).to_string())
            .collect();
        for tag in &options.deny {
            let tag = tag.to_ascii_lowercase();
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Self { tags }
    }

    /// Whether the tag starting at `html[0] == '<'` is filtered.
    fn is_filtered(&self, html: &[u8]) -> bool {
        let mut name_start = 1;
        if html.get(1) == Some(&b'/') {
            name_start = 2;
        }
        let rest = &html[name_start.min(html.len())..];
        self.tags.iter().any(|tag| {
            let tag = tag.as_bytes();
            rest.len() >= tag.len()
                && rest[..tag.len()].eq_ignore_ascii_case(tag)
                && match rest.get(tag.len()) {
                    None => true,
                    Some(b'>') => true,
                    Some(b'/') => rest.get(tag.len() + 1) == Some(&b'>'),
                    Some(b) => b.is_ascii_whitespace(),
                }
        })
    }
}

impl Extension for Tagfilter {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn filter_raw_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        let bytes = html.as_bytes();
        let hits: Vec<usize> = bytes
            .iter()
            .enumerate()
            .filter(|&(i, &b)| b == b'<' && self.is_filtered(&bytes[i..]))
            .map(|(i, _)| i)
            .collect();
        if hits.is_empty() {
            return Cow::Borrowed(html);
        }

        let mut out = String::with_capacity(html.len() + hits.len() * 3);
        let mut last = 0;
        for i in hits {
            out.push_str(&html[last..i]);
            out.push_str("&lt;");
            last = i + 1;
        }
        out.push_str(&html[last..]);
        Cow::Owned(out)
    }
}
