//! The engine: one configured parser, registry and set of renderers.

use std::sync::Arc;
use std::time::Instant;

use gfmark_ast::Document;
use gfmark_parser::{ExtensionRegistry, MarkdownParser, Parser};
use gfmark_render::{HtmlRenderer, PlainTextRenderer, RenderReport, XmlRenderer};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{EngineConfig, EngineError};

/// Parses and renders Markdown according to an [`EngineConfig`].
///
/// The registry is built once and shared read-only; an engine can be used
/// from several threads at once.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    registry: Arc<ExtensionRegistry>,
    parser: MarkdownParser,
}

impl Engine {
    /// Creates an engine, registering the configured extensions in order.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut registry = ExtensionRegistry::new();
        for entry in &config.extensions {
            let extension = gfmark_extensions::create(entry.name(), entry.options())?;
            registry.register(extension)?;
        }
        info!("Engine ready with {} extension(s)", registry.len());

        let registry = Arc::new(registry);
        let parser = MarkdownParser::with_registry(config.parse.clone(), Arc::clone(&registry));
        Ok(Self {
            config,
            registry,
            parser,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn parse(&self, text: &str) -> Result<Document, EngineError> {
        Ok(self.parser.parse(text)?)
    }

    /// Parses raw bytes. Invalid UTF-8 is an error.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Document, EngineError> {
        Ok(self.parser.parse_bytes(bytes)?)
    }

    fn html_renderer(&self) -> HtmlRenderer<'_> {
        HtmlRenderer::new(&self.config.render, &self.registry).strict(self.config.strict)
    }

    /// Renders HTML. Failed extension callbacks fall back to the default
    /// output unless the configuration is strict.
    pub fn render_html(&self, doc: &Document) -> Result<String, EngineError> {
        Ok(self.html_renderer().render(doc)?)
    }

    /// Renders HTML and reports every failed extension callback.
    pub fn render_report(&self, doc: &Document) -> Result<RenderReport, EngineError> {
        Ok(self.html_renderer().render_report(doc)?)
    }

    pub fn render_xml(&self, doc: &Document) -> Result<String, EngineError> {
        Ok(XmlRenderer::new(&self.config.render, &self.registry).render(doc)?)
    }

    pub fn render_plaintext(&self, doc: &Document) -> String {
        PlainTextRenderer::new(&self.config.render).render(doc)
    }

    /// Serializes the tree as pretty-printed JSON.
    pub fn to_json(&self, doc: &Document) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&doc.serialize_node(doc.root))?)
    }

    pub fn markdown_to_html(&self, text: &str) -> Result<String, EngineError> {
        let doc = self.parse(text)?;
        self.render_html(&doc)
    }

    /// Converts independent documents to HTML in parallel. Results keep the
    /// input order.
    pub fn render_batch<S>(&self, inputs: &[S]) -> Vec<Result<String, EngineError>>
    where
        S: AsRef<str> + Sync,
    {
        let start = Instant::now();
        let results: Vec<Result<String, EngineError>> = inputs
            .par_iter()
            .map(|input| self.markdown_to_html(input.as_ref()))
            .collect();

        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            warn!("{} of {} documents failed to render", failures, inputs.len());
        }
        debug!(
            "Rendered {} documents in {:?}",
            inputs.len(),
            start.elapsed()
        );
        results
    }
}

/// Converts CommonMark to HTML with default options and no extensions.
pub fn markdown_to_html(text: &str) -> Result<String, EngineError> {
    Engine::new(EngineConfig::new())?.markdown_to_html(text)
}

/// Converts GitHub Flavored Markdown to HTML with every GFM extension.
pub fn gfm_to_html(text: &str) -> Result<String, EngineError> {
    Engine::new(EngineConfig::gfm())?.markdown_to_html(text)
}
