//! Render error types.

use std::fmt;

use gfmark_ast::{NodeId, NodeType};
use gfmark_parser::ExtensionError;
use thiserror::Error;

/// An extension render callback that failed on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub node: NodeId,
    pub node_type: NodeType,
    pub error: ExtensionError,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (node {} of type {})",
            self.error,
            self.node.index(),
            self.node_type
        )
    }
}

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing to the output failed.
    #[error("Write error: {0}")]
    Fmt(#[from] fmt::Error),

    /// Extension callbacks failed while rendering in strict mode.
    #[error("{} render callback(s) failed: {}", .0.len(), summarize(.0))]
    Callbacks(Vec<CallbackFailure>),
}

impl RenderError {
    /// Creates an aggregate callback error.
    pub fn callbacks(failures: Vec<CallbackFailure>) -> Self {
        Self::Callbacks(failures)
    }
}

fn summarize(failures: &[CallbackFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
