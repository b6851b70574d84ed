//! Parse and extension error types.

use gfmark_text::TextError;
use thiserror::Error;

/// Errors that can occur during parsing.
///
/// Grammar ambiguities never produce errors. Unmatched delimiters,
/// unresolved references and unterminated constructs fall back to literal
/// text, so the only failures are bad input bytes and failing extensions.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input is not valid UTF-8.
    #[error("Malformed input: invalid UTF-8 at byte {offset}")]
    MalformedInput {
        /// Byte offset of the first invalid sequence.
        offset: usize,
    },

    /// An extension hook aborted the parse.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// The parser was used after `finish`.
    #[error("Parser already finished")]
    Finished,
}

impl ParseError {
    /// Creates a malformed input error.
    pub fn malformed_input(offset: usize) -> Self {
        Self::MalformedInput { offset }
    }
}

impl From<TextError> for ParseError {
    fn from(err: TextError) -> Self {
        match err {
            TextError::MalformedInput { offset } => Self::MalformedInput { offset },
            other => Self::Extension(ExtensionError::callback("text", other.to_string())),
        }
    }
}

/// Errors raised by the extension registry and by extension hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// An extension with the same name is already registered.
    #[error("Extension '{0}' is already registered")]
    Duplicate(String),

    /// No extension with this name exists.
    #[error("Extension not found: {0}")]
    NotFound(String),

    /// Extension options could not be deserialized.
    #[error("Invalid options for extension '{name}': {message}")]
    InvalidOptions { name: String, message: String },

    /// An extension hook failed.
    #[error("Extension '{name}' failed: {message}")]
    Callback { name: String, message: String },
}

impl ExtensionError {
    /// Creates a duplicate registration error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::Duplicate(name.into())
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Creates an invalid options error.
    pub fn invalid_options(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a callback failure error.
    pub fn callback(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Callback {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Name of the extension the error is about.
    pub fn extension_name(&self) -> &str {
        match self {
            Self::Duplicate(name) | Self::NotFound(name) => name,
            Self::InvalidOptions { name, .. } | Self::Callback { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ExtensionError::duplicate("table").to_string(),
            "Extension 'table' is already registered"
        );
        assert_eq!(
            ExtensionError::callback("tasklist", "boom").to_string(),
            "Extension 'tasklist' failed: boom"
        );
        assert_eq!(
            ParseError::malformed_input(3).to_string(),
            "Malformed input: invalid UTF-8 at byte 3"
        );
    }

    #[test]
    fn test_text_error_conversion() {
        let err: ParseError = TextError::MalformedInput { offset: 7 }.into();
        assert!(matches!(err, ParseError::MalformedInput { offset: 7 }));

        let err: ParseError = TextError::bounds(0, 4, 2).into();
        assert!(matches!(err, ParseError::Extension(_)));
    }

    #[test]
    fn test_extension_name() {
        let err = ExtensionError::invalid_options("tagfilter", "expected array");
        assert_eq!(err.extension_name(), "tagfilter");
    }
}
