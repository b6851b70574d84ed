/// Errors raised by buffer and chunk operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum TextError {
    /// A view reaches past the end of the bytes it refers to.
    #[error("range {offset}..{end} is out of bounds for length {len}", end = .offset + .size)]
    #[diagnostic(code(gfmark::text::bounds))]
    Bounds {
        offset: usize,
        size: usize,
        len: usize,
    },

    /// A chunk was resolved against a buffer that changed after the chunk
    /// was taken.
    #[error("chunk outlives its buffer (taken at generation {chunk}, buffer is at {buffer})")]
    #[diagnostic(code(gfmark::text::stale_chunk))]
    StaleChunk { chunk: u64, buffer: u64 },

    /// Input bytes are not valid UTF-8.
    #[error("malformed input: invalid UTF-8 at byte {offset}")]
    #[diagnostic(code(gfmark::text::malformed_input))]
    MalformedInput { offset: usize },
}

impl TextError {
    pub fn bounds(offset: usize, size: usize, len: usize) -> Self {
        Self::Bounds { offset, size, len }
    }
}
