//! Growable byte buffer and checked views into it.
//!
//! A [`Chunk`] is a plain `(offset, len)` pair tagged with the buffer
//! generation it was taken at. It does not borrow the buffer, so the parser
//! can hold chunks across mutations; resolving a chunk after the buffer
//! changed fails with [`TextError::StaleChunk`] instead of yielding bytes
//! that no longer mean what they did.

use crate::TextError;

/// Owned, growable bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    bytes: Vec<u8>,
    generation: u64,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            generation: 0,
        }
    }

    /// Current generation. Every mutation increments it.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.bytes.extend_from_slice(bytes);
        self.touch();
    }

    pub fn append_str(&mut self, text: &str) {
        self.append(text.as_bytes());
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.touch();
    }

    /// Shortens the buffer to `len` bytes.
    pub fn truncate(&mut self, len: usize) -> Result<(), TextError> {
        if len > self.bytes.len() {
            return Err(TextError::bounds(0, len, self.bytes.len()));
        }
        self.bytes.truncate(len);
        self.touch();
        Ok(())
    }

    /// Removes the first `count` bytes.
    pub fn drain_front(&mut self, count: usize) -> Result<(), TextError> {
        if count > self.bytes.len() {
            return Err(TextError::bounds(0, count, self.bytes.len()));
        }
        self.bytes.drain(..count);
        self.touch();
        Ok(())
    }

    /// Trims ASCII whitespace from both ends in place.
    pub fn trim(&mut self) {
        let start = self
            .bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.bytes.len());
        let end = self
            .bytes
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(start, |i| i + 1);
        self.bytes.truncate(end);
        self.bytes.drain(..start);
        self.touch();
    }

    /// Takes a view of `len` bytes starting at `offset`.
    pub fn chunk(&self, offset: usize, len: usize) -> Result<Chunk, TextError> {
        check_range(offset, len, self.bytes.len())?;
        Ok(Chunk {
            offset,
            len,
            generation: self.generation,
        })
    }

    /// Takes a view of the whole buffer.
    pub fn full(&self) -> Chunk {
        Chunk {
            offset: 0,
            len: self.bytes.len(),
            generation: self.generation,
        }
    }

    /// Resolves a chunk to its bytes.
    pub fn slice(&self, chunk: &Chunk) -> Result<&[u8], TextError> {
        if chunk.generation != self.generation {
            return Err(TextError::StaleChunk {
                chunk: chunk.generation,
                buffer: self.generation,
            });
        }
        check_range(chunk.offset, chunk.len, self.bytes.len())?;
        Ok(&self.bytes[chunk.offset..chunk.offset + chunk.len])
    }

    /// Resolves a chunk to text.
    pub fn str(&self, chunk: &Chunk) -> Result<&str, TextError> {
        let bytes = self.slice(chunk)?;
        validate_utf8(bytes).map_err(|err| match err {
            TextError::MalformedInput { offset } => TextError::MalformedInput {
                offset: chunk.offset + offset,
            },
            other => other,
        })
    }

    /// Iterates over lines, each chunk including its terminator.
    ///
    /// `\n`, `\r\n` and a lone `\r` all end a line. The final line may lack
    /// a terminator.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            bytes: &self.bytes,
            pos: 0,
            generation: self.generation,
        }
    }
}

impl From<&str> for Buffer {
    fn from(text: &str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
            generation: 0,
        }
    }
}

fn check_range(offset: usize, len: usize, size: usize) -> Result<(), TextError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(TextError::bounds(offset, len, size)),
    }
}

/// A bounds-checked view into a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    offset: usize,
    len: usize,
    generation: u64,
}

impl Chunk {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// End offset (exclusive) within the buffer.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Sub-view relative to this chunk.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Chunk, TextError> {
        check_range(offset, len, self.len)?;
        Ok(Chunk {
            offset: self.offset + offset,
            len,
            generation: self.generation,
        })
    }

    /// Sub-view with ASCII whitespace removed from both ends.
    pub fn trim(&self, buffer: &Buffer) -> Result<Chunk, TextError> {
        let bytes = buffer.slice(self)?;
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let end = bytes
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(start, |i| i + 1);
        self.slice(start, end - start)
    }
}

/// Iterator over the lines of a buffer.
pub struct Lines<'a> {
    bytes: &'a [u8],
    pos: usize,
    generation: u64,
}

impl Iterator for Lines<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.bytes[start..];
        let len = match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(i) if rest[i] == b'\r' && rest.get(i + 1) == Some(&b'\n') => i + 2,
            Some(i) => i + 1,
            None => rest.len(),
        };
        self.pos += len;
        Some(Chunk {
            offset: start,
            len,
            generation: self.generation,
        })
    }
}

/// Checks that `bytes` is UTF-8.
pub fn validate_utf8(bytes: &[u8]) -> Result<&str, TextError> {
    std::str::from_utf8(bytes).map_err(|err| TextError::MalformedInput {
        offset: err.valid_up_to(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_resolves() {
        let buf = Buffer::from("hello world");
        let chunk = buf.chunk(6, 5).unwrap();
        assert_eq!(buf.str(&chunk).unwrap(), "world");
        assert_eq!(chunk.end(), 11);
    }

    #[test]
    fn test_chunk_out_of_bounds() {
        let buf = Buffer::from("abc");
        assert_eq!(buf.chunk(2, 5), Err(TextError::bounds(2, 5, 3)));
        assert!(buf.chunk(usize::MAX, 2).is_err());
        assert!(buf.chunk(3, 0).is_ok());
    }

    #[test]
    fn test_stale_chunk_after_mutation() {
        let mut buf = Buffer::from("abc");
        let chunk = buf.chunk(0, 3).unwrap();
        buf.append_str("def");
        let err = buf.slice(&chunk).unwrap_err();
        assert!(matches!(err, TextError::StaleChunk { .. }));
        assert!(err.to_string().contains("outlives its buffer"));
    }

    #[test]
    fn test_empty_append_keeps_chunks_valid() {
        let mut buf = Buffer::from("abc");
        let chunk = buf.full();
        buf.append(b"");
        assert_eq!(buf.slice(&chunk).unwrap(), b"abc");
    }

    #[test]
    fn test_chunk_sub_slice_and_trim() {
        let buf = Buffer::from("  padded  ");
        let whole = buf.full();
        let trimmed = whole.trim(&buf).unwrap();
        assert_eq!(buf.str(&trimmed).unwrap(), "padded");

        let sub = trimmed.slice(1, 3).unwrap();
        assert_eq!(buf.str(&sub).unwrap(), "add");
        assert!(trimmed.slice(4, 5).is_err());
    }

    #[test]
    fn test_trim_all_whitespace() {
        let buf = Buffer::from(" \t\n");
        let trimmed = buf.full().trim(&buf).unwrap();
        assert!(trimmed.is_empty());

        let mut owned = Buffer::from("\n x \n");
        owned.trim();
        assert_eq!(owned.as_bytes(), b"x");
    }

    #[test]
    fn test_lines_keep_terminators() {
        let buf = Buffer::from("a\nb\r\nc\rd");
        let lines: Vec<_> = buf
            .lines()
            .map(|c| buf.str(&c).unwrap().to_string())
            .collect();
        assert_eq!(lines, ["a\n", "b\r\n", "c\r", "d"]);
    }

    #[test]
    fn test_drain_front() {
        let mut buf = Buffer::from("line\nrest");
        buf.drain_front(5).unwrap();
        assert_eq!(buf.as_bytes(), b"rest");
        assert!(buf.drain_front(10).is_err());
    }

    #[test]
    fn test_validate_utf8_reports_offset() {
        assert_eq!(validate_utf8(b"ok").unwrap(), "ok");
        assert_eq!(
            validate_utf8(b"ab\xffcd"),
            Err(TextError::MalformedInput { offset: 2 })
        );
    }

    #[test]
    fn test_str_offset_is_buffer_relative() {
        let mut buf = Buffer::new();
        buf.append(b"abc\xff");
        let chunk = buf.chunk(2, 2).unwrap();
        assert_eq!(
            buf.str(&chunk),
            Err(TextError::MalformedInput { offset: 3 })
        );
    }
}
