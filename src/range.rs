/// A span of bytes inside a block, known to fit within that block.
///
/// The only way to obtain one is [`ByteRange::within`], which refuses any
/// span whose end would pass the buffer length or overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    start: usize,
    len: usize,
}

impl ByteRange {
    /// Build a range of `len` bytes at `start`, provided
    /// `start + len <= buffer_len`.
    pub fn within(start: usize, len: usize, buffer_len: usize) -> Option<Self> {
        if start > buffer_len || len > buffer_len - start {
            return None;
        }
        Some(Self { start, len })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Borrow the covered bytes. Returns `None` when `data` is shorter than
    /// the buffer this range was validated against.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        data.get(self.start..self.end())
    }
}
