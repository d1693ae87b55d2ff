//! Errors raised while loading and decoding file-system B-tree nodes.
//!
//! Every variant carries the field it concerns, the value that was read or
//! computed, and the bound it violated, so that a failure on a damaged image
//! can be traced back to the offending bytes.

use std::fmt;
use std::io;

use thiserror::Error;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller handed over an unusable argument, such as an empty buffer.
    InvalidArgument,
    /// The block holds something other than a supported file-system B-tree node.
    UnsupportedFormat,
    /// An offset or size points outside the block, or regions overlap.
    OutOfBounds,
    /// The backing source could not be positioned or read.
    Io,
    /// The stored object checksum does not match the block contents.
    Checksum,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid argument",
            Self::UnsupportedFormat => "unsupported format",
            Self::OutOfBounds => "out of bounds",
            Self::Io => "i/o",
            Self::Checksum => "checksum",
        };
        f.write_str(name)
    }
}

/// Failure to decode a node from an in-memory block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty block buffer")]
    EmptyBuffer,

    #[error("block too small for {structure}: need {needed} bytes, got {actual}")]
    Truncated {
        structure: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("unsupported {field}: {value:#x} (expected {expected:#x})")]
    UnsupportedValue {
        field: &'static str,
        value: u64,
        expected: u64,
    },

    #[error("{field} of {value} exceeds the {available} bytes available")]
    Region {
        field: &'static str,
        value: u64,
        available: u64,
    },

    #[error("number of entries {count} exceeds entry table capacity {capacity}")]
    TooManyEntries { count: u64, capacity: u64 },

    #[error("entry {index}: {field} at {start} with size {len} exceeds block size {bound}")]
    EntryOutOfBounds {
        index: u64,
        field: &'static str,
        start: u64,
        len: u64,
        bound: u64,
    },

    #[error("entry {index}: value offset {value_offset} reaches before the start of the block (footer at {footer_offset})")]
    ValueOffsetUnderflow {
        index: u64,
        value_offset: u64,
        footer_offset: u64,
    },

    #[error("object checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { stored: u64, computed: u64 },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyBuffer => ErrorKind::InvalidArgument,
            Self::UnsupportedValue { .. } => ErrorKind::UnsupportedFormat,
            Self::Truncated { .. }
            | Self::Region { .. }
            | Self::TooManyEntries { .. }
            | Self::EntryOutOfBounds { .. }
            | Self::ValueOffsetUnderflow { .. } => ErrorKind::OutOfBounds,
            Self::ChecksumMismatch { .. } => ErrorKind::Checksum,
        }
    }
}

/// Failure to fetch a block from the backing source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid block size: {block_size}")]
    InvalidBlockSize { block_size: u32 },

    #[error("unable to seek to offset {offset:#x}")]
    Seek {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("unable to read block at offset {offset:#x}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("short read at offset {offset:#x}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBlockSize { .. } => ErrorKind::InvalidArgument,
            Self::Seek { .. } | Self::Read { .. } | Self::ShortRead { .. } => ErrorKind::Io,
        }
    }
}

/// Failure to read a node, located by its offset in the backing source.
///
/// A node that fails here cannot be trusted for any of its entries, and
/// neither can the subtree rooted at it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("node at offset {offset:#x} (block size {block_size}): {source}")]
    Load {
        offset: u64,
        block_size: u32,
        #[source]
        source: LoadError,
    },

    #[error("node at offset {offset:#x} (block size {block_size}): {source}")]
    Decode {
        offset: u64,
        block_size: u32,
        #[source]
        source: DecodeError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Load { source, .. } => source.kind(),
            Self::Decode { source, .. } => source.kind(),
        }
    }

    /// Byte offset of the node that failed.
    pub fn offset(&self) -> u64 {
        match self {
            Self::Load { offset, .. } | Self::Decode { offset, .. } => *offset,
        }
    }

    pub fn block_size(&self) -> u32 {
        match self {
            Self::Load { block_size, .. } | Self::Decode { block_size, .. } => *block_size,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
