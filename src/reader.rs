use std::io::{Read, Seek};

use tracing::{debug, warn};

use crate::block::load_block;
use crate::checksum::verify_object_checksum;
use crate::error::{Error, Result};
use crate::node::{EntryRecord, FsBtreeNode, ResolvedEntry};
use crate::raw::{BtreeFooter, BtreeHeader, ObjectHeader};

/// Where a node lives in the backing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLocation {
    /// Absolute byte offset of the node's block.
    pub offset: u64,
    pub block_size: u32,
}

impl NodeLocation {
    pub fn new(offset: u64, block_size: u32) -> Self {
        Self { offset, block_size }
    }

    /// Locate block `block_number` of a volume starting `volume_offset` bytes
    /// into the source. `None` if the offset does not fit in 64 bits.
    pub fn from_block(volume_offset: u64, block_number: u64, block_size: u32) -> Option<Self> {
        let offset = block_number
            .checked_mul(u64::from(block_size))?
            .checked_add(volume_offset)?;
        Some(Self { offset, block_size })
    }
}

/// A decoded node with its entries copied out, independent of the block it
/// was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedNode {
    pub location: NodeLocation,
    pub object: ObjectHeader,
    pub header: BtreeHeader,
    pub footer: BtreeFooter,
    /// Where each record sat within the block.
    pub entries: Vec<ResolvedEntry>,
    pub records: Vec<EntryRecord>,
}

/// How much to trust the block before decoding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Check the object's Fletcher-64 checksum before decoding.
    pub verify_checksum: bool,
}

/// Load the block at `location` and decode it as a file-system B-tree node.
///
/// Failures carry the node's offset and block size. The block buffer is
/// dropped before returning.
pub fn read_node<R>(source: &mut R, location: NodeLocation, options: ReadOptions) -> Result<OwnedNode>
where
    R: Read + Seek + ?Sized,
{
    let block = read_block(source, location)?;
    decode_block(location, &block, options)
}

/// Load the raw block at `location` without decoding it.
pub fn read_block<R>(source: &mut R, location: NodeLocation) -> Result<Vec<u8>>
where
    R: Read + Seek + ?Sized,
{
    let NodeLocation { offset, block_size } = location;

    load_block(source, offset, block_size).map_err(|e| {
        warn!(offset, block_size, kind = %e.kind(), error = %e, "unable to load node");
        Error::Load {
            offset,
            block_size,
            source: e,
        }
    })
}

/// Decode a block already loaded from `location`.
pub fn decode_block(location: NodeLocation, block: &[u8], options: ReadOptions) -> Result<OwnedNode> {
    let NodeLocation { offset, block_size } = location;
    let decode_error = |source| Error::Decode {
        offset,
        block_size,
        source,
    };

    if options.verify_checksum {
        verify_object_checksum(block).map_err(decode_error)?;
    }

    let node = FsBtreeNode::parse(block).map_err(|e| {
        warn!(offset, block_size, kind = %e.kind(), error = %e, "unable to decode node");
        decode_error(e)
    })?;
    debug!(offset, entries = node.len(), "decoded node");

    Ok(OwnedNode {
        location,
        object: *node.object_header(),
        header: *node.btree_header(),
        footer: *node.btree_footer(),
        records: node.records(),
        entries: node.into_entries(),
    })
}
