// SPDX-License-Identifier: MIT

//! Sizes and well-known values for the APFS object header and the
//! file-system B-tree node layout, described in Apple's
//! [Apple File System Reference](https://developer.apple.com/support/downloads/Apple-File-System-Reference.pdf),
//! adjusted to use Rust-friendly naming.
//!
//! Only the values that a node reader validates are defined here. Nothing in
//! this crate decodes bytes.

#![forbid(dead_code, unsafe_code, unused)]

/// Object Identifier, unique within a container or volume.
///
/// Described in the Reference > Objects > `oid_t`.
pub type ObjectId = u64;

/// Transaction Identifier, incremented for each checkpoint.
///
/// Described in the Reference > Objects > `xid_t`.
pub type TransactionId = u64;

/// Size of the common header at the start of every on-disk object
/// (`obj_phys_t`): checksum, identifier, version, type and subtype.
pub const OBJECT_HEADER_SIZE: usize = 32;

/// Size of the checksum field that leads the object header. The checksum
/// covers every byte of the block after this field.
pub const OBJECT_CHECKSUM_SIZE: usize = 8;

/// Size of the node header following the object header: flags and four
/// (offset, size) pairs.
pub const BTREE_HEADER_SIZE: usize = 18;

/// Size of the trailer occupying the last bytes of a file-system B-tree node.
pub const BTREE_FOOTER_SIZE: usize = 40;

/// Size of one table-of-contents slot for a node of variable-size entries.
pub const ENTRY_DESCRIPTOR_SIZE: usize = 8;

/// Offset of the first byte after the object and node headers. Entry regions
/// are measured relative to this point.
pub const BTREE_HEADER_END: usize = OBJECT_HEADER_SIZE + BTREE_HEADER_SIZE;

/// Smallest block that can hold a node: both headers and the footer, with an
/// empty entry table and no free space.
pub const MIN_NODE_SIZE: usize = BTREE_HEADER_END + BTREE_FOOTER_SIZE;

/// Object types that identify the structure stored in a block.
///
/// Described in the Reference > Objects > Object Types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// A B-tree root or node.
    Btree = 0x0000_0002,
}

/// Object subtypes that identify the records indexed by a B-tree.
///
/// Described in the Reference > Objects > Object Types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSubtype {
    /// The volume's file-system tree: inodes, directory records, extents.
    FileSystemTree = 0x0000_000e,
}

/// Node layouts, as carried in the node header's flags.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtreeNodeLayout {
    /// A table of fixed-size descriptors pointing at variable-size keys and
    /// values. The only layout a file-system tree node reader accepts.
    VariableSizeEntries = 0x0003,
}

impl BtreeNodeLayout {
    /// Map raw header flags onto a known layout.
    pub const fn from_flags(flags: u16) -> Option<Self> {
        match flags {
            0x0003 => Some(Self::VariableSizeEntries),
            _ => None,
        }
    }
}

/// Value stored in the footer's fixed key and value size fields when the tree
/// holds variable-size entries.
pub const VARIABLE_ENTRY_SIZE: u32 = 0;

/// Block sizes a container may declare, from 4 KiB to 64 KiB.
///
/// Described in the Reference > Container > `nx_block_size`.
pub const MIN_BLOCK_SIZE: u32 = 4096;
pub const MAX_BLOCK_SIZE: u32 = 65536;
pub const DEFAULT_BLOCK_SIZE: u32 = MIN_BLOCK_SIZE;
