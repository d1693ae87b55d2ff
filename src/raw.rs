//! Unvalidated on-disk records, decoded field by field from little-endian
//! bytes. Nothing here checks that the values make sense; that is the node
//! decoder's job.

use apfs_types::{
    BTREE_FOOTER_SIZE, BTREE_HEADER_SIZE, ENTRY_DESCRIPTOR_SIZE, OBJECT_HEADER_SIZE, ObjectId,
    TransactionId,
};
use deku::prelude::*;

use crate::error::DecodeError;

/// Common header at the start of every object. Defined as `obj_phys_t` in the
/// Apple File System Reference > Objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct ObjectHeader {
    /// Fletcher-64 checksum of the rest of the block.
    pub checksum: u64,
    pub identifier: ObjectId,
    /// Transaction that last modified the object.
    pub version: TransactionId,
    pub object_type: u32,
    pub subtype: u32,
}

/// Node header following the object header.
///
/// All offsets are relative to the end of this header. The free-list pairs
/// are carried through for callers but describe space this reader never
/// dereferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct BtreeHeader {
    pub flags: u16,
    pub entries_offset: u16,
    pub entries_size: u16,
    pub unused_offset: u16,
    pub unused_size: u16,
    pub key_free_list_offset: u16,
    pub key_free_list_size: u16,
    pub value_free_list_offset: u16,
    pub value_free_list_size: u16,
}

/// Trailer in the last bytes of the node. Defined as `btree_info_t` in the
/// Apple File System Reference > B-Trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct BtreeFooter {
    pub flags: u32,
    pub node_size: u32,
    /// Fixed key size, or zero for variable-size keys.
    pub key_size: u32,
    /// Fixed value size, or zero for variable-size values.
    pub value_size: u32,
    pub maximum_key_size: u32,
    pub maximum_value_size: u32,
    pub number_of_entries: u64,
    pub number_of_nodes: u64,
}

/// One slot of the entry table. Offsets are as stored: keys count forward from
/// the end of the table, values count backward from the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
pub struct EntryDescriptor {
    pub key_offset: u16,
    pub key_size: u16,
    pub value_offset: u16,
    pub value_size: u16,
}

pub fn read_object_header(data: &[u8]) -> Result<ObjectHeader, DecodeError> {
    read_record(data, OBJECT_HEADER_SIZE, "object header")
}

pub fn read_btree_header(data: &[u8]) -> Result<BtreeHeader, DecodeError> {
    read_record(data, BTREE_HEADER_SIZE, "B-tree header")
}

pub fn read_btree_footer(data: &[u8]) -> Result<BtreeFooter, DecodeError> {
    read_record(data, BTREE_FOOTER_SIZE, "B-tree footer")
}

pub fn read_entry_descriptor(data: &[u8]) -> Result<EntryDescriptor, DecodeError> {
    read_record(data, ENTRY_DESCRIPTOR_SIZE, "entry descriptor")
}

/// Decode a fixed-size record from the front of `data`, refusing to touch
/// anything when fewer than `size` bytes are present.
fn read_record<T>(data: &[u8], size: usize, structure: &'static str) -> Result<T, DecodeError>
where
    T: for<'a> DekuContainerRead<'a>,
{
    let truncated = DecodeError::Truncated {
        structure,
        needed: size,
        actual: data.len(),
    };
    let bytes = data.get(..size).ok_or_else(|| truncated.clone())?;

    // The records are plain integers, so the only way deku can fail on
    // `size` bytes is by running out of input.
    let (_rest, record) = T::from_bytes((bytes, 0)).map_err(|_| truncated)?;

    Ok(record)
}
