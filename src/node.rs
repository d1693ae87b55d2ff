//! Decoder for a single file-system B-tree node.
//!
//! A node is one block laid out as:
//!
//! ```text
//! +---------------+---------------+-------------+-----------+-- ... --+--------------+---------------+
//! | object header | B-tree header | entry table | key bytes |  free   | value bytes  | B-tree footer |
//! |   32 bytes    |   18 bytes    |  8 * count  |  -->      |         |      <--     |   40 bytes    |
//! +---------------+---------------+-------------+-----------+-- ... --+--------------+---------------+
//! ```
//!
//! Key offsets count forward from the end of the entry table, value offsets
//! count backward from the start of the footer. Every field comes from a
//! possibly hostile image, so each is checked before it is used to index the
//! block, and a single bad field rejects the whole node.

use apfs_types::{
    BTREE_FOOTER_SIZE, BTREE_HEADER_END, BtreeNodeLayout, ENTRY_DESCRIPTOR_SIZE, MIN_NODE_SIZE,
    OBJECT_HEADER_SIZE, ObjectSubtype, ObjectType, VARIABLE_ENTRY_SIZE,
};
use tracing::trace;

use crate::error::DecodeError;
use crate::range::ByteRange;
use crate::raw::{
    BtreeFooter, BtreeHeader, ObjectHeader, read_btree_footer, read_btree_header,
    read_entry_descriptor, read_object_header,
};

/// Location of one entry's key and value within the block it was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub key: ByteRange,
    pub value: ByteRange,
}

/// Owned copy of one entry's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A decoded node borrowing the block it came from.
#[derive(Debug, Clone)]
pub struct FsBtreeNode<'a> {
    data: &'a [u8],
    object: ObjectHeader,
    header: BtreeHeader,
    footer: BtreeFooter,
    entries: Vec<ResolvedEntry>,
}

/// Validate `data` as a file-system B-tree node and resolve every entry.
///
/// Entries are returned in table order. Any inconsistency fails the whole
/// node; nothing is returned for the entries that happened to look valid.
pub fn decode_node(data: &[u8]) -> Result<Vec<ResolvedEntry>, DecodeError> {
    FsBtreeNode::parse(data).map(FsBtreeNode::into_entries)
}

impl<'a> FsBtreeNode<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::EmptyBuffer);
        }
        let data_size = data.len();

        // Both headers must be present before either is looked at.
        if data_size < BTREE_HEADER_END {
            return Err(DecodeError::Truncated {
                structure: "B-tree header",
                needed: BTREE_HEADER_END,
                actual: data_size,
            });
        }

        let object = read_object_header(data)?;
        trace!(
            checksum = object.checksum,
            identifier = object.identifier,
            version = object.version,
            object_type = object.object_type,
            subtype = object.subtype,
            "object header"
        );
        expect_value(
            "object type",
            u64::from(object.object_type),
            u64::from(ObjectType::Btree as u32),
        )?;
        expect_value(
            "object subtype",
            u64::from(object.subtype),
            u64::from(ObjectSubtype::FileSystemTree as u32),
        )?;

        let header = read_btree_header(&data[OBJECT_HEADER_SIZE..])?;
        trace!(?header, "B-tree header");
        if BtreeNodeLayout::from_flags(header.flags).is_none() {
            return Err(DecodeError::UnsupportedValue {
                field: "B-tree header flags",
                value: u64::from(header.flags),
                expected: u64::from(BtreeNodeLayout::VariableSizeEntries as u16),
            });
        }

        if data_size < MIN_NODE_SIZE {
            return Err(DecodeError::Truncated {
                structure: "B-tree footer",
                needed: MIN_NODE_SIZE,
                actual: data_size,
            });
        }
        let footer_offset = data_size - BTREE_FOOTER_SIZE;
        let footer = read_btree_footer(&data[footer_offset..])?;
        trace!(?footer, "B-tree footer");

        check_regions(&header, footer_offset - BTREE_HEADER_END)?;

        expect_value(
            "footer key size",
            u64::from(footer.key_size),
            u64::from(VARIABLE_ENTRY_SIZE),
        )?;
        expect_value(
            "footer value size",
            u64::from(footer.value_size),
            u64::from(VARIABLE_ENTRY_SIZE),
        )?;

        let capacity = (usize::from(header.entries_size) / ENTRY_DESCRIPTOR_SIZE) as u64;
        if footer.number_of_entries > capacity {
            return Err(DecodeError::TooManyEntries {
                count: footer.number_of_entries,
                capacity,
            });
        }

        let entries = resolve_entries(data, &header, &footer, footer_offset)?;

        Ok(Self {
            data,
            object,
            header,
            footer,
            entries,
        })
    }

    pub fn object_header(&self) -> &ObjectHeader {
        &self.object
    }

    pub fn btree_header(&self) -> &BtreeHeader {
        &self.header
    }

    pub fn btree_footer(&self) -> &BtreeFooter {
        &self.footer
    }

    pub fn entries(&self) -> &[ResolvedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key bytes of the entry at `index` in table order.
    pub fn key(&self, index: usize) -> Option<&'a [u8]> {
        let data = self.data;
        self.entries.get(index).and_then(|e| e.key.slice(data))
    }

    /// Value bytes of the entry at `index` in table order.
    pub fn value(&self, index: usize) -> Option<&'a [u8]> {
        let data = self.data;
        self.entries.get(index).and_then(|e| e.value.slice(data))
    }

    /// Borrowed key and value bytes, in table order. Yields exactly
    /// [`len`](Self::len) items.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + '_ {
        let data = self.data;
        // Every range was built against `data.len()` in `parse`.
        self.entries.iter().map(move |e| {
            (
                &data[e.key.start()..e.key.end()],
                &data[e.value.start()..e.value.end()],
            )
        })
    }

    /// Copy every entry out of the block.
    pub fn records(&self) -> Vec<EntryRecord> {
        self.iter()
            .map(|(key, value)| EntryRecord {
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .collect()
    }

    pub fn into_entries(self) -> Vec<ResolvedEntry> {
        self.entries
    }
}

fn expect_value(field: &'static str, value: u64, expected: u64) -> Result<(), DecodeError> {
    if value != expected {
        return Err(DecodeError::UnsupportedValue {
            field,
            value,
            expected,
        });
    }
    Ok(())
}

/// Prove that the entry table and unused space fit, one after the other, in
/// the `available` bytes between the headers and the footer. Consuming the
/// space in order is what keeps the regions disjoint.
///
/// The free lists are never dereferenced and are not checked. An empty list
/// stores an invalid offset of 0xffff.
fn check_regions(header: &BtreeHeader, available: usize) -> Result<(), DecodeError> {
    let sequence = [
        ("entries offset", header.entries_offset),
        ("entries size", header.entries_size),
        ("unused offset", header.unused_offset),
        ("unused size", header.unused_size),
    ];
    let mut remaining = available as u64;
    for (field, value) in sequence {
        let value = u64::from(value);
        if value > remaining {
            return Err(DecodeError::Region {
                field,
                value,
                available: remaining,
            });
        }
        remaining -= value;
    }

    Ok(())
}

fn resolve_entries(
    data: &[u8],
    header: &BtreeHeader,
    footer: &BtreeFooter,
    footer_offset: usize,
) -> Result<Vec<ResolvedEntry>, DecodeError> {
    let data_size = data.len();
    let table_start = BTREE_HEADER_END + usize::from(header.entries_offset);
    let key_area_start = table_start + usize::from(header.entries_size);

    // Bounded by the entry table capacity, which has already been checked.
    let count = footer.number_of_entries as usize;
    let mut entries = Vec::with_capacity(count);

    for index in 0..count {
        let descriptor_offset = table_start + index * ENTRY_DESCRIPTOR_SIZE;
        let descriptor = read_entry_descriptor(data.get(descriptor_offset..).unwrap_or(&[]))?;
        trace!(index, ?descriptor, "entry descriptor");

        let key_start = key_area_start + usize::from(descriptor.key_offset);
        let key_len = usize::from(descriptor.key_size);
        let key = ByteRange::within(key_start, key_len, data_size).ok_or(
            DecodeError::EntryOutOfBounds {
                index: index as u64,
                field: "key",
                start: key_start as u64,
                len: key_len as u64,
                bound: data_size as u64,
            },
        )?;

        let value_offset = usize::from(descriptor.value_offset);
        let value_start =
            footer_offset
                .checked_sub(value_offset)
                .ok_or(DecodeError::ValueOffsetUnderflow {
                    index: index as u64,
                    value_offset: value_offset as u64,
                    footer_offset: footer_offset as u64,
                })?;
        let value_len = usize::from(descriptor.value_size);
        let value = ByteRange::within(value_start, value_len, data_size).ok_or(
            DecodeError::EntryOutOfBounds {
                index: index as u64,
                field: "value",
                start: value_start as u64,
                len: value_len as u64,
                bound: data_size as u64,
            },
        )?;

        trace!(
            index,
            key_start = key.start(),
            key_len = key.len(),
            value_start = value.start(),
            value_len = value.len(),
            "resolved entry"
        );
        entries.push(ResolvedEntry { key, value });
    }

    Ok(entries)
}
