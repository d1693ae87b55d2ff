#![forbid(unsafe_code)]

//! Read-only access to APFS file-system B-tree nodes in raw disk images.
//!
//! The decoder trusts nothing in the block: [`decode_node`] validates the
//! object header, the node header and footer, and every entry's key and value
//! location before handing back a single byte range. A node that fails any
//! check yields no entries at all.
//!
//! ```no_run
//! use std::fs::File;
//! use apfsprust::{NodeLocation, ReadOptions, read_node};
//!
//! let mut image = File::open("disk.img")?;
//! let location = NodeLocation::from_block(0, 1234, 4096).expect("offset fits");
//! let node = read_node(&mut image, location, ReadOptions::default())?;
//! for record in &node.records {
//!     println!("{} byte key, {} byte value", record.key.len(), record.value.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod block;
pub mod checksum;
pub mod error;
pub mod node;
pub mod range;
pub mod raw;
pub mod reader;

pub use block::load_block;
pub use checksum::{fletcher64, verify_object_checksum};
pub use error::{DecodeError, Error, ErrorKind, LoadError, Result};
pub use node::{EntryRecord, FsBtreeNode, ResolvedEntry, decode_node};
pub use range::ByteRange;
pub use raw::{
    BtreeFooter, BtreeHeader, EntryDescriptor, ObjectHeader, read_btree_footer,
    read_btree_header, read_entry_descriptor, read_object_header,
};
pub use reader::{NodeLocation, OwnedNode, ReadOptions, decode_block, read_block, read_node};
