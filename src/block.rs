use std::io::{ErrorKind, Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::LoadError;

/// Read exactly `block_size` bytes at `file_offset` from `source`.
///
/// Never returns a short buffer: running out of data before the block is
/// complete is a [`LoadError::ShortRead`].
pub fn load_block<R>(source: &mut R, file_offset: u64, block_size: u32) -> Result<Vec<u8>, LoadError>
where
    R: Read + Seek + ?Sized,
{
    if block_size == 0 {
        return Err(LoadError::InvalidBlockSize { block_size });
    }
    let expected = block_size as usize;

    debug!(file_offset, block_size, "reading block");

    source
        .seek(SeekFrom::Start(file_offset))
        .map_err(|source| LoadError::Seek {
            offset: file_offset,
            source,
        })?;

    let mut block = vec![0u8; expected];
    let mut filled = 0;
    while filled < expected {
        match source.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(LoadError::Read {
                    offset: file_offset,
                    source,
                });
            }
        }
    }

    if filled != expected {
        return Err(LoadError::ShortRead {
            offset: file_offset,
            expected,
            actual: filled,
        });
    }

    Ok(block)
}
