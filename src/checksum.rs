//! Fletcher-64 object checksums, as stored in the first eight bytes of every
//! APFS object.

use apfs_types::{OBJECT_CHECKSUM_SIZE, OBJECT_HEADER_SIZE};

use crate::error::DecodeError;

const MODULUS: u64 = 0xffff_ffff;

/// Compute the Fletcher-64 checksum of `data`, read as little-endian 32-bit
/// words. A trailing partial word is ignored, as objects are always a whole
/// number of words long.
pub fn fletcher64(data: &[u8]) -> u64 {
    let mut sum1: u64 = 0;
    let mut sum2: u64 = 0;

    for word in data.chunks_exact(4) {
        let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        sum1 = (sum1 + u64::from(word)) % MODULUS;
        sum2 = (sum2 + sum1) % MODULUS;
    }

    let check1 = MODULUS - ((sum1 + sum2) % MODULUS);
    let check2 = MODULUS - ((sum1 + check1) % MODULUS);

    (check2 << 32) | check1
}

/// Compare the checksum stored at the start of `block` against the rest of
/// the block.
pub fn verify_object_checksum(block: &[u8]) -> Result<(), DecodeError> {
    if block.is_empty() {
        return Err(DecodeError::EmptyBuffer);
    }
    if block.len() < OBJECT_HEADER_SIZE {
        return Err(DecodeError::Truncated {
            structure: "object header",
            needed: OBJECT_HEADER_SIZE,
            actual: block.len(),
        });
    }

    let (stored, covered) = block.split_at(OBJECT_CHECKSUM_SIZE);
    let stored = u64::from_le_bytes([
        stored[0], stored[1], stored[2], stored[3], stored[4], stored[5], stored[6], stored[7],
    ]);
    let computed = fletcher64(covered);

    if stored != computed {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    Ok(())
}
