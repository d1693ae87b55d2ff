use apfsprust::fletcher64;

pub const OBJECT_HEADER_SIZE: usize = 32;
pub const HEADER_END: usize = 50;
pub const FOOTER_SIZE: usize = 40;

fn put_u16(block: &mut [u8], at: usize, value: u16) {
    block[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(block: &mut [u8], at: usize, value: u32) {
    block[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(block: &mut [u8], at: usize, value: u64) {
    block[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

/// Build a sealed file-system tree node holding `entries`.
pub fn build_node(block_size: usize, identifier: u64, entries: &[(&str, &str)]) -> Vec<u8> {
    let mut block = vec![0u8; block_size];
    let footer_offset = block_size - FOOTER_SIZE;
    let table_size = entries.len() * 8;
    let key_area = HEADER_END + table_size;

    put_u64(&mut block, 8, identifier);
    put_u64(&mut block, 16, 1);
    put_u32(&mut block, 24, 2);
    put_u32(&mut block, 28, 0xe);

    let mut key_offset = 0;
    let mut value_offset = 0;
    for (i, (key, value)) in entries.iter().enumerate() {
        let (key, value) = (key.as_bytes(), value.as_bytes());
        value_offset += value.len();

        let slot = HEADER_END + i * 8;
        put_u16(&mut block, slot, key_offset as u16);
        put_u16(&mut block, slot + 2, key.len() as u16);
        put_u16(&mut block, slot + 4, value_offset as u16);
        put_u16(&mut block, slot + 6, value.len() as u16);

        let key_start = key_area + key_offset;
        block[key_start..key_start + key.len()].copy_from_slice(key);
        let value_start = footer_offset - value_offset;
        block[value_start..value_start + value.len()].copy_from_slice(value);

        key_offset += key.len();
    }

    let free = footer_offset - key_area - key_offset - value_offset;
    put_u16(&mut block, OBJECT_HEADER_SIZE, 0x0003);
    put_u16(&mut block, OBJECT_HEADER_SIZE + 4, table_size as u16);
    put_u16(&mut block, OBJECT_HEADER_SIZE + 6, key_offset as u16);
    put_u16(&mut block, OBJECT_HEADER_SIZE + 8, free as u16);

    put_u32(&mut block, footer_offset + 4, block_size as u32);
    put_u64(&mut block, footer_offset + 24, entries.len() as u64);
    put_u64(&mut block, footer_offset + 32, 1);

    seal(&mut block);
    block
}

/// Recompute the object checksum after editing a block.
pub fn seal(block: &mut [u8]) {
    let checksum = fletcher64(&block[8..]);
    block[..8].copy_from_slice(&checksum.to_le_bytes());
}
