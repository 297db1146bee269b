//! Bucket and block byte layout.
//!
//! ```text
//! Bucket:
//!   off  0: u64  bucket id
//!   off  8: u32  depth
//!   off 12: u32  fill count
//!   off 16: u64  overflow pointer (0 = none)
//!   off 24: blocks
//!
//! Block:
//!   off  0: u32  block length (header + key + value)
//!   off  4: key bytes (max key length)
//!   off  4 + max key length: value bytes (max value length)
//! ```
//!
//! All fields are host-endian. The layout is bit-exact across instances of
//! the same binary but not guaranteed stable across library versions.

pub(crate) const BUCKET_ID_OFFSET: usize = 0;
pub(crate) const BUCKET_DEPTH_OFFSET: usize = 8;
pub(crate) const BUCKET_FILL_COUNT_OFFSET: usize = 12;
pub(crate) const BUCKET_OVERFLOW_OFFSET: usize = 16;
pub(crate) const BUCKET_DATA_OFFSET: usize = 24;

pub(crate) const BLOCK_LENGTH_OFFSET: usize = 0;
pub(crate) const BLOCK_KEY_OFFSET: usize = 4;

pub(crate) fn block_value_offset(max_key_length: usize) -> usize {
    BLOCK_KEY_OFFSET + max_key_length
}

pub(crate) fn block_length(max_key_length: usize, max_value_length: usize) -> usize {
    BLOCK_KEY_OFFSET + max_key_length + max_value_length
}

pub(crate) fn bucket_length(
    blocks_per_bucket: usize,
    max_key_length: usize,
    max_value_length: usize,
) -> usize {
    BUCKET_DATA_OFFSET + blocks_per_bucket * block_length(max_key_length, max_value_length)
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_ne_bytes(bytes)
}

pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_ne_bytes(bytes)
}

pub(crate) fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
}
