//! Typed access to keys and values stored in bucket memory.
//!
//! Handlers are the map's polymorphism boundary: they know how to hash a
//! staged key, compare it against stored bytes, and copy keys and values in
//! and out of bucket memory. The controller only ever hands them window
//! slices, so all byte interpretation is concentrated here. Handler instances
//! are owned by the map and reused across calls.

use core::hash::BuildHasher;

use foldhash::fast::FixedState;

/// Stages a key and moves it in and out of bucket memory.
pub trait KeyHandler {
    /// Fixed stored width of a key in bytes.
    fn key_length(&self) -> usize;

    /// Hash of the staged key. The directory index is the hash masked by the
    /// current table size.
    fn hash(&self) -> u64;

    /// Copies the staged key into bucket memory.
    fn write_to(&self, dst: &mut [u8]);

    /// Replaces the staged key with the one stored in bucket memory.
    fn read_from(&mut self, src: &[u8]);

    /// Compares the staged key byte-wise against bucket memory.
    fn key_equals(&self, stored: &[u8]) -> bool;
}

/// Stages a value and moves it in and out of bucket memory.
pub trait ValueHandler {
    /// Fixed stored width of a value in bytes.
    fn value_length(&self) -> usize;

    /// Copies the staged value into bucket memory.
    fn write_to(&self, dst: &mut [u8]);

    /// Replaces the staged value with the one stored in bucket memory.
    fn read_from(&mut self, src: &[u8]);
}

/// Key handler for `u64` keys stored as eight host-endian bytes.
///
/// The hash folds the high half into the low half, so small keys hash to
/// themselves and bucket placement stays predictable.
#[derive(Clone, Default)]
pub struct U64KeyHandler {
    /// The staged key.
    pub key: u64,
}

impl U64KeyHandler {
    /// Creates a handler with key zero staged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `key`.
    pub fn set_key(&mut self, key: u64) {
        self.key = key;
    }
}

impl KeyHandler for U64KeyHandler {
    fn key_length(&self) -> usize {
        8
    }

    fn hash(&self) -> u64 {
        self.key ^ (self.key >> 32)
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[..8].copy_from_slice(&self.key.to_ne_bytes());
    }

    fn read_from(&mut self, src: &[u8]) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&src[..8]);
        self.key = u64::from_ne_bytes(bytes);
    }

    fn key_equals(&self, stored: &[u8]) -> bool {
        stored[..8] == self.key.to_ne_bytes()
    }
}

/// Key handler for `u32` keys stored as four host-endian bytes.
#[derive(Clone, Default)]
pub struct U32KeyHandler {
    /// The staged key.
    pub key: u32,
}

impl U32KeyHandler {
    /// Creates a handler with key zero staged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `key`.
    pub fn set_key(&mut self, key: u32) {
        self.key = key;
    }
}

impl KeyHandler for U32KeyHandler {
    fn key_length(&self) -> usize {
        4
    }

    fn hash(&self) -> u64 {
        self.key as u64
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[..4].copy_from_slice(&self.key.to_ne_bytes());
    }

    fn read_from(&mut self, src: &[u8]) {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&src[..4]);
        self.key = u32::from_ne_bytes(bytes);
    }

    fn key_equals(&self, stored: &[u8]) -> bool {
        stored[..4] == self.key.to_ne_bytes()
    }
}

/// Key handler for byte-slice keys padded to a fixed width.
///
/// Staged keys shorter than the width are zero-padded, so two keys that
/// differ only in trailing zeroes occupy the same slot.
#[derive(Clone)]
pub struct BytesKeyHandler {
    key: Vec<u8>,
    hasher: FixedState,
}

impl BytesKeyHandler {
    /// Creates a handler for keys of at most `max_key_length` bytes.
    pub fn new(max_key_length: usize) -> Self {
        BytesKeyHandler {
            key: vec![0; max_key_length],
            hasher: FixedState::default(),
        }
    }

    /// Stages `key`, zero-padding up to the fixed width. The caller validates
    /// the length.
    pub fn set_key(&mut self, key: &[u8]) {
        self.key[..key.len()].copy_from_slice(key);
        self.key[key.len()..].fill(0);
    }

    /// The staged key at its fixed width.
    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl KeyHandler for BytesKeyHandler {
    fn key_length(&self) -> usize {
        self.key.len()
    }

    fn hash(&self) -> u64 {
        self.hasher.hash_one(&self.key[..])
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[..self.key.len()].copy_from_slice(&self.key);
    }

    fn read_from(&mut self, src: &[u8]) {
        let len = self.key.len();
        self.key.copy_from_slice(&src[..len]);
    }

    fn key_equals(&self, stored: &[u8]) -> bool {
        stored[..self.key.len()] == self.key[..]
    }
}

/// Value handler for `u64` values stored as eight host-endian bytes.
#[derive(Clone, Default)]
pub struct U64ValueHandler {
    /// The staged value.
    pub value: u64,
}

impl U64ValueHandler {
    /// Creates a handler with value zero staged.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ValueHandler for U64ValueHandler {
    fn value_length(&self) -> usize {
        8
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[..8].copy_from_slice(&self.value.to_ne_bytes());
    }

    fn read_from(&mut self, src: &[u8]) {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&src[..8]);
        self.value = u64::from_ne_bytes(bytes);
    }
}

/// Value handler for byte-slice values padded to a fixed width.
#[derive(Clone)]
pub struct BytesValueHandler {
    value: Vec<u8>,
}

impl BytesValueHandler {
    /// Creates a handler for values of at most `max_value_length` bytes.
    pub fn new(max_value_length: usize) -> Self {
        BytesValueHandler {
            value: vec![0; max_value_length],
        }
    }

    /// Stages `value`, zero-padding up to the fixed width. The caller
    /// validates the length.
    pub fn set_value(&mut self, value: &[u8]) {
        self.value[..value.len()].copy_from_slice(value);
        self.value[value.len()..].fill(0);
    }

    /// The staged value at its fixed width.
    pub fn value_bytes(&self) -> &[u8] {
        &self.value
    }
}

impl ValueHandler for BytesValueHandler {
    fn value_length(&self) -> usize {
        self.value.len()
    }

    fn write_to(&self, dst: &mut [u8]) {
        dst[..self.value.len()].copy_from_slice(&self.value);
    }

    fn read_from(&mut self, src: &[u8]) {
        let len = self.value.len();
        self.value.copy_from_slice(&src[..len]);
    }
}
