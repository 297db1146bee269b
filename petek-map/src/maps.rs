//! Strongly typed map fronts.
//!
//! Each front owns a [`PetekMap`] with a fixed handler pairing, validates
//! argument lengths, stages the handlers, and hands values back as owned
//! copies.

use petek::{MemStore, Store};

use crate::config::MapConfig;
use crate::error::MapError;
use crate::map::PetekMap;
use crate::types::{BytesKeyHandler, BytesValueHandler, U64KeyHandler, U64ValueHandler};

/// Map from `u64` keys to `u64` values.
pub struct U64U64Map<S: Store = MemStore> {
    inner: PetekMap<U64KeyHandler, U64ValueHandler, S>,
}

impl U64U64Map<MemStore> {
    /// Creates an in-memory map with the default config.
    pub fn new() -> Result<Self, MapError> {
        Self::with_config(&MapConfig::new())
    }

    /// Creates an in-memory map with `config`.
    pub fn with_config(config: &MapConfig) -> Result<Self, MapError> {
        Ok(U64U64Map {
            inner: PetekMap::new(config, U64KeyHandler::new(), U64ValueHandler::new())?,
        })
    }
}

impl<S: Store> U64U64Map<S> {
    /// Creates a map over the given directory and arena stores.
    pub fn new_in(
        table_store: S,
        bucket_store: S,
        config: &MapConfig,
    ) -> Result<Self, MapError> {
        Ok(U64U64Map {
            inner: PetekMap::new_in(
                table_store,
                bucket_store,
                config,
                U64KeyHandler::new(),
                U64ValueHandler::new(),
            )?,
        })
    }

    /// Inserts or updates `key`, returning the replaced value if any.
    pub fn put(&mut self, key: u64, value: u64) -> Result<Option<u64>, MapError> {
        self.inner.key_handler_mut().set_key(key);
        self.inner.value_handler_mut().value = value;
        let updated = self.inner.put()?;
        Ok(updated.then(|| self.inner.prev_value_handler().value))
    }

    /// Looks up `key`.
    pub fn get(&mut self, key: u64) -> Result<Option<u64>, MapError> {
        self.inner.key_handler_mut().set_key(key);
        let found = self.inner.get()?;
        Ok(found.then(|| self.inner.value_handler().value))
    }

    /// Removes `key`, returning the removed value if any.
    pub fn remove(&mut self, key: u64) -> Result<Option<u64>, MapError> {
        self.inner.key_handler_mut().set_key(key);
        let removed = self.inner.remove()?;
        Ok(removed.then(|| self.inner.value_handler().value))
    }

    /// Total bytes in use across the directory and the arena.
    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    /// Empties the map, keeping the backing regions.
    pub fn clear(&mut self) -> Result<(), MapError> {
        self.inner.clear()
    }

    /// Releases the backing stores. Idempotent.
    pub fn close(&mut self) {
        self.inner.close()
    }

    /// The underlying map, for inspection.
    pub fn raw(&self) -> &PetekMap<U64KeyHandler, U64ValueHandler, S> {
        &self.inner
    }

    /// Mutable access to the underlying map.
    pub fn raw_mut(&mut self) -> &mut PetekMap<U64KeyHandler, U64ValueHandler, S> {
        &mut self.inner
    }
}

/// Map from fixed-width byte keys to `u64` values.
///
/// Keys shorter than the configured width are zero-padded, so keys that
/// differ only in trailing zeroes are the same key.
pub struct BytesU64Map<S: Store = MemStore> {
    inner: PetekMap<BytesKeyHandler, U64ValueHandler, S>,
    max_key_length: usize,
}

impl BytesU64Map<MemStore> {
    /// Creates an in-memory map for keys of at most `max_key_length` bytes.
    pub fn new(max_key_length: usize) -> Result<Self, MapError> {
        Self::with_config(max_key_length, &MapConfig::new())
    }

    /// Creates an in-memory map with `config`.
    pub fn with_config(max_key_length: usize, config: &MapConfig) -> Result<Self, MapError> {
        Ok(BytesU64Map {
            inner: PetekMap::new(
                config,
                BytesKeyHandler::new(max_key_length),
                U64ValueHandler::new(),
            )?,
            max_key_length,
        })
    }
}

impl<S: Store> BytesU64Map<S> {
    fn check_key_length(&self, provided: usize) -> Result<(), MapError> {
        if provided > self.max_key_length {
            return Err(MapError::KeyTooLong {
                max: self.max_key_length,
                actual: provided,
            });
        }
        Ok(())
    }

    /// Inserts or updates `key`, returning the replaced value if any.
    pub fn put(&mut self, key: &[u8], value: u64) -> Result<Option<u64>, MapError> {
        self.check_key_length(key.len())?;
        self.inner.key_handler_mut().set_key(key);
        self.inner.value_handler_mut().value = value;
        let updated = self.inner.put()?;
        Ok(updated.then(|| self.inner.prev_value_handler().value))
    }

    /// Looks up `key`.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<u64>, MapError> {
        self.check_key_length(key.len())?;
        self.inner.key_handler_mut().set_key(key);
        let found = self.inner.get()?;
        Ok(found.then(|| self.inner.value_handler().value))
    }

    /// Removes `key`, returning the removed value if any.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<u64>, MapError> {
        self.check_key_length(key.len())?;
        self.inner.key_handler_mut().set_key(key);
        let removed = self.inner.remove()?;
        Ok(removed.then(|| self.inner.value_handler().value))
    }

    /// Total bytes in use across the directory and the arena.
    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    /// Empties the map, keeping the backing regions.
    pub fn clear(&mut self) -> Result<(), MapError> {
        self.inner.clear()
    }

    /// Releases the backing stores. Idempotent.
    pub fn close(&mut self) {
        self.inner.close()
    }

    /// The underlying map, for inspection.
    pub fn raw_mut(&mut self) -> &mut PetekMap<BytesKeyHandler, U64ValueHandler, S> {
        &mut self.inner
    }
}

/// Map from `u64` keys to fixed-width byte values.
///
/// Values are returned at their fixed width; values staged shorter than the
/// width read back zero-padded.
pub struct U64BytesMap<S: Store = MemStore> {
    inner: PetekMap<U64KeyHandler, BytesValueHandler, S>,
    max_value_length: usize,
}

impl U64BytesMap<MemStore> {
    /// Creates an in-memory map for values of at most `max_value_length`
    /// bytes.
    pub fn new(max_value_length: usize) -> Result<Self, MapError> {
        Self::with_config(max_value_length, &MapConfig::new())
    }

    /// Creates an in-memory map with `config`.
    pub fn with_config(max_value_length: usize, config: &MapConfig) -> Result<Self, MapError> {
        Ok(U64BytesMap {
            inner: PetekMap::new(
                config,
                U64KeyHandler::new(),
                BytesValueHandler::new(max_value_length),
            )?,
            max_value_length,
        })
    }
}

impl<S: Store> U64BytesMap<S> {
    fn check_value_length(&self, provided: usize) -> Result<(), MapError> {
        if provided > self.max_value_length {
            return Err(MapError::ValueTooLong {
                max: self.max_value_length,
                actual: provided,
            });
        }
        Ok(())
    }

    /// Inserts or updates `key`, returning the replaced value if any.
    pub fn put(&mut self, key: u64, value: &[u8]) -> Result<Option<Vec<u8>>, MapError> {
        self.check_value_length(value.len())?;
        self.inner.key_handler_mut().set_key(key);
        self.inner.value_handler_mut().set_value(value);
        let updated = self.inner.put()?;
        Ok(updated.then(|| self.inner.prev_value_handler().value_bytes().to_vec()))
    }

    /// Looks up `key`, returning the value at its fixed width.
    pub fn get(&mut self, key: u64) -> Result<Option<Vec<u8>>, MapError> {
        self.inner.key_handler_mut().set_key(key);
        let found = self.inner.get()?;
        Ok(found.then(|| self.inner.value_handler().value_bytes().to_vec()))
    }

    /// Removes `key`, returning the removed value if any.
    pub fn remove(&mut self, key: u64) -> Result<Option<Vec<u8>>, MapError> {
        self.inner.key_handler_mut().set_key(key);
        let removed = self.inner.remove()?;
        Ok(removed.then(|| self.inner.value_handler().value_bytes().to_vec()))
    }

    /// Total bytes in use across the directory and the arena.
    pub fn size(&self) -> u64 {
        self.inner.size()
    }

    /// Empties the map, keeping the backing regions.
    pub fn clear(&mut self) -> Result<(), MapError> {
        self.inner.clear()
    }

    /// Releases the backing stores. Idempotent.
    pub fn close(&mut self) {
        self.inner.close()
    }

    /// Maximum value width in bytes.
    pub fn max_value_length(&self) -> usize {
        self.max_value_length
    }
}
