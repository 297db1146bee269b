//! Extensible-hashing map on manually managed, page-addressable storage.
//!
//! The map is built from a growable directory of bucket addresses
//! ([`HashTable`]), an append-only arena of fixed-size buckets
//! ([`BucketArray`]), and a controller ([`PetekMap`]) that splits buckets in
//! place as they fill. Keys and values flow through reusable
//! [`KeyHandler`] / [`ValueHandler`] instances, which concentrate all raw
//! byte interpretation; everything above them is safe code over window
//! slices.
//!
//! Most callers want one of the typed fronts:
//!
//! ```rust
//! use petek_map::U64U64Map;
//!
//! let mut map = U64U64Map::new().unwrap();
//! map.put(17, 4200).unwrap();
//! assert_eq!(map.get(17).unwrap(), Some(4200));
//! assert_eq!(map.remove(17).unwrap(), Some(4200));
//! map.close();
//! ```
//!
//! The map is single-writer and keeps no internal locks; every operation
//! takes `&mut self`. Storage is released by [`close`](U64U64Map::close)
//! (idempotent); dropping an unclosed map still releases it but logs an
//! error, as skipping the explicit lifecycle step is a bug in the owner.

#![warn(missing_docs)]

mod bucket_array;
mod config;
mod error;
mod hash_table;
mod layout;
mod map;
mod maps;
mod types;

pub use bucket_array::BucketArray;
pub use config::{
    MapConfig, DEFAULT_BLOCK_COUNT, DEFAULT_LOAD_FACTOR_OVERFLOW_LIMIT, DEFAULT_TABLE_SIZE,
    MAX_TABLE_SIZE,
};
pub use error::MapError;
pub use hash_table::HashTable;
pub use map::PetekMap;
pub use maps::{BytesU64Map, U64BytesMap, U64U64Map};
pub use types::{
    BytesKeyHandler, BytesValueHandler, KeyHandler, U32KeyHandler, U64KeyHandler, U64ValueHandler,
    ValueHandler,
};
