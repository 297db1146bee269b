use std::collections::HashMap as StdHashMap;

use petek::FileStore;
use petek_map::{KeyHandler, MapConfig, MapError, U64KeyHandler, U64U64Map};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn put_get_remove_round_trip() {
    let mut map = U64U64Map::new().unwrap();

    assert_eq!(map.put(1, 100).unwrap(), None);
    assert_eq!(map.get(1).unwrap(), Some(100));
    assert_eq!(map.get(2).unwrap(), None);

    assert_eq!(map.remove(1).unwrap(), Some(100));
    assert_eq!(map.get(1).unwrap(), None);
    assert_eq!(map.remove(1).unwrap(), None);
    map.close();
}

#[test]
fn update_in_place_returns_previous_and_keeps_size() {
    let mut map = U64U64Map::new().unwrap();

    assert_eq!(map.put(1, 7).unwrap(), None);
    let size_after_first = map.size();

    assert_eq!(map.put(1, 9).unwrap(), Some(7));
    assert_eq!(map.get(1).unwrap(), Some(9));
    assert_eq!(map.size(), size_after_first);
    map.close();
}

#[test]
fn repeated_identical_put_is_idempotent() {
    let mut map = U64U64Map::new().unwrap();

    map.put(5, 9).unwrap();
    let size_after_first = map.size();

    assert_eq!(map.put(5, 9).unwrap(), Some(9));
    assert_eq!(map.size(), size_after_first);
    map.close();
}

#[test]
fn remove_then_put_round_trips() {
    let mut map = U64U64Map::new().unwrap();

    map.put(8, 1).unwrap();
    assert_eq!(map.remove(8).unwrap(), Some(1));
    assert_eq!(map.put(8, 2).unwrap(), None);
    assert_eq!(map.get(8).unwrap(), Some(2));
    map.close();
}

// Four keys with hashes 0b00..0b11 into a two-slot directory with one block
// per bucket: the directory doubles exactly once and every bucket ends at
// depth 2 with a single block. Chaining is switched off so splitting always
// grows the directory.
#[test]
fn distinct_hash_prefixes_double_the_directory_once() {
    let config = MapConfig::new()
        .initial_table_size(2)
        .min_block_count_per_bucket(1)
        .load_factor_overflow_limit(0.0);
    let mut map = U64U64Map::with_config(&config).unwrap();

    for key in 0..4 {
        map.put(key, key + 10).unwrap();
    }

    assert_eq!(map.raw().table_size(), 4);
    assert_eq!(map.raw().bucket_count(), 4);

    for index in 0..4 {
        let address = map.raw().hash_table().bucket_address(index);
        let bucket_array = map.raw_mut().bucket_array_mut();
        assert_eq!(bucket_array.bucket_depth(address).unwrap(), 2);
        assert_eq!(bucket_array.bucket_fill_count(address).unwrap(), 1);
    }

    for key in 0..4 {
        assert_eq!(map.get(key).unwrap(), Some(key + 10));
    }
    map.close();
}

// A single-slot directory that may not grow: the third colliding key chains
// an overflow bucket once the limit is raised out of the way.
#[test]
fn capped_directory_overflows_instead_of_growing() {
    let config = MapConfig::new()
        .initial_table_size(1)
        .max_table_size(1)
        .min_block_count_per_bucket(2)
        .load_factor_overflow_limit(1.0);
    let mut map = U64U64Map::with_config(&config).unwrap();

    for key in 0..3 {
        map.put(key, key * 11).unwrap();
    }

    assert_eq!(map.raw().table_size(), 1);
    // the sole primary bucket grew one overflow bucket
    assert_eq!(map.raw().bucket_count(), 2);
    let primary = map.raw().hash_table().bucket_address(0);
    assert_ne!(
        map.raw_mut()
            .bucket_array_mut()
            .bucket_overflow_pointer(primary)
            .unwrap(),
        0
    );

    for key in 0..3 {
        assert_eq!(map.get(key).unwrap(), Some(key * 11));
    }
    map.close();
}

// Two keys that collide on the bucket id but differ at the depth bit: the
// split relocates exactly one of them and both stay reachable.
#[test]
fn split_relocates_the_block_with_the_depth_bit_set() {
    let config = MapConfig::new()
        .initial_table_size(2)
        .min_block_count_per_bucket(1)
        .load_factor_overflow_limit(0.0);
    let mut map = U64U64Map::with_config(&config).unwrap();

    map.put(1, 100).unwrap();
    map.put(3, 300).unwrap();

    assert_eq!(map.get(1).unwrap(), Some(100));
    assert_eq!(map.get(3).unwrap(), Some(300));

    // key 1 was relocated out of the original bucket by the first split
    let original = map.raw().hash_table().bucket_address(0);
    assert_eq!(
        map.raw_mut()
            .bucket_array_mut()
            .bucket_fill_count(original)
            .unwrap(),
        0
    );
    map.close();
}

// Distinct hash prefixes fill a capped directory exactly; one more key either
// chains (load factor below the limit) or fails with a full map.
#[test]
fn filling_to_capacity_then_one_more_key() {
    for (limit, expect_overflow) in [(1.0f32, true), (0.0f32, false)] {
        let config = MapConfig::new()
            .initial_table_size(4)
            .max_table_size(4)
            .min_block_count_per_bucket(1)
            .load_factor_overflow_limit(limit);
        let mut map = U64U64Map::with_config(&config).unwrap();

        // hashes 0..4 are perfectly distinct under the mask; no overflow yet
        for key in 0..4 {
            map.put(key, key).unwrap();
        }
        assert_eq!(map.raw().bucket_count(), 4);

        let result = map.put(4, 4);
        if expect_overflow {
            result.unwrap();
            assert_eq!(map.raw().bucket_count(), 5);
            assert_eq!(map.get(4).unwrap(), Some(4));
        } else {
            assert!(matches!(result, Err(MapError::MapFull { .. })));
        }
        map.close();
    }
}

#[test]
fn full_capped_map_fails_but_stays_readable() {
    let config = MapConfig::new()
        .initial_table_size(1)
        .max_table_size(1)
        .min_block_count_per_bucket(1)
        .load_factor_overflow_limit(0.0);
    let mut map = U64U64Map::with_config(&config).unwrap();

    map.put(0, 4).unwrap();
    let result = map.put(1, 5);
    assert!(matches!(result, Err(MapError::MapFull { .. })));

    // reads and removes keep working after the failed insertion
    assert_eq!(map.get(0).unwrap(), Some(4));
    assert_eq!(map.remove(0).unwrap(), Some(4));
    map.close();
}

// Every directory slot must point at a bucket whose id equals the slot index
// masked by the bucket's local depth, and every stored key must hash back
// into its bucket.
#[test]
fn directory_and_bucket_invariants_hold_after_growth() {
    let config = MapConfig::new()
        .initial_table_size(2)
        .min_block_count_per_bucket(4);
    let mut map = U64U64Map::with_config(&config).unwrap();

    for key in 0..500 {
        map.put(key, key).unwrap();
    }

    let table_size = map.raw().table_size();
    assert!(table_size.is_power_of_two());

    let mut key_handler = U64KeyHandler::new();
    for index in 0..table_size {
        let address = map.raw().hash_table().bucket_address(index);
        let bucket_array = map.raw_mut().bucket_array_mut();
        let depth = bucket_array.bucket_depth(address).unwrap();
        let id = bucket_array.bucket_id(address).unwrap();
        let depth_mask = (1u64 << depth) - 1;
        assert_eq!(id, index & depth_mask);

        // walk the bucket and its overflow chain
        let mut chain = address;
        loop {
            let fill_count = bucket_array.bucket_fill_count(chain).unwrap();
            let mut offset = bucket_array.first_block_offset();
            for _ in 0..fill_count {
                bucket_array.read_key(&mut key_handler, chain, offset).unwrap();
                assert_eq!(key_handler.hash() & depth_mask, id);
                offset += bucket_array.block_length_at(chain, offset).unwrap();
            }
            chain = bucket_array.bucket_overflow_pointer(chain).unwrap();
            if chain == 0 {
                break;
            }
        }
    }

    for key in 0..500 {
        assert_eq!(map.get(key).unwrap(), Some(key));
    }
    map.close();
}

#[test]
fn randomized_churn_matches_oracle() {
    let mut map = U64U64Map::with_config(
        &MapConfig::new()
            .initial_table_size(2)
            .min_block_count_per_bucket(4),
    )
    .unwrap();
    let mut oracle = StdHashMap::new();
    let mut rng = StdRng::seed_from_u64(0x9e37);

    for _ in 0..4000 {
        let key = rng.gen_range(0..256u64);
        match rng.gen_range(0..3) {
            0 => {
                let value = rng.gen::<u32>() as u64;
                assert_eq!(map.put(key, value).unwrap(), oracle.insert(key, value));
            }
            1 => assert_eq!(map.get(key).unwrap(), oracle.get(&key).copied()),
            _ => assert_eq!(map.remove(key).unwrap(), oracle.remove(&key)),
        }
    }

    for (key, value) in &oracle {
        assert_eq!(map.get(*key).unwrap(), Some(*value));
    }
    map.close();
}

#[test]
fn clear_empties_and_reuses_the_map() {
    let mut map = U64U64Map::new().unwrap();
    for key in 0..100 {
        map.put(key, key).unwrap();
    }

    map.clear().unwrap();

    for key in 0..100 {
        assert_eq!(map.get(key).unwrap(), None);
    }
    map.put(7, 70).unwrap();
    assert_eq!(map.get(7).unwrap(), Some(70));
    map.close();
}

#[test]
fn operations_after_close_report_the_closed_store() {
    let mut map = U64U64Map::new().unwrap();
    map.put(1, 1).unwrap();
    map.close();
    // closing twice is a no-op
    map.close();

    assert!(matches!(map.get(1), Err(MapError::Io(_))));
}

#[test]
fn map_works_over_file_stores() {
    let dir = tempfile::tempdir().unwrap();
    let table_store = FileStore::create(dir.path().join("table.bin")).unwrap();
    let bucket_store = FileStore::create(dir.path().join("buckets.bin")).unwrap();

    let config = MapConfig::new()
        .initial_table_size(2)
        .min_block_count_per_bucket(2);
    let mut map = U64U64Map::new_in(table_store, bucket_store, &config).unwrap();

    for key in 0..64 {
        map.put(key, key * 3).unwrap();
    }
    for key in 0..64 {
        assert_eq!(map.get(key).unwrap(), Some(key * 3));
    }
    map.close();
}
