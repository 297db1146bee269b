use petek_map::{BytesU64Map, MapConfig, MapError, U64BytesMap};

#[test]
fn bytes_keys_round_trip() {
    let mut map = BytesU64Map::new(8).unwrap();

    assert_eq!(map.put(b"aardvark", 1).unwrap(), None);
    assert_eq!(map.put(b"badger", 2).unwrap(), None);

    assert_eq!(map.get(b"aardvark").unwrap(), Some(1));
    assert_eq!(map.get(b"badger").unwrap(), Some(2));
    assert_eq!(map.get(b"civet").unwrap(), None);

    assert_eq!(map.remove(b"badger").unwrap(), Some(2));
    assert_eq!(map.get(b"badger").unwrap(), None);
    map.close();
}

#[test]
fn bytes_keys_are_fixed_width() {
    let mut map = BytesU64Map::new(4).unwrap();

    map.put(&[1], 10).unwrap();
    // a key differing only in trailing zeroes is the same stored key
    assert_eq!(map.get(&[1, 0, 0]).unwrap(), Some(10));
    assert_eq!(map.put(&[1, 0], 20).unwrap(), Some(10));
    map.close();
}

#[test]
fn over_long_key_is_rejected_without_mutation() {
    let mut map = BytesU64Map::new(4).unwrap();
    map.put(&[1, 2, 3, 4], 44).unwrap();
    let size_before = map.size();

    let result = map.put(&[1, 2, 3, 4, 5], 55);
    assert!(matches!(
        result,
        Err(MapError::KeyTooLong { max: 4, actual: 5 })
    ));

    // the failed put left the map untouched
    assert_eq!(map.size(), size_before);
    assert_eq!(map.get(&[1, 2, 3, 4]).unwrap(), Some(44));

    assert!(matches!(
        map.get(&[0; 5]),
        Err(MapError::KeyTooLong { .. })
    ));
    assert!(matches!(
        map.remove(&[0; 5]),
        Err(MapError::KeyTooLong { .. })
    ));
    map.close();
}

#[test]
fn bytes_values_round_trip_at_fixed_width() {
    let mut map = U64BytesMap::new(4).unwrap();

    assert_eq!(map.put(9, &[1, 2, 3, 4]).unwrap(), None);
    assert_eq!(map.get(9).unwrap(), Some(vec![1, 2, 3, 4]));

    // shorter values read back zero-padded to the fixed width
    map.put(10, &[7]).unwrap();
    assert_eq!(map.get(10).unwrap(), Some(vec![7, 0, 0, 0]));

    assert_eq!(
        map.put(9, &[9, 9, 9, 9]).unwrap(),
        Some(vec![1, 2, 3, 4])
    );
    assert_eq!(map.remove(9).unwrap(), Some(vec![9, 9, 9, 9]));
    map.close();
}

#[test]
fn over_long_value_is_rejected_without_mutation() {
    let mut map = U64BytesMap::new(4).unwrap();
    map.put(1, &[1, 1, 1, 1]).unwrap();
    let size_before = map.size();

    let result = map.put(2, &[0; 5]);
    assert!(matches!(
        result,
        Err(MapError::ValueTooLong { max: 4, actual: 5 })
    ));
    assert_eq!(map.size(), size_before);
    assert_eq!(map.get(1).unwrap(), Some(vec![1, 1, 1, 1]));
    map.close();
}

#[test]
fn bytes_map_grows_through_splits() {
    let config = MapConfig::new()
        .initial_table_size(2)
        .min_block_count_per_bucket(2);
    let mut map = BytesU64Map::with_config(8, &config).unwrap();

    for i in 0..200u64 {
        map.put(&i.to_le_bytes(), i).unwrap();
    }
    for i in 0..200u64 {
        assert_eq!(map.get(&i.to_le_bytes()).unwrap(), Some(i));
    }
    map.close();
}
