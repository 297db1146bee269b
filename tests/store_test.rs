use petek::{FileStore, MemStore, Store, StoreError};

#[test]
fn mem_store_round_trip() {
    let mut store = MemStore::new();
    assert_eq!(store.length(), 0);

    assert_eq!(store.write(&[1, 2, 3, 4], 0).unwrap(), 4);
    assert_eq!(store.length(), 4);

    let mut dst = [0u8; 4];
    assert_eq!(store.read(&mut dst, 0).unwrap(), 4);
    assert_eq!(dst, [1, 2, 3, 4]);
}

#[test]
fn mem_store_write_extends_length() {
    let mut store = MemStore::new();
    store.write(&[7, 7], 1000).unwrap();
    assert_eq!(store.length(), 1002);
}

#[test]
fn read_past_the_end_transfers_the_available_prefix() {
    let mut store = MemStore::new();
    store.write(&[1, 2, 3], 0).unwrap();

    let mut dst = [0u8; 8];
    assert_eq!(store.read(&mut dst, 1).unwrap(), 2);
    assert_eq!(&dst[..2], &[2, 3]);

    assert_eq!(store.read(&mut dst, 100).unwrap(), 0);
}

#[test]
fn closed_mem_store_rejects_access() {
    let mut store = MemStore::new();
    store.write(&[1], 0).unwrap();
    store.close();

    let mut dst = [0u8; 1];
    assert!(matches!(store.read(&mut dst, 0), Err(StoreError::Closed)));
    assert!(matches!(store.write(&[1], 0), Err(StoreError::Closed)));

    // closing twice is a no-op
    store.close();
}

#[test]
fn file_store_round_trip_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.bin");

    let mut store = FileStore::create(&path).unwrap();
    store.write(&[10, 20, 30], 64).unwrap();
    assert_eq!(store.length(), 67);

    let mut dst = [0u8; 3];
    assert_eq!(store.read(&mut dst, 64).unwrap(), 3);
    assert_eq!(dst, [10, 20, 30]);
    store.close();

    // a fresh store over the same file sees the persisted bytes
    let mut reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.length(), 67);
    let mut dst = [0u8; 3];
    reopened.read(&mut dst, 64).unwrap();
    assert_eq!(dst, [10, 20, 30]);

    // the gap before the first write reads back as zeroes
    let mut gap = [0xffu8; 4];
    reopened.read(&mut gap, 0).unwrap();
    assert_eq!(gap, [0, 0, 0, 0]);
    reopened.close();
}

#[test]
fn closed_file_store_rejects_access() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::create(dir.path().join("store.bin")).unwrap();
    store.close();
    assert!(matches!(store.write(&[1], 0), Err(StoreError::Closed)));
}
