use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::StoreError;
use crate::store::Store;

/// A store persisted to a file.
///
/// Positions map directly to file offsets. Durability follows the operating
/// system's page cache; `close` flushes outstanding writes.
pub struct FileStore {
    file: Option<File>,
    length: u64,
}

impl FileStore {
    /// Creates (or truncates) the file at `path` and opens it as an empty
    /// store.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(FileStore {
            file: Some(file),
            length: 0,
        })
    }

    /// Opens an existing file as a store, picking up its current length.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let length = file.metadata()?.len();
        Ok(FileStore {
            file: Some(file),
            length,
        })
    }

    fn file_mut(&mut self) -> Result<&mut File, StoreError> {
        self.file.as_mut().ok_or(StoreError::Closed)
    }
}

impl Store for FileStore {
    fn read(&mut self, dst: &mut [u8], position: u64) -> Result<usize, StoreError> {
        let length = self.length;
        let file = self.file_mut()?;
        let available = length.saturating_sub(position) as usize;
        let count = dst.len().min(available);
        if count == 0 {
            return Ok(0);
        }
        file.seek(SeekFrom::Start(position))?;
        file.read_exact(&mut dst[..count])?;
        Ok(count)
    }

    fn write(&mut self, src: &[u8], position: u64) -> Result<usize, StoreError> {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(position))?;
        file.write_all(src)?;
        self.length = self.length.max(position + src.len() as u64);
        Ok(src.len())
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
        self.length = 0;
    }
}
