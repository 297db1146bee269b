use crate::error::StoreError;
use crate::store::Store;

/// A cached window over one contiguous region of a [`Store`].
///
/// The window remembers its `(position, len)`; [`ensure_loaded`] reloads only
/// when either changes, so repeated access to the same region stays in
/// memory. Mutations go through [`bytes_mut`] and are flushed with
/// [`write_back`]. A window loaded past the store's current length zero-fills
/// the remainder, so freshly extended regions read as zeroes.
///
/// [`ensure_loaded`]: LoadedBuffer::ensure_loaded
/// [`bytes_mut`]: LoadedBuffer::bytes_mut
/// [`write_back`]: LoadedBuffer::write_back
pub struct LoadedBuffer {
    buf: Vec<u8>,
    position: u64,
    len: usize,
    initial_position: u64,
    initial_len: usize,
}

impl LoadedBuffer {
    /// Creates an unloaded window. The first [`ensure_loaded`] call populates
    /// it.
    ///
    /// [`ensure_loaded`]: LoadedBuffer::ensure_loaded
    pub fn new() -> Self {
        Self::with_window(0, 0)
    }

    /// Creates an unloaded window whose [`clear`](LoadedBuffer::clear) target
    /// is `(initial_position, initial_len)`.
    pub fn with_window(initial_position: u64, initial_len: usize) -> Self {
        LoadedBuffer {
            buf: Vec::new(),
            position: u64::MAX,
            len: 0,
            initial_position,
            initial_len,
        }
    }

    /// Loads the window at `position` with `len` bytes, unconditionally.
    pub fn load<S: Store>(
        &mut self,
        store: &mut S,
        position: u64,
        len: usize,
    ) -> Result<(), StoreError> {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
        self.buf[..len].fill(0);
        store.read(&mut self.buf[..len], position)?;
        self.position = position;
        self.len = len;
        Ok(())
    }

    /// Loads the window only when `position` or `len` differ from the cached
    /// window.
    pub fn ensure_loaded<S: Store>(
        &mut self,
        store: &mut S,
        position: u64,
        len: usize,
    ) -> Result<(), StoreError> {
        if self.position != position || self.len != len {
            self.load(store, position, len)?;
        }
        Ok(())
    }

    /// Flushes the window back to the store at its current position.
    pub fn write_back<S: Store>(&self, store: &mut S) -> Result<(), StoreError> {
        store.write(&self.buf[..self.len], self.position)?;
        Ok(())
    }

    /// Resets the window to its initial `(position, len)`.
    pub fn clear<S: Store>(&mut self, store: &mut S) -> Result<(), StoreError> {
        let position = self.initial_position;
        let len = self.initial_len;
        self.load(store, position, len)
    }

    /// Marks the cached window stale; the next
    /// [`ensure_loaded`](LoadedBuffer::ensure_loaded) reloads from the store.
    pub fn invalidate(&mut self) {
        self.position = u64::MAX;
        self.len = 0;
    }

    /// Position of the cached window.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The cached window contents.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Mutable access to the cached window contents. Changes are not visible
    /// in the store until [`write_back`](LoadedBuffer::write_back).
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }
}

impl Default for LoadedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemStore;

    #[test]
    fn reloads_only_when_window_changes() {
        let mut store = MemStore::new();
        store.write(&[1, 2, 3, 4], 0).unwrap();

        let mut window = LoadedBuffer::new();
        window.ensure_loaded(&mut store, 0, 4).unwrap();
        assert_eq!(window.bytes(), &[1, 2, 3, 4]);

        // the store changes underneath; the cached window does not notice
        store.write(&[9, 9, 9, 9], 0).unwrap();
        window.ensure_loaded(&mut store, 0, 4).unwrap();
        assert_eq!(window.bytes(), &[1, 2, 3, 4]);

        // a different window forces a reload
        window.ensure_loaded(&mut store, 0, 2).unwrap();
        assert_eq!(window.bytes(), &[9, 9]);
    }

    #[test]
    fn write_back_flushes_at_window_position() {
        let mut store = MemStore::new();
        store.write(&[0u8; 8], 0).unwrap();

        let mut window = LoadedBuffer::new();
        window.ensure_loaded(&mut store, 4, 4).unwrap();
        window.bytes_mut().copy_from_slice(&[5, 6, 7, 8]);
        window.write_back(&mut store).unwrap();

        let mut dst = [0u8; 8];
        store.read(&mut dst, 0).unwrap();
        assert_eq!(dst, [0, 0, 0, 0, 5, 6, 7, 8]);
    }

    #[test]
    fn loading_past_the_end_zero_fills() {
        let mut store = MemStore::new();
        store.write(&[1, 2], 0).unwrap();

        let mut window = LoadedBuffer::new();
        window.load(&mut store, 0, 6).unwrap();
        assert_eq!(window.bytes(), &[1, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn clear_restores_the_initial_window() {
        let mut store = MemStore::new();
        store.write(&[1, 2, 3, 4, 5, 6, 7, 8], 0).unwrap();

        let mut window = LoadedBuffer::with_window(0, 4);
        window.ensure_loaded(&mut store, 4, 4).unwrap();
        assert_eq!(window.position(), 4);

        window.clear(&mut store).unwrap();
        assert_eq!(window.position(), 0);
        assert_eq!(window.bytes(), &[1, 2, 3, 4]);
    }
}
