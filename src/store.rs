use crate::error::StoreError;

/// An abstract byte-addressable region.
///
/// Positions are arbitrary non-negative offsets; the implementation may be an
/// in-memory arena, a file, or a mapping. Callers never interpret positions
/// beyond handing back what they were issued. A store is owned by exactly one
/// consumer; concurrent access to the same backing region is undefined.
pub trait Store {
    /// Reads bytes at `position` into `dst` and returns the count actually
    /// transferred. A read past the current length transfers only the
    /// available prefix (possibly zero bytes).
    fn read(&mut self, dst: &mut [u8], position: u64) -> Result<usize, StoreError>;

    /// Writes `src` at `position` and returns the count written. Writing past
    /// the current length extends the region; any gap reads back as zeroes.
    fn write(&mut self, src: &[u8], position: u64) -> Result<usize, StoreError>;

    /// Current length of the region in bytes.
    fn length(&self) -> u64;

    /// Releases the backing region. Further access fails with
    /// [`StoreError::Closed`]. Closing twice is a no-op.
    fn close(&mut self);
}
