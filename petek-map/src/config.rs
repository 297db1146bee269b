/// Starting directory size when none is configured.
pub const DEFAULT_TABLE_SIZE: u64 = 32;

/// Blocks per bucket when none is configured. Determined as the sweet spot
/// between lookup cost and split churn for mixed workloads.
pub const DEFAULT_BLOCK_COUNT: usize = 16;

/// The maximum directory size: the last power of two whose byte length
/// (entries times eight) still fits a signed 64-bit length after the
/// directory's own doubling headroom.
pub const MAX_TABLE_SIZE: u64 = 1 << 27;

/// Below this load factor a filled bucket overflows instead of doubling the
/// directory.
pub const DEFAULT_LOAD_FACTOR_OVERFLOW_LIMIT: f32 = 0.6;

/// Construction options for [`PetekMap`](crate::PetekMap).
///
/// Sizes that are not powers of two are rounded up at construction; sizes
/// past [`MAX_TABLE_SIZE`] are clamped. Key and value widths are taken from
/// the handler instances, not the config.
///
/// ```rust
/// use petek_map::MapConfig;
///
/// let config = MapConfig::new()
///     .initial_table_size(64)
///     .min_block_count_per_bucket(8);
/// ```
#[derive(Clone, Debug)]
pub struct MapConfig {
    /// Starting directory size (rounded up to a power of two).
    pub initial_table_size: u64,
    /// Hard cap on directory doubling.
    pub max_table_size: u64,
    /// Blocks per bucket; together with the key and value widths this fixes
    /// the bucket byte size.
    pub min_block_count_per_bucket: usize,
    /// Below this ratio, a filled bucket prefers overflow chaining over
    /// directory doubling.
    pub load_factor_overflow_limit: f32,
}

impl MapConfig {
    /// Creates a config with the defaults.
    pub fn new() -> Self {
        MapConfig {
            initial_table_size: DEFAULT_TABLE_SIZE,
            max_table_size: MAX_TABLE_SIZE,
            min_block_count_per_bucket: DEFAULT_BLOCK_COUNT,
            load_factor_overflow_limit: DEFAULT_LOAD_FACTOR_OVERFLOW_LIMIT,
        }
    }

    /// Sets the starting directory size.
    pub fn initial_table_size(mut self, table_size: u64) -> Self {
        self.initial_table_size = table_size;
        self
    }

    /// Sets the directory cap.
    pub fn max_table_size(mut self, table_size: u64) -> Self {
        self.max_table_size = table_size;
        self
    }

    /// Sets the block count per bucket.
    pub fn min_block_count_per_bucket(mut self, count: usize) -> Self {
        self.min_block_count_per_bucket = count;
        self
    }

    /// Sets the overflow-versus-doubling threshold.
    pub fn load_factor_overflow_limit(mut self, limit: f32) -> Self {
        self.load_factor_overflow_limit = limit;
        self
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}
