//! Construction-time sizing for an `InternTable`.

use crate::error::Error;

const MAX_INDEX_CAPACITY: usize = 1 << 31;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableConfig {
    /// Initial number of index slots; rounded up to a power of two.
    pub index_capacity: usize,
    /// Initial arena size in bytes.
    pub arena_capacity: usize,
    /// The index grows before `len / capacity` would exceed this.
    pub max_load_factor: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            index_capacity: 8,
            arena_capacity: 256,
            max_load_factor: 0.8,
        }
    }
}

impl TableConfig {
    pub fn index_capacity(mut self, slots: usize) -> Self {
        self.index_capacity = slots;
        self
    }

    pub fn arena_capacity(mut self, bytes: usize) -> Self {
        self.arena_capacity = bytes;
        self
    }

    pub fn max_load_factor(mut self, load: f64) -> Self {
        self.max_load_factor = load;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.index_capacity == 0 {
            return Err(Error::InvalidConfig("index_capacity must be at least 1"));
        }
        if self.index_capacity > MAX_INDEX_CAPACITY {
            return Err(Error::InvalidConfig("index_capacity exceeds 2^31 slots"));
        }
        let load = self.max_load_factor;
        if !(load.is_finite() && load > 0.0 && load < 1.0) {
            return Err(Error::InvalidConfig("max_load_factor must be in (0, 1)"));
        }
        Ok(())
    }
}
