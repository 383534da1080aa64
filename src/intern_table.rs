//! InternTable: composition of the arena and the Robin-Hood index.

use crate::arena::{self, Arena, Handle};
use crate::config::TableConfig;
use crate::error::Error;
use crate::fnv::BuildFnv32;
use crate::robin_hood::{Entry, RobinHoodIndex};
use core::hash::{BuildHasher, Hasher};
use tracing::trace;

/// Maps byte strings to stable handles; equal strings share one handle and
/// one stored copy.
#[derive(Clone, Debug)]
pub struct InternTable<S = BuildFnv32> {
    hasher: S,
    arena: Arena,
    index: RobinHoodIndex,
}

/// Point-in-time sizing figures for a table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    /// Distinct strings interned.
    pub len: usize,
    /// Index slots allocated; zero before the first intern.
    pub index_capacity: usize,
    /// `len / index_capacity`, or 0 when nothing is allocated.
    pub load_factor: f64,
    /// Longest distance of any entry from its ideal slot.
    pub max_dib: usize,
    /// Arena bytes in use, including the pad byte and length prefixes.
    pub arena_len: usize,
    /// Arena bytes allocated.
    pub arena_capacity: usize,
}

impl InternTable {
    /// Creates an empty table. Nothing is allocated until the first intern.
    pub fn new() -> Self {
        Self::with_hasher(BuildFnv32::default())
    }

    pub fn with_config(config: TableConfig) -> Result<Self, Error> {
        Self::with_config_and_hasher(config, BuildFnv32::default())
    }
}

impl Default for InternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher> InternTable<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            arena: Arena::new(),
            index: RobinHoodIndex::new(TableConfig::default().max_load_factor),
        }
    }

    pub fn with_config_and_hasher(config: TableConfig, hasher: S) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            hasher,
            arena: Arena::with_capacity(config.arena_capacity)?,
            index: RobinHoodIndex::with_capacity(config.index_capacity, config.max_load_factor)?,
        })
    }

    fn hash(&self, bytes: &[u8]) -> u32 {
        let mut state = self.hasher.build_hasher();
        state.write(bytes);
        // Low 32 bits; the index folds further.
        state.finish() as u32
    }

    /// Number of distinct strings interned.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the handle of `bytes`, storing a copy first if the string is
    /// new. Repeated calls with equal bytes return the same handle.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the index or the arena cannot grow. The table is
    /// left as it was: no entry is added and existing handles stay valid.
    pub fn intern(&mut self, bytes: impl AsRef<[u8]>) -> Result<Handle, Error> {
        let bytes = bytes.as_ref();
        let hash = self.hash(bytes);
        if let Some(handle) = self.find_hashed(hash, bytes) {
            trace!(handle = handle.to_raw(), "intern hit");
            return Ok(handle);
        }
        // Index room first: once the bytes are appended nothing can fail.
        self.index.reserve_one()?;
        let handle = self.arena.append(bytes)?;
        self.index.insert_reserved(Entry::new(handle, hash));
        trace!(handle = handle.to_raw(), len = bytes.len(), "intern miss");
        Ok(handle)
    }

    /// Handle of `bytes` if it has been interned, without inserting it.
    pub fn get(&self, bytes: impl AsRef<[u8]>) -> Option<Handle> {
        let bytes = bytes.as_ref();
        self.find_hashed(self.hash(bytes), bytes)
    }

    pub fn contains(&self, bytes: impl AsRef<[u8]>) -> bool {
        self.get(bytes).is_some()
    }

    fn find_hashed(&self, hash: u32, bytes: &[u8]) -> Option<Handle> {
        let arena = &self.arena;
        // Equal hashes are only candidates; the stored bytes decide.
        self.index
            .find(hash, |candidate| arena.read(candidate) == Ok(bytes))
    }

    /// Returns the bytes interned under `handle`.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` unless `handle` was returned by `intern` on this
    /// table.
    pub fn resolve(&self, handle: Handle) -> Result<&[u8], Error> {
        let bytes = self.arena.read(handle)?;
        let hash = self.hash(bytes);
        // An offset inside another record may still decode; only handles the
        // index knows about were issued.
        self.index
            .find(hash, |candidate| candidate == handle)
            .map(|_| bytes)
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Iterates over `(handle, bytes)` in the order strings were first
    /// interned.
    pub fn iter(&self) -> arena::Iter<'_> {
        self.arena.iter()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            len: self.index.len(),
            index_capacity: self.index.capacity(),
            load_factor: self.index.load_factor(),
            max_dib: self.index.max_dib(),
            arena_len: self.arena.len(),
            arena_capacity: self.arena.capacity(),
        }
    }
}
