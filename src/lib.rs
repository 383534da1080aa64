//! rh-intern: a byte-string interning table that hands out small, stable
//! handles and stores each distinct string exactly once.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: equal strings always map to the same `Handle`, handle comparison
//!   replaces string comparison, and memory grows with the number of
//!   distinct strings only.
//! - Layers:
//!   - `fnv`: 32-bit FNV hashing plus XOR-folding to small bit widths.
//!   - `Arena`: append-only, length-prefixed byte store. A `Handle` is the
//!     byte offset of a record, so it stays valid across reallocation.
//!   - `RobinHoodIndex`: open-addressing table of `(handle, hash)` entries
//!     using Robin-Hood displacement to keep probe lengths short.
//!   - `InternTable<S>`: public API composing the three; `S: BuildHasher`
//!     defaults to FNV.
//!
//! Constraints
//! - Single owner, synchronous: mutation takes `&mut self`. Callers that
//!   share a table across threads wrap it in their own lock.
//! - No deletion. Records and index entries are only ever added.
//! - Arena offsets are `u32`; a table addresses at most 4 GiB of records.
//!
//! Handles and the zero sentinel
//! - The arena writes a pad byte at offset 0 before its first record, so
//!   `Handle` wraps `NonZeroU32` and an empty index slot is simply `None`
//!   (no size cost thanks to the niche).
//! - `resolve` only accepts handles the index knows about; an arbitrary
//!   offset that happens to decode as a record is still `InvalidHandle`.
//!
//! Hashing and growth
//! - Entries keep the full 32-bit hash; the ideal slot is that hash folded
//!   to `log2(capacity)` bits. Rehash therefore never reads the arena.
//! - The index doubles before `len / capacity` would exceed the configured
//!   maximum load factor (0.8 by default) and never becomes full, so every
//!   probe terminates.
//! - Folded and full-hash collisions are expected; a lookup confirms every
//!   candidate by comparing the stored bytes.
//!
//! Failure atomicity
//! - `intern` reserves index room, then appends to the arena, then places
//!   the entry. Only the first two steps can fail and neither changes the
//!   set of interned strings, so an `OutOfMemory` leaves the table as it was.

pub mod arena;
mod config;
mod error;
pub mod fnv;
mod intern_table;
pub mod robin_hood;
mod robin_hood_proptest;

// Public surface
pub use arena::Handle;
pub use config::TableConfig;
pub use error::Error;
pub use fnv::{fnv1_32, fold, BuildFnv32, Fnv32Hasher};
pub use intern_table::{InternTable, Stats};
