//! RobinHoodIndex: open-addressing table from hashes to arena handles.
//!
//! Slots hold `Option<Entry>`; `Handle` is non-zero so an empty slot costs
//! nothing extra. Capacity is zero or a power of two, and the ideal slot of
//! an entry is its hash XOR-folded to `log2(capacity)` bits. Insertion
//! displaces residents that are closer to their ideal slot than the entry
//! being placed, which keeps the distance-to-initial-bucket (DIB) of every
//! entry close to the minimum for the load factor. There is no deletion.

use crate::arena::Handle;
use crate::error::Error;
use crate::fnv::xor_fold;
use tracing::{debug, warn};

const MIN_CAPACITY: usize = 8;
const MAX_BITS: u32 = 31;
const MAX_SLOTS: usize = 1 << MAX_BITS;

/// One occupied slot: the handle of the canonical bytes and their full hash.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    handle: Handle,
    hash: u32,
}

impl Entry {
    pub fn new(handle: Handle, hash: u32) -> Self {
        Self { handle, hash }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }
}

#[derive(Clone, Debug)]
pub struct RobinHoodIndex {
    slots: Vec<Option<Entry>>,
    bits: u32,
    count: usize,
    max_load_factor: f64,
}

impl RobinHoodIndex {
    /// Creates an empty index without allocating. The first insertion
    /// allocates a small table.
    pub fn new(max_load_factor: f64) -> Self {
        Self {
            slots: Vec::new(),
            bits: 0,
            count: 0,
            max_load_factor,
        }
    }

    /// Creates an index with at least `capacity` slots (rounded up to a power
    /// of two, minimum 2).
    pub fn with_capacity(capacity: usize, max_load_factor: f64) -> Result<Self, Error> {
        let capacity = capacity
            .max(2)
            .checked_next_power_of_two()
            .filter(|&c| c.trailing_zeros() <= MAX_BITS)
            .ok_or(Error::OutOfMemory)?;
        Ok(Self {
            slots: alloc_slots(capacity)?,
            bits: capacity.trailing_zeros(),
            count: 0,
            max_load_factor,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f64 {
        if self.slots.is_empty() {
            0.0
        } else {
            self.count as f64 / self.slots.len() as f64
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    fn ideal(&self, hash: u32) -> usize {
        xor_fold(hash, self.bits) as usize
    }

    #[inline]
    fn dib(&self, pos: usize, hash: u32) -> usize {
        let cap = self.slots.len();
        (cap + pos - self.ideal(hash)) % cap
    }

    /// Probes for `hash`, offering every entry with an equal hash to `eq`
    /// until it accepts one. Stops at an empty slot or at a resident whose
    /// DIB is below the distance travelled, since insertion would have
    /// displaced it had the target been present.
    pub fn find<F>(&self, hash: u32, mut eq: F) -> Option<Handle>
    where
        F: FnMut(Handle) -> bool,
    {
        if self.slots.is_empty() {
            return None;
        }
        let mask = self.mask();
        let mut pos = self.ideal(hash);
        for traveled in 0..self.slots.len() {
            let resident = self.slots[pos]?;
            if self.dib(pos, resident.hash) < traveled {
                return None;
            }
            if resident.hash == hash && eq(resident.handle) {
                return Some(resident.handle);
            }
            pos = (pos + 1) & mask;
        }
        None
    }

    /// First entry stored under `hash`, if any.
    pub fn lookup(&self, hash: u32) -> Option<Entry> {
        self.find(hash, |_| true).map(|handle| Entry::new(handle, hash))
    }

    /// Makes room for one more entry, growing and rehashing when the load
    /// factor would be exceeded. The target size is computed up front, so a
    /// table that can never fit fails before allocating. On error the index
    /// is unchanged.
    pub fn reserve_one(&mut self) -> Result<(), Error> {
        let wanted = self.count + 1;
        if self.fits(wanted, self.slots.len()) {
            return Ok(());
        }
        let Some(new_capacity) = self.capacity_for(wanted) else {
            warn!(
                old_capacity = self.slots.len(),
                wanted,
                "index cannot hold this many entries"
            );
            return Err(Error::OutOfMemory);
        };
        self.grow(new_capacity)
    }

    fn fits(&self, wanted: usize, cap: usize) -> bool {
        wanted < cap && wanted as f64 <= cap as f64 * self.max_load_factor
    }

    // Smallest power of two, at least double the current size, that holds
    // `wanted` entries under the load factor; `None` past 2^31 slots.
    fn capacity_for(&self, wanted: usize) -> Option<usize> {
        let by_load = (wanted as f64 / self.max_load_factor).ceil();
        if by_load.is_nan() || by_load > MAX_SLOTS as f64 {
            return None;
        }
        let doubled = match self.slots.len() {
            0 => MIN_CAPACITY,
            cap => cap.checked_mul(2)?,
        };
        let mut target = doubled.max(by_load as usize).checked_next_power_of_two()?;
        while !self.fits(wanted, target) {
            target = target.checked_mul(2)?;
        }
        (target <= MAX_SLOTS).then_some(target)
    }

    /// Inserts `entry`, growing first if needed. The caller guarantees no
    /// entry with the same handle is present.
    pub fn insert(&mut self, entry: Entry) -> Result<(), Error> {
        self.reserve_one()?;
        self.insert_reserved(entry);
        Ok(())
    }

    /// Robin-Hood placement. Requires a prior successful `reserve_one`, so
    /// an empty slot is always reachable.
    pub(crate) fn insert_reserved(&mut self, entry: Entry) {
        assert!(
            self.count + 1 < self.slots.len(),
            "insert into an index without a reserved slot"
        );
        let mask = self.mask();
        let mut carried = entry;
        let mut pos = self.ideal(carried.hash);
        let mut traveled = 0;
        loop {
            let Some(resident) = self.slots[pos] else {
                self.slots[pos] = Some(carried);
                self.count += 1;
                return;
            };
            let resident_dib = self.dib(pos, resident.hash);
            if traveled > resident_dib {
                // The evicted resident continues the probe from here.
                self.slots[pos] = Some(carried);
                carried = resident;
                traveled = resident_dib;
            }
            traveled += 1;
            pos = (pos + 1) & mask;
        }
    }

    fn grow(&mut self, new_capacity: usize) -> Result<(), Error> {
        let old_capacity = self.slots.len();
        let slots = match alloc_slots(new_capacity) {
            Ok(slots) => slots,
            Err(e) => {
                warn!(old_capacity, new_capacity, "index growth failed");
                return Err(e);
            }
        };
        let old = std::mem::replace(&mut self.slots, slots);
        self.bits = new_capacity.trailing_zeros();
        self.count = 0;
        for entry in old.into_iter().flatten() {
            self.insert_reserved(entry);
        }
        debug!(
            old_capacity,
            new_capacity,
            entries = self.count,
            "index rehashed"
        );
        Ok(())
    }

    /// Largest DIB over all occupied slots.
    pub fn max_dib(&self) -> usize {
        self.iter_slots()
            .map(|(pos, e)| self.dib(pos, e.hash))
            .max()
            .unwrap_or(0)
    }

    /// Occupied entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entry> + '_ {
        self.iter_slots().map(|(_, e)| e)
    }

    pub(crate) fn iter_slots(&self) -> impl Iterator<Item = (usize, Entry)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.map(|e| (pos, e)))
    }

    #[cfg(test)]
    pub(crate) fn slot_dib(&self, pos: usize) -> Option<usize> {
        self.slots[pos].map(|e| self.dib(pos, e.hash))
    }

    /// Panics unless every occupied slot followed by an occupied slot has a
    /// successor DIB of at most one more than its own.
    #[cfg(test)]
    pub(crate) fn assert_robin_hood_invariant(&self) {
        let cap = self.slots.len();
        for pos in 0..cap {
            if let (Some(here), Some(next)) = (self.slot_dib(pos), self.slot_dib((pos + 1) % cap)) {
                assert!(next <= here + 1, "slot {pos} dib {here} followed by dib {next}");
            }
        }
    }
}

fn alloc_slots(capacity: usize) -> Result<Vec<Option<Entry>>, Error> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity)?;
    slots.resize(capacity, None);
    Ok(slots)
}
