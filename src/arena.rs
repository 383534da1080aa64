//! Append-only byte arena holding the canonical copy of every interned
//! string.
//!
//! Each record is a LEB128 length prefix followed by the payload. A
//! [`Handle`] is the offset of the prefix. Offset 0 holds a pad byte written
//! before the first record, so no record ever starts at 0 and handles can be
//! `NonZeroU32`.

use crate::error::Error;
use core::num::NonZeroU32;
use tracing::{debug, warn};

const MIN_CAPACITY: usize = 16;
const PAD: u8 = 0;
const MAX_PREFIX: usize = 5;
// Every offset, including the end of the last record, must fit a u32.
const MAX_LEN: usize = u32::MAX as usize;

/// Opaque, stable identifier of an interned string.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Rebuild a handle from its raw value, e.g. one previously obtained
    /// from [`Handle::to_raw`]. Returns `None` for 0, which is never issued.
    pub fn from_raw(raw: u32) -> Option<Handle> {
        NonZeroU32::new(raw).map(Handle)
    }

    pub fn to_raw(self) -> u32 {
        self.0.get()
    }

    #[inline]
    pub(crate) fn offset(self) -> usize {
        self.0.get() as usize
    }
}

#[derive(Clone, Debug)]
pub struct Arena {
    bytes: Vec<u8>,
    // Largest end offset a record may reach.
    limit: usize,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Creates an empty arena without allocating.
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            limit: MAX_LEN,
        }
    }

    /// An arena that refuses to grow past `limit` bytes.
    #[cfg(test)]
    pub(crate) fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit: limit.min(MAX_LEN),
        }
    }

    /// Creates an arena able to hold `capacity` bytes (pad byte included)
    /// before its first growth.
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(capacity.max(1))?;
        bytes.push(PAD);
        Ok(Self {
            bytes,
            limit: MAX_LEN,
        })
    }

    /// Bytes in use, pad byte and length prefixes included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when no record has been appended.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 1
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Copies `data` to the end of the arena and returns its handle.
    ///
    /// On error nothing is written; previously issued handles are never
    /// affected by growth.
    pub fn append(&mut self, data: &[u8]) -> Result<Handle, Error> {
        let mut prefix = [0u8; MAX_PREFIX];
        let prefix_len = encode_len(data.len(), &mut prefix).ok_or(Error::OutOfMemory)?;
        let pad = usize::from(self.bytes.is_empty());
        let record = pad + prefix_len + data.len();
        self.bytes
            .len()
            .checked_add(record)
            .filter(|&end| end <= self.limit)
            .ok_or(Error::OutOfMemory)?;

        let offset = self.bytes.len() + pad;
        // Offset 0 is the pad byte, so a record offset is never zero.
        let handle = u32::try_from(offset)
            .ok()
            .and_then(Handle::from_raw)
            .ok_or(Error::OutOfMemory)?;

        self.reserve(record)?;
        if pad == 1 {
            self.bytes.push(PAD);
        }
        self.bytes.extend_from_slice(&prefix[..prefix_len]);
        self.bytes.extend_from_slice(data);
        Ok(handle)
    }

    /// Returns the payload of the record starting at `handle`.
    pub fn read(&self, handle: Handle) -> Result<&[u8], Error> {
        self.record(handle.offset())
            .map(|(data, _)| data)
            .ok_or(Error::InvalidHandle(handle))
    }

    /// Iterates over records in append order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            arena: self,
            offset: 1,
        }
    }

    // Payload and end offset of the record at `offset`.
    fn record(&self, offset: usize) -> Option<(&[u8], usize)> {
        let tail = self.bytes.get(offset..)?;
        let (len, prefix_len) = decode_len(tail)?;
        let end = prefix_len.checked_add(len)?;
        let data = tail.get(prefix_len..end)?;
        Some((data, offset + end))
    }

    // Doubles capacity until `additional` more bytes fit.
    fn reserve(&mut self, additional: usize) -> Result<(), Error> {
        let required = self
            .bytes
            .len()
            .checked_add(additional)
            .ok_or(Error::OutOfMemory)?;
        let old_capacity = self.bytes.capacity();
        if required <= old_capacity {
            return Ok(());
        }
        let mut target = old_capacity.max(MIN_CAPACITY);
        while target < required {
            target = target.checked_mul(2).ok_or(Error::OutOfMemory)?;
        }
        if let Err(e) = self.bytes.try_reserve_exact(target - self.bytes.len()) {
            warn!(old_capacity, requested = target, "arena growth failed");
            return Err(e.into());
        }
        debug!(
            old_capacity,
            new_capacity = self.bytes.capacity(),
            "arena grew"
        );
        Ok(())
    }
}

/// Iterator over `(Handle, payload)` pairs in append order.
pub struct Iter<'a> {
    arena: &'a Arena,
    offset: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (Handle, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = Handle::from_raw(u32::try_from(self.offset).ok()?)?;
        let (data, end) = self.arena.record(self.offset)?;
        self.offset = end;
        Some((handle, data))
    }
}

fn encode_len(len: usize, out: &mut [u8; MAX_PREFIX]) -> Option<usize> {
    let mut v = u32::try_from(len).ok()?;
    let mut i = 0;
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out[i] = byte;
            return Some(i + 1);
        }
        out[i] = byte | 0x80;
        i += 1;
    }
}

// Returns the decoded length and the number of prefix bytes.
fn decode_len(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut value: u32 = 0;
    for (i, &byte) in bytes.iter().take(MAX_PREFIX).enumerate() {
        let chunk = u32::from(byte & 0x7f);
        if i == MAX_PREFIX - 1 && chunk > 0x0f {
            return None;
        }
        value |= chunk << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value as usize, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: offset 0 is reserved, so the first record gets handle 1.
    #[test]
    fn first_record_skips_pad_byte() {
        let mut a = Arena::new();
        assert!(a.is_empty());
        let h = a.append(b"foo").unwrap();
        assert_eq!(h.to_raw(), 1);
        assert_eq!(a.read(h).unwrap(), b"foo");
        // pad + 1-byte prefix + payload
        assert_eq!(a.len(), 5);
        assert!(!a.is_empty());

        let mut b = Arena::with_capacity(64).unwrap();
        assert_eq!(b.append(b"bar").unwrap().to_raw(), 1);
    }

    /// Invariant: handles issued before growth read back the same bytes after
    /// many reallocations.
    #[test]
    fn growth_preserves_existing_records() {
        let mut a = Arena::with_capacity(1).unwrap();
        let mut issued = Vec::new();
        for i in 0..500 {
            let s = format!("record-{i}");
            issued.push((a.append(s.as_bytes()).unwrap(), s));
        }
        assert!(a.capacity() >= a.len());
        for (h, s) in &issued {
            assert_eq!(a.read(*h).unwrap(), s.as_bytes());
        }
    }

    /// Invariant: capacity grows by doubling from the minimum.
    #[test]
    fn capacity_doubles() {
        let mut a = Arena::new();
        a.append(&[7u8; 10]).unwrap();
        assert!(a.capacity() >= MIN_CAPACITY);
        a.append(&[7u8; 40]).unwrap();
        assert!(a.capacity() >= 4 * MIN_CAPACITY);
    }

    /// Invariant: empty strings and payloads needing a multi-byte prefix are
    /// stored exactly.
    #[test]
    fn lengths_round_trip() {
        let mut a = Arena::new();
        let empty = a.append(b"").unwrap();
        let long = vec![b'x'; 300];
        let big = a.append(&long).unwrap();
        let after = a.append(b"z").unwrap();
        assert_eq!(a.read(empty).unwrap(), b"");
        assert_eq!(a.read(big).unwrap(), &long[..]);
        assert_eq!(a.read(after).unwrap(), b"z");
        // 300 needs two prefix bytes.
        assert_eq!(after.to_raw() - big.to_raw(), 302);
    }

    /// Invariant: offsets past the end yield `InvalidHandle`.
    #[test]
    fn out_of_range_read_is_invalid() {
        let mut a = Arena::new();
        a.append(b"abc").unwrap();
        let past = Handle::from_raw(a.len() as u32).unwrap();
        assert_eq!(a.read(past), Err(Error::InvalidHandle(past)));
        let far = Handle::from_raw(10_000).unwrap();
        assert_eq!(a.read(far), Err(Error::InvalidHandle(far)));
    }

    #[test]
    fn iter_walks_records_in_order() {
        let mut a = Arena::new();
        let words: [&[u8]; 4] = [b"alpha", b"", b"beta", b"gamma"];
        let handles: Vec<Handle> = words.iter().map(|w| a.append(w).unwrap()).collect();
        let seen: Vec<(Handle, &[u8])> = a.iter().collect();
        assert_eq!(seen.len(), 4);
        for ((h, data), (eh, ew)) in seen.iter().zip(handles.iter().zip(words.iter())) {
            assert_eq!(h, eh);
            assert_eq!(data, ew);
        }
        assert_eq!(Arena::new().iter().count(), 0);
    }

    /// Invariant: an append that would pass the limit writes nothing.
    #[test]
    fn append_past_limit_writes_nothing() {
        let mut a = Arena::with_limit(8);
        let h = a.append(b"abc").unwrap();
        let len = a.len();
        assert_eq!(a.append(b"defgh"), Err(Error::OutOfMemory));
        assert_eq!(a.len(), len);
        assert_eq!(a.read(h).unwrap(), b"abc");
        // pad + prefix + "abc" + prefix + "de" reaches the limit exactly.
        assert!(a.append(b"de").is_ok());
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn zero_is_not_a_handle() {
        assert!(Handle::from_raw(0).is_none());
        assert_eq!(Handle::from_raw(42).map(Handle::to_raw), Some(42));
    }

    #[test]
    fn varint_prefix() {
        let mut buf = [0u8; MAX_PREFIX];
        for len in [0usize, 1, 127, 128, 16_383, 16_384, u32::MAX as usize] {
            let n = encode_len(len, &mut buf).unwrap();
            assert_eq!(decode_len(&buf[..n]), Some((len, n)));
        }
        // Truncated and overlong prefixes are rejected.
        assert_eq!(decode_len(&[0x80]), None);
        assert_eq!(decode_len(&[0xff, 0xff, 0xff, 0xff, 0x7f]), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_length_cannot_be_encoded() {
        let mut buf = [0u8; MAX_PREFIX];
        assert_eq!(encode_len(u32::MAX as usize + 1, &mut buf), None);
    }
}
