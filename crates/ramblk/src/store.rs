//! The in-memory backing store.
//!
//! A [`BackingStore`] is a fixed-length, zero-initialized byte store. It is
//! logically contiguous but physically striped: the address space is split
//! into fixed-size regions, each guarded by its own mutex, so concurrent
//! dispatches touching disjoint stripes proceed in parallel while
//! overlapping ranges serialize instead of racing.
//!
//! All access goes through the bounds-checked [`read_at`](BackingStore::read_at)
//! and [`write_at`](BackingStore::write_at); there is no way to reach the
//! bytes without the range check.

use std::collections::TryReserveError;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ramblk_core::IoError;

/// log2 of the stripe size (1 MiB stripes).
const STRIPE_SHIFT: u32 = 20;
/// Bytes covered by one stripe lock.
const STRIPE_SIZE: u64 = 1 << STRIPE_SHIFT;

/// Fixed-capacity, stripe-locked byte store.
pub struct BackingStore {
    /// One lock-guarded region per stripe; the last stripe may be short.
    stripes: Box<[Mutex<Box<[u8]>>]>,
    len: u64,
}

impl BackingStore {
    /// Allocates a zero-filled store of `len` bytes.
    ///
    /// Fails if the allocation cannot be satisfied; no partial store is
    /// left behind.
    pub fn try_new(len: u64) -> Result<Self, TryReserveError> {
        let n_stripes = len.div_ceil(STRIPE_SIZE);
        let mut stripes = Vec::new();
        stripes.try_reserve_exact(n_stripes as usize)?;
        for i in 0..n_stripes {
            let stripe_len = STRIPE_SIZE.min(len - i * STRIPE_SIZE) as usize;
            let mut bytes = Vec::new();
            bytes.try_reserve_exact(stripe_len)?;
            bytes.resize(stripe_len, 0u8);
            stripes.push(Mutex::new(bytes.into_boxed_slice()));
        }
        Ok(Self {
            stripes: stripes.into_boxed_slice(),
            len,
        })
    }

    /// Total store length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the store has zero capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, offset: u64, len: u64) -> Result<(), IoError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(IoError::OutOfRange),
        }
    }

    fn stripe(&self, pos: u64) -> (MutexGuard<'_, Box<[u8]>>, usize) {
        let guard = self.stripes[(pos >> STRIPE_SHIFT) as usize]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (guard, (pos & (STRIPE_SIZE - 1)) as usize)
    }

    /// Copies `dst.len()` bytes out of the store starting at `offset`.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<(), IoError> {
        self.check(offset, dst.len() as u64)?;
        let mut copied = 0;
        while copied < dst.len() {
            let (chunk, within) = self.stripe(offset + copied as u64);
            let n = (dst.len() - copied).min(chunk.len() - within);
            dst[copied..copied + n].copy_from_slice(&chunk[within..within + n]);
            copied += n;
        }
        Ok(())
    }

    /// Copies `src.len()` bytes into the store starting at `offset`.
    pub fn write_at(&self, offset: u64, src: &[u8]) -> Result<(), IoError> {
        self.check(offset, src.len() as u64)?;
        let mut copied = 0;
        while copied < src.len() {
            let (mut chunk, within) = self.stripe(offset + copied as u64);
            let n = (src.len() - copied).min(chunk.len() - within);
            chunk[within..within + n].copy_from_slice(&src[copied..copied + n]);
            copied += n;
        }
        Ok(())
    }
}
