//! Sector units and the device capacity model.
//!
//! All sector-to-byte conversion in the workspace goes through
//! [`SECTOR_SIZE`]/[`SECTOR_SHIFT`] so the addressing unit cannot drift
//! between the host layer and a driver.

use core::fmt;

/// Size of one sector in bytes.
pub const SECTOR_SIZE: u64 = 512;

/// `1 << SECTOR_SHIFT == SECTOR_SIZE`.
pub const SECTOR_SHIFT: u32 = 9;

/// Memory page size reported as the default logical/physical block size.
pub const PAGE_SIZE: u32 = 4096;

/// A sector index on a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Sector(u64);

impl Sector {
    /// Creates a new `Sector`.
    pub const fn new(val: u64) -> Self {
        Self(val)
    }

    /// Returns the raw sector index.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the byte offset of the start of this sector.
    ///
    /// The shift wraps for sectors at or above `2^55`; callers must check
    /// the sector against a [`Capacity`] first (see [`Capacity::contains`]).
    pub const fn to_byte_offset(self) -> u64 {
        self.0 << SECTOR_SHIFT
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed capacity of a block device, in sectors.
///
/// The byte capacity is always derived from the sector count; it is never
/// stored separately, so the two cannot fall out of sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    sectors: u64,
}

impl Capacity {
    /// Creates a capacity of `sectors` sectors.
    ///
    /// # Panics
    ///
    /// Panics if `sectors` is zero. A zero-capacity device is a programming
    /// error, not a runtime condition.
    #[must_use]
    pub const fn from_sectors(sectors: u64) -> Self {
        assert!(sectors > 0, "device capacity must be non-zero");
        Self { sectors }
    }

    /// Creates a capacity of `mib` mebibytes.
    #[must_use]
    pub const fn from_mib(mib: u64) -> Self {
        Self::from_sectors((mib * 1024 * 1024) >> SECTOR_SHIFT)
    }

    /// Returns the capacity in sectors.
    #[must_use]
    pub const fn sectors(self) -> u64 {
        self.sectors
    }

    /// Returns the capacity in bytes.
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.sectors << SECTOR_SHIFT
    }

    /// Returns `true` if the byte range `[offset, offset + len)` lies
    /// entirely within the device.
    #[must_use]
    pub fn in_bounds(self, offset: u64, len: u64) -> bool {
        match offset.checked_add(len) {
            Some(end) => end <= self.bytes(),
            None => false,
        }
    }

    /// Returns `true` if `sector` is addressable on this device.
    #[must_use]
    pub fn contains(self, sector: Sector) -> bool {
        sector.as_u64() < self.sectors
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sectors", self.sectors)
    }
}
