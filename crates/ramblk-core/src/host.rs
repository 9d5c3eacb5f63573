//! Traits and handles at the driver/host-layer seam.
//!
//! A driver implements [`BlockDriver`] to receive requests; the host block
//! layer implements [`BlockHost`] to hand out the resources a driver needs
//! to publish a disk. Handles are opaque `Copy` newtypes issued by the host;
//! the driver never inspects them, only returns them on release.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::capacity::Capacity;
use crate::error::{HostError, IoError};
use crate::queue::{HwQueueId, QueueLimits, TagSetConfig};
use crate::request::Request;

/// Major number identifying a registered block driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Major(u32);

impl Major {
    /// Creates a new `Major`.
    pub const fn new(val: u32) -> Self {
        Self(val)
    }

    /// Returns the raw major number.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minor index assigned to a published disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MinorIndex(u32);

impl MinorIndex {
    /// Creates a new `MinorIndex`.
    pub const fn new(val: u32) -> Self {
        Self(val)
    }

    /// Returns the raw minor index.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MinorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to an allocated tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TagSetHandle(u64);

impl TagSetHandle {
    /// Creates a handle from a raw host-issued id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw host-issued id.
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// Opaque handle to an allocated (not necessarily published) disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DiskHandle(u64);

impl DiskHandle {
    /// Creates a handle from a raw host-issued id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw host-issued id.
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Disk behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiskFlags: u32 {
        /// The disk does not support partitions.
        const NO_PART = 1 << 0;
    }
}

/// Identity of a disk at publication time.
#[derive(Debug, Clone, Copy)]
pub struct DiskParams<'a> {
    /// Name the disk is published under; unique within the host layer.
    pub name: &'a str,
    /// Minor index previously obtained from the host.
    pub minor: MinorIndex,
    /// Disk capacity.
    pub capacity: Capacity,
    /// Behavior flags.
    pub flags: DiskFlags,
}

/// A driver able to service block requests.
///
/// The host layer may call [`queue_rq`](Self::queue_rq) concurrently from
/// multiple hardware queues. Requests delivered on the same queue arrive in
/// submission order; there is no ordering between queues.
pub trait BlockDriver: Send + Sync {
    /// Executes one request to a terminal status.
    ///
    /// Returns `Ok(())` once every segment transferred, or the first
    /// [`IoError`] encountered. There is no asynchronous completion path;
    /// the status is final when this returns.
    fn queue_rq(&self, queue: HwQueueId, req: &mut Request<'_>) -> Result<(), IoError>;
}

/// Resource-management operations a block driver consumes from the host
/// layer during bring-up and tear-down.
///
/// Acquisition methods can fail; release methods cannot. Releasing a handle
/// the host does not know is a no-op (the host logs and ignores it).
pub trait BlockHost {
    /// Registers a block driver and allocates a dynamic major for it.
    fn register_blkdev(&self, name: &str) -> Result<Major, HostError>;

    /// Releases a driver major.
    fn unregister_blkdev(&self, major: Major);

    /// Allocates a dispatch-queue tag set.
    fn alloc_tag_set(&self, config: &TagSetConfig) -> Result<TagSetHandle, HostError>;

    /// Releases a tag set.
    fn free_tag_set(&self, tag_set: TagSetHandle);

    /// Allocates a disk bound to `major` and `tag_set`.
    fn alloc_disk(&self, major: Major, tag_set: TagSetHandle) -> Result<DiskHandle, HostError>;

    /// Releases a disk handle (and any geometry set on it).
    fn put_disk(&self, disk: DiskHandle);

    /// Sets the I/O geometry of an allocated disk.
    fn set_queue_limits(&self, disk: DiskHandle, limits: &QueueLimits) -> Result<(), HostError>;

    /// Allocates the smallest free minor index.
    fn alloc_index(&self) -> Result<MinorIndex, HostError>;

    /// Returns a minor index to the allocator.
    fn free_index(&self, index: MinorIndex);

    /// Publishes a disk into the host's device namespace and attaches the
    /// driver that will service its requests.
    fn add_disk(
        &self,
        disk: DiskHandle,
        params: &DiskParams<'_>,
        driver: Arc<dyn BlockDriver>,
    ) -> Result<(), HostError>;

    /// Removes a published disk from the device namespace.
    fn del_disk(&self, disk: DiskHandle);
}
