//! Shared block-layer types and traits.
//!
//! This crate defines the seam between a block driver and the host block
//! layer: sector units and the capacity model, the request/segment model,
//! dispatch-queue configuration, the error taxonomy, and the [`BlockDriver`]
//! and [`BlockHost`] traits. It contains no I/O of its own; both the
//! `ramblk` driver and the `ramblk-host` block layer build on it.

pub mod capacity;
pub mod error;
pub mod host;
pub mod queue;
pub mod request;

pub use capacity::{Capacity, PAGE_SIZE, SECTOR_SHIFT, SECTOR_SIZE, Sector};
pub use error::{HostError, IoError};
pub use host::{BlockDriver, BlockHost, DiskFlags, DiskHandle, DiskParams, Major, MinorIndex, TagSetHandle};
pub use queue::{HwQueueId, QueueLimits, TagSetConfig, TagSetFlags};
pub use request::{Request, RequestOp, Segment};
