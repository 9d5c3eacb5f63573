//! In-process simulation of the host block I/O layer.
//!
//! [`BlockLayer`] plays the role the kernel block core plays for a real
//! driver: it hands out driver majors, tag sets, disk handles, and minor
//! indexes (implementing [`ramblk_core::BlockHost`]), keeps the namespace of
//! published disks, and routes submitted requests to the owning driver's
//! hardware queues. Everything lives in process memory; there is no device
//! node or wire protocol.

pub mod index;
pub mod layer;

pub use index::IndexAllocator;
pub use layer::{BlockLayer, PublishedInfo, ResourceCounts, SubmitError};
