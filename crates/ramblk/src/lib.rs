//! RAM-backed multi-queue block device driver.
//!
//! Presents a fixed-capacity, sector-addressable volume to the host block
//! layer and services requests against an in-memory backing store. The
//! driver has three parts:
//!
//! - [`store`]: the stripe-locked backing store, the single source of truth
//!   for device contents.
//! - [`disk`]: the dispatcher. It walks a request's segments, validates
//!   each against the capacity model, and performs the transfer.
//! - [`lifecycle`]: multi-stage bring-up and tear-down against a
//!   [`BlockHost`](ramblk_core::BlockHost), with strict reverse-order unwind
//!   of partially acquired resources.
//!
//! The store is volatile; contents do not survive the device.

pub mod config;
pub mod disk;
pub mod lifecycle;
pub mod store;

pub use config::RamDiskConfig;
pub use disk::RamDisk;
pub use lifecycle::{BringUpError, BringUpStep, DeviceHandle, bring_up, tear_down};
pub use store::BackingStore;
