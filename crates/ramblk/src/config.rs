//! Device configuration.

use ramblk_core::{Capacity, QueueLimits, TagSetConfig};

/// Name the device is published under by default.
pub const DEVICE_NAME: &str = "ramblk";

/// Default device capacity in mebibytes.
pub const DEFAULT_CAPACITY_MIB: u64 = 40;

/// Everything [`bring_up`](crate::lifecycle::bring_up) needs to know about
/// the device being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamDiskConfig {
    /// Name the disk is published under.
    pub name: String,
    /// Capacity in mebibytes.
    pub capacity_mib: u64,
    /// Dispatch-queue configuration.
    pub tag_set: TagSetConfig,
    /// Advertised I/O geometry.
    pub limits: QueueLimits,
}

impl RamDiskConfig {
    /// The configured capacity in sectors.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        Capacity::from_mib(self.capacity_mib)
    }
}

impl Default for RamDiskConfig {
    fn default() -> Self {
        Self {
            name: String::from(DEVICE_NAME),
            capacity_mib: DEFAULT_CAPACITY_MIB,
            tag_set: TagSetConfig::default(),
            limits: QueueLimits::default(),
        }
    }
}
