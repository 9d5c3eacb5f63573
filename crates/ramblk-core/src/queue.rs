//! Dispatch-queue configuration.
//!
//! [`TagSetConfig`] sizes and parallelizes request dispatch (queue depth,
//! hardware-queue count, merge policy, NUMA affinity); [`QueueLimits`] is the
//! I/O geometry a disk advertises to the host layer. Both are plain
//! configuration values decoupled from any particular scheduler integration.

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Behavior flags for a tag set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TagSetFlags: u32 {
        /// Allow the host layer to merge adjacent requests.
        const SHOULD_MERGE = 1 << 0;
    }
}

/// Identifies one hardware queue (independent dispatch context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HwQueueId(u32);

impl HwQueueId {
    /// Creates a new `HwQueueId`.
    pub const fn new(val: u32) -> Self {
        Self(val)
    }

    /// Returns the raw queue index.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the queue index as `usize` (convenience for indexing).
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HwQueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration of a dispatch-queue tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSetConfig {
    /// Maximum number of outstanding requests per hardware queue.
    pub queue_depth: u32,
    /// Number of independent hardware queues.
    pub nr_hw_queues: u32,
    /// Preferred NUMA node, or `None` for no affinity.
    pub numa_node: Option<u32>,
    /// Behavior flags.
    pub flags: TagSetFlags,
}

impl TagSetConfig {
    /// Returns `true` if the configuration is usable: at least one queue
    /// with a non-zero depth.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.queue_depth > 0 && self.nr_hw_queues > 0
    }
}

impl Default for TagSetConfig {
    fn default() -> Self {
        Self {
            queue_depth: 128,
            nr_hw_queues: 1,
            numa_node: None,
            flags: TagSetFlags::SHOULD_MERGE,
        }
    }
}

/// I/O geometry advertised by a disk.
///
/// These are alignment and sizing hints for the host layer; they do not
/// affect the storage layout itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLimits {
    /// Smallest unit the device addresses, in bytes.
    pub logical_block_size: u32,
    /// Smallest unit the device can transfer without read-modify-write.
    pub physical_block_size: u32,
    /// Maximum number of segments per request.
    pub max_segments: u32,
    /// Maximum length of a single segment, in bytes.
    pub max_segment_size: u32,
}

impl QueueLimits {
    /// Returns `true` if the limits are internally consistent: power-of-two
    /// block sizes and non-zero segment limits.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.logical_block_size.is_power_of_two()
            && self.physical_block_size.is_power_of_two()
            && self.physical_block_size >= self.logical_block_size
            && self.max_segments > 0
            && self.max_segment_size > 0
    }
}

impl Default for QueueLimits {
    fn default() -> Self {
        Self {
            logical_block_size: crate::capacity::PAGE_SIZE,
            physical_block_size: crate::capacity::PAGE_SIZE,
            max_segments: 32,
            max_segment_size: 65536,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tag_set() {
        let ts = TagSetConfig::default();
        assert_eq!(ts.queue_depth, 128);
        assert_eq!(ts.nr_hw_queues, 1);
        assert!(ts.flags.contains(TagSetFlags::SHOULD_MERGE));
        assert!(ts.is_valid());
    }

    #[test]
    fn zero_depth_invalid() {
        let ts = TagSetConfig {
            queue_depth: 0,
            ..TagSetConfig::default()
        };
        assert!(!ts.is_valid());
    }

    #[test]
    fn default_limits_valid() {
        let limits = QueueLimits::default();
        assert!(limits.is_valid());
        assert_eq!(limits.max_segments, 32);
        assert_eq!(limits.max_segment_size, 65536);
    }

    #[test]
    fn non_power_of_two_block_size_invalid() {
        let limits = QueueLimits {
            logical_block_size: 1000,
            ..QueueLimits::default()
        };
        assert!(!limits.is_valid());
    }

    #[test]
    fn physical_smaller_than_logical_invalid() {
        let limits = QueueLimits {
            logical_block_size: 4096,
            physical_block_size: 512,
            ..QueueLimits::default()
        };
        assert!(!limits.is_valid());
    }
}
