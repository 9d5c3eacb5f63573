//! The host block layer proper.
//!
//! [`BlockLayer`] owns every resource a driver acquires during bring-up and
//! routes submitted requests to the driver that published the target disk.
//! Same-queue submissions are serialized on a per-hardware-queue lock, so a
//! driver observes them in submission order; submissions to different queues
//! run concurrently.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use thiserror::Error;

use ramblk_core::{
    BlockDriver, BlockHost, Capacity, DiskFlags, DiskHandle, DiskParams, HostError, HwQueueId,
    IoError, Major, MinorIndex, QueueLimits, Request, TagSetConfig, TagSetHandle,
};

use crate::index::IndexAllocator;

/// Dynamic majors are handed out downward from here, like the kernel's
/// dynamic major range.
const DYNAMIC_MAJOR_MAX: u32 = 254;
/// Inclusive lower bound of the dynamic major range.
const DYNAMIC_MAJOR_MIN: u32 = 234;
/// Upper bound on minor indexes.
const MAX_MINORS: u32 = 256;

/// Reasons a request submission can fail.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// No published disk has the given name.
    #[error("no published disk named {0:?}")]
    UnknownDisk(String),
    /// The hardware-queue index is outside the disk's tag set.
    #[error("hardware queue {0} out of range")]
    BadQueue(HwQueueId),
    /// The request carries more segments than the disk allows.
    #[error("request has {got} segments, limit is {limit}")]
    TooManySegments {
        /// Segments in the request.
        got: usize,
        /// The disk's `max_segments`.
        limit: u32,
    },
    /// One segment is longer than the disk allows.
    #[error("segment of {got} bytes exceeds max segment size {limit}")]
    SegmentTooLarge {
        /// Length of the offending segment.
        got: usize,
        /// The disk's `max_segment_size`.
        limit: u32,
    },
    /// The driver failed the request.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// A disk visible in the device namespace.
struct PublishedDisk {
    name: String,
    minor: MinorIndex,
    capacity: Capacity,
    flags: DiskFlags,
    limits: QueueLimits,
    nr_hw_queues: u32,
    driver: Arc<dyn BlockDriver>,
    /// One lock per hardware queue; holding it delivers same-queue requests
    /// in submission order.
    queue_locks: Vec<Mutex<()>>,
}

/// An allocated disk, published or not.
struct DiskState {
    major: Major,
    tag_set: TagSetHandle,
    limits: Option<QueueLimits>,
    published: Option<Arc<PublishedDisk>>,
}

struct LayerState {
    /// Live majors, keyed by number, with the registering driver's name.
    majors: BTreeMap<u32, String>,
    tag_sets: BTreeMap<u64, TagSetConfig>,
    next_tag_set: u64,
    disks: BTreeMap<u64, DiskState>,
    next_disk: u64,
    /// Published disk name → disk id.
    names: BTreeMap<String, u64>,
    minors: IndexAllocator,
}

/// Snapshot of live host-layer resources, used as a leak oracle in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCounts {
    /// Registered driver majors.
    pub majors: usize,
    /// Allocated tag sets.
    pub tag_sets: usize,
    /// Allocated disk handles.
    pub disks: usize,
    /// Live minor indexes.
    pub minors: usize,
    /// Disks visible in the device namespace.
    pub published: usize,
}

impl ResourceCounts {
    /// Returns `true` if nothing is allocated.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.majors == 0
            && self.tag_sets == 0
            && self.disks == 0
            && self.minors == 0
            && self.published == 0
    }
}

/// Identity of a published disk, as reported by introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedInfo {
    /// Major of the driver the disk was allocated under.
    pub major: Major,
    /// Assigned minor index.
    pub minor: MinorIndex,
    /// Disk capacity.
    pub capacity: Capacity,
    /// Behavior flags.
    pub flags: DiskFlags,
    /// Advertised I/O geometry.
    pub limits: QueueLimits,
}

/// The in-process host block layer.
pub struct BlockLayer {
    state: Mutex<LayerState>,
}

impl BlockLayer {
    /// Creates an empty block layer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LayerState {
                majors: BTreeMap::new(),
                tag_sets: BTreeMap::new(),
                next_tag_set: 1,
                disks: BTreeMap::new(),
                next_disk: 1,
                names: BTreeMap::new(),
                minors: IndexAllocator::new(MAX_MINORS),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submits one request to the named disk on the given hardware queue and
    /// returns its terminal status.
    ///
    /// The request is validated against the disk's queue limits before it
    /// reaches the driver.
    pub fn submit(
        &self,
        name: &str,
        queue: HwQueueId,
        req: &mut Request<'_>,
    ) -> Result<(), SubmitError> {
        let disk = {
            let state = self.lock();
            state
                .names
                .get(name)
                .and_then(|id| state.disks.get(id))
                .and_then(|d| d.published.clone())
        }
        .ok_or_else(|| SubmitError::UnknownDisk(name.to_string()))?;

        if queue.as_u32() >= disk.nr_hw_queues {
            return Err(SubmitError::BadQueue(queue));
        }
        if req.segments().len() > disk.limits.max_segments as usize {
            return Err(SubmitError::TooManySegments {
                got: req.segments().len(),
                limit: disk.limits.max_segments,
            });
        }
        for seg in req.segments() {
            if seg.len() > disk.limits.max_segment_size as usize {
                return Err(SubmitError::SegmentTooLarge {
                    got: seg.len(),
                    limit: disk.limits.max_segment_size,
                });
            }
        }

        // Serialize per queue; the driver sees same-queue requests in
        // submission order.
        let _order = disk.queue_locks[queue.as_usize()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(
            "submit: disk={} queue={} op={:?} start={} len={}",
            disk.name,
            queue,
            req.op(),
            req.start(),
            req.total_len()
        );
        disk.driver.queue_rq(queue, req)?;
        Ok(())
    }

    /// Returns `true` if a disk with this name is in the device namespace.
    #[must_use]
    pub fn is_published(&self, name: &str) -> bool {
        self.lock().names.contains_key(name)
    }

    /// Looks up a published disk's identity.
    #[must_use]
    pub fn published_info(&self, name: &str) -> Option<PublishedInfo> {
        let state = self.lock();
        let disk = state.names.get(name).and_then(|id| state.disks.get(id))?;
        let published = disk.published.as_ref()?;
        Some(PublishedInfo {
            major: disk.major,
            minor: published.minor,
            capacity: published.capacity,
            flags: published.flags,
            limits: published.limits,
        })
    }

    /// Counts live resources.
    #[must_use]
    pub fn resource_counts(&self) -> ResourceCounts {
        let state = self.lock();
        ResourceCounts {
            majors: state.majors.len(),
            tag_sets: state.tag_sets.len(),
            disks: state.disks.len(),
            minors: state.minors.live_count(),
            published: state.names.len(),
        }
    }
}

impl Default for BlockLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockHost for BlockLayer {
    fn register_blkdev(&self, name: &str) -> Result<Major, HostError> {
        let mut state = self.lock();
        let major = (DYNAMIC_MAJOR_MIN..=DYNAMIC_MAJOR_MAX)
            .rev()
            .find(|m| !state.majors.contains_key(m))
            .ok_or(HostError::MajorsExhausted)?;
        state.majors.insert(major, name.to_string());
        debug!("register_blkdev: {name} -> major {major}");
        Ok(Major::new(major))
    }

    fn unregister_blkdev(&self, major: Major) {
        let mut state = self.lock();
        if state.majors.remove(&major.as_u32()).is_none() {
            warn!("unregister_blkdev: major {major} was not registered");
        }
    }

    fn alloc_tag_set(&self, config: &TagSetConfig) -> Result<TagSetHandle, HostError> {
        if !config.is_valid() {
            return Err(HostError::InvalidTagSet);
        }
        let mut state = self.lock();
        let id = state.next_tag_set;
        state.next_tag_set += 1;
        state.tag_sets.insert(id, *config);
        debug!(
            "alloc_tag_set: id={id} depth={} queues={}",
            config.queue_depth, config.nr_hw_queues
        );
        Ok(TagSetHandle::from_raw(id))
    }

    fn free_tag_set(&self, tag_set: TagSetHandle) {
        let mut state = self.lock();
        if state.tag_sets.remove(&tag_set.into_raw()).is_none() {
            warn!("free_tag_set: handle {tag_set:?} was not allocated");
        }
    }

    fn alloc_disk(&self, major: Major, tag_set: TagSetHandle) -> Result<DiskHandle, HostError> {
        let mut state = self.lock();
        if !state.majors.contains_key(&major.as_u32()) {
            return Err(HostError::UnknownHandle);
        }
        if !state.tag_sets.contains_key(&tag_set.into_raw()) {
            return Err(HostError::UnknownHandle);
        }
        let id = state.next_disk;
        state.next_disk += 1;
        state.disks.insert(
            id,
            DiskState {
                major,
                tag_set,
                limits: None,
                published: None,
            },
        );
        debug!("alloc_disk: id={id} major={major}");
        Ok(DiskHandle::from_raw(id))
    }

    fn put_disk(&self, disk: DiskHandle) {
        let mut state = self.lock();
        match state.disks.remove(&disk.into_raw()) {
            Some(d) => {
                if let Some(published) = d.published {
                    // Releasing a still-published disk also retracts it.
                    warn!("put_disk: disk {:?} was still published", published.name);
                    state.names.remove(&published.name);
                }
            }
            None => warn!("put_disk: handle {disk:?} was not allocated"),
        }
    }

    fn set_queue_limits(&self, disk: DiskHandle, limits: &QueueLimits) -> Result<(), HostError> {
        if !limits.is_valid() {
            return Err(HostError::InvalidLimits);
        }
        let mut state = self.lock();
        let entry = state
            .disks
            .get_mut(&disk.into_raw())
            .ok_or(HostError::UnknownHandle)?;
        entry.limits = Some(*limits);
        Ok(())
    }

    fn alloc_index(&self) -> Result<MinorIndex, HostError> {
        let mut state = self.lock();
        let idx = state.minors.alloc().ok_or(HostError::IndexesExhausted)?;
        Ok(MinorIndex::new(idx))
    }

    fn free_index(&self, index: MinorIndex) {
        let mut state = self.lock();
        state.minors.free(index.as_u32());
    }

    fn add_disk(
        &self,
        disk: DiskHandle,
        params: &DiskParams<'_>,
        driver: Arc<dyn BlockDriver>,
    ) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.names.contains_key(params.name) {
            return Err(HostError::DuplicateName(params.name.to_string()));
        }
        if !state.minors.is_live(params.minor.as_u32()) {
            return Err(HostError::UnknownHandle);
        }
        let entry = state
            .disks
            .get(&disk.into_raw())
            .ok_or(HostError::UnknownHandle)?;
        // Geometry must be set before publication.
        let limits = entry.limits.ok_or(HostError::InvalidLimits)?;
        let config = state
            .tag_sets
            .get(&entry.tag_set.into_raw())
            .copied()
            .ok_or(HostError::UnknownHandle)?;

        let queue_locks = (0..config.nr_hw_queues).map(|_| Mutex::new(())).collect();
        let published = Arc::new(PublishedDisk {
            name: params.name.to_string(),
            minor: params.minor,
            capacity: params.capacity,
            flags: params.flags,
            limits,
            nr_hw_queues: config.nr_hw_queues,
            driver,
            queue_locks,
        });
        let id = disk.into_raw();
        state.names.insert(params.name.to_string(), id);
        if let Some(entry) = state.disks.get_mut(&id) {
            entry.published = Some(published);
        }
        info!(
            "add_disk: {} (minor {}, {})",
            params.name, params.minor, params.capacity
        );
        Ok(())
    }

    fn del_disk(&self, disk: DiskHandle) {
        let mut state = self.lock();
        let Some(entry) = state.disks.get_mut(&disk.into_raw()) else {
            warn!("del_disk: handle {disk:?} was not allocated");
            return;
        };
        match entry.published.take() {
            Some(published) => {
                state.names.remove(&published.name);
                info!("del_disk: {}", published.name);
            }
            None => warn!("del_disk: disk {disk:?} was not published"),
        }
    }
}
