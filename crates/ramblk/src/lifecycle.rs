//! Device bring-up and tear-down.
//!
//! Bring-up walks a fixed sequence of resource acquisitions against the
//! host layer; each step is recorded as it completes. On failure at any
//! step, and on normal shutdown, the same unwind routine releases every
//! acquired resource in strict reverse order, so a partially initialized
//! device never leaks anything.

use std::sync::Arc;

use log::{error, info};
use thiserror::Error;

use ramblk_core::{
    BlockDriver, BlockHost, DiskFlags, DiskHandle, DiskParams, HostError, Major, MinorIndex,
    TagSetHandle,
};

use crate::config::RamDiskConfig;
use crate::disk::RamDisk;

/// Bring-up steps, in acquisition order.
///
/// The ordering is meaningful: unwinding releases resources from the
/// highest step reached back down to [`DriverRegistered`](Self::DriverRegistered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BringUpStep {
    /// A dynamic major was allocated for the driver.
    DriverRegistered,
    /// The backing store was allocated.
    StoreAllocated,
    /// The dispatch-queue tag set was allocated.
    TagSetReady,
    /// A disk handle was allocated.
    DiskAllocated,
    /// The disk's I/O geometry was set.
    GeometrySet,
    /// A minor index was allocated.
    IndexAllocated,
    /// The disk is visible in the device namespace (terminal running state).
    DiskPublished,
}

/// A bring-up attempt failed.
///
/// By the time this is returned, every resource acquired before the failing
/// step has already been released.
#[derive(Debug, Error)]
#[error("bring-up failed at {step:?}: {source}")]
pub struct BringUpError {
    /// The step that failed.
    pub step: BringUpStep,
    /// Why it failed.
    #[source]
    pub source: HostError,
}

/// A fully brought-up device, as returned by [`bring_up`].
///
/// Holds every host resource backing the device; pass it to [`tear_down`]
/// exactly once to release them.
#[derive(Debug)]
pub struct DeviceHandle {
    name: String,
    major: Major,
    minor: MinorIndex,
    tag_set: TagSetHandle,
    disk: DiskHandle,
    device: Arc<RamDisk>,
}

impl DeviceHandle {
    /// The name the disk is published under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The driver's major number.
    #[must_use]
    pub fn major(&self) -> Major {
        self.major
    }

    /// The disk's minor index.
    #[must_use]
    pub fn minor(&self) -> MinorIndex {
        self.minor
    }

    /// The device itself.
    #[must_use]
    pub fn device(&self) -> &Arc<RamDisk> {
        &self.device
    }
}

/// Everything acquired so far during one bring-up attempt.
///
/// Doubles as the unwind record: [`unwind`] releases whatever is present,
/// most recently acquired first.
#[derive(Default)]
struct Acquired {
    major: Option<Major>,
    device: Option<Arc<RamDisk>>,
    tag_set: Option<TagSetHandle>,
    disk: Option<DiskHandle>,
    minor: Option<MinorIndex>,
    published: bool,
}

/// Creates the backing store, registers the device with the host block
/// layer, and publishes it under `config.name`.
///
/// On failure at any step, all prior acquisitions are released in reverse
/// order before the error is returned; the host layer is left exactly as it
/// was found.
pub fn bring_up<H: BlockHost>(host: &H, config: &RamDiskConfig) -> Result<DeviceHandle, BringUpError> {
    let mut acq = Acquired::default();
    match try_bring_up(host, config, &mut acq) {
        Ok(handle) => Ok(handle),
        Err(err) => {
            error!("bring_up: {err}; unwinding");
            unwind(host, &mut acq);
            Err(err)
        }
    }
}

/// Removes the device from the host layer and frees its resources.
///
/// Must be called exactly once, after all in-flight requests have drained;
/// releases follow the exact reverse of the bring-up acquisition order.
pub fn tear_down<H: BlockHost>(host: &H, handle: DeviceHandle) {
    info!("tear_down: removing {}", handle.name);
    let mut acq = Acquired {
        major: Some(handle.major),
        device: Some(handle.device),
        tag_set: Some(handle.tag_set),
        disk: Some(handle.disk),
        minor: Some(handle.minor),
        published: true,
    };
    unwind(host, &mut acq);
}

fn try_bring_up<H: BlockHost>(
    host: &H,
    config: &RamDiskConfig,
    acq: &mut Acquired,
) -> Result<DeviceHandle, BringUpError> {
    let step = |step| move |source| BringUpError { step, source };

    info!("bring_up: registering block driver {:?}", config.name);
    let major = host
        .register_blkdev(&config.name)
        .map_err(step(BringUpStep::DriverRegistered))?;
    acq.major = Some(major);

    let capacity = config.capacity();
    info!(
        "bring_up: allocating backing store ({} bytes, {capacity})",
        capacity.bytes()
    );
    let device = RamDisk::try_new(capacity)
        .map(Arc::new)
        .map_err(|_| BringUpError {
            step: BringUpStep::StoreAllocated,
            source: HostError::OutOfMemory,
        })?;
    acq.device = Some(Arc::clone(&device));

    let tag_set = host
        .alloc_tag_set(&config.tag_set)
        .map_err(step(BringUpStep::TagSetReady))?;
    acq.tag_set = Some(tag_set);

    let disk = host
        .alloc_disk(major, tag_set)
        .map_err(step(BringUpStep::DiskAllocated))?;
    acq.disk = Some(disk);

    host.set_queue_limits(disk, &config.limits)
        .map_err(step(BringUpStep::GeometrySet))?;

    let minor = host.alloc_index().map_err(step(BringUpStep::IndexAllocated))?;
    acq.minor = Some(minor);

    let params = DiskParams {
        name: &config.name,
        minor,
        capacity,
        flags: DiskFlags::NO_PART,
    };
    let driver: Arc<dyn BlockDriver> = device.clone();
    host.add_disk(disk, &params, driver)
        .map_err(step(BringUpStep::DiskPublished))?;
    acq.published = true;

    info!(
        "bring_up: {} published (major {major}, minor {minor}, {capacity})",
        config.name
    );
    Ok(DeviceHandle {
        name: config.name.clone(),
        major,
        minor,
        tag_set,
        disk,
        device,
    })
}

/// Releases whatever `acq` holds, most recently acquired first.
///
/// Serves both the bring-up failure path and normal shutdown; there is no
/// second release order to keep in sync. Geometry has no resource of its
/// own; it is cleared when the disk handle is released.
fn unwind<H: BlockHost>(host: &H, acq: &mut Acquired) {
    if acq.published {
        if let Some(disk) = acq.disk {
            host.del_disk(disk);
        }
        acq.published = false;
    }
    if let Some(minor) = acq.minor.take() {
        host.free_index(minor);
    }
    if let Some(disk) = acq.disk.take() {
        host.put_disk(disk);
    }
    if let Some(tag_set) = acq.tag_set.take() {
        host.free_tag_set(tag_set);
    }
    // Dropping the last reference frees the backing store.
    acq.device = None;
    if let Some(major) = acq.major.take() {
        host.unregister_blkdev(major);
    }
}
