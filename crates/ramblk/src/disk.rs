//! The dispatcher: executes requests against the backing store.

use std::fmt;

use log::debug;

use ramblk_core::{BlockDriver, Capacity, HwQueueId, IoError, Request, RequestOp};

use crate::store::BackingStore;

/// The RAM disk device: a capacity model plus its backing store.
///
/// `queue_rq` takes `&self` and may be called concurrently from any number
/// of hardware queues; the store's stripe locks serialize overlapping
/// transfers.
pub struct RamDisk {
    capacity: Capacity,
    store: BackingStore,
}

impl RamDisk {
    /// Allocates a zero-filled device of the given capacity.
    pub fn try_new(capacity: Capacity) -> Result<Self, std::collections::TryReserveError> {
        let store = BackingStore::try_new(capacity.bytes())?;
        Ok(Self { capacity, store })
    }

    /// The device's fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}

impl fmt::Debug for RamDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RamDisk")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl BlockDriver for RamDisk {
    /// Walks the request's segments in order, bounds-checking each against
    /// the capacity model and transferring it to or from the store.
    ///
    /// The running cursor, not any per-segment offset, is the sole source of
    /// positional truth: segment *n + 1* starts where segment *n* ended in
    /// the device's logical address space. The first bounds or operation
    /// violation aborts the request; earlier segments' transfers are not
    /// rolled back, but the request's terminal status is failure.
    fn queue_rq(&self, queue: HwQueueId, req: &mut Request<'_>) -> Result<(), IoError> {
        let op = req.op();
        let start = req.start();
        // A start sector past the device would wrap in the byte-offset
        // shift, so it is rejected before the cursor is formed.
        if !req.segments().is_empty() && !self.capacity.contains(start) {
            debug!("queue_rq: queue={queue} {op:?} start sector {start} beyond capacity");
            return Err(IoError::OutOfRange);
        }
        let mut pos = start.to_byte_offset();

        for seg in req.segments_mut() {
            let len = seg.len() as u64;
            if !self.capacity.in_bounds(pos, len) {
                debug!(
                    "queue_rq: queue={queue} {op:?} at byte {pos} + {len} exceeds capacity"
                );
                return Err(IoError::OutOfRange);
            }
            match op {
                RequestOp::Read => self.store.read_at(pos, seg.as_mut_slice())?,
                RequestOp::Write => self.store.write_at(pos, seg.as_slice())?,
                RequestOp::Flush | RequestOp::Discard => {
                    debug!("queue_rq: queue={queue} unsupported op {op:?}");
                    return Err(IoError::Unsupported);
                }
            }
            pos += len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramblk_core::{SECTOR_SIZE, Sector, Segment};

    fn disk_with_sectors(sectors: u64) -> RamDisk {
        RamDisk::try_new(Capacity::from_sectors(sectors)).unwrap()
    }

    fn submit(disk: &RamDisk, op: RequestOp, start: u64, bufs: Vec<&mut [u8]>) -> Result<(), IoError> {
        let segments = bufs.into_iter().map(Segment::new).collect();
        let mut req = Request::new(op, Sector::new(start), segments);
        disk.queue_rq(HwQueueId::new(0), &mut req)
    }

    #[test]
    fn write_then_read_single_segment() {
        let disk = disk_with_sectors(16);
        let mut data = [0xABu8; 1024];
        submit(&disk, RequestOp::Write, 2, vec![&mut data]).unwrap();

        let mut out = [0u8; 1024];
        submit(&disk, RequestOp::Read, 2, vec![&mut out]).unwrap();
        assert_eq!(out, [0xABu8; 1024]);
    }

    #[test]
    fn segments_accumulate_in_order() {
        let disk = disk_with_sectors(16);
        let mut data: Vec<u8> = (0..200).collect();
        submit(&disk, RequestOp::Write, 0, vec![&mut data]).unwrap();

        let mut a = [0u8; 100];
        let mut b = [0u8; 100];
        submit(&disk, RequestOp::Read, 0, vec![&mut a, &mut b]).unwrap();
        assert_eq!(a.to_vec(), (0..100).collect::<Vec<u8>>());
        assert_eq!(b.to_vec(), (100..200).collect::<Vec<u8>>());
    }

    #[test]
    fn rejects_read_past_capacity() {
        let disk = disk_with_sectors(4);
        let mut buf = vec![0u8; (4 * SECTOR_SIZE + 1) as usize];
        let err = submit(&disk, RequestOp::Read, 0, vec![&mut buf]).unwrap_err();
        assert_eq!(err, IoError::OutOfRange);
    }

    #[test]
    fn rejects_write_starting_past_capacity() {
        let disk = disk_with_sectors(4);
        let mut buf = [0u8; 512];
        let err = submit(&disk, RequestOp::Write, 4, vec![&mut buf]).unwrap_err();
        assert_eq!(err, IoError::OutOfRange);
    }

    #[test]
    fn rejects_start_sector_that_wraps_byte_offset() {
        // (1 << 55) + 5 shifted by 9 wraps to sector 5's byte offset.
        let disk = disk_with_sectors(16);
        let mut buf = [0x42u8; 512];
        let err = submit(&disk, RequestOp::Write, (1 << 55) + 5, vec![&mut buf]).unwrap_err();
        assert_eq!(err, IoError::OutOfRange);

        // The sector the wrap would have aliased is untouched.
        let mut out = [0xFFu8; 512];
        submit(&disk, RequestOp::Read, 5, vec![&mut out]).unwrap();
        assert_eq!(out, [0u8; 512]);
    }

    #[test]
    fn failed_write_leaves_store_untouched() {
        let disk = disk_with_sectors(4);
        let mut bad = [0xFFu8; 1024];
        // Starts on the last sector but overruns it.
        let err = submit(&disk, RequestOp::Write, 3, vec![&mut bad]).unwrap_err();
        assert_eq!(err, IoError::OutOfRange);

        let mut out = [0xEEu8; 512];
        submit(&disk, RequestOp::Read, 3, vec![&mut out]).unwrap();
        assert_eq!(out, [0u8; 512]);
    }

    #[test]
    fn partial_segments_persist_on_failure() {
        let disk = disk_with_sectors(4);
        let mut first = [0x11u8; 512];
        let mut second = [0x22u8; 512];
        let mut third = [0x33u8; 1024];
        // Segments 0 and 1 land on sectors 2 and 3; segment 2 overruns.
        let err = submit(
            &disk,
            RequestOp::Write,
            2,
            vec![&mut first, &mut second, &mut third],
        )
        .unwrap_err();
        assert_eq!(err, IoError::OutOfRange);

        // No rollback: the first two segments reached the store even though
        // the request as a whole failed.
        let mut out = [0u8; 1024];
        submit(&disk, RequestOp::Read, 2, vec![&mut out]).unwrap();
        assert_eq!(&out[..512], &[0x11u8; 512]);
        assert_eq!(&out[512..], &[0x22u8; 512]);
    }

    #[test]
    fn unsupported_op_with_segments_fails() {
        let disk = disk_with_sectors(4);
        let mut buf = [0u8; 512];
        let err = submit(&disk, RequestOp::Discard, 0, vec![&mut buf]).unwrap_err();
        assert_eq!(err, IoError::Unsupported);
    }

    #[test]
    fn segmentless_request_is_vacuously_ok() {
        // With no segments there is nothing to validate or transfer; the
        // segment walk completes immediately, whatever the operation.
        let disk = disk_with_sectors(4);
        let mut req = Request::new(RequestOp::Flush, Sector::new(0), Vec::new());
        assert_eq!(disk.queue_rq(HwQueueId::new(0), &mut req), Ok(()));
    }

    #[test]
    fn capacity_reported() {
        let disk = disk_with_sectors(8);
        assert_eq!(disk.capacity().sectors(), 8);
        assert_eq!(disk.capacity().bytes(), 8 * SECTOR_SIZE);
    }
}
