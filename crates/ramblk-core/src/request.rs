//! The request/segment model.
//!
//! A [`Request`] describes one block I/O call: an operation, a starting
//! sector, and an ordered sequence of memory [`Segment`]s. Segments may be
//! scattered in the caller's address space but always map to contiguous
//! device-logical bytes, so their order is significant and must not be
//! changed between submission and dispatch.

use crate::capacity::Sector;

/// The kind of operation a request performs.
///
/// Drivers are free to support only a subset; the `ramblk` driver handles
/// `Read` and `Write` and rejects everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOp {
    /// Copy bytes from the device into the request's segments.
    Read,
    /// Copy bytes from the request's segments onto the device.
    Write,
    /// Flush volatile caches to stable storage.
    Flush,
    /// Discard a sector range.
    Discard,
}

/// One contiguous piece of a request's caller memory.
///
/// The buffer is mutably borrowed for the lifetime of the request so it can
/// serve as either a transfer source (write) or destination (read).
#[derive(Debug)]
pub struct Segment<'a> {
    buf: &'a mut [u8],
}

impl<'a> Segment<'a> {
    /// Wraps a caller buffer as a request segment.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    /// Length of this segment in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if this segment is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Read-only view of the segment buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.buf
    }

    /// Mutable view of the segment buffer.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.buf
    }
}

/// One block I/O request, consumed by a single dispatch.
#[derive(Debug)]
pub struct Request<'a> {
    op: RequestOp,
    start: Sector,
    segments: Vec<Segment<'a>>,
}

impl<'a> Request<'a> {
    /// Creates a request from an ordered list of segments.
    pub fn new(op: RequestOp, start: Sector, segments: Vec<Segment<'a>>) -> Self {
        Self { op, start, segments }
    }

    /// The operation this request performs.
    #[must_use]
    pub fn op(&self) -> RequestOp {
        self.op
    }

    /// The sector at which the request begins.
    #[must_use]
    pub fn start(&self) -> Sector {
        self.start
    }

    /// The request's segments, in dispatch order.
    #[must_use]
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// Mutable access to the request's segments, in dispatch order.
    pub fn segments_mut(&mut self) -> &mut [Segment<'a>] {
        &mut self.segments
    }

    /// Total transfer length in bytes across all segments.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.segments.iter().map(|s| s.len() as u64).sum()
    }
}
