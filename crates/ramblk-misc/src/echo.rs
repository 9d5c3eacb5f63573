//! Bounded echo buffer with control operations.

use std::sync::{Mutex, PoisonError};

use log::debug;

/// Capacity of the echo buffer in bytes.
pub const ECHO_BUF_LEN: usize = 256;

/// Raw command code for [`Control::Clear`].
pub const CMD_CLEAR: u32 = 0x4501;
/// Raw command code for [`Control::Reverse`].
pub const CMD_REVERSE: u32 = 0x4502;

/// Control operations the echo device accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Discard the stored bytes.
    Clear,
    /// Reverse the stored bytes in place.
    Reverse,
}

/// An echo control request failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EchoError {
    /// The raw command code matches no known operation.
    #[error("unknown echo command {0:#x}")]
    UnknownCommand(u32),
}

#[derive(Debug)]
struct EchoBuf {
    data: [u8; ECHO_BUF_LEN],
    len: usize,
}

/// A character-device-style bounded byte buffer.
///
/// Writes append at the current end and stop at capacity; reads copy out
/// of the stored region at a caller-supplied offset. [`Control`] operations
/// arrive either typed or as raw command codes.
#[derive(Debug)]
pub struct EchoDevice {
    buf: Mutex<EchoBuf>,
}

impl EchoDevice {
    /// Creates an empty device.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Mutex::new(EchoBuf {
                data: [0; ECHO_BUF_LEN],
                len: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EchoBuf> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `input` to the stored bytes.
    ///
    /// Returns how many bytes were accepted, which is less than
    /// `input.len()` once the buffer fills up.
    pub fn write(&self, input: &[u8]) -> usize {
        let mut buf = self.lock();
        let room = ECHO_BUF_LEN - buf.len;
        let accepted = input.len().min(room);
        let start = buf.len;
        buf.data[start..start + accepted].copy_from_slice(&input[..accepted]);
        buf.len += accepted;
        debug!("echo: accepted {accepted} bytes, {} stored", buf.len);
        accepted
    }

    /// Copies stored bytes starting at `offset` into `dst`.
    ///
    /// Returns how many bytes were copied. An offset at or past the stored
    /// length reads nothing.
    pub fn read_at(&self, offset: usize, dst: &mut [u8]) -> usize {
        let buf = self.lock();
        if offset >= buf.len {
            return 0;
        }
        let copied = dst.len().min(buf.len - offset);
        dst[..copied].copy_from_slice(&buf.data[offset..offset + copied]);
        copied
    }

    /// Number of bytes currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len
    }

    /// Whether the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies a typed control operation.
    pub fn control(&self, op: Control) {
        let mut buf = self.lock();
        match op {
            Control::Clear => {
                buf.len = 0;
                debug!("echo: cleared");
            }
            Control::Reverse => {
                let len = buf.len;
                buf.data[..len].reverse();
                debug!("echo: reversed {len} bytes");
            }
        }
    }

    /// Dispatches a raw command code.
    pub fn ioctl(&self, cmd: u32) -> Result<(), EchoError> {
        let op = match cmd {
            CMD_CLEAR => Control::Clear,
            CMD_REVERSE => Control::Reverse,
            other => return Err(EchoError::UnknownCommand(other)),
        };
        self.control(op);
        Ok(())
    }
}

impl Default for EchoDevice {
    fn default() -> Self {
        Self::new()
    }
}
