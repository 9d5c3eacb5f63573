//! Error taxonomy shared by drivers and the host layer.

use thiserror::Error;

/// Per-request dispatch failures.
///
/// These are scoped to the single failing request; device state is
/// unaffected and the device stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IoError {
    /// A segment's projected byte range exceeds device capacity.
    #[error("request range exceeds device capacity")]
    OutOfRange,
    /// The request's operation is not supported by the driver.
    #[error("unsupported request operation")]
    Unsupported,
}

/// Resource-acquisition failures reported by the host block layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The dynamic major range is exhausted.
    #[error("no free device major available")]
    MajorsExhausted,
    /// No free minor index is available.
    #[error("no free minor index available")]
    IndexesExhausted,
    /// A disk with this name is already published.
    #[error("disk name {0:?} is already published")]
    DuplicateName(String),
    /// The tag-set configuration is unusable (zero depth or queue count).
    #[error("invalid tag set configuration")]
    InvalidTagSet,
    /// The queue limits are inconsistent (see `QueueLimits::is_valid`).
    #[error("invalid queue limits")]
    InvalidLimits,
    /// A handle does not name a live host resource.
    #[error("unknown or stale handle")]
    UnknownHandle,
    /// Backing memory could not be allocated.
    #[error("backing memory allocation failed")]
    OutOfMemory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        assert_eq!(
            format!("{}", IoError::OutOfRange),
            "request range exceeds device capacity"
        );
        assert_eq!(
            format!("{}", IoError::Unsupported),
            "unsupported request operation"
        );
    }

    #[test]
    fn host_error_display_includes_name() {
        let err = HostError::DuplicateName(String::from("ramblk"));
        assert_eq!(format!("{err}"), "disk name \"ramblk\" is already published");
    }
}
