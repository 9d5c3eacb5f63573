//! Companion endpoints to the block device.
//!
//! Small synchronous buffer-copy devices with no dispatch protocol of their
//! own: a bounded [`EchoDevice`] with clear/reverse control operations, a
//! [`DiceRoller`] proc-style text endpoint, and a [`Magic8Ball`] random
//! message endpoint. A harness exercising the whole repository drives these
//! alongside the block device.

pub mod dice;
pub mod echo;
pub mod magic8ball;

pub use dice::DiceRoller;
pub use echo::{Control, EchoDevice, EchoError};
pub use magic8ball::Magic8Ball;

/// The write payload of a count endpoint was not a decimal integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("input is not a decimal count")]
pub struct InvalidCount;

pub(crate) fn parse_count(input: &[u8]) -> Result<u32, InvalidCount> {
    let text = std::str::from_utf8(input).map_err(|_| InvalidCount)?;
    text.trim().parse().map_err(|_| InvalidCount)
}
