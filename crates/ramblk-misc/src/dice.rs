//! Dice-roll text endpoint.
//!
//! Writing a decimal integer sets how many dice to roll; each read returns
//! a fresh roll as a comma-separated list of values in `[1, 6]` followed by
//! a newline.

use std::sync::{Mutex, PoisonError};

use log::debug;
use rand::Rng;

use crate::InvalidCount;

/// Dice rolled per read if no count was ever written.
pub const DEFAULT_DICE_COUNT: u32 = 2;

/// A proc-style endpoint rolling `count` six-sided dice per read.
pub struct DiceRoller {
    count: Mutex<u32>,
}

impl DiceRoller {
    /// Creates a roller with the default count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: Mutex::new(DEFAULT_DICE_COUNT),
        }
    }

    /// Parses a decimal dice count from `input` and stores it.
    ///
    /// Returns the number of bytes consumed. On parse failure the current
    /// count is left unchanged.
    pub fn handle_write(&self, input: &[u8]) -> Result<usize, InvalidCount> {
        let count = crate::parse_count(input)?;
        debug!("dice: count set to {count}");
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) = count;
        Ok(input.len())
    }

    /// Rolls the dice and formats the result.
    ///
    /// A count of zero produces just the trailing newline.
    pub fn handle_read(&self) -> String {
        let count = *self.count.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rng = rand::thread_rng();
        let mut out = String::new();
        for i in 0..count {
            if i > 0 {
                out.push(',');
            }
            let roll: u8 = rng.gen_range(1..=6);
            out.push((b'0' + roll) as char);
        }
        out.push('\n');
        out
    }
}

impl Default for DiceRoller {
    fn default() -> Self {
        Self::new()
    }
}
