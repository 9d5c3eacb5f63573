//! Magic 8-ball text endpoint.
//!
//! Each read returns a number of randomly chosen answers from the classic
//! 20-entry table, each followed by a single space. Writing a decimal
//! integer sets how many answers a read returns.

use std::sync::{Mutex, PoisonError};

use log::debug;
use rand::Rng;

use crate::InvalidCount;

/// Answers returned per read if no count was ever written.
pub const DEFAULT_ANSWER_COUNT: u32 = 2;

/// The classic answer table.
pub const MESSAGES: [&str; 20] = [
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes. definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

/// A proc-style endpoint answering with random table entries.
pub struct Magic8Ball {
    count: Mutex<u32>,
}

impl Magic8Ball {
    /// Creates an endpoint with the default answer count.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: Mutex::new(DEFAULT_ANSWER_COUNT),
        }
    }

    /// Parses a decimal answer count from `input` and stores it.
    pub fn handle_write(&self, input: &[u8]) -> Result<usize, InvalidCount> {
        let count = crate::parse_count(input)?;
        debug!("magic8ball: count set to {count}");
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) = count;
        Ok(input.len())
    }

    /// Picks `count` random answers, each followed by one space.
    pub fn handle_read(&self) -> String {
        let count = *self.count.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rng = rand::thread_rng();
        let mut out = String::new();
        for _ in 0..count {
            out.push_str(MESSAGES[rng.gen_range(0..MESSAGES.len())]);
            out.push(' ');
        }
        out
    }
}

impl Default for Magic8Ball {
    fn default() -> Self {
        Self::new()
    }
}
