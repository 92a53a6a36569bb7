//! Score records
//!
//! `current` is the running score of the game in progress; `prime` is the
//! best score actually played (replays never count). Where `prime` is kept
//! between sessions is up to the embedder.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Records {
    pub current: u64,
    pub prime: u64,
}

impl Records {
    /// Restore a previously saved personal best
    pub fn with_prime(prime: u64) -> Self {
        Self { current: 0, prime }
    }

    /// One more landed flame
    pub fn up(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn reset_current(&mut self) {
        self.current = 0;
    }

    /// Check if the current score would beat the personal best
    pub fn beats_prime(&self) -> bool {
        self.current > self.prime
    }

    /// Promote the current score to the personal best if it beats it.
    /// Returns true when `prime` changed.
    pub fn commit(&mut self) -> bool {
        if !self.beats_prime() {
            return false;
        }
        self.prime = self.current;
        true
    }
}
