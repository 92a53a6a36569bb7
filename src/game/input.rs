//! Player input as a small bit-vector
//!
//! This is exactly what replays store, so it must stay compact and stable.

use serde::{Deserialize, Serialize};

/// Bit offsets
pub const LEFT_PRESSED: u8 = 0;
pub const RIGHT_PRESSED: u8 = 1;
/// Right wins when both directions are held
pub const RIGHT_PRIOR: u8 = 2;
/// Marks every input recorded in a game started with shift held. Playback
/// reads it off the first record to spawn the same weakened runner.
pub const WEAK_STARTED: u8 = 3;

/// Horizontal facing/movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBits(pub u8);

impl InputBits {
    pub fn get(self, offset: u8) -> bool {
        self.0 & (1 << offset) != 0
    }

    pub fn set(&mut self, offset: u8, value: bool) {
        self.0 = self.0 & !(1 << offset) | (u8::from(value) << offset);
    }

    /// Direction to move this frame, if any
    pub fn direction(self) -> Option<Direction> {
        let left = self.get(LEFT_PRESSED);
        let right = self.get(RIGHT_PRESSED);
        match (left, right) {
            (true, true) if self.get(RIGHT_PRIOR) => Some(Direction::Right),
            (true, _) => Some(Direction::Left),
            (false, true) => Some(Direction::Right),
            (false, false) => None,
        }
    }
}

/// Phase of a touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    Start,
    Move,
    End,
}

/// Live keyboard/touch state. Handlers return true when the event should
/// start a game from the splash screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct Controls {
    pub bits: InputBits,
    pub shift_pressed: bool,
    /// Shift was toggled (three-finger touch) rather than held
    pub shift_locked: bool,
}

impl Controls {
    pub fn key_left(&mut self, press: bool) -> bool {
        self.bits.set(LEFT_PRESSED, press);
        self.bits.set(RIGHT_PRIOR, false);
        press
    }

    pub fn key_right(&mut self, press: bool) -> bool {
        self.bits.set(RIGHT_PRESSED, press);
        self.bits.set(RIGHT_PRIOR, true);
        press
    }

    pub fn key_shift(&mut self, press: bool, lock: bool) -> bool {
        self.shift_pressed = press;
        self.shift_locked = lock;
        press && lock
    }

    /// Focus lost: nothing stays held
    pub fn blur(&mut self) {
        self.bits = InputBits::default();
        self.shift_pressed = false;
        self.shift_locked = false;
    }

    /// `touches` are x positions as fractions of the viewport width, in
    /// touch order. The last touch decides the direction.
    pub fn touch(&mut self, touches: &[f64], phase: TouchPhase) -> bool {
        if phase == TouchPhase::Start && touches.len() == 3 {
            return self.key_shift(!self.shift_pressed, true);
        }
        let (left, right) = match touches.last() {
            Some(&x) if x < 0.5 => (true, false),
            Some(_) => (false, true),
            None => (false, false),
        };
        let start_left = self.key_left(left);
        let start_right = self.key_right(right);
        start_left || start_right
    }

    pub fn release_locked_shift(&mut self) {
        if self.shift_locked {
            self.shift_pressed = false;
            self.shift_locked = false;
        }
    }
}
