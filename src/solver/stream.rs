//! Input-record streams
//!
//! The solver searches over delta-encoded input streams. A stream maps to a
//! replay one to one as long as no record repeats the input before it, which
//! everything generated here guarantees.

use rand::Rng;

use crate::replay::{Record, Replay};
use crate::settings::SolverConfig;

/// Random record generator
#[derive(Debug, Clone, Copy)]
pub struct StreamGenerator {
    /// Records are 1..=max_delta_frame frames apart
    max_delta_frame: u64,
    /// Inputs are drawn from 0..input_choices
    input_choices: u8,
}

impl Default for StreamGenerator {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl StreamGenerator {
    pub fn new(max_delta_frame: u64, input_choices: u8) -> Self {
        Self {
            max_delta_frame: max_delta_frame.max(1),
            // With a single choice no input could ever differ from the last
            input_choices: input_choices.max(2),
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.max_delta_frame, config.input_choices)
    }

    pub fn max_delta_frame(&self) -> u64 {
        self.max_delta_frame
    }

    pub fn input_choices(&self) -> u8 {
        self.input_choices
    }

    /// An input different from `prev_input`
    pub fn input<R: Rng + ?Sized>(&self, prev_input: u8, rng: &mut R) -> u8 {
        loop {
            let input = rng.random_range(0..self.input_choices);
            if input != prev_input {
                return input;
            }
        }
    }

    pub fn record<R: Rng + ?Sized>(&self, prev_input: u8, rng: &mut R) -> Record {
        Record {
            delta_frame: 1 + rng.random_range(0..self.max_delta_frame),
            input: self.input(prev_input, rng),
        }
    }

    /// Append `count` records continuing from the end of `stream`
    pub fn extend<R: Rng + ?Sized>(&self, stream: &mut Vec<Record>, count: usize, rng: &mut R) {
        let mut prev_input = last_input(stream);
        stream.reserve(count);
        for _ in 0..count {
            let record = self.record(prev_input, rng);
            prev_input = record.input;
            stream.push(record);
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Record> {
        let mut stream = Vec::with_capacity(count);
        self.extend(&mut stream, count, rng);
        stream
    }

    /// Redraw every input that repeats the one before it
    pub fn repair<R: Rng + ?Sized>(&self, stream: &mut [Record], rng: &mut R) {
        let mut prev_input = 0;
        for record in stream.iter_mut() {
            if record.input == prev_input {
                record.input = self.input(prev_input, rng);
            }
            record.delta_frame = record.delta_frame.max(1);
            prev_input = record.input;
        }
    }
}

/// Input in effect after the whole stream (0 for an empty stream)
pub fn last_input(stream: &[Record]) -> u8 {
    stream.last().map_or(0, |record| record.input)
}

pub fn to_replay(random_seed: u64, stream: &[Record]) -> Replay {
    Replay::from_records(random_seed, stream)
}

pub fn encode(random_seed: u64, stream: &[Record]) -> String {
    to_replay(random_seed, stream).encode()
}
