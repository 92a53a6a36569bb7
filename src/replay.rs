//! Replay recording, playback and text encoding
//!
//! A replay is the random seed plus a sparse, frame-indexed history of input
//! changes. Seeding the gameplay RNG and feeding the same inputs back on the
//! same frames reproduces a run exactly.
//!
//! Encoding (version 2, all numbers hexadecimal):
//!
//! ```text
//! 2!SEED!DELTA_FRAME1.INPUT1!DELTA_FRAME2.INPUT2!...
//! ```
//!
//! Version 1 is still decoded (decimal, absolute frames):
//!
//! ```text
//! 1;SEED;FRAME1:INPUT1;FRAME2:INPUT2;...
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version written by [`Replay::encode`]
pub const VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty replay")]
    Empty,
    #[error("unsupported replay version {0:?}")]
    UnknownVersion(String),
    #[error("replay has no random seed")]
    MissingSeed,
    #[error("invalid {field} {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("malformed input record {0:?}")]
    MalformedRecord(String),
}

/// Playback was asked for a frame out of sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("replay desync: expected frame {expected}, got {actual}")]
pub struct DesyncError {
    pub expected: u64,
    pub actual: u64,
}

/// One input change relative to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Frames since the previous record (the first is relative to frame 0)
    pub delta_frame: u64,
    /// Input bit-vector active from that frame on
    pub input: u8,
}

/// Playback position
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    base_frame: u64,
    frame: u64,
    last_input: u8,
    consumed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    pub random_seed: u64,
    /// Frame number to the input recorded at that frame; only changes are stored
    pub input_history: BTreeMap<u64, u8>,
    last_recorded_input: u8,
    #[serde(skip)]
    cursor: Cursor,
}

impl PartialEq for Replay {
    fn eq(&self, other: &Self) -> bool {
        self.random_seed == other.random_seed && self.input_history == other.input_history
    }
}

impl Eq for Replay {}

impl Replay {
    pub fn new(random_seed: u64) -> Self {
        Self {
            random_seed,
            input_history: BTreeMap::new(),
            last_recorded_input: 0,
            cursor: Cursor::default(),
        }
    }

    /// Build a replay from a delta-encoded input stream
    pub fn from_records(random_seed: u64, records: &[Record]) -> Self {
        let mut replay = Self::new(random_seed);
        let mut frame = 0;
        for record in records {
            frame += record.delta_frame;
            replay.record_input(frame, record.input);
        }
        replay
    }

    /// The history as a delta-encoded stream, ordered by frame
    pub fn records(&self) -> Vec<Record> {
        let mut prev = 0;
        self.input_history
            .iter()
            .map(|(&frame, &input)| {
                let record = Record {
                    delta_frame: frame - prev,
                    input,
                };
                prev = frame;
                record
            })
            .collect()
    }

    /// Record the input active at `frame`. Only changes are stored, so
    /// holding a key for many frames costs a single entry. Frames must not
    /// go backwards. Returns whether an entry was written.
    pub fn record_input(&mut self, frame: u64, input: u8) -> bool {
        debug_assert!(
            self.input_history
                .last_key_value()
                .is_none_or(|(&last, _)| frame >= last),
            "recorded frames must not go backwards"
        );
        if input == self.last_recorded_input {
            return false;
        }
        self.input_history.insert(frame, input);
        self.last_recorded_input = input;
        true
    }

    pub fn last_recorded_input(&self) -> u8 {
        self.last_recorded_input
    }

    /// Input for the next frame of playback.
    ///
    /// Frames must be requested one by one, starting at `base_frame + 1`
    /// after [`rewind`](Self::rewind). Frames without a record hold the last
    /// input.
    pub fn next_input(&mut self, expected_frame: u64) -> Result<u8, DesyncError> {
        let cursor = &mut self.cursor;
        cursor.frame += 1;
        let actual = cursor.base_frame + cursor.frame;
        if actual != expected_frame {
            return Err(DesyncError {
                expected: expected_frame,
                actual,
            });
        }
        if let Some(&input) = self.input_history.get(&cursor.frame) {
            cursor.last_input = input;
            cursor.consumed += 1;
        }
        Ok(cursor.last_input)
    }

    /// Reset playback so the next [`next_input`](Self::next_input) expects
    /// `base_frame + 1`
    pub fn rewind(&mut self, base_frame: u64) {
        self.cursor = Cursor {
            base_frame,
            ..Cursor::default()
        };
    }

    /// History entries consumed by playback since the last rewind
    pub fn replayed_inputs(&self) -> usize {
        self.cursor.consumed
    }

    /// Copy for outside inspection, with its own fresh playback cursor
    pub fn snapshot(&self) -> Self {
        Self {
            cursor: Cursor::default(),
            ..self.clone()
        }
    }

    pub fn encode(&self) -> String {
        let mut words = Vec::with_capacity(self.input_history.len() + 2);
        words.push(VERSION.to_string());
        words.push(format!("{:x}", self.random_seed));
        for record in self.records() {
            words.push(format!("{:x}.{:x}", record.delta_frame, record.input));
        }
        words.join("!")
    }

    /// Decode any supported version; the version is the leading number
    pub fn decode(encoded: &str) -> Result<Self, DecodeError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(DecodeError::Empty);
        }
        let digits = encoded.bytes().take_while(u8::is_ascii_digit).count();
        let (version, delimiter) = match &encoded[..digits] {
            "2" => (2, '!'),
            "1" => (1, ';'),
            _ => {
                let head = encoded.split(['!', ';']).next().unwrap_or_default();
                return Err(DecodeError::UnknownVersion(head.to_string()));
            }
        };

        let mut words: Vec<&str> = encoded.split(delimiter).collect();
        if words[0].len() != digits {
            return Err(DecodeError::UnknownVersion(words[0].to_string()));
        }
        // Older encoders left a trailing delimiter on empty streams
        if words.len() > 2 && words.last().is_some_and(|w| w.is_empty()) {
            words.pop();
        }
        match words.get(1) {
            Some(seed) if !seed.is_empty() => {}
            _ => return Err(DecodeError::MissingSeed),
        }

        if version == 2 {
            decode_v2(&words[1..])
        } else {
            decode_v1(&words[1..])
        }
    }
}

impl fmt::Display for Replay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Replay {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Digits only; `from_str_radix` alone would also take a leading sign
fn digits(field: &'static str, value: &str, radix: u32) -> Result<(), DecodeError> {
    if !value.is_empty() && value.chars().all(|c| c.is_digit(radix)) {
        Ok(())
    } else {
        Err(DecodeError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }
}

fn parse_number(field: &'static str, value: &str, radix: u32) -> Result<u64, DecodeError> {
    digits(field, value, radix)?;
    u64::from_str_radix(value, radix).map_err(|_| DecodeError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_input(value: &str, radix: u32) -> Result<u8, DecodeError> {
    digits("input", value, radix)?;
    u8::from_str_radix(value, radix).map_err(|_| DecodeError::InvalidNumber {
        field: "input",
        value: value.to_string(),
    })
}

/// `SEED!DELTA.INPUT!...` in hexadecimal
fn decode_v2(words: &[&str]) -> Result<Replay, DecodeError> {
    let seed = parse_number("random seed", words[0], 16)?;
    let mut replay = Replay::new(seed);
    let mut frame = 0u64;
    for word in &words[1..] {
        let (delta, input) = word
            .split_once('.')
            .ok_or_else(|| DecodeError::MalformedRecord(word.to_string()))?;
        let delta = parse_number("delta frame", delta, 16)?;
        let input = parse_input(input, 16)?;
        frame = frame
            .checked_add(delta)
            .ok_or_else(|| DecodeError::MalformedRecord(word.to_string()))?;
        replay.record_input(frame, input);
    }
    Ok(replay)
}

/// `SEED;FRAME:INPUT;...` in decimal with absolute frames
fn decode_v1(words: &[&str]) -> Result<Replay, DecodeError> {
    let seed = parse_number("random seed", words[0], 10)?;
    let mut replay = Replay::new(seed);
    let mut last_frame = 0u64;
    for word in &words[1..] {
        let (frame, input) = word
            .split_once(':')
            .ok_or_else(|| DecodeError::MalformedRecord(word.to_string()))?;
        let frame = parse_number("frame", frame, 10)?;
        let input = parse_input(input, 10)?;
        if frame < last_frame {
            return Err(DecodeError::MalformedRecord(word.to_string()));
        }
        last_frame = frame;
        replay.record_input(frame, input);
    }
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sparse_recording() {
        let mut replay = Replay::new(1);
        for frame in 1..=10 {
            replay.record_input(frame, 1);
        }
        for frame in 11..=20 {
            replay.record_input(frame, 1);
        }
        replay.record_input(21, 0);
        assert_eq!(
            replay.input_history,
            BTreeMap::from([(1, 1), (21, 0)])
        );
    }

    #[test]
    fn test_initial_zero_input_not_recorded() {
        let mut replay = Replay::new(1);
        assert!(!replay.record_input(1, 0));
        assert!(replay.input_history.is_empty());
    }

    #[test]
    fn test_encode_format() {
        let mut replay = Replay::new(255);
        replay.record_input(16, 1);
        replay.record_input(20, 2);
        replay.record_input(46, 6);
        assert_eq!(replay.encode(), "2!ff!10.1!4.2!1a.6");
        assert_eq!(replay.to_string(), replay.encode());
    }

    #[test]
    fn test_decode_v2() {
        let replay = Replay::decode("2!ff!10.1!4.2!1a.6").unwrap();
        assert_eq!(replay.random_seed, 255);
        assert_eq!(
            replay.input_history,
            BTreeMap::from([(16, 1), (20, 2), (46, 6)])
        );
        assert_eq!(replay.last_recorded_input(), 6);
    }

    #[test]
    fn test_decode_v2_without_records() {
        let replay = Replay::decode("2!2a").unwrap();
        assert_eq!(replay.random_seed, 42);
        assert!(replay.input_history.is_empty());

        // Older encoders left a trailing delimiter on empty streams
        let replay: Replay = "2!2a!".parse().unwrap();
        assert_eq!(replay.random_seed, 42);
    }

    #[test]
    fn test_decode_v1() {
        let replay = Replay::decode("1;1234;10:1;25:2;30:0").unwrap();
        assert_eq!(replay.random_seed, 1234);
        assert_eq!(
            replay.input_history,
            BTreeMap::from([(10, 1), (25, 2), (30, 0)])
        );
        // Same history re-encodes as version 2
        assert_eq!(replay.encode(), "2!4d2!a.1!f.2!5.0");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Replay::decode(""), Err(DecodeError::Empty));
        assert!(matches!(
            Replay::decode("3!ff"),
            Err(DecodeError::UnknownVersion(v)) if v == "3"
        ));
        assert!(matches!(
            Replay::decode("abc"),
            Err(DecodeError::UnknownVersion(_))
        ));
        assert!(matches!(
            Replay::decode("2x!ff"),
            Err(DecodeError::UnknownVersion(_))
        ));
        assert_eq!(Replay::decode("2"), Err(DecodeError::MissingSeed));
        assert!(matches!(
            Replay::decode("2!zz"),
            Err(DecodeError::InvalidNumber { field: "random seed", .. })
        ));
        assert!(matches!(
            Replay::decode("2!ff!10"),
            Err(DecodeError::MalformedRecord(_))
        ));
        assert!(matches!(
            Replay::decode("2!ff!g.1"),
            Err(DecodeError::InvalidNumber { field: "delta frame", .. })
        ));
        assert!(matches!(
            Replay::decode("2!ff!1.100"),
            Err(DecodeError::InvalidNumber { field: "input", .. })
        ));
        // Signs are not digits
        assert!(matches!(
            Replay::decode("2!+2a!a.1"),
            Err(DecodeError::InvalidNumber { field: "random seed", .. })
        ));
        assert!(matches!(
            Replay::decode("2!2a!+a.1"),
            Err(DecodeError::InvalidNumber { field: "delta frame", .. })
        ));
        assert!(matches!(
            Replay::decode("2!2a!a.+1"),
            Err(DecodeError::InvalidNumber { field: "input", .. })
        ));
        assert!(matches!(
            Replay::decode("1;+42;3:1"),
            Err(DecodeError::InvalidNumber { field: "random seed", .. })
        ));
        assert!(matches!(
            Replay::decode("1;42;3:+1"),
            Err(DecodeError::InvalidNumber { field: "input", .. })
        ));
        assert!(matches!(
            Replay::decode("1;12;ff:1"),
            Err(DecodeError::InvalidNumber { field: "frame", .. })
        ));
        assert!(matches!(
            Replay::decode("1;12;20:1;10:2"),
            Err(DecodeError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_next_input_holds_last_value() {
        let mut replay = Replay::new(7);
        replay.record_input(2, 1);
        replay.record_input(4, 2);
        replay.rewind(0);

        let inputs: Vec<u8> = (1..=6).map(|f| replay.next_input(f).unwrap()).collect();
        assert_eq!(inputs, vec![0, 1, 1, 2, 2, 2]);
        assert_eq!(replay.replayed_inputs(), 2);
    }

    #[test]
    fn test_next_input_desync() {
        let mut replay = Replay::new(7);
        replay.rewind(0);
        assert_eq!(replay.next_input(1), Ok(0));
        assert_eq!(
            replay.next_input(3),
            Err(DesyncError {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_rewind_with_base_frame() {
        let mut replay = Replay::new(7);
        replay.record_input(1, 2);
        replay.rewind(100);
        assert!(replay.next_input(1).is_err());

        replay.rewind(100);
        assert_eq!(replay.next_input(101), Ok(2));
        assert_eq!(replay.next_input(102), Ok(2));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut replay = Replay::new(7);
        replay.record_input(3, 1);
        replay.rewind(0);
        replay.next_input(1).unwrap();

        let mut copy = replay.snapshot();
        copy.record_input(9, 2);
        assert_eq!(replay.input_history.len(), 1);
        assert_eq!(copy.input_history.len(), 2);
        // Fresh cursor
        assert_eq!(copy.next_input(1), Ok(0));
    }

    #[test]
    fn test_records_round_trip() {
        let records = [
            Record { delta_frame: 5, input: 1 },
            Record { delta_frame: 12, input: 2 },
            Record { delta_frame: 1, input: 0 },
        ];
        let replay = Replay::from_records(9, &records);
        assert_eq!(replay.records(), records);
    }

    #[test]
    fn test_json_round_trip() {
        let replay = Replay::decode("2!ff!10.1!4.2").unwrap();
        let json = serde_json::to_string(&replay).unwrap();
        let back: Replay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, replay);
    }

    fn history() -> impl Strategy<Value = BTreeMap<u64, u8>> {
        prop::collection::vec((1u64..500, 1u8..8), 0..40).prop_map(|steps| {
            let mut history = BTreeMap::new();
            let mut frame = 0;
            let mut last = 0;
            for (delta, input) in steps {
                frame += delta;
                if input != last {
                    history.insert(frame, input);
                    last = input;
                }
            }
            history
        })
    }

    proptest! {
        #[test]
        fn prop_encode_decode_equivalent(seed in any::<u32>(), history in history()) {
            let mut replay = Replay::new(u64::from(seed));
            for (&frame, &input) in &history {
                replay.record_input(frame, input);
            }
            let decoded = Replay::decode(&replay.encode()).unwrap();
            prop_assert_eq!(decoded.random_seed, replay.random_seed);
            prop_assert_eq!(&decoded.input_history, &replay.input_history);
        }
    }
}
