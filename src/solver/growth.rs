//! Grow-and-trim search
//!
//! While under the goal, append a chunk of random records and keep the part
//! that was actually played before the runner died. Once at or over the goal
//! (only relevant for exact goals), cut a chunk off the tail. A try that
//! leaves the stream as it was drops the last record so the search never
//! stands still.

use rand_pcg::Pcg32;

use super::stream::StreamGenerator;
use super::{Attempt, Evaluator, SearchStrategy};
use crate::replay::{DesyncError, Record};

pub struct Growth {
    stream: Vec<Record>,
    score: u64,
    chunk_size: usize,
    generator: StreamGenerator,
}

impl Growth {
    pub fn new(stream: Vec<Record>, chunk_size: usize, generator: StreamGenerator) -> Self {
        Self {
            stream,
            score: 0,
            chunk_size: chunk_size.max(1),
            generator,
        }
    }

    pub fn stream(&self) -> &[Record] {
        &self.stream
    }
}

impl SearchStrategy for Growth {
    fn name(&self) -> &'static str {
        "growth"
    }

    fn attempt(&mut self, evaluator: &Evaluator, rng: &mut Pcg32) -> Result<Attempt, DesyncError> {
        let goal = evaluator.goal().score;
        let before = self.stream.len();

        let evaluation = if self.score < goal {
            self.generator.extend(&mut self.stream, self.chunk_size, rng);
            let evaluation = evaluator.evaluate(&self.stream)?;
            // Records after the death were never played
            self.stream.truncate(evaluation.replayed_inputs);
            evaluation
        } else {
            let keep = self.stream.len().saturating_sub(self.chunk_size);
            self.stream.truncate(keep);
            evaluator.evaluate(&self.stream)?
        };
        self.score = evaluation.score;

        let attempt = Attempt {
            stream: self.stream.clone(),
            evaluation,
            increased: self.stream.len() as i64 - before as i64,
        };

        if self.score < goal && self.stream.len() == before {
            self.stream.pop();
        }
        Ok(attempt)
    }
}
