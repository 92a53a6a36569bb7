//! Evolutionary search
//!
//! Keeps a small population of input streams. Until the population is full
//! every try evaluates a fresh random stream; after that every try ranks the
//! population, breeds a child from two parents drawn from the top half
//! (single-point crossover plus per-record mutation) and lets it replace the
//! weakest member if it is at least as fit.

use std::cmp::{Ordering, Reverse};

use rand::Rng;
use rand_pcg::Pcg32;

use super::stream::StreamGenerator;
use super::{Attempt, Evaluation, Evaluator, Goal, SearchStrategy};
use crate::replay::{DesyncError, Record};

#[derive(Debug, Clone)]
struct Individual {
    stream: Vec<Record>,
    evaluation: Evaluation,
}

pub struct Genetic {
    population: Vec<Individual>,
    size: usize,
    chromosome_len: usize,
    mutation_rate: f64,
    generator: StreamGenerator,
    /// Stream to start the population from
    seed_stream: Option<Vec<Record>>,
}

/// Closer to the goal first, then longer survival
fn fitness(goal: &Goal, evaluation: &Evaluation) -> (Reverse<u64>, u64) {
    (Reverse(goal.distance(evaluation.score)), evaluation.frames)
}

fn compare(goal: &Goal, a: &Evaluation, b: &Evaluation) -> Ordering {
    fitness(goal, a).cmp(&fitness(goal, b))
}

impl Genetic {
    pub fn new(
        seed_stream: Vec<Record>,
        size: usize,
        chromosome_len: usize,
        mutation_rate: f64,
        generator: StreamGenerator,
    ) -> Self {
        Self {
            population: Vec::new(),
            size: size.max(2),
            chromosome_len: chromosome_len.max(1),
            mutation_rate: mutation_rate.clamp(0.0, 1.0),
            generator,
            seed_stream: (!seed_stream.is_empty()).then_some(seed_stream),
        }
    }

    pub fn population_len(&self) -> usize {
        self.population.len()
    }

    /// Two parents drawn from the better half of the population, ranked
    /// by fitness. Equal fitness keeps insertion order.
    fn parents(&self, goal: &Goal, rng: &mut Pcg32) -> (&Individual, &Individual) {
        let mut ranked: Vec<&Individual> = self.population.iter().collect();
        ranked.sort_by(|a, b| compare(goal, &b.evaluation, &a.evaluation));
        let elite = (ranked.len() / 2).max(1);
        let mother = ranked[rng.random_range(0..elite)];
        let father = ranked[rng.random_range(0..elite)];
        (mother, father)
    }

    fn breed(&self, goal: &Goal, rng: &mut Pcg32) -> Vec<Record> {
        let (mother, father) = self.parents(goal, rng);
        let (mother, father) = (&mother.stream, &father.stream);

        let shortest = mother.len().min(father.len());
        let mut child = if shortest >= 2 {
            let point = rng.random_range(1..shortest);
            let mut child = mother[..point].to_vec();
            child.extend_from_slice(&father[point..]);
            child
        } else {
            mother.clone()
        };

        let mut prev_input = 0;
        for record in child.iter_mut() {
            if rng.random_bool(self.mutation_rate) {
                *record = self.generator.record(prev_input, rng);
            }
            prev_input = record.input;
        }
        // Crossover and mutation can both leave an input repeated
        self.generator.repair(&mut child, rng);
        child
    }

    fn fresh(&mut self, rng: &mut Pcg32) -> Vec<Record> {
        match self.seed_stream.take() {
            Some(mut stream) => {
                if stream.len() < self.chromosome_len {
                    let missing = self.chromosome_len - stream.len();
                    self.generator.extend(&mut stream, missing, rng);
                }
                self.generator.repair(&mut stream, rng);
                stream
            }
            None => self.generator.generate(self.chromosome_len, rng),
        }
    }

    fn insert(&mut self, goal: &Goal, individual: Individual) {
        if self.population.len() < self.size {
            self.population.push(individual);
            return;
        }
        let weakest = self
            .population
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| compare(goal, &a.evaluation, &b.evaluation))
            .map(|(index, _)| index);
        if let Some(index) = weakest {
            if compare(goal, &individual.evaluation, &self.population[index].evaluation) != Ordering::Less {
                self.population[index] = individual;
            }
        }
    }
}

impl SearchStrategy for Genetic {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn attempt(&mut self, evaluator: &Evaluator, rng: &mut Pcg32) -> Result<Attempt, DesyncError> {
        let goal = *evaluator.goal();
        let stream = if self.population.len() < self.size {
            self.fresh(rng)
        } else {
            self.breed(&goal, rng)
        };
        let evaluation = evaluator.evaluate(&stream)?;

        // Only what was played goes into the report
        let played = stream[..evaluation.replayed_inputs.min(stream.len())].to_vec();
        self.insert(&goal, Individual { stream, evaluation });

        Ok(Attempt {
            stream: played,
            evaluation,
            increased: 0,
        })
    }
}
