//! Replay solver
//!
//! Searches for an input stream whose replay reaches a goal score on a given
//! seed. Every try is scored by a full headless run of the game, so a found
//! replay is exactly as valid as one recorded by hand.
//!
//! [`Solver`] is resumable: call [`Solver::step`] (or iterate) to run one try
//! at a time, which lets callers spread the work over several frames.

pub mod genetic;
pub mod growth;
pub mod stream;

use std::str::FromStr;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_STEPS, TIME_STEP_MS};
use crate::game::{GamePhase, Subleerunker};
use crate::platform::Stopwatch;
use crate::replay::{DecodeError, DesyncError, Record, Replay};
use crate::settings::{Settings, Strategy};
use crate::sim::NullSink;
use genetic::Genetic;
use growth::Growth;
use stream::StreamGenerator;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Desync(#[from] DesyncError),
    #[error("goal type should be \"gte\" or \"eq\", got {0:?}")]
    InvalidGoalType(String),
}

/// Outcome of one headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub score: u64,
    /// Replay records consumed before the game ended
    pub replayed_inputs: usize,
    /// Frame the game ended on
    pub frames: u64,
    /// False when the run hit the frame limit with the runner still alive
    pub completed: bool,
}

/// Play `replay` back without rendering and report the score.
///
/// Runs at time-scale 1 with debug features off. Wall-clock ticks of
/// `TIME_STEP_MS * MAX_STEPS` keep every tick at the catch-up bound.
pub fn determine_score(replay: &Replay, settings: &Settings) -> Result<Evaluation, DesyncError> {
    let mut game = Subleerunker::new(settings.headless()).into_game();
    game.hooks.load_replay(replay.snapshot());

    let dt = TIME_STEP_MS * MAX_STEPS;
    let mut now = 0.0;

    // Setup, time base, then the first steps start playback
    while !game.hooks.is_playing() {
        game.tick(now, &mut NullSink)?;
        now += dt;
    }

    let limit = settings.headless_frame_limit;
    let mut completed = true;
    while game.hooks.phase(&game.scene) == GamePhase::Playing {
        if game.frame() >= limit {
            log::warn!("Headless run stopped at the {limit} frame limit");
            completed = false;
            break;
        }
        game.tick(now, &mut NullSink)?;
        now += dt;
    }

    let frames = if completed {
        game.hooks.last_frame()
    } else {
        game.frame()
    };
    Ok(Evaluation {
        score: game.hooks.records().current,
        replayed_inputs: game.hooks.replay().map_or(0, Replay::replayed_inputs),
        frames,
        completed,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    /// Score at least the goal
    #[default]
    Gte,
    /// Score exactly the goal
    Eq,
}

impl FromStr for GoalType {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gte" => Ok(GoalType::Gte),
            "eq" => Ok(GoalType::Eq),
            _ => Err(SolveError::InvalidGoalType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub score: u64,
    pub kind: GoalType,
}

impl Goal {
    pub fn reached(&self, score: u64) -> bool {
        match self.kind {
            GoalType::Gte => score >= self.score,
            GoalType::Eq => score == self.score,
        }
    }

    /// How far `score` is from reaching the goal (0 when reached)
    pub fn distance(&self, score: u64) -> u64 {
        match self.kind {
            GoalType::Gte => self.score.saturating_sub(score),
            GoalType::Eq => self.score.abs_diff(score),
        }
    }
}

/// Where the search starts
#[derive(Debug, Clone, PartialEq)]
pub enum Start {
    Seed(u64),
    /// Continue from an existing replay's seed and inputs
    Replay(Replay),
}

impl Start {
    /// A decimal number is a seed; anything else must be an encoded replay
    pub fn parse(s: &str) -> Result<Self, SolveError> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            let seed = s.parse().map_err(|_| DecodeError::InvalidNumber {
                field: "random seed",
                value: s.to_string(),
            })?;
            return Ok(Start::Seed(seed));
        }
        Ok(Start::Replay(Replay::decode(s)?))
    }

    pub fn random_seed(&self) -> u64 {
        match self {
            Start::Seed(seed) => *seed,
            Start::Replay(replay) => replay.random_seed,
        }
    }

    pub fn stream(&self) -> Vec<Record> {
        match self {
            Start::Seed(_) => Vec::new(),
            Start::Replay(replay) => replay.records(),
        }
    }
}

/// Scores candidate streams on a fixed seed
#[derive(Debug, Clone)]
pub struct Evaluator {
    random_seed: u64,
    goal: Goal,
    settings: Settings,
}

impl Evaluator {
    pub fn new(random_seed: u64, goal: Goal, settings: Settings) -> Self {
        Self {
            random_seed,
            goal,
            settings,
        }
    }

    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn evaluate(&self, stream: &[Record]) -> Result<Evaluation, DesyncError> {
        determine_score(&stream::to_replay(self.random_seed, stream), &self.settings)
    }
}

/// One evaluated try
#[derive(Debug, Clone)]
pub struct Attempt {
    /// The stream as it should be reported
    pub stream: Vec<Record>,
    pub evaluation: Evaluation,
    /// Change in stream length caused by this try
    pub increased: i64,
}

/// A search strategy; keeps its own state between tries
pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    fn attempt(&mut self, evaluator: &Evaluator, rng: &mut Pcg32) -> Result<Attempt, DesyncError>;
}

/// Progress report, one per try
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub tries_used: u32,
    pub achieved_score: u64,
    pub encoded_replay: String,
    /// Records in the reported replay
    pub inputs: usize,
    pub increased: i64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Running(Report),
    /// Goal reached or tries exhausted; the report is the best found
    Finished(Report),
}

impl Progress {
    pub fn report(&self) -> &Report {
        match self {
            Progress::Running(report) | Progress::Finished(report) => report,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Progress::Finished(_))
    }
}

pub struct Solver {
    evaluator: Evaluator,
    strategy: Box<dyn SearchStrategy>,
    rng: Pcg32,
    max_tries: u32,
    tries: u32,
    stopwatch: Stopwatch,
    best: Option<Report>,
    outcome: Option<Report>,
    finished: bool,
}

impl Solver {
    pub fn new(start: Start, goal: Goal, max_tries: u32, settings: &Settings) -> Self {
        let config = &settings.solver;
        let generator = StreamGenerator::from_config(config);
        let initial = start.stream();
        let strategy: Box<dyn SearchStrategy> = match config.strategy {
            Strategy::Growth => Box::new(Growth::new(initial, config.chunk_size, generator)),
            Strategy::Genetic => Box::new(Genetic::new(
                initial,
                config.population,
                config.chromosome_len,
                config.mutation_rate,
                generator,
            )),
        };
        let rng_seed = config.rng_seed.unwrap_or_else(rand::random);

        log::info!(
            "Solving seed {:x} for score {:?} {} ({} strategy, up to {} tries)",
            start.random_seed(),
            goal.kind,
            goal.score,
            strategy.name(),
            max_tries
        );

        Self {
            evaluator: Evaluator::new(start.random_seed(), goal, settings.headless()),
            strategy,
            rng: Pcg32::seed_from_u64(rng_seed),
            max_tries: max_tries.max(1),
            tries: 0,
            stopwatch: Stopwatch::start(),
            best: None,
            outcome: None,
            finished: false,
        }
    }

    /// Parse a seed or encoded replay and build a solver for it
    pub fn parse(start: &str, goal: Goal, max_tries: u32, settings: &Settings) -> Result<Self, SolveError> {
        Ok(Self::new(Start::parse(start)?, goal, max_tries, settings))
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Best report so far
    pub fn best(&self) -> Option<&Report> {
        self.best.as_ref()
    }

    /// Run one try. After the search has finished this keeps returning the
    /// final report without doing any more work.
    pub fn step(&mut self) -> Result<Progress, SolveError> {
        if let (true, Some(outcome)) = (self.finished, &self.outcome) {
            return Ok(Progress::Finished(outcome.clone()));
        }

        self.tries += 1;
        let attempt = match self.strategy.attempt(&self.evaluator, &mut self.rng) {
            Ok(attempt) => attempt,
            Err(err) => {
                self.finished = true;
                return Err(err.into());
            }
        };

        let goal = *self.evaluator.goal();
        let report = Report {
            tries_used: self.tries,
            achieved_score: attempt.evaluation.score,
            encoded_replay: stream::encode(self.evaluator.random_seed(), &attempt.stream),
            inputs: attempt.stream.len(),
            increased: attempt.increased,
            elapsed_ms: self.stopwatch.elapsed_ms(),
        };
        log::debug!(
            "try {}: score {} with {} inputs ({:+})",
            report.tries_used,
            report.achieved_score,
            report.inputs,
            report.increased
        );

        let improved = self
            .best
            .as_ref()
            .is_none_or(|best| goal.distance(report.achieved_score) < goal.distance(best.achieved_score));
        if improved {
            self.best = Some(report.clone());
        }

        if goal.reached(report.achieved_score) {
            return Ok(Progress::Finished(self.finish(report)));
        }
        if self.tries >= self.max_tries {
            let best = match self.best.clone() {
                Some(best) => Report {
                    tries_used: report.tries_used,
                    elapsed_ms: report.elapsed_ms,
                    ..best
                },
                None => report,
            };
            return Ok(Progress::Finished(self.finish(best)));
        }
        Ok(Progress::Running(report))
    }

    fn finish(&mut self, report: Report) -> Report {
        log::info!(
            "Solver finished after {} tries: score {} ({}ms)",
            report.tries_used,
            report.achieved_score,
            report.elapsed_ms
        );
        self.finished = true;
        self.outcome = Some(report.clone());
        report
    }

    /// Run to completion
    pub fn run(mut self) -> Result<Report, SolveError> {
        loop {
            if let Progress::Finished(report) = self.step()? {
                return Ok(report);
            }
        }
    }
}

impl Iterator for Solver {
    type Item = Result<Progress, SolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        Some(self.step())
    }
}
