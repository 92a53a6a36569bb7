//! Game and solver settings
//!
//! Persisted as JSON. Missing fields fall back to their defaults so older
//! files keep loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Search strategy used by the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Grow the input stream chunk by chunk, trimming back after overshoot
    #[default]
    Growth,
    /// Evolve a population of fixed-length input streams
    Genetic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Growth => "growth",
            Strategy::Genetic => "genetic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "growth" | "grow" => Some(Strategy::Growth),
            "genetic" | "ga" => Some(Strategy::Genetic),
            _ => None,
        }
    }
}

/// Solver tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Records added or removed per growth attempt
    pub chunk_size: usize,
    /// Generated records are 1..=max_delta_frame frames apart
    pub max_delta_frame: u64,
    /// Generated inputs are drawn from 0..input_choices
    pub input_choices: u8,
    pub strategy: Strategy,

    // === Genetic ===
    pub population: usize,
    /// Records per chromosome
    pub chromosome_len: usize,
    /// Per-record mutation probability
    pub mutation_rate: f64,

    /// Fixed solver RNG seed, for reproducible searches
    pub rng_seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            max_delta_frame: 30,
            input_choices: 3,
            strategy: Strategy::Growth,
            population: 16,
            chromosome_len: 60,
            mutation_rate: 0.05,
            rng_seed: None,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Playfield ===
    pub width: f64,
    pub height: f64,

    // === Difficulty ===
    /// Flame spawn probability per spawn frame at the start of a game
    pub difficulty: f64,
    /// Multiplier applied to the difficulty every spawn frame
    pub difficulty_growth: f64,
    /// Spawn check runs every this many frames
    pub spawn_interval: u64,

    // === Debug ===
    /// Enables slow motion while shift is held
    pub debug: bool,
    /// Fixed gameplay seed instead of a random one
    pub random_seed: Option<u64>,
    pub slow_motion_scale: f64,

    /// Show touch instead of keyboard hints on the splash screen
    pub touch_controls: bool,

    /// Headless evaluation gives up after this many frames
    pub headless_frame_limit: u64,

    pub solver: SolverConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: consts::WIDTH,
            height: consts::HEIGHT,

            difficulty: 0.25,
            difficulty_growth: 1.001,
            spawn_interval: 2,

            debug: false,
            random_seed: None,
            slow_motion_scale: 0.5,

            touch_controls: false,

            headless_frame_limit: 1_000_000,

            solver: SolverConfig::default(),
        }
    }
}

impl Settings {
    /// Copy for headless evaluation: no debug features, no seed override
    /// (the replay carries its own seed)
    pub fn headless(&self) -> Self {
        Self {
            debug: false,
            random_seed: None,
            ..self.clone()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }
}
