//! SUBLEERUNKER - dodge the falling flames
//!
//! Core modules:
//! - `sim`: Deterministic engine (scene graph, fixed timestep loop, physics, animation)
//! - `game`: SUBLEERUNKER gameplay built on top of `sim`
//! - `replay`: Seeded input recording, playback and the text encoding
//! - `solver`: Headless evaluation and replay search toward a goal score
//! - `platform`: Browser/native platform abstraction

pub mod game;
pub mod platform;
pub mod records;
pub mod replay;
pub mod settings;
pub mod sim;
pub mod solver;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use records::Records;
pub use replay::{DecodeError, DesyncError, Replay};
pub use settings::{Settings, SettingsError, SolverConfig};

/// Game configuration constants
pub mod consts {
    /// Simulation frames per second
    pub const FPS: f64 = 60.0;
    /// Milliseconds per simulation frame at time-scale 1
    pub const TIME_STEP_MS: f64 = 1000.0 / FPS;
    /// Maximum catch-up steps per tick at time-scale 1 (prevents the spiral of death)
    pub const MAX_STEPS: f64 = 6.0;
    /// Smallest accepted time-scale; anything at or below zero is clamped up to this
    pub const MIN_TIME_SCALE: f64 = 0.01;

    /// Playfield dimensions
    pub const WIDTH: f64 = 320.0;
    pub const HEIGHT: f64 = 480.0;
}

/// Clamp `n` into `[min, max]`
#[inline]
pub fn limit(n: f64, min: f64, max: f64) -> f64 {
    min.max(max.min(n))
}
