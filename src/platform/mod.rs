//! Platform abstraction layer
//!
//! Handles browser/native differences for wall-clock time and seed
//! generation. Nothing in here may feed the deterministic simulation except
//! through a recorded seed.

/// Milliseconds on a monotonic-enough clock, for measuring elapsed time
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// A fresh gameplay seed in the 32-bit range replays have always used
pub fn random_seed() -> u64 {
    u64::from(rand::random::<u32>())
}

/// Elapsed-time helper
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: f64,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self { started_at: now_ms() }
    }

    pub fn elapsed_ms(&self) -> u64 {
        (now_ms() - self.started_at).max(0.0) as u64
    }
}
