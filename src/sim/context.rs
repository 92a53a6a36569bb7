//! Shared context for an entity tree
//!
//! One context lives for as long as the scene's root. It carries the random
//! source override, the debug flag and the time-scale multiplier.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::MIN_TIME_SCALE;

#[derive(Debug, Clone)]
pub struct Context {
    /// Seeded generator; `None` falls back to the thread RNG
    random: Option<Pcg32>,
    /// Number of draws taken from the seeded generator
    draws: u64,
    pub debug: bool,
    time_scale: f64,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            random: None,
            draws: 0,
            debug: false,
            time_scale: 1.0,
        }
    }

    /// Route every gameplay `random()` call through a generator seeded with `seed`
    pub fn seed(&mut self, seed: u64) {
        self.random = Some(Pcg32::seed_from_u64(seed));
        self.draws = 0;
    }

    pub fn is_seeded(&self) -> bool {
        self.random.is_some()
    }

    /// Uniform sample in `[0, 1)` from the gameplay random source
    pub fn random(&mut self) -> f64 {
        match self.random.as_mut() {
            Some(rng) => {
                self.draws += 1;
                rng.random::<f64>()
            }
            None => rand::random::<f64>(),
        }
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Set the time-scale; zero, negative and NaN values clamp to the minimum
    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = if time_scale.is_nan() {
            1.0
        } else {
            time_scale.max(MIN_TIME_SCALE)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_sequence_repeats() {
        let mut a = Context::new();
        let mut b = Context::new();
        a.seed(42);
        b.seed(42);
        let xs: Vec<f64> = (0..16).map(|_| a.random()).collect();
        let ys: Vec<f64> = (0..16).map(|_| b.random()).collect();
        assert_eq!(xs, ys);
        assert_eq!(a.draws(), 16);
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn test_time_scale_guard() {
        let mut ctx = Context::new();
        ctx.set_time_scale(0.0);
        assert_eq!(ctx.time_scale(), MIN_TIME_SCALE);
        ctx.set_time_scale(-2.0);
        assert_eq!(ctx.time_scale(), MIN_TIME_SCALE);
        ctx.set_time_scale(f64::NAN);
        assert_eq!(ctx.time_scale(), 1.0);
        ctx.set_time_scale(0.5);
        assert_eq!(ctx.time_scale(), 0.5);
    }
}
