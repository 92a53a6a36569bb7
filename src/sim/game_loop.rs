//! Fixed timestep game loop
//!
//! Wall-clock ticks are converted into whole simulation steps of
//! `TIME_STEP_MS / time_scale` milliseconds. Leftover time is only used to
//! predict a smooth in-between pose for rendering, so gameplay state depends
//! on the number of steps alone.
//! See also: <https://gafferongames.com/post/fix_your_timestep>

use super::context::Context;
use super::render::RenderSink;
use super::scene::{Hooks, Scene};
use crate::consts::{MAX_STEPS, TIME_STEP_MS};

/// What one call to [`Game::tick`] did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    /// The first tick only runs setup
    pub setup: bool,
    /// Fixed steps simulated
    pub steps: u32,
    /// Catch-up bound was hit and the remaining lag discarded
    pub dropped_lag: bool,
    /// Fraction of a step predicted for rendering
    pub delta_frame: Option<f64>,
}

/// A top-level game: the scene tree, its gameplay hooks and the loop state
pub struct Game<H: Hooks> {
    pub scene: Scene<H::Kind>,
    pub hooks: H,
    first_tick: bool,
    /// Timestamp of the previous tick
    time: Option<f64>,
    /// Unconsumed wall-clock milliseconds
    lag: f64,
    refocused: bool,
}

impl<H: Hooks> Game<H> {
    pub fn new(root_kind: H::Kind, hooks: H, ctx: Context) -> Self {
        Self {
            scene: Scene::new(root_kind, ctx),
            hooks,
            first_tick: true,
            time: None,
            lag: 0.0,
            refocused: false,
        }
    }

    pub fn frame(&self) -> u64 {
        self.scene.frame()
    }

    pub fn lag(&self) -> f64 {
        self.lag
    }

    /// Milliseconds per step at the current time-scale
    pub fn time_step(&self) -> f64 {
        TIME_STEP_MS / self.scene.ctx.time_scale()
    }

    /// Catch-up bound at the current time-scale
    pub fn max_steps(&self) -> f64 {
        MAX_STEPS * self.scene.ctx.time_scale()
    }

    /// The window regained focus: forget the time spent away instead of
    /// catching up on it
    pub fn refocus(&mut self) {
        self.refocused = true;
    }

    /// One iteration of the loop; call it once per animation frame with a
    /// monotonic timestamp in milliseconds.
    pub fn tick(&mut self, now: f64, sink: &mut dyn RenderSink) -> Result<TickStats, H::Error> {
        let mut stats = TickStats::default();

        // Setup runs alone so asset loading can finish before physics starts
        if self.first_tick {
            self.first_tick = false;
            self.scene.set_time(now);
            self.hooks.setup(&mut self.scene)?;
            stats.setup = true;
            return Ok(stats);
        }

        if let Some(prev) = self.time {
            if self.refocused {
                self.lag = 0.0;
            } else {
                self.lag += now - prev;
            }
        }
        self.refocused = false;
        self.time = Some(now);
        self.scene.set_time(now);

        let time_step = self.time_step();
        let max_steps = self.max_steps();

        while self.lag >= time_step {
            let frame = self.scene.advance_frame();
            self.scene.simulate_all();
            self.scene.update_all(&mut self.hooks, frame)?;
            self.lag -= time_step;
            stats.steps += 1;

            if f64::from(stats.steps) >= max_steps {
                if self.lag > 0.0 {
                    log::debug!(
                        "catch-up bound hit after {} steps, dropping {:.1}ms of lag",
                        stats.steps,
                        self.lag
                    );
                }
                self.lag = 0.0;
                stats.dropped_lag = true;
                break;
            }
        }

        // Rendering lags behind simulation time; predict to keep motion smooth
        if self.lag > 0.0 {
            let delta_frame = self.lag / time_step;
            self.scene.predict_all(delta_frame);
            stats.delta_frame = Some(delta_frame);
        }

        self.scene.render_all(&mut self.hooks, sink);
        Ok(stats)
    }
}
