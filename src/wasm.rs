//! JavaScript bindings
//!
//! Everything crosses the boundary as plain numbers or JSON strings so the
//! page needs no generated type glue beyond wasm-bindgen's own.

use serde_json::json;
use wasm_bindgen::prelude::*;

use crate::game::input::TouchPhase;
use crate::game::{GameEvent, Subleerunker};
use crate::replay::Replay;
use crate::settings::Settings;
use crate::sim::{CollectSink, Game};
use crate::solver::{self, Goal, GoalType, Progress, Solver};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    // A second init (hot reload) is harmless
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("SUBLEERUNKER core loaded");
}

/// Headless score of an encoded replay
#[wasm_bindgen(js_name = determineScore)]
pub fn determine_score(encoded: &str) -> Result<f64, JsError> {
    let replay = Replay::decode(encoded)?;
    let evaluation = solver::determine_score(&replay, &Settings::default())?;
    Ok(evaluation.score as f64)
}

/// Re-encode any supported replay version as the current one
#[wasm_bindgen(js_name = normalizeReplay)]
pub fn normalize_replay(encoded: &str) -> Result<String, JsError> {
    Ok(Replay::decode(encoded)?.encode())
}

/// Stepwise solver; call `next()` from a timer until it reports `done`
#[wasm_bindgen]
pub struct WasmSolver {
    inner: Solver,
}

#[wasm_bindgen]
impl WasmSolver {
    #[wasm_bindgen(constructor)]
    pub fn new(start: &str, goal: f64, goal_type: &str, max_tries: u32) -> Result<WasmSolver, JsError> {
        let kind = if goal_type.is_empty() {
            GoalType::default()
        } else {
            goal_type.parse()?
        };
        let goal = Goal {
            score: goal.max(0.0) as u64,
            kind,
        };
        let inner = Solver::parse(start, goal, max_tries, &Settings::default())?;
        Ok(Self { inner })
    }

    /// `{"done": bool, "report": {...}}`
    pub fn next(&mut self) -> Result<String, JsError> {
        let progress = self.inner.step()?;
        let value = json!({
            "done": matches!(progress, Progress::Finished(_)),
            "report": progress.report(),
        });
        Ok(value.to_string())
    }
}

/// A live game driven by `requestAnimationFrame`
#[wasm_bindgen]
pub struct WasmGame {
    game: Game<Subleerunker>,
    sink: CollectSink,
}

#[wasm_bindgen]
impl WasmGame {
    #[wasm_bindgen(constructor)]
    pub fn new(random_seed: Option<f64>, touch_controls: bool) -> WasmGame {
        let settings = Settings {
            random_seed: random_seed.map(|seed| seed.max(0.0) as u64),
            touch_controls,
            ..Default::default()
        };
        Self {
            game: Subleerunker::new(settings).into_game(),
            sink: CollectSink::default(),
        }
    }

    /// Advance to `now` (ms) and return this frame's sprites, released
    /// sprites and game events as JSON
    pub fn tick(&mut self, now: f64) -> Result<String, JsError> {
        self.sink.clear();
        self.game.tick(now, &mut self.sink)?;

        let events: Vec<serde_json::Value> = self
            .game
            .hooks
            .drain_events()
            .into_iter()
            .map(|event| match event {
                GameEvent::Started { seed, replaying } => {
                    json!({"type": "started", "seed": seed, "replaying": replaying})
                }
                GameEvent::Scored { score } => json!({"type": "scored", "score": score}),
                GameEvent::GameOver {
                    score,
                    frames,
                    duration_ms,
                    replay,
                    replaying,
                } => json!({
                    "type": "gameOver",
                    "score": score,
                    "frames": frames,
                    "durationMs": duration_ms,
                    "replay": replay.encode(),
                    "replaying": replaying,
                }),
                GameEvent::Reset => json!({"type": "reset"}),
            })
            .collect();

        let value = json!({
            "views": self.sink.views,
            "released": self.sink.released,
            "events": events,
        });
        Ok(value.to_string())
    }

    #[wasm_bindgen(js_name = keyLeft)]
    pub fn key_left(&mut self, press: bool) {
        self.game.hooks.key_left(press);
    }

    #[wasm_bindgen(js_name = keyRight)]
    pub fn key_right(&mut self, press: bool) {
        self.game.hooks.key_right(press);
    }

    #[wasm_bindgen(js_name = keyShift)]
    pub fn key_shift(&mut self, press: bool, lock: bool) {
        self.game.hooks.key_shift(press, lock);
    }

    /// `xs` are touch x positions divided by the viewport width
    pub fn touch(&mut self, xs: Vec<f64>, phase: &str) {
        let phase = match phase {
            "start" => TouchPhase::Start,
            "move" => TouchPhase::Move,
            _ => TouchPhase::End,
        };
        self.game.hooks.touch(&xs, phase);
    }

    pub fn blur(&mut self) {
        self.game.hooks.blur();
    }

    /// The page became visible again
    pub fn refocus(&mut self) {
        self.game.refocus();
    }

    #[wasm_bindgen(js_name = loadReplay)]
    pub fn load_replay(&mut self, encoded: &str) -> Result<(), JsError> {
        let replay = Replay::decode(encoded)?;
        self.game.hooks.load_replay(replay);
        Ok(())
    }

    pub fn score(&self) -> f64 {
        self.game.hooks.records().current as f64
    }

    pub fn prime(&self) -> f64 {
        self.game.hooks.records().prime as f64
    }

    /// Restore a personal best kept by the page
    #[wasm_bindgen(js_name = setPrime)]
    pub fn set_prime(&mut self, prime: f64) {
        self.game.hooks.records_mut().prime = prime.max(0.0) as u64;
    }
}
