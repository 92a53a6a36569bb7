//! Deterministic simulation engine
//!
//! Everything a replay depends on lives here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (through the shared [`Context`])
//! - Stable iteration order (children are walked by ascending entity ID)
//! - No rendering or platform dependencies beyond the [`RenderSink`] boundary

pub mod anim;
pub mod context;
pub mod entity;
pub mod game_loop;
pub mod physics;
pub mod render;
pub mod scene;

pub use anim::{AnimSpec, Animator};
pub use context::Context;
pub use entity::{Entity, EntityId};
pub use game_loop::{Game, TickStats};
pub use physics::{Body, Boundary, MotionState};
pub use render::{CollectSink, NullSink, RenderSink, RenderView};
pub use scene::{Hooks, Scene};
