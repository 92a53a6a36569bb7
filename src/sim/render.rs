//! Rendering collaborator boundary
//!
//! The simulation pushes one [`RenderView`] per visible entity per tick and
//! never reads anything back. Sprite atlases, canvases and HUDs live behind
//! [`RenderSink`] implementations outside this crate.

use glam::Vec2;
use serde::Serialize;

use super::entity::EntityId;

/// What the renderer needs to draw one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderView {
    pub id: EntityId,
    /// Position along the entity's movement axis
    pub position: f64,
    pub speed: f64,
    /// True when `position`/`speed` come from prediction rather than the last step
    pub predicted: bool,
    /// Frame index into the current animation
    pub frame_index: Option<usize>,
    /// Frame identifier at `frame_index`
    pub texture: Option<&'static str>,
    /// Top-left placement on the playfield
    pub pos: Vec2,
    /// Mirror horizontally
    pub flip_x: bool,
    /// Extra sprite drawn over the entity
    pub overlay: Option<&'static str>,
}

pub trait RenderSink {
    fn render(&mut self, view: &RenderView);

    /// The entity was destroyed; drop whatever was allocated for it
    fn release(&mut self, _id: EntityId) {}
}

/// Sink for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn render(&mut self, _view: &RenderView) {}
}

/// Keeps every view pushed during the last tick (useful for tests and tooling)
#[derive(Debug, Default, Clone)]
pub struct CollectSink {
    pub views: Vec<RenderView>,
    pub released: Vec<EntityId>,
}

impl CollectSink {
    pub fn clear(&mut self) {
        self.views.clear();
        self.released.clear();
    }

    pub fn find(&self, id: EntityId) -> Option<&RenderView> {
        self.views.iter().find(|view| view.id == id)
    }
}

impl RenderSink for CollectSink {
    fn render(&mut self, view: &RenderView) {
        self.views.push(*view);
    }

    fn release(&mut self, id: EntityId) {
        self.released.push(id);
    }
}
