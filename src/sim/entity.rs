//! Scene graph nodes
//!
//! Entities live in the [`Scene`](super::Scene) arena and refer to their
//! parent, root and children by [`EntityId`] only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::anim::Animator;
use super::physics::{Body, MotionState};

/// Process-unique entity identifier. Later entities always get larger IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// A node in the entity tree
#[derive(Debug, Clone)]
pub struct Entity<K> {
    pub id: EntityId,
    pub parent: Option<EntityId>,
    pub root: EntityId,
    pub body: Body,
    pub anim: Animator,
    /// Game-specific payload
    pub kind: K,
    /// Ordered by ID so every walk visits children in a stable order
    pub(crate) children: BTreeSet<EntityId>,
    pub(crate) prediction: Option<MotionState>,
    pub(crate) destroyed: bool,
    pub(crate) destroy_soon: bool,
}

impl<K> Entity<K> {
    pub(crate) fn new(id: EntityId, parent: Option<EntityId>, root: EntityId, kind: K) -> Self {
        Self {
            id,
            parent,
            root,
            body: Body::default(),
            anim: Animator::none(),
            kind,
            children: BTreeSet::new(),
            prediction: None,
            destroyed: false,
            destroy_soon: false,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.children.iter().copied()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Destruction has been requested for the next update pass
    pub fn is_destroy_pending(&self) -> bool {
        self.destroy_soon && !self.destroyed
    }

    /// Predicted state if the last tick ended between two steps
    pub fn prediction(&self) -> Option<MotionState> {
        self.prediction
    }

    /// The state to show: the prediction when present, else the authoritative state
    pub fn visible_state(&self) -> MotionState {
        self.prediction.unwrap_or_else(|| self.body.state())
    }
}
