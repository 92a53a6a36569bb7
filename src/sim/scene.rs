//! Entity arena and per-tick scheduler walks
//!
//! Every tick the loop runs, for each node and recursively its children:
//! `simulate` (physics step) then `update` (gameplay hook), and once per tick
//! `predict` (only when time is left over) and `render`.

use std::collections::HashMap;

use super::anim::{AnimSpec, Animator};
use super::context::Context;
use super::entity::{Entity, EntityId};
use super::physics::Body;
use super::render::{RenderSink, RenderView};

/// Gameplay behaviour plugged into the scheduler
pub trait Hooks {
    /// Payload stored on every entity
    type Kind;
    type Error;

    /// Runs once, on the first tick, before any simulation
    fn setup(&mut self, _scene: &mut Scene<Self::Kind>) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Gameplay logic for one entity, after its physics step
    fn update(
        &mut self,
        scene: &mut Scene<Self::Kind>,
        id: EntityId,
        frame: u64,
    ) -> Result<(), Self::Error>;

    /// Adjust and push the view of one entity
    fn render(&mut self, _scene: &Scene<Self::Kind>, view: RenderView, sink: &mut dyn RenderSink) {
        sink.render(&view);
    }
}

/// Arena owning an entity tree plus its shared context and clock
#[derive(Debug)]
pub struct Scene<K> {
    nodes: HashMap<EntityId, Entity<K>>,
    root: EntityId,
    next_id: u64,
    pub ctx: Context,
    /// Render clock in milliseconds
    time: f64,
    /// Simulation frame counter
    frame: u64,
    /// Destroyed this pass, removed from the arena once the walk is over
    graveyard: Vec<EntityId>,
    /// Destroyed entities whose render handles have not been released yet
    released: Vec<EntityId>,
}

impl<K> Scene<K> {
    pub fn new(root_kind: K, ctx: Context) -> Self {
        let root = EntityId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Entity::new(root, None, root, root_kind));
        Self {
            nodes,
            root,
            next_id: 1,
            ctx,
            time: 0.0,
            frame: 0,
            graveyard: Vec::new(),
            released: Vec::new(),
        }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Restart frame numbering (the next step will be frame 1)
    pub fn reset_frame(&mut self) {
        self.frame = 0;
    }

    pub(crate) fn advance_frame(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    pub fn random(&mut self) -> f64 {
        self.ctx.random()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity<K>> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity<K>> {
        self.nodes.get_mut(&id)
    }

    /// True while the entity exists and has not been destroyed
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.nodes.get(&id).is_some_and(|node| !node.destroyed)
    }

    /// Number of entities in the arena, including the root, so never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.nodes
            .get(&id)
            .map(|node| node.children().collect())
            .unwrap_or_default()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create an entity under `parent`, sharing its root and context.
    /// Returns `None` when the parent is gone.
    pub fn spawn(&mut self, parent: EntityId, kind: K, body: Body, anim: Animator) -> Option<EntityId> {
        let root = self.nodes.get(&parent).filter(|p| !p.destroyed)?.root;
        let id = self.allocate_id();
        let mut entity = Entity::new(id, Some(parent), root, kind);
        entity.body = body;
        entity.anim = anim;
        self.nodes.insert(id, entity);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(id);
        }
        Some(id)
    }

    /// Move a live `child` under `parent`, detaching it from its current
    /// parent first. Refused for the root and for moves that would create a
    /// cycle. Returns whether the child was moved.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        if child == self.root || !self.is_alive(parent) || !self.is_alive(child) {
            return false;
        }
        // `parent` must not sit inside the subtree being moved
        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return false;
            }
            ancestor = self.nodes.get(&id).and_then(|node| node.parent);
        }

        self.detach(child);
        let root = self.nodes.get(&parent).map_or(self.root, |node| node.root);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
            node.root = root;
        }
        true
    }

    /// Unregister `child` from `parent`. A detached entity is never walked
    /// again, so it is destroyed along with its subtree.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) {
        let registered = self
            .nodes
            .get(&child)
            .is_some_and(|node| node.parent == Some(parent));
        if registered {
            self.destroy(child);
        }
    }

    /// Drop the link between `id` and its parent
    fn detach(&mut self, id: EntityId) {
        let Some(parent) = self.nodes.get_mut(&id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.remove(&id);
        }
    }

    /// Destroy immediately: detach from the parent and release the render
    /// handle. Calling it again is a no-op.
    pub fn destroy(&mut self, id: EntityId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.destroyed {
            return;
        }
        node.destroyed = true;
        self.detach(id);
        self.graveyard.push(id);
        self.released.push(id);
    }

    /// Destroy on this entity's next update pass
    pub fn destroy_soon(&mut self, id: EntityId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.destroy_soon = true;
        }
    }

    /// Drop destroyed entities and everything below them from the arena
    fn reap(&mut self) {
        while let Some(id) = self.graveyard.pop() {
            let Some(node) = self.nodes.remove(&id) else {
                continue;
            };
            for child in node.children {
                if let Some(orphan) = self.nodes.get_mut(&child) {
                    if !orphan.destroyed {
                        orphan.destroyed = true;
                        self.released.push(child);
                    }
                }
                self.graveyard.push(child);
            }
        }
    }

    /// Render handles to drop since the last call
    pub fn take_released(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.released)
    }

    /// Switch an entity's animation at the current render time
    pub fn set_anim(&mut self, id: EntityId, name: &str) {
        let time = self.time;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.anim.set(name, time);
        }
    }

    /// Re-anchor an entity's animation so `frame` shows now
    pub fn rebase_anim(&mut self, id: EntityId, frame: i64) {
        let time = self.time;
        if let Some(node) = self.nodes.get_mut(&id) {
            node.anim.rebase(frame, time);
        }
    }

    pub fn anim_frame(&self, id: EntityId) -> i64 {
        self.nodes
            .get(&id)
            .map(|node| node.anim.frame(self.time, self.ctx.time_scale()))
            .unwrap_or(0)
    }

    pub fn anim_spec(&self, id: EntityId) -> Option<&'static AnimSpec> {
        self.nodes.get(&id).and_then(|node| node.anim.current())
    }

    pub fn anim_ended(&self, id: EntityId) -> bool {
        self.nodes
            .get(&id)
            .is_none_or(|node| node.anim.ended(self.time, self.ctx.time_scale()))
    }

    /// Physics step for the whole tree
    pub fn simulate_all(&mut self) {
        self.simulate_node(self.root);
    }

    fn simulate_node(&mut self, id: EntityId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.body.simulate();
        node.prediction = None;
        let children: Vec<EntityId> = node.children().collect();
        for child in children {
            self.simulate_node(child);
        }
    }

    /// Gameplay hooks for the whole tree. Entities flagged by
    /// [`destroy_soon`](Self::destroy_soon) are destroyed instead of updated.
    pub fn update_all<H>(&mut self, hooks: &mut H, frame: u64) -> Result<(), H::Error>
    where
        H: Hooks<Kind = K>,
    {
        let result = self.update_node(hooks, self.root, frame);
        self.reap();
        result
    }

    fn update_node<H>(&mut self, hooks: &mut H, id: EntityId, frame: u64) -> Result<(), H::Error>
    where
        H: Hooks<Kind = K>,
    {
        let Some(node) = self.nodes.get(&id) else {
            return Ok(());
        };
        // Already destroyed earlier in this pass
        if node.destroyed {
            return Ok(());
        }
        if node.destroy_soon {
            self.destroy(id);
        } else {
            hooks.update(self, id, frame)?;
        }

        // Children are still visited when the node destroyed itself just now
        let children = self.children(id);
        for child in children {
            self.update_node(hooks, child, frame)?;
        }
        Ok(())
    }

    /// Render-only projection `delta_frame` frames past the last step
    pub fn predict_all(&mut self, delta_frame: f64) {
        self.predict_node(self.root, delta_frame);
    }

    fn predict_node(&mut self, id: EntityId, delta_frame: f64) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.prediction = Some(node.body.predict(delta_frame));
        let children: Vec<EntityId> = node.children().collect();
        for child in children {
            self.predict_node(child, delta_frame);
        }
    }

    /// Push every live entity to `sink`, releasing destroyed ones first
    pub fn render_all<H>(&mut self, hooks: &mut H, sink: &mut dyn RenderSink)
    where
        H: Hooks<Kind = K>,
    {
        for id in self.take_released() {
            sink.release(id);
        }
        self.render_node(hooks, self.root, sink);
    }

    fn render_node<H>(&self, hooks: &mut H, id: EntityId, sink: &mut dyn RenderSink)
    where
        H: Hooks<Kind = K>,
    {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.destroyed {
            return;
        }
        hooks.render(self, self.view(node), sink);
        for child in node.children() {
            self.render_node(hooks, child, sink);
        }
    }

    /// Default view of an entity at the current render time
    pub fn view(&self, node: &Entity<K>) -> RenderView {
        let state = node.visible_state();
        let time_scale = self.ctx.time_scale();
        RenderView {
            id: node.id,
            position: state.position,
            speed: state.speed,
            predicted: node.prediction.is_some(),
            frame_index: node.anim.index(self.time, time_scale),
            texture: node.anim.texture(self.time, time_scale),
            pos: glam::Vec2::new(state.position as f32, 0.0),
            flip_x: false,
            overlay: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::render::CollectSink;

    #[derive(Debug, Clone, PartialEq)]
    enum Node {
        Root,
        /// Destroys itself on its first update
        Suicide,
        /// Requests deferred destruction on its first update
        Fading,
        Plain,
    }

    #[derive(Default)]
    struct Recorder {
        visits: Vec<(EntityId, u64)>,
    }

    impl Hooks for Recorder {
        type Kind = Node;
        type Error = ();

        fn update(&mut self, scene: &mut Scene<Node>, id: EntityId, frame: u64) -> Result<(), ()> {
            self.visits.push((id, frame));
            match scene.get(id).map(|n| n.kind.clone()) {
                Some(Node::Suicide) => scene.destroy(id),
                Some(Node::Fading) => scene.destroy_soon(id),
                _ => {}
            }
            Ok(())
        }
    }

    fn scene() -> Scene<Node> {
        Scene::new(Node::Root, Context::new())
    }

    #[test]
    fn test_ids_increase_and_children_register() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let b = scene.spawn(a, Node::Plain, Body::default(), Animator::none()).unwrap();
        assert!(a < b);
        assert_eq!(scene.children(root), vec![a]);
        assert_eq!(scene.children(a), vec![b]);
        assert_eq!(scene.get(b).unwrap().root, root);
        assert_eq!(scene.get(b).unwrap().parent, Some(a));
    }

    #[test]
    fn test_add_child_moves_node() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let b = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let c = scene.spawn(a, Node::Plain, Body::default(), Animator::none()).unwrap();

        assert!(scene.add_child(b, c));
        assert!(scene.children(a).is_empty());
        assert_eq!(scene.children(b), vec![c]);
        assert_eq!(scene.get(c).unwrap().parent, Some(b));

        let mut hooks = Recorder::default();
        scene.update_all(&mut hooks, 1).unwrap();
        let ids: Vec<EntityId> = hooks.visits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![root, a, b, c]);

        // No cycles, and the root stays where it is
        assert!(!scene.add_child(c, b));
        assert!(!scene.add_child(b, b));
        assert!(!scene.add_child(a, root));
        assert_eq!(scene.children(root), vec![a, b]);
    }

    #[test]
    fn test_remove_child_destroys_subtree() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let d = scene.spawn(a, Node::Plain, Body::default(), Animator::none()).unwrap();

        // Not a child of the root
        scene.remove_child(root, d);
        assert!(scene.is_alive(d));

        scene.remove_child(root, a);
        assert!(!scene.is_alive(a));
        assert!(scene.children(root).is_empty());

        let mut hooks = Recorder::default();
        for frame in 1..=4 {
            scene.update_all(&mut hooks, frame).unwrap();
        }
        assert_eq!(scene.len(), 1);
        assert!(scene.get(d).is_none());
        assert_eq!(scene.take_released(), vec![a, d]);
    }

    #[test]
    fn test_every_node_updated_once_per_pass() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let b = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let c = scene.spawn(a, Node::Plain, Body::default(), Animator::none()).unwrap();

        let mut hooks = Recorder::default();
        scene.update_all(&mut hooks, 7).unwrap();
        let ids: Vec<EntityId> = hooks.visits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![root, a, c, b]);
        assert!(hooks.visits.iter().all(|(_, frame)| *frame == 7));
    }

    #[test]
    fn test_immediate_destroy_is_idempotent() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        scene.destroy(a);
        scene.destroy(a);
        assert!(!scene.is_alive(a));
        assert!(scene.children(root).is_empty());
        assert_eq!(scene.take_released(), vec![a]);
    }

    #[test]
    fn test_self_destroy_still_visits_children() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Suicide, Body::default(), Animator::none()).unwrap();
        let child = scene.spawn(a, Node::Plain, Body::default(), Animator::none()).unwrap();

        let mut hooks = Recorder::default();
        scene.update_all(&mut hooks, 1).unwrap();
        let ids: Vec<EntityId> = hooks.visits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![root, a, child]);

        // Both are gone once the pass is over
        assert!(scene.get(a).is_none());
        assert!(scene.get(child).is_none());
        assert_eq!(scene.len(), 1);

        let mut sink = CollectSink::default();
        scene.render_all(&mut hooks, &mut sink);
        assert!(sink.released.contains(&a));
        assert!(sink.released.contains(&child));
    }

    #[test]
    fn test_deferred_destroy_skips_hook_next_pass() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Fading, Body::default(), Animator::none()).unwrap();

        let mut hooks = Recorder::default();
        scene.update_all(&mut hooks, 1).unwrap();
        assert!(scene.is_alive(a));
        assert!(scene.get(a).unwrap().is_destroy_pending());

        scene.update_all(&mut hooks, 2).unwrap();
        assert!(!scene.is_alive(a));
        // Visited on frame 1 only
        assert_eq!(hooks.visits.iter().filter(|(id, _)| *id == a).count(), 1);
    }

    #[test]
    fn test_predict_is_cleared_by_simulate() {
        let mut scene = scene();
        let root = scene.root();
        let body = Body {
            speed: 2.0,
            ..Default::default()
        };
        let a = scene.spawn(root, Node::Plain, body, Animator::none()).unwrap();

        scene.predict_all(0.5);
        let node = scene.get(a).unwrap();
        assert_eq!(node.visible_state().position, 1.0);
        assert_eq!(node.body.position, 0.0);

        scene.simulate_all();
        let node = scene.get(a).unwrap();
        assert!(node.prediction().is_none());
        assert_eq!(node.visible_state().position, 2.0);
    }

    #[test]
    fn test_render_skips_destroyed() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        let b = scene.spawn(root, Node::Plain, Body::default(), Animator::none()).unwrap();
        scene.destroy(a);

        let mut hooks = Recorder::default();
        let mut sink = CollectSink::default();
        scene.render_all(&mut hooks, &mut sink);
        assert!(sink.find(a).is_none());
        assert!(sink.find(b).is_some());
        assert_eq!(sink.released, vec![a]);
    }
}
