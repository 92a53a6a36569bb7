//! The runner
//!
//! Moves horizontally along the bottom edge. Movement calls are ignored once
//! dead.

use glam::DVec2;

use super::Actor;
use super::hitbox::{Hitbox, Padding};
use super::input::Direction;
use crate::sim::{AnimSpec, Animator, Body, Boundary, EntityId, Scene};

pub const WIDTH: f64 = 48.0;
pub const HEIGHT: f64 = 72.0;
pub const INNER_PADDING: Padding = Padding::new(10.0, 18.0, 50.0, 18.0);
pub const FORCE: f64 = 1.0;
pub const MAX_VELOCITY: f64 = 5.0;

/// Running animation offset that keeps the stride when turning around
const FLIP_FRAME_OFFSET: i64 = 4;
/// A blink decision holds for this many frames
const BLINK_CONTINUANCE: u64 = 4;
const BLINK_CHANCE: f64 = 0.02;

const IDLE: &[&str] = &[
    "player-idle-0",
    "player-idle-1",
    "player-idle-2",
    "player-idle-3",
    "player-idle-4",
    "player-idle-5",
    "player-idle-6",
];
const RUN: &[&str] = &[
    "player-run-0",
    "player-run-1",
    "player-run-2",
    "player-run-3",
    "player-run-4",
    "player-run-5",
    "player-run-6",
    "player-run-7",
];
const DIE: &[&str] = &[
    "player-die-0",
    "player-die-1",
    "player-die-2",
    "player-die-3",
    "player-die-4",
    "player-die-5",
    "player-die-6",
    "player-die-7",
];
const IDLE_EYELIDS: &[&str] = &[
    "player-idle-0-eyelids",
    "player-idle-1-eyelids",
    "player-idle-2-eyelids",
    "player-idle-3-eyelids",
    "player-idle-4-eyelids",
    "player-idle-5-eyelids",
    "player-idle-6-eyelids",
];
const RUN_EYELIDS: &[&str] = &[
    "player-run-0-eyelids",
    "player-run-1-eyelids",
    "player-run-2-eyelids",
    "player-run-3-eyelids",
    "player-run-4-eyelids",
    "player-run-5-eyelids",
    "player-run-6-eyelids",
    "player-run-7-eyelids",
];

pub static ANIMS: &[AnimSpec] = &[
    AnimSpec {
        name: "idle",
        fps: 12.0,
        frames: IDLE,
        once: false,
    },
    AnimSpec {
        name: "run",
        fps: 12.0,
        frames: RUN,
        once: false,
    },
    AnimSpec {
        name: "die",
        fps: 12.0,
        frames: DIE,
        once: true,
    },
];

/// Cosmetic eye blink. Not part of the deterministic state: decisions use
/// the thread RNG, never the seeded one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blink {
    /// Frame the current decision was made
    pub frame: u64,
    /// Eyes closed
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub force: f64,
    pub direction: Direction,
    pub dead: bool,
    pub blink: Blink,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            force: FORCE,
            direction: Direction::Right,
            dead: false,
            blink: Blink::default(),
        }
    }
}

impl Player {
    /// Eyelid overlay for the shown frame, if the eyes are closed
    pub fn eyelids(&self, anim: &str, index: usize) -> Option<&'static str> {
        if !self.blink.active {
            return None;
        }
        match anim {
            "idle" => IDLE_EYELIDS.get(index).copied(),
            "run" => RUN_EYELIDS.get(index).copied(),
            // No eyelids while dying
            _ => None,
        }
    }

    fn update_blink(&mut self, frame: u64) {
        if frame.saturating_sub(self.blink.frame) < BLINK_CONTINUANCE {
            return;
        }
        let was_active = self.blink.active;
        self.blink.frame = frame;
        // Never keep the eyes closed for two decisions in a row
        self.blink.active = !was_active && rand::random::<f64>() < BLINK_CHANCE;
    }
}

/// Add a player centered at the bottom of a `playfield_width` wide field
pub fn spawn(scene: &mut Scene<Actor>, parent: EntityId, playfield_width: f64, force: f64) -> Option<EntityId> {
    let body = Body {
        position: playfield_width / 2.0 - WIDTH / 2.0,
        friction: FORCE,
        max_velocity: Some(MAX_VELOCITY),
        boundary: Boundary::new(0.0, playfield_width - WIDTH),
        ..Default::default()
    };
    let mut anim = Animator::new(ANIMS);
    anim.set("idle", scene.time());
    let player = Player {
        force,
        ..Default::default()
    };
    scene.spawn(parent, Actor::Player(player), body, anim)
}

/// Accelerate towards `direction`
pub fn run(scene: &mut Scene<Actor>, id: EntityId, direction: Direction) {
    let time = scene.time();
    let time_scale = scene.ctx.time_scale();
    let Some(node) = scene.get_mut(id) else {
        return;
    };
    let Actor::Player(player) = &mut node.kind else {
        return;
    };
    if player.dead {
        return;
    }
    node.body.acceleration = direction.sign() * player.force;
    node.body.friction = 0.0;

    match node.anim.name() {
        Some("idle") => node.anim.rebase(0, time),
        Some("run") if direction != player.direction => {
            let flipped = node.anim.frame(time, time_scale) + FLIP_FRAME_OFFSET;
            node.anim.rebase(flipped, time);
        }
        _ => {}
    }
    player.direction = direction;
    node.anim.set("run", time);
}

/// Stop accelerating and let friction slow down
pub fn rest(scene: &mut Scene<Actor>, id: EntityId) {
    let time = scene.time();
    let Some(node) = scene.get_mut(id) else {
        return;
    };
    let Actor::Player(player) = &mut node.kind else {
        return;
    };
    if player.dead {
        return;
    }
    node.body.acceleration = 0.0;
    node.body.friction = player.force;
    node.anim.set("idle", time);
}

pub fn die(scene: &mut Scene<Actor>, id: EntityId) {
    let time = scene.time();
    let Some(node) = scene.get_mut(id) else {
        return;
    };
    let Actor::Player(player) = &mut node.kind else {
        return;
    };
    player.dead = true;
    node.body.speed = 0.0;
    node.body.acceleration = 0.0;
    node.body.friction = 0.0;
    node.anim.set("die", time);
}

/// Per-frame hook: blink, and leave once the death animation is over
pub fn update(scene: &mut Scene<Actor>, id: EntityId, frame: u64) {
    let ended = scene.anim_ended(id);
    let Some(node) = scene.get_mut(id) else {
        return;
    };
    let Actor::Player(player) = &mut node.kind else {
        return;
    };
    player.update_blink(frame);
    if player.dead && ended {
        scene.destroy_soon(id);
    }
}

/// Collision box of a player standing at `position` on a field of `height`
pub fn hitbox(position: f64, playfield_height: f64) -> Hitbox {
    let top = playfield_height - (HEIGHT - INNER_PADDING.top);
    let bottom = playfield_height - INNER_PADDING.bottom;
    let left = position + INNER_PADDING.left;
    let right = left + INNER_PADDING.inner_width(WIDTH);
    Hitbox::new(DVec2::new(left, top), DVec2::new(right, bottom))
}
