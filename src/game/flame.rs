//! Falling flames
//!
//! A flame drops from above the playfield at a seeded-random x, then either
//! lands (a point for a living player) or hits the player (game over).

use glam::DVec2;

use super::Actor;
use super::hitbox::{Hitbox, Padding};
use super::player;
use crate::sim::{AnimSpec, Animator, Body, Boundary, EntityId, Scene};

pub const WIDTH: f64 = 24.0;
pub const HEIGHT: f64 = 16.0;
pub const INNER_PADDING: Padding = Padding::new(8.0, 8.0, 2.0, 8.0);
/// Lands this far above the bottom edge
pub const LANDING_MARGIN: f64 = 2.0;
pub const ACCELERATION: f64 = 0.1;
pub const MAX_VELOCITY: f64 = 10.0;

const BURN: &[&str] = &[
    "flame-burn-0",
    "flame-burn-1",
    "flame-burn-2",
    "flame-burn-3",
    "flame-burn-4",
    "flame-burn-5",
    "flame-burn-6",
];
const LAND: &[&str] = &["flame-land-0", "flame-land-1", "flame-land-2"];

pub static ANIMS: &[AnimSpec] = &[
    AnimSpec {
        name: "burn",
        fps: 12.0,
        frames: BURN,
        once: false,
    },
    AnimSpec {
        name: "land",
        fps: 24.0,
        frames: LAND,
        once: true,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct Flame {
    /// Fixed horizontal position; the body moves along y
    pub x: f64,
    pub landed: bool,
    /// Frame it was spawned on
    pub spawn_frame: u64,
}

/// What a flame's update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Falling,
    /// Landed earlier, still playing the landing animation
    Settling,
    /// Touched the ground this frame; `scored` when the player was alive
    Landed { scored: bool },
    /// Hit the player and burnt out
    Hit,
    Done,
}

/// Where the player stands, as far as a flame is concerned
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub position: f64,
    pub dead: bool,
}

/// Drop a new flame. Consumes exactly one draw from the seeded RNG.
pub fn spawn(
    scene: &mut Scene<Actor>,
    parent: EntityId,
    playfield: DVec2,
    frame: u64,
) -> Option<EntityId> {
    let x = (playfield.x - WIDTH * 2.0) * scene.random() + WIDTH / 2.0;
    let body = Body {
        position: -HEIGHT,
        acceleration: ACCELERATION,
        max_velocity: Some(MAX_VELOCITY),
        boundary: Boundary::up_to(playfield.y - HEIGHT - LANDING_MARGIN),
        ..Default::default()
    };
    let mut anim = Animator::new(ANIMS);
    anim.set("burn", scene.time());
    let flame = Flame {
        x,
        landed: false,
        spawn_frame: frame,
    };
    scene.spawn(parent, Actor::Flame(flame), body, anim)
}

/// Collision box of a flame at `position`
pub fn hitbox(x: f64, position: f64) -> Hitbox {
    let top = position + INNER_PADDING.top;
    let bottom = position + HEIGHT - INNER_PADDING.bottom;
    let left = x + INNER_PADDING.left;
    let right = left + INNER_PADDING.inner_width(WIDTH);
    Hitbox::new(DVec2::new(left, top), DVec2::new(right, bottom))
}

/// Per-frame hook. Scoring and game over are up to the caller.
pub fn update(scene: &mut Scene<Actor>, id: EntityId, target: Target, playfield_height: f64) -> Outcome {
    let ended = scene.anim_ended(id);
    let time = scene.time();
    let Some(node) = scene.get_mut(id) else {
        return Outcome::Done;
    };
    let Actor::Flame(flame) = &mut node.kind else {
        return Outcome::Done;
    };

    if flame.landed {
        if ended {
            scene.destroy(id);
            return Outcome::Done;
        }
        return Outcome::Settling;
    }

    // Not low enough to reach the player yet
    let position = node.body.position;
    if position < playfield_height - player::HEIGHT {
        return Outcome::Falling;
    }

    if position >= node.body.boundary.max {
        flame.landed = true;
        node.anim.set("land", time);
        return Outcome::Landed { scored: !target.dead };
    }

    let x = flame.x;
    if !target.dead && hitbox(x, position).hits(&player::hitbox(target.position, playfield_height)) {
        scene.destroy(id);
        return Outcome::Hit;
    }
    Outcome::Falling
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Context;

    const FIELD: DVec2 = DVec2::new(320.0, 480.0);

    fn seeded_scene() -> Scene<Actor> {
        let mut ctx = Context::new();
        ctx.seed(7);
        Scene::new(Actor::Stage, ctx)
    }

    fn spawn_at_root(scene: &mut Scene<Actor>, frame: u64) -> EntityId {
        let root = scene.root();
        spawn(scene, root, FIELD, frame).unwrap()
    }

    fn place(scene: &mut Scene<Actor>, id: EntityId, x: f64, position: f64) {
        let node = scene.get_mut(id).unwrap();
        node.body.position = position;
        if let Actor::Flame(flame) = &mut node.kind {
            flame.x = x;
        }
    }

    #[test]
    fn test_spawn_within_playfield() {
        let mut scene = seeded_scene();
        for frame in 0..50 {
            let id = spawn_at_root(&mut scene, frame);
            let node = scene.get(id).unwrap();
            let Actor::Flame(flame) = &node.kind else {
                panic!("not a flame");
            };
            assert!(flame.x >= 12.0 && flame.x <= 284.0);
            assert_eq!(node.body.position, -16.0);
            assert_eq!(node.body.boundary.max, 462.0);
        }
        assert_eq!(scene.ctx.draws(), 50);
    }

    #[test]
    fn test_ignored_above_player() {
        let mut scene = seeded_scene();
        let id = spawn_at_root(&mut scene, 0);
        place(&mut scene, id, 150.0, 400.0);
        let target = Target {
            position: 136.0,
            dead: false,
        };
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Falling);
    }

    #[test]
    fn test_landing_scores_for_living_player() {
        let mut scene = seeded_scene();
        let id = spawn_at_root(&mut scene, 0);
        place(&mut scene, id, 12.0, 462.0);
        let target = Target {
            position: 272.0,
            dead: false,
        };
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Landed { scored: true });
        assert_eq!(scene.get(id).unwrap().anim.name(), Some("land"));

        // Lingers until the landing animation is over
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Settling);
        scene.set_time(200.0);
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Done);
        assert!(!scene.is_alive(id));
    }

    #[test]
    fn test_landing_after_death_scores_nothing() {
        let mut scene = seeded_scene();
        let id = spawn_at_root(&mut scene, 0);
        place(&mut scene, id, 150.0, 462.0);
        let target = Target {
            position: 136.0,
            dead: true,
        };
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Landed { scored: false });
    }

    #[test]
    fn test_hit_destroys_flame() {
        let mut scene = seeded_scene();
        let id = spawn_at_root(&mut scene, 0);
        // Flame box x 154..162, y 418..424 against player box x 154..166, y 418..430
        place(&mut scene, id, 146.0, 410.0);
        let target = Target {
            position: 136.0,
            dead: false,
        };
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Hit);
        assert!(!scene.is_alive(id));
    }

    #[test]
    fn test_dead_player_cannot_be_hit() {
        let mut scene = seeded_scene();
        let id = spawn_at_root(&mut scene, 0);
        place(&mut scene, id, 146.0, 410.0);
        let target = Target {
            position: 136.0,
            dead: true,
        };
        assert_eq!(update(&mut scene, id, target, 480.0), Outcome::Falling);
        assert!(scene.is_alive(id));
    }
}
