//! SUBLEERUNKER gameplay
//!
//! Dodge the falling flames. Every flame that lands while the runner is
//! alive scores a point; the first one that touches the runner ends the game.
//!
//! [`Subleerunker`] plugs into the generic loop through [`Hooks`]. The root
//! entity is the stage; the runner, flames and splash sprites are its
//! children.

pub mod flame;
pub mod hitbox;
pub mod input;
pub mod player;

use glam::{DVec2, Vec2};

use crate::platform;
use crate::records::Records;
use crate::replay::{DesyncError, Replay};
use crate::settings::Settings;
use crate::sim::{AnimSpec, Animator, Body, Context, EntityId, Game, Hooks, RenderSink, RenderView, Scene};
use flame::{Flame, Outcome, Target};
use input::{Controls, Direction, InputBits, TouchPhase, WEAK_STARTED};
use player::Player;

/// Force multiplier when shift is held at the start of a game
pub const WEAK_START: f64 = 0.25;

const LOGO_SIZE: Vec2 = Vec2::new(148.0, 66.0);
const LOGO_TOP: f32 = 156.0;
const KEY_CONTROL_SIZE: Vec2 = Vec2::new(65.0, 14.0);
const TOUCH_CONTROL_SIZE: Vec2 = Vec2::new(33.0, 35.0);
/// Control hint sits this far above the bottom edge
const CONTROL_BOTTOM: f32 = 30.0;

static LOGO_ANIMS: &[AnimSpec] = &[AnimSpec {
    name: "default",
    fps: 0.0,
    frames: &["logo"],
    once: false,
}];
static KEY_CONTROL_ANIMS: &[AnimSpec] = &[AnimSpec {
    name: "blink",
    fps: 1.0,
    frames: &["key-0", "key-1"],
    once: false,
}];
static TOUCH_CONTROL_ANIMS: &[AnimSpec] = &[AnimSpec {
    name: "blink",
    fps: 1.0,
    frames: &["touch-0", "touch-1"],
    once: false,
}];

/// Entity payloads
#[derive(Debug, Clone)]
pub enum Actor {
    /// The playfield itself (root)
    Stage,
    Logo,
    /// Control hint on the splash screen
    Control,
    Player(Player),
    Flame(Flame),
}

/// Coarse game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for input on the splash screen
    Splash,
    Playing,
    /// The runner died; waiting for the remaining sprites to finish
    GameOver,
}

/// Things outside the simulation may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Started {
        seed: u64,
        replaying: bool,
    },
    Scored {
        score: u64,
    },
    GameOver {
        score: u64,
        /// Frame the runner died on
        frames: u64,
        duration_ms: f64,
        /// Independent copy of the game's replay
        replay: Replay,
        replaying: bool,
    },
    /// Back on the splash screen
    Reset,
}

pub struct Subleerunker {
    settings: Settings,
    controls: Controls,
    should_play: bool,
    difficulty: f64,
    player: Option<EntityId>,
    splash: Vec<EntityId>,
    records: Records,
    replay: Option<Replay>,
    replaying: bool,
    /// The current game started with a weakened runner
    weak_start: bool,
    started_at: f64,
    /// Frame of the most recent game over
    last_frame: u64,
    events: Vec<GameEvent>,
}

impl Subleerunker {
    pub fn new(settings: Settings) -> Self {
        let difficulty = settings.difficulty;
        Self {
            settings,
            controls: Controls::default(),
            should_play: false,
            difficulty,
            player: None,
            splash: Vec::new(),
            records: Records::default(),
            replay: None,
            replaying: false,
            weak_start: false,
            started_at: 0.0,
            last_frame: 0,
            events: Vec::new(),
        }
    }

    /// A ready-to-tick game with this gameplay
    pub fn into_game(self) -> Game<Self> {
        let mut ctx = Context::new();
        ctx.debug = self.settings.debug;
        Game::new(Actor::Stage, self, ctx)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Records {
        &mut self.records
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Replay of the current or last game
    pub fn replay(&self) -> Option<&Replay> {
        self.replay.as_ref()
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_some()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn last_frame(&self) -> u64 {
        self.last_frame
    }

    pub fn phase(&self, scene: &Scene<Actor>) -> GamePhase {
        match self.player {
            None => GamePhase::Splash,
            Some(_) if self.player_target(scene).dead => GamePhase::GameOver,
            Some(_) => GamePhase::Playing,
        }
    }

    /// Events since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Input handlers ===

    pub fn key_left(&mut self, press: bool) {
        let start = self.controls.key_left(press);
        self.request_play(start);
    }

    pub fn key_right(&mut self, press: bool) {
        let start = self.controls.key_right(press);
        self.request_play(start);
    }

    pub fn key_shift(&mut self, press: bool, lock: bool) {
        let start = self.controls.key_shift(press, lock);
        self.request_play(start);
    }

    pub fn blur(&mut self) {
        self.controls.blur();
    }

    pub fn touch(&mut self, touches: &[f64], phase: TouchPhase) {
        let start = self.controls.touch(touches, phase);
        self.request_play(start);
    }

    fn request_play(&mut self, start: bool) {
        if start && !self.is_playing() {
            self.should_play = true;
        }
    }

    /// Play `replay` back as soon as the splash screen is up
    pub fn load_replay(&mut self, replay: Replay) {
        self.replay = Some(replay);
        self.replaying = true;
        self.should_play = true;
    }

    // === Gameplay ===

    /// Back to the splash screen
    fn reset(&mut self, scene: &mut Scene<Actor>) {
        self.controls.bits = InputBits::default();
        self.controls.release_locked_shift();
        self.show_splash(scene);
        self.difficulty = self.settings.difficulty;
        self.events.push(GameEvent::Reset);
    }

    fn show_splash(&mut self, scene: &mut Scene<Actor>) {
        let root = scene.root();
        let time = scene.time();
        let control_anims = if self.settings.touch_controls {
            TOUCH_CONTROL_ANIMS
        } else {
            KEY_CONTROL_ANIMS
        };
        let sprites = [
            (Actor::Logo, LOGO_ANIMS, "default"),
            (Actor::Control, control_anims, "blink"),
        ];
        for (actor, anims, anim_name) in sprites {
            let mut anim = Animator::new(anims);
            anim.set(anim_name, time);
            if let Some(id) = scene.spawn(root, actor, Body::default(), anim) {
                self.splash.push(id);
            }
        }
    }

    fn hide_splash(&mut self, scene: &mut Scene<Actor>) {
        for id in self.splash.drain(..) {
            scene.destroy(id);
        }
    }

    fn start_gameplay(&mut self, scene: &mut Scene<Actor>) {
        // The spawner depends on frame numbers
        scene.reset_frame();

        let replayed = if self.replaying {
            self.replay.as_mut().map(|replay| {
                replay.rewind(0);
                let weak = replay
                    .input_history
                    .values()
                    .next()
                    .is_some_and(|&input| InputBits(input).get(WEAK_STARTED));
                (replay.random_seed, weak)
            })
        } else {
            None
        };
        let (seed, weak_start) = match replayed {
            Some(started) => started,
            None => {
                self.replaying = false;
                let seed = self.settings.random_seed.unwrap_or_else(platform::random_seed);
                self.replay = Some(Replay::new(seed));
                (seed, self.controls.shift_pressed)
            }
        };
        if self.controls.shift_pressed {
            self.controls.release_locked_shift();
        }
        self.weak_start = weak_start;

        let force = if weak_start {
            player::FORCE * WEAK_START
        } else {
            player::FORCE
        };
        let root = scene.root();
        self.player = player::spawn(scene, root, self.settings.width, force);

        self.records.reset_current();
        self.hide_splash(scene);
        self.started_at = scene.time();
        scene.ctx.seed(seed);

        log::info!(
            "Gameplay started (seed {seed:x}, replaying: {}, weak: {weak_start})",
            self.replaying
        );
        self.events.push(GameEvent::Started {
            seed,
            replaying: self.replaying,
        });
    }

    fn update_stage(&mut self, scene: &mut Scene<Actor>, frame: u64) -> Result<(), DesyncError> {
        let slow_motion = self.settings.debug && self.controls.shift_pressed;
        scene.ctx.set_time_scale(if slow_motion {
            self.settings.slow_motion_scale
        } else {
            1.0
        });

        if !self.is_playing() {
            if self.should_play {
                self.start_gameplay(scene);
                self.should_play = false;
            }
            return Ok(());
        }
        self.update_gameplay(scene, frame)
    }

    fn update_gameplay(&mut self, scene: &mut Scene<Actor>, frame: u64) -> Result<(), DesyncError> {
        let Some(player_id) = self.player else {
            return Ok(());
        };
        let root = scene.root();

        // Wait for every sprite to finish once the runner is dead
        if self.player_target(scene).dead {
            let done = scene.get(root).is_none_or(|stage| !stage.has_children());
            if done {
                self.player = None;
                self.replaying = false;
                self.reset(scene);
            }
            return Ok(());
        }

        if frame % self.settings.spawn_interval.max(1) == 0 {
            if scene.random() < self.difficulty {
                let playfield = DVec2::new(self.settings.width, self.settings.height);
                flame::spawn(scene, root, playfield, frame);
            }
            self.difficulty *= self.settings.difficulty_growth;
        }

        let mut bits = match self.replay.as_mut() {
            Some(replay) if self.replaying => InputBits(replay.next_input(frame)?),
            Some(replay) => {
                let mut recorded = self.controls.bits;
                recorded.set(WEAK_STARTED, self.weak_start);
                replay.record_input(frame, recorded.0);
                self.controls.bits
            }
            None => self.controls.bits,
        };
        bits.set(WEAK_STARTED, false);
        self.controls.bits = bits;

        match bits.direction() {
            Some(direction) => player::run(scene, player_id, direction),
            None => player::rest(scene, player_id),
        }
        Ok(())
    }

    /// The runner as flames see it. A runner that is gone counts as dead.
    fn player_target(&self, scene: &Scene<Actor>) -> Target {
        let node = self.player.and_then(|id| scene.get(id));
        match node {
            Some(node) => match &node.kind {
                Actor::Player(player) => Target {
                    position: node.body.position,
                    dead: player.dead,
                },
                _ => Target {
                    position: 0.0,
                    dead: true,
                },
            },
            None => Target {
                position: 0.0,
                dead: true,
            },
        }
    }

    fn update_flame(&mut self, scene: &mut Scene<Actor>, id: EntityId) {
        let target = self.player_target(scene);
        match flame::update(scene, id, target, self.settings.height) {
            Outcome::Landed { scored: true } => {
                let score = self.records.up();
                self.events.push(GameEvent::Scored { score });
            }
            Outcome::Hit => self.game_over(scene),
            _ => {}
        }
    }

    fn game_over(&mut self, scene: &mut Scene<Actor>) {
        if let Some(id) = self.player {
            player::die(scene, id);
        }

        if !self.replaying && self.records.commit() {
            log::info!("New personal best: {}", self.records.prime);
        }

        self.last_frame = scene.frame();
        let score = self.records.current;
        let duration_ms = scene.time() - self.started_at;
        log::info!("Game over: score {score} after {} frames", self.last_frame);

        let replay = self
            .replay
            .as_ref()
            .map(Replay::snapshot)
            .unwrap_or_else(|| Replay::new(0));
        self.events.push(GameEvent::GameOver {
            score,
            frames: self.last_frame,
            duration_ms,
            replay,
            replaying: self.replaying,
        });
    }
}

impl Hooks for Subleerunker {
    type Kind = Actor;
    type Error = DesyncError;

    fn setup(&mut self, scene: &mut Scene<Actor>) -> Result<(), DesyncError> {
        scene.ctx.debug = self.settings.debug;
        self.reset(scene);
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene<Actor>, id: EntityId, frame: u64) -> Result<(), DesyncError> {
        let Some(node) = scene.get(id) else {
            return Ok(());
        };
        match node.kind {
            Actor::Stage => self.update_stage(scene, frame)?,
            Actor::Player(_) => player::update(scene, id, frame),
            Actor::Flame(_) => self.update_flame(scene, id),
            Actor::Logo | Actor::Control => {}
        }
        Ok(())
    }

    fn render(&mut self, scene: &Scene<Actor>, mut view: RenderView, sink: &mut dyn RenderSink) {
        let Some(node) = scene.get(view.id) else {
            return;
        };
        let width = self.settings.width as f32;
        let height = self.settings.height as f32;
        match &node.kind {
            Actor::Stage => view.pos = Vec2::ZERO,
            Actor::Logo => view.pos = Vec2::new(width / 2.0 - LOGO_SIZE.x / 2.0, LOGO_TOP),
            Actor::Control => {
                let size = if self.settings.touch_controls {
                    TOUCH_CONTROL_SIZE
                } else {
                    KEY_CONTROL_SIZE
                };
                view.pos = Vec2::new(width / 2.0 - size.x / 2.0, height - CONTROL_BOTTOM - size.y);
            }
            Actor::Player(runner) => {
                view.pos = Vec2::new(view.position as f32, height - player::HEIGHT as f32);
                view.flip_x = runner.direction == Direction::Left;
                if let (Some(anim), Some(index)) = (node.anim.name(), view.frame_index) {
                    view.overlay = runner.eyelids(anim, index);
                }
            }
            Actor::Flame(flame) => view.pos = Vec2::new(flame.x as f32, view.position as f32),
        }
        sink.render(&view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::TIME_STEP_MS;
    use crate::sim::{CollectSink, NullSink};

    fn seeded(seed: u64) -> Settings {
        Settings {
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Tick one fixed step at a time
    struct Clock {
        now: f64,
    }

    impl Clock {
        fn start(game: &mut Game<Subleerunker>) -> Self {
            game.tick(0.0, &mut NullSink).unwrap();
            game.tick(0.0, &mut NullSink).unwrap();
            // Stay half a step ahead so rounding never skips or doubles a step
            let now = TIME_STEP_MS / 2.0;
            game.tick(now, &mut NullSink).unwrap();
            Self { now }
        }

        fn step(&mut self, game: &mut Game<Subleerunker>) {
            self.now += TIME_STEP_MS;
            game.tick(self.now, &mut NullSink).unwrap();
        }
    }

    fn splash_count(game: &Game<Subleerunker>) -> usize {
        let scene = &game.scene;
        scene
            .children(scene.root())
            .into_iter()
            .filter(|&id| matches!(scene.get(id).map(|n| &n.kind), Some(Actor::Logo | Actor::Control)))
            .count()
    }

    #[test]
    fn test_setup_shows_splash() {
        let mut game = Subleerunker::new(Settings::default()).into_game();
        game.tick(0.0, &mut NullSink).unwrap();
        assert_eq!(splash_count(&game), 2);
        assert_eq!(game.hooks.phase(&game.scene), GamePhase::Splash);
        assert!(!game.hooks.is_playing());
    }

    #[test]
    fn test_key_press_starts_game() {
        let mut game = Subleerunker::new(seeded(1)).into_game();
        let mut clock = Clock::start(&mut game);
        clock.step(&mut game);
        assert!(!game.hooks.is_playing());

        game.hooks.key_right(true);
        clock.step(&mut game);
        assert!(game.hooks.is_playing());
        assert_eq!(splash_count(&game), 0);
        assert_eq!(game.hooks.records().current, 0);
        assert_eq!(
            game.hooks.drain_events().last(),
            Some(&GameEvent::Started {
                seed: 1,
                replaying: false
            })
        );
        // Frame numbering restarted with the game
        assert_eq!(game.frame(), 0);
    }

    #[test]
    fn test_shift_weakens_runner() {
        let mut game = Subleerunker::new(seeded(1)).into_game();
        let mut clock = Clock::start(&mut game);
        game.hooks.key_shift(true, true);
        clock.step(&mut game);
        assert!(game.hooks.is_playing());
        assert!(!game.hooks.controls().shift_pressed);

        let player_id = game.hooks.player.unwrap();
        match &game.scene.get(player_id).unwrap().kind {
            Actor::Player(player) => assert_eq!(player.force, WEAK_START),
            other => panic!("not a player: {other:?}"),
        }

        // Recorded so playback spawns the same runner
        clock.step(&mut game);
        let replay = game.hooks.replay().unwrap();
        let history: Vec<(u64, u8)> = replay.input_history.iter().map(|(&f, &i)| (f, i)).collect();
        assert_eq!(history, vec![(1, 1 << WEAK_STARTED)]);
        assert_eq!(game.hooks.controls().bits, InputBits(0));
    }

    #[test]
    fn test_slow_motion_only_in_debug() {
        let mut game = Subleerunker::new(seeded(1)).into_game();
        let mut clock = Clock::start(&mut game);
        game.hooks.key_shift(true, false);
        clock.step(&mut game);
        assert_eq!(game.scene.ctx.time_scale(), 1.0);

        let settings = Settings {
            debug: true,
            ..seeded(1)
        };
        let mut game = Subleerunker::new(settings).into_game();
        let mut clock = Clock::start(&mut game);
        game.hooks.key_shift(true, false);
        clock.step(&mut game);
        assert_eq!(game.scene.ctx.time_scale(), 0.5);
    }

    #[test]
    fn test_recording_is_sparse() {
        let mut game = Subleerunker::new(seeded(3)).into_game();
        let mut clock = Clock::start(&mut game);
        game.hooks.key_left(true);
        clock.step(&mut game);
        for _ in 0..5 {
            clock.step(&mut game);
        }
        game.hooks.key_left(false);
        clock.step(&mut game);

        let replay = game.hooks.replay().unwrap();
        // Held for frames 1..=5, released on frame 6
        let history: Vec<(u64, u8)> = replay.input_history.iter().map(|(&f, &i)| (f, i)).collect();
        assert_eq!(history, vec![(1, 0b001), (6, 0)]);
    }

    /// Play a seeded game with a fixed key pattern until it ends
    fn play_until_over(seed: u64) -> (u64, Replay, u64) {
        let mut game = Subleerunker::new(seeded(seed)).into_game();
        let mut clock = Clock::start(&mut game);
        game.hooks.key_left(true);
        for step in 0..100_000u64 {
            clock.step(&mut game);
            match step % 90 {
                0 => game.hooks.key_right(true),
                45 => game.hooks.key_right(false),
                _ => {}
            }
            for event in game.hooks.drain_events() {
                if let GameEvent::GameOver {
                    score, replay, frames, ..
                } = event
                {
                    return (score, replay, frames);
                }
            }
        }
        panic!("game never ended");
    }

    #[test]
    fn test_game_over_then_reset() {
        let mut game = Subleerunker::new(seeded(5)).into_game();
        let mut clock = Clock::start(&mut game);
        game.hooks.key_left(true);

        let mut over = false;
        let mut reset = false;
        for _ in 0..100_000 {
            clock.step(&mut game);
            for event in game.hooks.drain_events() {
                match event {
                    GameEvent::GameOver { .. } => {
                        over = true;
                        assert_eq!(game.hooks.phase(&game.scene), GamePhase::GameOver);
                    }
                    GameEvent::Reset if over => reset = true,
                    _ => {}
                }
            }
            if reset {
                break;
            }
        }
        assert!(over && reset);
        assert!(!game.hooks.is_playing());
        assert_eq!(splash_count(&game), 2);
        assert_eq!(game.hooks.records().prime, game.hooks.records().current);
        assert_eq!(game.hooks.difficulty(), 0.25);
    }

    #[test]
    fn test_replay_reproduces_score() {
        let (score, replay, frames) = play_until_over(11);

        let mut game = Subleerunker::new(Settings::default()).into_game();
        game.hooks.load_replay(replay.snapshot());
        let mut clock = Clock::start(&mut game);
        let mut replayed = None;
        for _ in 0..100_000 {
            clock.step(&mut game);
            for event in game.hooks.drain_events() {
                if let GameEvent::GameOver {
                    score, frames, replaying, ..
                } = event
                {
                    assert!(replaying);
                    replayed = Some((score, frames));
                }
            }
            if replayed.is_some() {
                break;
            }
        }
        assert_eq!(replayed, Some((score, frames)));
        // Replays never count as a personal best
        assert_eq!(game.hooks.records().prime, 0);
    }

    #[test]
    fn test_same_seed_same_game() {
        let first = play_until_over(21);
        let second = play_until_over(21);
        assert_eq!(first.0, second.0);
        assert_eq!(first.2, second.2);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_render_places_sprites() {
        let mut game = Subleerunker::new(seeded(1)).into_game();
        let mut sink = CollectSink::default();
        game.tick(0.0, &mut sink).unwrap();
        game.tick(0.0, &mut sink).unwrap();
        game.hooks.key_left(true);
        sink.clear();
        game.tick(TIME_STEP_MS, &mut sink).unwrap();
        // Splash sprites were released when the game started
        assert_eq!(sink.released.len(), 2);

        // Input is applied from the first gameplay frame on
        sink.clear();
        game.tick(TIME_STEP_MS * 2.0, &mut sink).unwrap();
        let player_id = game.hooks.player.unwrap();
        let view = sink.find(player_id).unwrap();
        assert_eq!(view.pos.y, 408.0);
        assert!(view.flip_x);
        assert!(view.texture.unwrap().starts_with("player-run-"));
    }
}
