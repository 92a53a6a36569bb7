//! Wall-clock driven sprite animation
//!
//! Animation frames are derived from render time, not simulation frames, so
//! they keep playing smoothly while the simulation is paused or slowed.

/// Static description of one animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimSpec {
    pub name: &'static str,
    pub fps: f64,
    /// Frame identifiers (texture names) in playback order
    pub frames: &'static [&'static str],
    /// Plays once and holds the last frame instead of looping
    pub once: bool,
}

impl AnimSpec {
    /// Map an unbounded frame counter into this animation's frame list
    pub fn index(&self, frame: i64) -> usize {
        let len = self.frames.len() as i64;
        if len == 0 {
            return 0;
        }
        if self.once {
            frame.clamp(0, len - 1) as usize
        } else {
            frame.rem_euclid(len) as usize
        }
    }
}

/// Per-entity animation state
#[derive(Debug, Clone)]
pub struct Animator {
    specs: &'static [AnimSpec],
    current: Option<&'static AnimSpec>,
    base_frame: i64,
    base_time: f64,
}

impl Animator {
    pub fn new(specs: &'static [AnimSpec]) -> Self {
        Self {
            specs,
            current: None,
            base_frame: 0,
            base_time: 0.0,
        }
    }

    /// An animator for entities without any animation
    pub fn none() -> Self {
        Self::new(&[])
    }

    pub fn current(&self) -> Option<&'static AnimSpec> {
        self.current
    }

    pub fn name(&self) -> Option<&'static str> {
        self.current.map(|spec| spec.name)
    }

    /// Switch to `name`, re-anchoring at frame 0 only when it actually changes.
    /// Unknown names clear the current animation.
    pub fn set(&mut self, name: &str, time: f64) {
        if self.name() == Some(name) {
            return;
        }
        self.current = self.specs.iter().find(|spec| spec.name == name);
        self.rebase(0, time);
    }

    /// Re-anchor frame counting so that `frame` is shown at `time`
    pub fn rebase(&mut self, frame: i64, time: f64) {
        self.base_frame = frame;
        self.base_time = time;
    }

    /// Unbounded frame counter at `time`
    pub fn frame(&self, time: f64, time_scale: f64) -> i64 {
        let Some(spec) = self.current else {
            return 0;
        };
        let fps = spec.fps * time_scale;
        let elapsed = time - self.base_time;
        self.base_frame + (elapsed * fps / 1000.0).floor() as i64
    }

    /// Index into the current animation's frame list at `time`
    pub fn index(&self, time: f64, time_scale: f64) -> Option<usize> {
        self.current
            .map(|spec| spec.index(self.frame(time, time_scale)))
    }

    /// Frame identifier shown at `time`
    pub fn texture(&self, time: f64, time_scale: f64) -> Option<&'static str> {
        let spec = self.current?;
        spec.frames
            .get(spec.index(self.frame(time, time_scale)))
            .copied()
    }

    /// True once a play-once animation has run past its last frame.
    /// Entities without an animation count as ended; looping ones never end.
    pub fn ended(&self, time: f64, time_scale: f64) -> bool {
        match self.current {
            None => true,
            Some(spec) if !spec.once => false,
            Some(spec) => self.frame(time, time_scale) >= spec.frames.len() as i64,
        }
    }
}
