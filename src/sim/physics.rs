//! One-dimensional kinematics integrator
//!
//! Every entity moves along a single axis. A step applies acceleration, then
//! friction, then the velocity cap, then moves and clamps against the boundary.

use serde::{Deserialize, Serialize};

use crate::limit;

/// Authoritative or predicted kinematic state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub position: f64,
    pub speed: f64,
}

/// Closed interval an entity's position is confined to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub min: f64,
    pub max: f64,
}

impl Default for Boundary {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl Boundary {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bounded only from above
    pub fn up_to(max: f64) -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max,
        }
    }

    /// Returns the clamped position, or `None` when it was already inside
    pub fn clamp(&self, position: f64) -> Option<f64> {
        if position < self.min {
            Some(self.min)
        } else if position > self.max {
            Some(self.max)
        } else {
            None
        }
    }
}

/// Per-entity physics parameters plus the authoritative state they act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: f64,
    pub speed: f64,
    /// Added to speed every frame
    pub acceleration: f64,
    /// Subtracted from |speed| every frame, never crossing zero
    pub friction: f64,
    /// Upper bound on |speed|
    pub max_velocity: Option<f64>,
    pub boundary: Boundary,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: 0.0,
            speed: 0.0,
            acceleration: 0.0,
            friction: 0.0,
            max_velocity: None,
            boundary: Boundary::UNBOUNDED,
        }
    }
}

impl Body {
    pub fn state(&self) -> MotionState {
        MotionState {
            position: self.position,
            speed: self.speed,
        }
    }

    /// Integrate `state` forward by `impact` frames without touching `self`.
    ///
    /// `impact` is 1 for an authoritative step and the fractional leftover
    /// frame during prediction.
    pub fn integrate(&self, state: MotionState, impact: f64) -> MotionState {
        let mut speed = state.speed + self.acceleration * impact;

        if speed != 0.0 && self.friction != 0.0 {
            let sign = if speed > 0.0 { 1.0 } else { -1.0 };
            speed = (speed.abs() - self.friction * impact).max(0.0) * sign;
        }

        if let Some(max_velocity) = self.max_velocity {
            speed = limit(speed, -max_velocity, max_velocity);
        }

        let mut position = state.position + speed * impact;

        // Hitting a wall kills the residual velocity
        if let Some(clamped) = self.boundary.clamp(position) {
            position = clamped;
            speed = 0.0;
        }

        MotionState { position, speed }
    }

    /// Advance the authoritative state by exactly one fixed step
    pub fn simulate(&mut self) {
        let next = self.integrate(self.state(), 1.0);
        self.position = next.position;
        self.speed = next.speed;
    }

    /// Render-only projection `delta_frame` frames ahead
    pub fn predict(&self, delta_frame: f64) -> MotionState {
        self.integrate(self.state(), delta_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundary_clamp_zeroes_speed() {
        let mut body = Body {
            position: 9.0,
            speed: 5.0,
            boundary: Boundary::new(0.0, 10.0),
            ..Default::default()
        };
        body.simulate();
        assert_eq!(body.position, 10.0);
        assert_eq!(body.speed, 0.0);
    }

    #[test]
    fn test_boundary_clamp_at_min() {
        let mut body = Body {
            position: 1.0,
            speed: -3.0,
            boundary: Boundary::new(0.0, 10.0),
            ..Default::default()
        };
        body.simulate();
        assert_eq!(body.position, 0.0);
        assert_eq!(body.speed, 0.0);
    }

    #[test]
    fn test_friction_floors_at_zero() {
        let mut body = Body {
            speed: 2.0,
            friction: 5.0,
            ..Default::default()
        };
        body.simulate();
        assert_eq!(body.speed, 0.0);
        assert_eq!(body.position, 0.0);

        let mut body = Body {
            speed: -2.0,
            friction: 5.0,
            ..Default::default()
        };
        body.simulate();
        assert_eq!(body.speed, 0.0);
    }

    #[test]
    fn test_friction_keeps_sign() {
        let mut body = Body {
            speed: -4.0,
            friction: 1.0,
            ..Default::default()
        };
        body.simulate();
        assert_eq!(body.speed, -3.0);
        assert_eq!(body.position, -3.0);
    }

    #[test]
    fn test_zero_friction_keeps_speed() {
        let mut body = Body {
            speed: 3.0,
            ..Default::default()
        };
        body.simulate();
        body.simulate();
        assert_eq!(body.speed, 3.0);
        assert_eq!(body.position, 6.0);
    }

    #[test]
    fn test_zero_max_velocity_pins_entity() {
        let mut body = Body {
            speed: 4.0,
            acceleration: 1.0,
            max_velocity: Some(0.0),
            ..Default::default()
        };
        body.simulate();
        assert_eq!(body.speed, 0.0);
        assert_eq!(body.position, 0.0);
    }

    #[test]
    fn test_acceleration_capped_by_max_velocity() {
        let mut body = Body {
            acceleration: 0.1,
            max_velocity: Some(10.0),
            ..Default::default()
        };
        for _ in 0..200 {
            body.simulate();
        }
        assert_eq!(body.speed, 10.0);
    }

    #[test]
    fn test_predict_does_not_mutate() {
        let body = Body {
            position: 5.0,
            speed: 2.0,
            acceleration: 1.0,
            ..Default::default()
        };
        let predicted = body.predict(0.5);
        assert_eq!(predicted.speed, 2.5);
        assert_eq!(predicted.position, 6.25);
        assert_eq!(body.position, 5.0);
        assert_eq!(body.speed, 2.0);
    }

    proptest! {
        #[test]
        fn prop_step_respects_limits(
            position in -100.0f64..100.0,
            speed in -50.0f64..50.0,
            acceleration in -5.0f64..5.0,
            friction in 0.0f64..5.0,
            max_velocity in 0.0f64..20.0,
        ) {
            let mut body = Body {
                position: position.clamp(-10.0, 10.0),
                speed,
                acceleration,
                friction,
                max_velocity: Some(max_velocity),
                boundary: Boundary::new(-10.0, 10.0),
            };
            body.simulate();
            prop_assert!(body.speed.abs() <= max_velocity);
            prop_assert!(body.position >= -10.0 && body.position <= 10.0);
        }
    }
}
