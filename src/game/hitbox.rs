//! Collision boxes
//!
//! Sprites are drawn larger than what can actually touch. Inner padding trims
//! each sprite down to the part that counts for collisions.

use glam::DVec2;

/// Insets from the sprite edges, in CSS order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn inner_width(&self, width: f64) -> f64 {
        width - self.left - self.right
    }

    pub fn inner_height(&self, height: f64) -> f64 {
        height - self.top - self.bottom
    }
}

/// Axis-aligned box, y grows downwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub min: DVec2,
    pub max: DVec2,
}

impl Hitbox {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Vertical spans overlap (touching counts)
    pub fn overlaps_altitude(&self, other: &Hitbox) -> bool {
        self.min.y <= other.max.y && other.min.y <= self.max.y
    }

    /// True when either horizontal edge of `self` lies within `other`.
    ///
    /// Only valid for a box no wider than `other`, which holds for a
    /// falling flame against the player.
    pub fn edge_within(&self, other: &Hitbox) -> bool {
        let within = |x: f64| other.min.x <= x && x <= other.max.x;
        within(self.min.x) || within(self.max.x)
    }

    pub fn hits(&self, other: &Hitbox) -> bool {
        self.overlaps_altitude(other) && self.edge_within(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x0: f64, y0: f64, x1: f64, y1: f64) -> Hitbox {
        Hitbox::new(DVec2::new(x0, y0), DVec2::new(x1, y1))
    }

    #[test]
    fn test_padding_inner_size() {
        let padding = Padding::new(10.0, 18.0, 50.0, 18.0);
        assert_eq!(padding.inner_width(48.0), 12.0);
        assert_eq!(padding.inner_height(72.0), 12.0);
    }

    #[test]
    fn test_hits_when_edges_inside() {
        let target = boxed(10.0, 10.0, 22.0, 22.0);
        assert!(boxed(5.0, 5.0, 13.0, 11.0).hits(&target));
        assert!(boxed(20.0, 20.0, 28.0, 30.0).hits(&target));
    }

    #[test]
    fn test_touching_edges_hit() {
        let target = boxed(10.0, 10.0, 22.0, 22.0);
        assert!(boxed(2.0, 22.0, 10.0, 30.0).hits(&target));
    }

    #[test]
    fn test_misses() {
        let target = boxed(10.0, 10.0, 22.0, 22.0);
        // Beside
        assert!(!boxed(23.0, 10.0, 31.0, 22.0).hits(&target));
        // Above
        assert!(!boxed(12.0, 0.0, 20.0, 9.0).hits(&target));
    }
}
