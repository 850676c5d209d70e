//! Ground contact strategies.
//!
//! Jumping is gated by a [`GroundContact`] strategy. [`SpanContact`] checks
//! the terrain directly under the player; [`UprightLock`] treats the player
//! as always grounded and keeps the body from tipping over instead.

use bevy::prelude::*;

use crate::terrain::{GroundSpan, Terrain};

/// Result of probing the terrain under the player.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundProbe {
    /// Whether a span exists under the probe point.
    pub detected: bool,
    /// Vertical distance from the body center to the span surface.
    /// Positive while the body is above the surface.
    pub distance: f32,
    /// Surface height of the detected span.
    pub ground_y: f32,
}

impl GroundProbe {
    /// Probe the terrain at a logical x.
    pub fn probe(logical_x: f32, body_y: f32, terrain: &Terrain) -> Self {
        match terrain.ground_span_at(logical_x) {
            Some(span) => Self::from_span(&span, body_y),
            None => Self::default(),
        }
    }

    fn from_span(span: &GroundSpan, body_y: f32) -> Self {
        Self {
            detected: true,
            distance: span.ground_y - body_y,
            ground_y: span.ground_y,
        }
    }

    /// Whether the distance lies within `[0, band]`.
    #[inline]
    pub fn within(&self, band: f32) -> bool {
        self.detected && self.distance >= 0.0 && self.distance <= band
    }
}

/// Strategy deciding whether the player stands on something.
pub trait GroundContact: Send + Sync + 'static {
    fn is_grounded(&self, logical_x: f32, body_y: f32, terrain: &Terrain) -> bool;

    /// Angle the body is locked to every sub-step, if any.
    fn upright_angle(&self) -> Option<f32> {
        None
    }
}

/// Grounded while the body center is within `band` above a ground span.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SpanContact {
    pub band: f32,
}

impl SpanContact {
    pub const DEFAULT_BAND: f32 = 25.0;

    pub fn new(band: f32) -> Self {
        Self { band }
    }
}

impl Default for SpanContact {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BAND)
    }
}

impl GroundContact for SpanContact {
    fn is_grounded(&self, logical_x: f32, body_y: f32, terrain: &Terrain) -> bool {
        GroundProbe::probe(logical_x, body_y, terrain).within(self.band)
    }
}

/// Always grounded; keeps the body upright at `angle`.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct UprightLock {
    pub angle: f32,
}

impl UprightLock {
    pub fn new(angle: f32) -> Self {
        Self { angle }
    }
}

impl GroundContact for UprightLock {
    fn is_grounded(&self, _logical_x: f32, _body_y: f32, _terrain: &Terrain) -> bool {
        true
    }

    fn upright_angle(&self) -> Option<f32> {
        Some(self.angle)
    }
}

#[cfg(all(test, feature = "rapier2d"))]
mod tests {
    use super::*;
    use crate::backend::{PhysicsBackend, PhysicsSettings};
    use crate::rapier::RapierWorld;
    use crate::terrain::LevelDescription;

    fn terrain() -> (RapierWorld, Terrain) {
        let mut physics = RapierWorld::with_settings(PhysicsSettings::default());
        let terrain = Terrain::build(&mut physics, &LevelDescription::tiled_earth()).unwrap();
        (physics, terrain)
    }

    #[test]
    fn span_contact_inside_band() {
        let (_physics, terrain) = terrain();
        let contact = SpanContact::default();
        // Surface at 600, resting box center at 585
        assert!(contact.is_grounded(300.0, 585.0, &terrain));
        assert!(contact.is_grounded(300.0, 575.0, &terrain));
        assert!(contact.is_grounded(300.0, 600.0, &terrain));
    }

    #[test]
    fn span_contact_outside_band() {
        let (_physics, terrain) = terrain();
        let contact = SpanContact::default();
        assert!(!contact.is_grounded(300.0, 574.0, &terrain));
        assert!(!contact.is_grounded(300.0, 200.0, &terrain));
        // Below the surface
        assert!(!contact.is_grounded(300.0, 601.0, &terrain));
    }

    #[test]
    fn span_contact_outside_horizontal_extent() {
        let (_physics, terrain) = terrain();
        let contact = SpanContact::default();
        assert!(!contact.is_grounded(50.0, 585.0, &terrain));
        assert!(!contact.is_grounded(6000.0, 585.0, &terrain));
    }

    #[test]
    fn span_contact_ends_exactly_at_level_edges() {
        let (_physics, terrain) = terrain();
        let contact = SpanContact::default();
        // Tiles cover [115, 5515]
        assert!(contact.is_grounded(115.0, 585.0, &terrain));
        assert!(!contact.is_grounded(114.9, 585.0, &terrain));
        assert!(contact.is_grounded(5515.0, 585.0, &terrain));
        assert!(!contact.is_grounded(5515.1, 585.0, &terrain));
    }

    #[test]
    fn span_contact_follows_scroll() {
        let (mut physics, mut terrain) = terrain();
        terrain.shift_left(&mut physics, 500.0);
        // Logical coordinates are unaffected by the scroll
        assert!(SpanContact::default().is_grounded(300.0, 585.0, &terrain));
    }

    #[test]
    fn probe_reports_distance() {
        let (_physics, terrain) = terrain();
        let probe = GroundProbe::probe(300.0, 585.0, &terrain);
        assert!(probe.detected);
        assert!((probe.distance - 15.0).abs() < 1e-4);
        assert!((probe.ground_y - 600.0).abs() < 1e-4);
        assert!(!GroundProbe::probe(10.0, 585.0, &terrain).detected);
    }

    #[test]
    fn upright_lock_is_always_grounded() {
        let (_physics, terrain) = terrain();
        let lock = UprightLock::new(1.5);
        assert!(lock.is_grounded(-100.0, -100.0, &terrain));
        assert_eq!(lock.upright_angle(), Some(1.5));
        assert_eq!(SpanContact::default().upright_angle(), None);
    }
}
