//! Player scroll state.
//!
//! The player has two horizontal positions: the body's position in the
//! physics world and its logical position in the level. They differ by the
//! cumulative world shift, which [`PlayerState`] keeps track of.

use std::f32::consts::PI;

use bevy::prelude::*;

use crate::scroll::DeadZone;

/// Facing angle of the player: "up" in y-down screen space.
pub const FACING_UP: f32 = 3.0 * PI / 2.0;

/// Scroll bookkeeping of the player.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    /// Absolute position in the level.
    pub logical_x: f32,
    /// `logical_x` as of the previous physics step.
    pub previous_x: f32,
    /// Current dead-zone bounds.
    pub dead_zone: DeadZone,
    /// How far the dead zone has drifted from its home position.
    pub zone_offset: f32,
    /// Total distance the world has been shifted, positive when the player
    /// has advanced to the right through scrolling.
    pub world_shift: f32,
    /// Camera offset, only moved by the camera-follow policy.
    pub camera_x: f32,
    /// Facing angle in radians. Never changes.
    pub facing: f32,
}

impl PlayerState {
    /// State of a freshly spawned player at body x `spawn_x`.
    pub fn new(spawn_x: f32, dead_zone: DeadZone) -> Self {
        Self {
            logical_x: spawn_x,
            previous_x: spawn_x,
            dead_zone,
            zone_offset: 0.0,
            world_shift: 0.0,
            camera_x: 0.0,
            facing: FACING_UP,
        }
    }

    /// Logical x implied by a body x.
    #[inline]
    pub fn logical_from_body(&self, body_x: f32) -> f32 {
        body_x + self.world_shift
    }

    /// Whether `logical_x == body_x + world_shift` within `epsilon`.
    pub fn is_consistent(&self, body_x: f32, epsilon: f32) -> bool {
        (self.logical_x - self.logical_from_body(body_x)).abs() <= epsilon
    }

    /// Drift the dead zone by `shift`, keeping its bounds relative to `home`.
    pub fn drift_dead_zone(&mut self, shift: f32, home: &DeadZone) {
        self.zone_offset += shift;
        self.dead_zone = home.shifted(self.zone_offset);
    }

    /// Signed horizontal movement during the last physics step.
    #[inline]
    pub fn frame_delta(&self) -> f32 {
        self.logical_x - self.previous_x
    }
}
