//! Horizontal scroll policies.
//!
//! A [`ScrollPolicy`] is a pure decision: given where the player is, where
//! the dead zone is and which way the player wants to go, it says whether the
//! player body moves, the world moves, or the camera pans. The controller
//! carries out the decision.

use bevy::prelude::*;

/// Tolerance used when comparing positions against dead-zone bounds.
///
/// Positions are sums of many small f32 steps; exact comparisons flicker at
/// the boundary.
pub const BOUND_EPSILON: f32 = 1e-2;

/// Moves shorter than this count as clamped.
const MIN_MOVE: f32 = 1e-4;

/// Horizontal band of the screen inside which the world scrolls instead of
/// the player moving.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct DeadZone {
    pub left: f32,
    pub right: f32,
}

impl DeadZone {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Band centered on the screen, `fraction * screen_width` to each side.
    pub fn centered(screen_width: f32, fraction: f32) -> Self {
        let center = screen_width * 0.5;
        let half = screen_width * fraction;
        Self::new(center - half, center + half)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn center(&self) -> f32 {
        (self.left + self.right) * 0.5
    }

    /// Inclusive containment with [`BOUND_EPSILON`] slack.
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left - BOUND_EPSILON && x <= self.right + BOUND_EPSILON
    }

    /// Copy translated by `offset`.
    #[inline]
    pub fn shifted(&self, offset: f32) -> Self {
        Self::new(self.left + offset, self.right + offset)
    }

    /// Signed drift to apply for a world shift of `delta`, clamped so the
    /// band never goes left of `home` nor right of `max_right`.
    ///
    /// Returns `delta` unchanged whenever no clamp applies, so a zone offset
    /// accumulated from these values tracks the world shift exactly.
    pub fn drift_for(&self, delta: f32, home: &DeadZone, max_right: f32) -> f32 {
        let mut drift = delta;
        if self.right + drift > max_right {
            drift = max_right - self.right;
        }
        if self.left + drift < home.left {
            drift = home.left - self.left;
        }
        drift
    }
}

/// Logical horizontal extent the player may occupy.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min: f32,
    pub max: f32,
}

impl WorldBounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Room left before hitting the bound in `direction`. Never negative.
    pub fn room(&self, x: f32, direction: Direction) -> f32 {
        match direction {
            Direction::Left => (x - self.min).max(0.0),
            Direction::Right => (self.max - x).max(0.0),
        }
    }
}

/// Fixed limits a policy decides within.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ScrollLimits {
    pub world: WorldBounds,
    /// Distance from a world edge inside which the player always moves.
    pub edge_margin: f32,
    /// Default dead-zone position; the live zone never drifts left of it.
    pub home: DeadZone,
}

impl ScrollLimits {
    /// Rightmost position the dead zone's right edge may reach.
    #[inline]
    pub fn max_dead_zone_right(&self) -> f32 {
        self.world.max - self.edge_margin
    }

    /// Whether `x` is within the edge margin of the world edge ahead.
    pub fn near_edge(&self, x: f32, direction: Direction) -> bool {
        match direction {
            Direction::Left => x <= self.world.min + self.edge_margin,
            Direction::Right => x >= self.world.max - self.edge_margin,
        }
    }
}

/// Horizontal direction of travel.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// -1 for left, +1 for right.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// Everything a policy looks at for one move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollInput {
    pub logical_x: f32,
    pub dead_zone: DeadZone,
    pub limits: ScrollLimits,
    pub direction: Direction,
    /// Requested move distance (positive).
    pub step: f32,
}

/// What a single move does.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollAction {
    /// Translate the player body.
    MovePlayer,
    /// Keep the body still and shift the terrain the opposite way.
    ShiftWorld,
    /// Translate the player body and the camera offset together.
    PanCamera,
    /// At the world bound; nothing moves.
    Clamped,
}

/// Result of [`ScrollPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollDecision {
    pub action: ScrollAction,
    /// Distance covered by the move (non-negative).
    pub distance: f32,
    /// Signed distance the dead zone drifts with this move.
    pub zone_shift: f32,
}

impl ScrollDecision {
    /// Signed logical displacement of the player.
    #[inline]
    pub fn delta(&self, direction: Direction) -> f32 {
        match self.action {
            ScrollAction::Clamped => 0.0,
            _ => self.distance * direction.sign(),
        }
    }
}

/// Strategy deciding how a horizontal move is realised.
pub trait ScrollPolicy: Send + Sync + 'static {
    fn decide(&self, input: &ScrollInput) -> ScrollDecision;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Shared classification. `Err(distance)` means "inside the dead zone", the
/// branch where the two policies differ.
fn classify(input: &ScrollInput) -> Result<ScrollDecision, f32> {
    let room = input.limits.world.room(input.logical_x, input.direction);
    let distance = input.step.min(room);
    if distance < MIN_MOVE {
        return Ok(ScrollDecision {
            action: ScrollAction::Clamped,
            distance: 0.0,
            zone_shift: 0.0,
        });
    }

    if input.limits.near_edge(input.logical_x, input.direction)
        || !input.dead_zone.contains(input.logical_x)
    {
        return Ok(ScrollDecision {
            action: ScrollAction::MovePlayer,
            distance,
            zone_shift: 0.0,
        });
    }

    Err(distance)
}

fn drift(input: &ScrollInput, distance: f32) -> f32 {
    input.dead_zone.drift_for(
        distance * input.direction.sign(),
        &input.limits.home,
        input.limits.max_dead_zone_right(),
    )
}

/// The terrain scrolls while the player is inside the dead zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadZoneScroll;

impl ScrollPolicy for DeadZoneScroll {
    fn decide(&self, input: &ScrollInput) -> ScrollDecision {
        match classify(input) {
            Ok(decision) => decision,
            Err(distance) => ScrollDecision {
                action: ScrollAction::ShiftWorld,
                distance,
                zone_shift: drift(input, distance),
            },
        }
    }

    fn name(&self) -> &'static str {
        "dead_zone"
    }
}

/// The camera follows the player while inside the dead zone; terrain stays put.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraFollow;

impl ScrollPolicy for CameraFollow {
    fn decide(&self, input: &ScrollInput) -> ScrollDecision {
        match classify(input) {
            Ok(decision) => decision,
            Err(distance) => ScrollDecision {
                action: ScrollAction::PanCamera,
                distance,
                zone_shift: drift(input, distance),
            },
        }
    }

    fn name(&self) -> &'static str {
        "camera_follow"
    }
}
