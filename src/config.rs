//! Configuration for the side-scrolling session.

use bevy::prelude::*;
use thiserror::Error;

use crate::backend::{PhysicsSettings, SurfaceMaterial};
use crate::detection::{GroundContact, SpanContact, UprightLock};
use crate::intent::InputAction;
use crate::scroll::{CameraFollow, DeadZone, DeadZoneScroll, ScrollLimits, ScrollPolicy, WorldBounds};
use crate::state::FACING_UP;

/// How the view follows the player inside the dead zone.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollMode {
    /// Shift the terrain; the camera never moves.
    #[default]
    Terrain,
    /// Pan a camera offset; the terrain never moves.
    Camera,
}

/// How jumping is gated.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContactMode {
    /// Grounded only inside the ground band above a terrain span.
    #[default]
    Span,
    /// Always grounded, body locked upright.
    UprightLock,
}

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sub-step count must be at least 1")]
    NoSubsteps,
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    #[error("move step must be positive, got {0}")]
    InvalidMoveStep(f32),
    #[error("world bounds are empty: min {min} >= max {max}")]
    EmptyWorld { min: f32, max: f32 },
    #[error("dead-zone fraction must be finite and non-negative, got {0}")]
    InvalidDeadZoneFraction(f32),
    #[error("dead zone [{left}, {right}] does not fit in the scrollable range [{min}, {max}]")]
    DeadZoneOutsideWorld {
        left: f32,
        right: f32,
        min: f32,
        max: f32,
    },
    #[error("player mass and half extent must be positive")]
    InvalidPlayerBody,
    #[error("ground band must be non-negative, got {0}")]
    InvalidGroundBand(f32),
}

/// Everything a [`GameSession`](crate::session::GameSession) is built from.
///
/// `Default` reproduces the prototype tuning: a 1280x1024 screen, 60 Hz
/// physics with 6 sub-steps per step, a 5120 unit wide world and a player
/// box of 30x30 units.
///
/// # Example
///
/// ```rust
/// use msg_side_scroller::prelude::*;
///
/// let config = SessionConfig::prototype()
///     .with_dead_zone_fraction(0.05)
///     .with_end_of_world(4000.0);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.home_dead_zone(), DeadZone::new(576.0, 704.0));
/// ```
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Resource)]
pub struct SessionConfig {
    // === Screen ===
    /// Screen size in world units.
    pub screen_size: Vec2,

    // === Timing ===
    /// Physics step in seconds.
    pub timestep: f32,
    /// Input sub-steps per physics step.
    pub substeps: u32,

    // === Movement ===
    /// Horizontal distance covered per move call.
    pub move_step: f32,
    /// Total jump force per physics step, split across sub-steps.
    pub jump_force: f32,

    // === World ===
    /// Rightmost logical x the player may reach.
    pub end_of_world: f32,
    /// Leftmost logical x the player may reach.
    pub world_min: f32,
    /// Dead-zone half width as a fraction of the screen width.
    pub dead_zone_fraction: f32,
    /// Edge margin as a fraction of the screen width.
    pub edge_margin_fraction: f32,

    // === Physics ===
    pub gravity: Vec2,
    pub solver_iterations: usize,

    // === Player body ===
    pub spawn: Vec2,
    pub player_half_extent: f32,
    pub player_mass: f32,
    pub player_friction: f32,
    pub player_restitution: f32,

    // === Strategies ===
    /// Maximum height above a span at which the player counts as grounded.
    pub ground_band: f32,
    pub scroll_mode: ScrollMode,
    pub contact_mode: ContactMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            screen_size: Vec2::new(1280.0, 1024.0),

            timestep: 1.0 / 60.0,
            substeps: 6,

            move_step: 0.8,
            jump_force: 10_000.0,

            end_of_world: 5120.0,
            world_min: 15.0,
            dead_zone_fraction: 0.1,
            edge_margin_fraction: 0.1,

            gravity: Vec2::new(0.0, 300.0),
            solver_iterations: 5,

            spawn: Vec2::new(200.0, 200.0),
            player_half_extent: 15.0,
            player_mass: 1.0,
            player_friction: 0.4,
            player_restitution: 0.0,

            ground_band: SpanContact::DEFAULT_BAND,
            scroll_mode: ScrollMode::Terrain,
            contact_mode: ContactMode::Span,
        }
    }
}

impl SessionConfig {
    /// Dead-zone scrolling with span-gated jumps.
    pub fn prototype() -> Self {
        Self::default()
    }

    /// Heavier sub-stepping with the body locked upright and jumps always allowed.
    pub fn upright() -> Self {
        Self {
            substeps: 30,
            jump_force: 40_000.0,
            contact_mode: ContactMode::UprightLock,
            ..default()
        }
    }

    /// Camera-follow scrolling over a static world.
    pub fn camera_follow() -> Self {
        Self {
            scroll_mode: ScrollMode::Camera,
            ..default()
        }
    }

    // === Derived values ===

    #[inline]
    pub fn edge_margin(&self) -> f32 {
        self.edge_margin_fraction * self.screen_size.x
    }

    /// Dead zone at its default position.
    #[inline]
    pub fn home_dead_zone(&self) -> DeadZone {
        DeadZone::centered(self.screen_size.x, self.dead_zone_fraction)
    }

    #[inline]
    pub fn world_bounds(&self) -> WorldBounds {
        WorldBounds::new(self.world_min, self.end_of_world)
    }

    pub fn scroll_limits(&self) -> ScrollLimits {
        ScrollLimits {
            world: self.world_bounds(),
            edge_margin: self.edge_margin(),
            home: self.home_dead_zone(),
        }
    }

    pub fn physics_settings(&self) -> PhysicsSettings {
        PhysicsSettings {
            gravity: self.gravity,
            solver_iterations: self.solver_iterations,
        }
    }

    pub fn player_material(&self) -> SurfaceMaterial {
        SurfaceMaterial::new(self.player_friction, self.player_restitution)
    }

    /// Jump force applied in one sub-step.
    #[inline]
    pub fn jump_force_per_substep(&self) -> f32 {
        self.jump_force / self.substeps.max(1) as f32
    }

    pub fn scroll_policy(&self) -> Box<dyn ScrollPolicy> {
        match self.scroll_mode {
            ScrollMode::Terrain => Box::new(DeadZoneScroll),
            ScrollMode::Camera => Box::new(CameraFollow),
        }
    }

    /// Ground contact strategy. Upright lock holds the body facing up.
    pub fn ground_contact(&self) -> Box<dyn GroundContact> {
        match self.contact_mode {
            ContactMode::Span => Box::new(SpanContact::new(self.ground_band)),
            ContactMode::UprightLock => Box::new(UprightLock::new(FACING_UP)),
        }
    }

    /// Check every value the session relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.substeps == 0 {
            return Err(ConfigError::NoSubsteps);
        }
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(ConfigError::InvalidTimestep(self.timestep));
        }
        if !(self.move_step > 0.0) {
            return Err(ConfigError::InvalidMoveStep(self.move_step));
        }
        if !(self.world_min < self.end_of_world) {
            return Err(ConfigError::EmptyWorld {
                min: self.world_min,
                max: self.end_of_world,
            });
        }
        if !(self.dead_zone_fraction.is_finite() && self.dead_zone_fraction >= 0.0) {
            return Err(ConfigError::InvalidDeadZoneFraction(self.dead_zone_fraction));
        }
        let zone = self.home_dead_zone();
        let max = self.end_of_world - self.edge_margin();
        if zone.left < self.world_min || zone.right > max || zone.width() < 0.0 {
            return Err(ConfigError::DeadZoneOutsideWorld {
                left: zone.left,
                right: zone.right,
                min: self.world_min,
                max,
            });
        }
        if !(self.player_mass > 0.0 && self.player_half_extent > 0.0) {
            return Err(ConfigError::InvalidPlayerBody);
        }
        if !(self.ground_band >= 0.0) {
            return Err(ConfigError::InvalidGroundBand(self.ground_band));
        }
        Ok(())
    }

    // === Builders ===

    pub fn with_screen_size(mut self, size: Vec2) -> Self {
        self.screen_size = size;
        self
    }

    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps;
        self
    }

    pub fn with_move_step(mut self, step: f32) -> Self {
        self.move_step = step;
        self
    }

    pub fn with_jump_force(mut self, force: f32) -> Self {
        self.jump_force = force;
        self
    }

    pub fn with_end_of_world(mut self, end: f32) -> Self {
        self.end_of_world = end;
        self
    }

    pub fn with_world_min(mut self, min: f32) -> Self {
        self.world_min = min;
        self
    }

    pub fn with_dead_zone_fraction(mut self, fraction: f32) -> Self {
        self.dead_zone_fraction = fraction;
        self
    }

    pub fn with_edge_margin_fraction(mut self, fraction: f32) -> Self {
        self.edge_margin_fraction = fraction;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_solver_iterations(mut self, iterations: usize) -> Self {
        self.solver_iterations = iterations;
        self
    }

    pub fn with_spawn(mut self, spawn: Vec2) -> Self {
        self.spawn = spawn;
        self
    }

    /// Set mass and half extent of the player box.
    pub fn with_player_body(mut self, half_extent: f32, mass: f32) -> Self {
        self.player_half_extent = half_extent;
        self.player_mass = mass;
        self
    }

    pub fn with_player_material(mut self, material: SurfaceMaterial) -> Self {
        self.player_friction = material.friction;
        self.player_restitution = material.restitution;
        self
    }

    pub fn with_ground_band(mut self, band: f32) -> Self {
        self.ground_band = band;
        self
    }

    pub fn with_scroll_mode(mut self, mode: ScrollMode) -> Self {
        self.scroll_mode = mode;
        self
    }

    pub fn with_contact_mode(mut self, mode: ContactMode) -> Self {
        self.contact_mode = mode;
        self
    }
}

/// Keys bound to each [`InputAction`].
#[derive(Resource, Reflect, Debug, Clone, PartialEq)]
#[reflect(Resource)]
pub struct KeyBindings {
    pub jump: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            jump: vec![KeyCode::ArrowUp, KeyCode::KeyW, KeyCode::Space],
            left: vec![KeyCode::ArrowLeft, KeyCode::KeyA],
            right: vec![KeyCode::ArrowRight, KeyCode::KeyD],
        }
    }
}

impl KeyBindings {
    pub fn keys_for(&self, action: InputAction) -> &[KeyCode] {
        match action {
            InputAction::Jump => &self.jump,
            InputAction::Left => &self.left,
            InputAction::Right => &self.right,
        }
    }
}
