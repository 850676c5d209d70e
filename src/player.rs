//! Player controller.
//!
//! [`PlayerController`] turns held input into body forces and horizontal
//! displacements. Horizontal moves are resolved by the configured
//! [`ScrollPolicy`]; jumps are gated by the configured [`GroundContact`].
//!
//! ## Force lifetime
//!
//! Forces are collected in a per-sub-step buffer and added to the body with
//! [`PlayerController::commit_substep`]. The body accumulator is cleared by
//! [`PlayerController::begin_frame`] right after each physics step, so a
//! force only ever acts during the step it was applied in. Holding jump for
//! every sub-step of a step adds up to exactly the configured jump force.

use bevy::log::trace;
use bevy::prelude::*;

use crate::backend::{
    angle_to_unit_vector, BodyDesc, BodyId, CollisionCategory, PhysicsBackend, ShapeDesc,
    ShapeId,
};
use crate::config::SessionConfig;
use crate::detection::GroundContact;
use crate::scroll::{Direction, ScrollAction, ScrollDecision, ScrollInput, ScrollLimits, ScrollPolicy};
use crate::session::SessionError;
use crate::state::{PlayerState, FACING_UP};
use crate::terrain::Terrain;

/// Where to draw the player, in screen space (y down).
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawPose {
    pub x: f32,
    pub y: f32,
    /// Body orientation in radians.
    pub angle: f32,
}

/// The player body and everything needed to move it.
pub struct PlayerController {
    body: BodyId,
    shape: ShapeId,
    state: PlayerState,
    limits: ScrollLimits,
    move_step: f32,
    jump_force: f32,
    policy: Box<dyn ScrollPolicy>,
    contact: Box<dyn GroundContact>,
    substep_force: Vec2,
}

impl PlayerController {
    /// Create the player body with the strategies selected by `config`.
    pub fn spawn<B: PhysicsBackend>(
        physics: &mut B,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        Self::spawn_with(physics, config, config.scroll_policy(), config.ground_contact())
    }

    /// Create the player body with explicit strategies.
    pub fn spawn_with<B: PhysicsBackend>(
        physics: &mut B,
        config: &SessionConfig,
        policy: Box<dyn ScrollPolicy>,
        contact: Box<dyn GroundContact>,
    ) -> Result<Self, SessionError> {
        let shape = ShapeDesc::square(config.player_half_extent)
            .with_material(config.player_material())
            .with_category(CollisionCategory::Player);
        let moment = shape.moment(config.player_mass);

        let body = physics.add_body(
            BodyDesc::new(config.spawn, config.player_mass, moment).with_angle(FACING_UP),
        );
        let shape = physics
            .add_shape(body, &shape)
            .ok_or(SessionError::PlayerShapeRejected)?;

        trace!(?body, moment, policy = policy.name(), "player spawned");

        Ok(Self {
            body,
            shape,
            state: PlayerState::new(config.spawn.x, config.home_dead_zone()),
            limits: config.scroll_limits(),
            move_step: config.move_step,
            jump_force: config.jump_force_per_substep(),
            policy,
            contact,
            substep_force: Vec2::ZERO,
        })
    }

    #[inline]
    pub fn body(&self) -> BodyId {
        self.body
    }

    #[inline]
    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    #[inline]
    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    #[inline]
    pub fn limits(&self) -> &ScrollLimits {
        &self.limits
    }

    /// Name of the active scroll policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Force collected in the current sub-step, not yet committed.
    #[inline]
    pub fn pending_force(&self) -> Vec2 {
        self.substep_force
    }

    /// Whether the ground contact strategy allows jumping right now.
    pub fn is_grounded<B: PhysicsBackend>(&self, physics: &B, terrain: &Terrain) -> bool {
        let body_y = physics.body_position(self.body).y;
        self.contact
            .is_grounded(self.state.logical_x, body_y, terrain)
    }

    /// Push along the facing direction if grounded.
    ///
    /// Returns whether any force was applied.
    pub fn jump<B: PhysicsBackend>(&mut self, physics: &B, terrain: &Terrain) -> bool {
        if !self.is_grounded(physics, terrain) {
            trace!(logical_x = self.state.logical_x, "jump ignored, airborne");
            return false;
        }
        self.substep_force += angle_to_unit_vector(self.state.facing) * self.jump_force;
        true
    }

    pub fn move_left<B: PhysicsBackend>(
        &mut self,
        physics: &mut B,
        terrain: &mut Terrain,
    ) -> ScrollDecision {
        self.move_horizontal(physics, terrain, Direction::Left)
    }

    pub fn move_right<B: PhysicsBackend>(
        &mut self,
        physics: &mut B,
        terrain: &mut Terrain,
    ) -> ScrollDecision {
        self.move_horizontal(physics, terrain, Direction::Right)
    }

    /// Resolve one horizontal move through the scroll policy and carry it out.
    pub fn move_horizontal<B: PhysicsBackend>(
        &mut self,
        physics: &mut B,
        terrain: &mut Terrain,
        direction: Direction,
    ) -> ScrollDecision {
        let decision = self.policy.decide(&ScrollInput {
            logical_x: self.state.logical_x,
            dead_zone: self.state.dead_zone,
            limits: self.limits,
            direction,
            step: self.move_step,
        });
        let delta = decision.delta(direction);

        match decision.action {
            ScrollAction::MovePlayer => {
                physics.translate_body(self.body, Vec2::new(delta, 0.0));
            }
            ScrollAction::ShiftWorld => {
                terrain.shift(physics, -delta);
                self.state.world_shift += delta;
            }
            ScrollAction::PanCamera => {
                physics.translate_body(self.body, Vec2::new(delta, 0.0));
                self.state.camera_x += delta;
            }
            ScrollAction::Clamped => {}
        }

        // Derived rather than accumulated so it stays exact
        let body_x = physics.body_position(self.body).x;
        self.state.logical_x = self.state.logical_from_body(body_x);
        if decision.zone_shift != 0.0 {
            self.state.drift_dead_zone(decision.zone_shift, &self.limits.home);
        }

        trace!(
            ?direction,
            action = ?decision.action,
            logical_x = self.state.logical_x,
            world_shift = self.state.world_shift,
            "move resolved"
        );
        decision
    }

    /// Clear the sub-step force buffer.
    pub fn reset_forces_for_substep(&mut self) {
        self.substep_force = Vec2::ZERO;
    }

    /// Add the sub-step force buffer to the body.
    pub fn commit_substep<B: PhysicsBackend>(&mut self, physics: &mut B) {
        if self.substep_force != Vec2::ZERO {
            physics.apply_force(self.body, self.substep_force);
        }
        self.substep_force = Vec2::ZERO;
    }

    /// Drop forces consumed by the last physics step.
    pub fn begin_frame<B: PhysicsBackend>(&mut self, physics: &mut B) {
        physics.reset_forces(self.body);
        self.substep_force = Vec2::ZERO;
    }

    /// Apply the upright lock of the contact strategy, if it has one.
    pub fn stabilize<B: PhysicsBackend>(&self, physics: &mut B) {
        if let Some(angle) = self.contact.upright_angle() {
            physics.lock_body_angle(self.body, angle);
        }
    }

    /// Recompute the logical position from the body after a physics step.
    pub fn resync_logical_position<B: PhysicsBackend>(&mut self, physics: &B) {
        let body_x = physics.body_position(self.body).x;
        self.state.previous_x = self.state.logical_x;
        self.state.logical_x = self.state.logical_from_body(body_x);
    }

    /// Screen-space pose of the player body.
    pub fn draw_pose<B: PhysicsBackend>(&self, physics: &B) -> DrawPose {
        let position = physics.body_position(self.body);
        DrawPose {
            x: position.x - self.state.camera_x,
            y: position.y,
            angle: physics.body_angle(self.body),
        }
    }
}

#[cfg(all(test, feature = "rapier2d"))]
mod tests {
    use super::*;
    use crate::config::{ContactMode, ScrollMode};
    use crate::rapier::RapierWorld;
    use crate::terrain::LevelDescription;

    fn setup(config: SessionConfig) -> (RapierWorld, Terrain, PlayerController) {
        let mut physics = RapierWorld::with_settings(config.physics_settings());
        let terrain = Terrain::build(&mut physics, &LevelDescription::tiled_earth()).unwrap();
        let player = PlayerController::spawn(&mut physics, &config).unwrap();
        (physics, terrain, player)
    }

    #[test]
    fn spawn_places_body() {
        let (physics, _terrain, player) = setup(SessionConfig::default());
        assert_eq!(physics.body_position(player.body()), Vec2::new(200.0, 200.0));
        assert_eq!(player.state().logical_x, 200.0);
        assert_eq!(player.policy_name(), "dead_zone");
    }

    #[test]
    fn move_outside_dead_zone_moves_body() {
        let (mut physics, mut terrain, mut player) = setup(SessionConfig::default());
        let decision = player.move_right(&mut physics, &mut terrain);
        assert_eq!(decision.action, ScrollAction::MovePlayer);
        assert!((physics.body_position(player.body()).x - 200.8).abs() < 1e-4);
        assert!((player.state().logical_x - 200.8).abs() < 1e-4);
        assert_eq!(terrain.scroll(), 0.0);
    }

    #[test]
    fn move_inside_dead_zone_shifts_terrain() {
        let config = SessionConfig::default().with_spawn(Vec2::new(640.0, 200.0));
        let (mut physics, mut terrain, mut player) = setup(config);
        let decision = player.move_right(&mut physics, &mut terrain);
        assert_eq!(decision.action, ScrollAction::ShiftWorld);
        assert!((physics.body_position(player.body()).x - 640.0).abs() < 1e-4);
        assert!((player.state().world_shift - 0.8).abs() < 1e-5);
        assert!((terrain.scroll() - 0.8).abs() < 1e-5);
        let body_x = physics.body_position(player.body()).x;
        assert!(player.state().is_consistent(body_x, 1e-4));
    }

    #[test]
    fn camera_follow_pans_instead_of_shifting() {
        let config = SessionConfig::camera_follow().with_spawn(Vec2::new(640.0, 200.0));
        assert_eq!(config.scroll_mode, ScrollMode::Camera);
        let (mut physics, mut terrain, mut player) = setup(config);

        player.move_right(&mut physics, &mut terrain);

        assert_eq!(terrain.scroll(), 0.0);
        assert!((player.state().camera_x - 0.8).abs() < 1e-5);
        let pose = player.draw_pose(&physics);
        assert!((pose.x - 640.0).abs() < 1e-4);
    }

    #[test]
    fn jump_requires_ground() {
        let (physics, terrain, mut player) = setup(SessionConfig::default());
        // Spawned at y = 200, far above the surface at 600
        assert!(!player.jump(&physics, &terrain));
        assert_eq!(player.pending_force(), Vec2::ZERO);
    }

    #[test]
    fn jump_force_is_split_across_substeps() {
        let config = SessionConfig::default().with_spawn(Vec2::new(300.0, 585.0));
        let (mut physics, terrain, mut player) = setup(config);

        player.begin_frame(&mut physics);
        for _ in 0..config.substeps {
            player.reset_forces_for_substep();
            assert!(player.jump(&physics, &terrain));
            player.commit_substep(&mut physics);
        }

        let total = physics.accumulated_force(player.body());
        assert!((total - Vec2::new(0.0, -10_000.0)).length() < 0.5, "total = {total}");

        player.begin_frame(&mut physics);
        assert_eq!(physics.accumulated_force(player.body()), Vec2::ZERO);
    }

    #[test]
    fn reset_forces_for_substep_drops_uncommitted_force() {
        let config = SessionConfig::default().with_spawn(Vec2::new(300.0, 585.0));
        let (mut physics, terrain, mut player) = setup(config);
        assert!(player.jump(&physics, &terrain));
        player.reset_forces_for_substep();
        player.commit_substep(&mut physics);
        assert_eq!(physics.accumulated_force(player.body()), Vec2::ZERO);
    }

    #[test]
    fn upright_lock_allows_jump_anywhere_and_locks_angle() {
        let config = SessionConfig::upright();
        assert_eq!(config.contact_mode, ContactMode::UprightLock);
        let (mut physics, terrain, mut player) = setup(config);

        assert!(player.jump(&physics, &terrain));
        physics.lock_body_angle(player.body(), 1.0);
        player.stabilize(&mut physics);
        let up = angle_to_unit_vector(physics.body_angle(player.body()));
        assert!((up - angle_to_unit_vector(FACING_UP)).length() < 1e-5);
    }

    #[test]
    fn body_spawns_facing_up() {
        for config in [SessionConfig::prototype(), SessionConfig::upright()] {
            let (physics, _terrain, player) = setup(config);
            let pose = player.draw_pose(&physics);
            let body_up = angle_to_unit_vector(pose.angle);
            let facing = angle_to_unit_vector(player.state().facing);
            println!("PROOF: facing = {facing:?}, body = {body_up:?}");
            assert!((body_up - facing).length() < 1e-5);
            assert!((body_up - Vec2::NEG_Y).length() < 1e-5);
        }
    }

    #[test]
    fn resync_tracks_previous_position() {
        let (mut physics, mut terrain, mut player) = setup(SessionConfig::default());
        player.move_right(&mut physics, &mut terrain);
        player.resync_logical_position(&physics);
        physics.translate_body(player.body(), Vec2::new(2.0, 0.0));
        player.resync_logical_position(&physics);
        assert!((player.state().frame_delta() - 2.0).abs() < 1e-4);
    }
}
