//! The simulation loop.
//!
//! [`GameSession`] owns the physics world, the terrain and the player. One
//! call to [`GameSession::advance_frame`] runs a full physics step followed
//! by the input sub-steps for the next one.

use bevy::log::{debug, info};
use bevy::prelude::*;
use thiserror::Error;

use crate::backend::PhysicsBackend;
use crate::config::{ConfigError, SessionConfig};
use crate::detection::GroundContact;
use crate::intent::{InputAction, InputSource};
use crate::player::{DrawPose, PlayerController};
use crate::scroll::{Direction, ScrollDecision, ScrollPolicy};
use crate::state::PlayerState;
use crate::terrain::{ImageId, LevelDescription, Terrain};

/// Errors raised while building a session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("level has no terrain segments")]
    EmptyLevel,
    #[error("terrain segment {index} is degenerate")]
    DegenerateSegment { index: usize },
    #[error("player shape was rejected by the physics backend")]
    PlayerShapeRejected,
}

/// Where to draw one terrain segment.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SegmentDraw {
    pub image: ImageId,
    /// Top-left corner in screen space.
    pub position: Vec2,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSnapshot {
    pub player: DrawPose,
    pub segments: Vec<SegmentDraw>,
    pub camera_x: f32,
    pub logical_x: f32,
    pub grounded: bool,
}

/// A running side-scroller: physics, terrain and player.
#[derive(Resource)]
pub struct GameSession<B: PhysicsBackend> {
    config: SessionConfig,
    physics: B,
    terrain: Terrain,
    player: PlayerController,
    frame: u64,
}

impl<B: PhysicsBackend> GameSession<B> {
    /// Build a session with the strategies selected by `config`.
    pub fn new(config: SessionConfig, level: &LevelDescription) -> Result<Self, SessionError> {
        Self::with_strategies(
            config,
            level,
            config.scroll_policy(),
            config.ground_contact(),
        )
    }

    /// Build a session with explicit strategies.
    pub fn with_strategies(
        config: SessionConfig,
        level: &LevelDescription,
        policy: Box<dyn ScrollPolicy>,
        contact: Box<dyn GroundContact>,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let mut physics = B::with_settings(config.physics_settings());
        let terrain = Terrain::build(&mut physics, level)?;
        let player = PlayerController::spawn_with(&mut physics, &config, policy, contact)?;

        info!(
            segments = terrain.segments().len(),
            substeps = config.substeps,
            policy = player.policy_name(),
            "session started"
        );

        Ok(Self {
            config,
            physics,
            terrain,
            player,
            frame: 0,
        })
    }

    /// Step physics once, then run every input sub-step.
    pub fn advance_frame(&mut self, input: &impl InputSource) {
        self.physics.step(self.config.timestep);
        self.player.resync_logical_position(&self.physics);
        self.player.begin_frame(&mut self.physics);

        for _ in 0..self.config.substeps {
            self.player.reset_forces_for_substep();
            self.player.stabilize(&mut self.physics);

            if input.is_held(InputAction::Jump) {
                self.player.jump(&self.physics, &self.terrain);
            }
            if let Some(direction) = input.horizontal() {
                self.player
                    .move_horizontal(&mut self.physics, &mut self.terrain, direction);
            }

            self.player.commit_substep(&mut self.physics);
        }

        self.frame += 1;
        if self.frame % 600 == 0 {
            debug!(
                frame = self.frame,
                logical_x = self.player.state().logical_x,
                world_shift = self.player.state().world_shift,
                velocity = ?self.player_velocity(),
                "session progress"
            );
        }
    }

    /// Advance `frames` frames with the same input.
    pub fn run_frames(&mut self, frames: usize, input: &impl InputSource) {
        for _ in 0..frames {
            self.advance_frame(input);
        }
    }

    /// Draw data for the current state.
    pub fn snapshot(&self) -> FrameSnapshot {
        let camera = Vec2::new(self.player.state().camera_x, 0.0);
        FrameSnapshot {
            player: self.player.draw_pose(&self.physics),
            segments: self
                .terrain
                .segments()
                .iter()
                .map(|segment| SegmentDraw {
                    image: segment.image,
                    position: segment.draw_origin - camera,
                })
                .collect(),
            camera_x: camera.x,
            logical_x: self.player.state().logical_x,
            grounded: self.is_grounded(),
        }
    }

    /// Resolve one horizontal move without running physics.
    pub fn nudge(&mut self, direction: Direction) -> ScrollDecision {
        self.player
            .move_horizontal(&mut self.physics, &mut self.terrain, direction)
    }

    pub fn is_grounded(&self) -> bool {
        self.player.is_grounded(&self.physics, &self.terrain)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn physics(&self) -> &B {
        &self.physics
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn state(&self) -> &PlayerState {
        self.player.state()
    }

    /// Current body position of the player.
    pub fn player_position(&self) -> Vec2 {
        self.physics.body_position(self.player.body())
    }

    /// Current linear velocity of the player body.
    pub fn player_velocity(&self) -> Vec2 {
        self.physics.body_velocity(self.player.body())
    }

    /// Frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
