//! # `msg_side_scroller`
//!
//! A 2D side-scrolling rigid-body player controller with physics backend
//! abstraction.
//!
//! The player is a dynamic box in a rigid-body simulation. Instead of moving
//! a camera, the controller shifts the static terrain whenever the player
//! walks inside a dead zone around the middle of the screen:
//! - Horizontal moves are teleports decided by a [`scroll::ScrollPolicy`]
//! - Jumps are forces gated by a [`detection::GroundContact`] strategy
//! - Gravity, collisions and landing are left to the physics engine
//! - The physics engine is abstracted (Rapier2D included)
//!
//! ## Architecture
//!
//! Every frame the [`session::GameSession`]:
//! 1. Steps the physics world once
//! 2. Re-derives the player's logical position from its body
//! 3. Runs a fixed number of input sub-steps, each of which may apply jump
//!    force and resolve one horizontal move
//!
//! The logical position always equals the body position plus the total
//! distance the world has been shifted.
//!
//! ## Usage
//!
//! ```rust
//! use msg_side_scroller::prelude::*;
//!
//! let mut session = GameSession::<RapierWorld>::new(
//!     SessionConfig::prototype(),
//!     &LevelDescription::tiled_earth(),
//! )
//! .unwrap();
//!
//! session.advance_frame(&HeldInput::none().with_right());
//! assert!(session.state().logical_x > 200.0);
//! ```

use std::marker::PhantomData;

use bevy::prelude::*;

pub mod backend;
pub mod config;
pub mod detection;
pub mod intent;
pub mod player;
pub mod scroll;
pub mod session;
pub mod state;
pub mod systems;
pub mod terrain;

#[cfg(feature = "rapier2d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{
        angle_to_unit_vector, BodyId, CollisionCategory, PhysicsBackend, PhysicsSettings,
        ShapeDesc, ShapeId, SurfaceMaterial,
    };
    pub use crate::config::{ConfigError, ContactMode, KeyBindings, ScrollMode, SessionConfig};
    pub use crate::detection::{GroundContact, GroundProbe, SpanContact, UprightLock};
    pub use crate::intent::{HeldInput, InputAction, InputSource, KeyboardInput};
    pub use crate::player::{DrawPose, PlayerController};
    pub use crate::scroll::{
        CameraFollow, DeadZone, DeadZoneScroll, Direction, ScrollAction, ScrollDecision,
        ScrollPolicy, WorldBounds,
    };
    pub use crate::session::{FrameSnapshot, GameSession, SegmentDraw, SessionError};
    pub use crate::state::{PlayerState, FACING_UP};
    pub use crate::systems::{PlayerSprite, TerrainSprite};
    pub use crate::terrain::{GroundSpan, ImageId, LevelDescription, SegmentDesc, Terrain};
    pub use crate::SideScrollPlugin;

    #[cfg(feature = "rapier2d")]
    pub use crate::rapier::RapierWorld;
}

/// Main plugin for the side scroller.
///
/// This plugin is generic over a physics backend `B`. It builds a
/// [`session::GameSession`] from its configuration and level, advances it
/// in `FixedUpdate` and syncs tagged sprites in `PostUpdate`.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `RapierWorld`)
///
/// # Examples
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use msg_side_scroller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(SideScrollPlugin::<RapierWorld>::default())
///     .run();
/// ```
pub struct SideScrollPlugin<B: backend::PhysicsBackend> {
    pub config: config::SessionConfig,
    pub level: terrain::LevelDescription,
    _marker: PhantomData<B>,
}

impl<B: backend::PhysicsBackend> Default for SideScrollPlugin<B> {
    fn default() -> Self {
        Self::new(
            config::SessionConfig::default(),
            terrain::LevelDescription::tiled_earth(),
        )
    }
}

impl<B: backend::PhysicsBackend> SideScrollPlugin<B> {
    pub fn new(config: config::SessionConfig, level: terrain::LevelDescription) -> Self {
        Self {
            config,
            level,
            _marker: PhantomData,
        }
    }
}

impl<B: backend::PhysicsBackend> Plugin for SideScrollPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::SessionConfig>();
        app.register_type::<config::KeyBindings>();
        app.register_type::<intent::HeldInput>();
        app.register_type::<systems::PlayerSprite>();
        app.register_type::<systems::TerrainSprite>();

        app.insert_resource(self.config);
        app.init_resource::<config::KeyBindings>();
        app.insert_resource(Time::<Fixed>::from_seconds(self.config.timestep as f64));

        match session::GameSession::<B>::new(self.config, &self.level) {
            Ok(session) => {
                app.insert_resource(session);
            }
            Err(err) => {
                error!("side scroller session not started: {err}");
            }
        }

        app.add_systems(FixedUpdate, systems::advance_session::<B>);
        app.add_systems(PostUpdate, systems::sync_draw_poses::<B>);
    }
}
