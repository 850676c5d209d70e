//! Bevy systems driving a [`GameSession`].
//!
//! The session lives in a resource and is advanced once per fixed tick.
//! Sprites opt in to pose sync with [`PlayerSprite`] or [`TerrainSprite`].

use bevy::prelude::*;

use crate::backend::PhysicsBackend;
use crate::config::KeyBindings;
use crate::intent::{HeldInput, InputAction, InputSource, KeyboardInput};
use crate::session::GameSession;

/// Marks the entity drawn at the player pose.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct PlayerSprite;

/// Marks the entity drawn at terrain segment `.0`.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct TerrainSprite(pub usize);

/// Keyboard and scripted input merged: an action is held if either holds it.
struct MergedInput<'a> {
    keyboard: Option<KeyboardInput<'a>>,
    scripted: Option<&'a HeldInput>,
}

impl InputSource for MergedInput<'_> {
    fn is_held(&self, action: InputAction) -> bool {
        self.keyboard.as_ref().is_some_and(|k| k.is_held(action))
            || self.scripted.is_some_and(|s| s.is_held(action))
    }
}

/// Advance the session by one frame.
///
/// Reads the keyboard when `ButtonInput<KeyCode>` exists and also honours a
/// [`HeldInput`] resource, so headless apps can drive the player.
pub fn advance_session<B: PhysicsBackend>(
    session: Option<ResMut<GameSession<B>>>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    bindings: Res<KeyBindings>,
    scripted: Option<Res<HeldInput>>,
) {
    let Some(mut session) = session else {
        return;
    };
    let input = MergedInput {
        keyboard: keys.as_deref().map(|k| KeyboardInput::new(k, &bindings)),
        scripted: scripted.as_deref(),
    };
    session.advance_frame(&input);
}

/// Convert a y-down screen position to Bevy's centered y-up world space.
#[inline]
pub fn screen_to_world(screen: Vec2, screen_size: Vec2) -> Vec2 {
    Vec2::new(screen.x - screen_size.x * 0.5, screen_size.y * 0.5 - screen.y)
}

/// Copy the session's draw poses onto tagged transforms.
pub fn sync_draw_poses<B: PhysicsBackend>(
    session: Option<Res<GameSession<B>>>,
    mut players: Query<&mut Transform, (With<PlayerSprite>, Without<TerrainSprite>)>,
    mut segments: Query<(&TerrainSprite, &mut Transform), Without<PlayerSprite>>,
) {
    let Some(session) = session else {
        return;
    };
    let snapshot = session.snapshot();
    let screen_size = session.config().screen_size;

    for mut transform in &mut players {
        let world = screen_to_world(
            Vec2::new(snapshot.player.x, snapshot.player.y),
            screen_size,
        );
        transform.translation.x = world.x;
        transform.translation.y = world.y;
        // Flipping y reverses the sense of rotation
        transform.rotation = Quat::from_rotation_z(-snapshot.player.angle);
    }

    for (sprite, mut transform) in &mut segments {
        let Some(draw) = snapshot.segments.get(sprite.0) else {
            continue;
        };
        let world = screen_to_world(draw.position, screen_size);
        transform.translation.x = world.x;
        transform.translation.y = world.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_to_world_centers_origin() {
        let size = Vec2::new(1280.0, 1024.0);
        assert_eq!(screen_to_world(Vec2::new(640.0, 512.0), size), Vec2::ZERO);
        assert_eq!(
            screen_to_world(Vec2::ZERO, size),
            Vec2::new(-640.0, 512.0)
        );
        assert_eq!(
            screen_to_world(Vec2::new(1280.0, 1024.0), size),
            Vec2::new(640.0, -512.0)
        );
    }

    #[test]
    fn merged_input_ors_sources() {
        let bindings = KeyBindings::default();
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::ArrowLeft);
        let scripted = HeldInput::none().with_jump();

        let input = MergedInput {
            keyboard: Some(KeyboardInput::new(&keys, &bindings)),
            scripted: Some(&scripted),
        };
        assert!(input.is_held(InputAction::Left));
        assert!(input.is_held(InputAction::Jump));
        assert!(!input.is_held(InputAction::Right));

        let empty = MergedInput {
            keyboard: None,
            scripted: None,
        };
        assert!(!empty.is_held(InputAction::Jump));
    }
}
