//! Side Scroller Example
//!
//! A playable example with a box-shaped player on a long row of earth tiles.
//! The camera never moves: once the player walks into the middle of the
//! screen the terrain scrolls underneath instead.
//!
//! ## Controls
//! - **A/D** or **Left/Right**: Move horizontally
//! - **W/Up/Space**: Jump (only while standing on ground)
//!
//! Pass `upright` or `camera` as the first argument to try the other presets.

use bevy::prelude::*;
use msg_side_scroller::prelude::*;

// ==================== Constants ====================

const PLAYER_COLOR: Color = Color::srgb(0.9, 0.3, 0.2);
const EARTH_COLOR: Color = Color::srgb(0.45, 0.3, 0.15);
const GROUND_COLOR: Color = Color::srgb(0.3, 0.5, 0.2);

// ==================== Main ====================

fn session_config() -> SessionConfig {
    match std::env::args().nth(1).as_deref() {
        Some("upright") => SessionConfig::upright(),
        Some("camera") => SessionConfig::camera_follow(),
        _ => SessionConfig::prototype(),
    }
}

fn main() {
    let config = session_config();
    let level = LevelDescription::tiled_earth();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Side Scroller - Terrain Scrolling Example".into(),
                resolution: (config.screen_size.x, config.screen_size.y).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(SideScrollPlugin::<RapierWorld>::new(config, level))
        .add_systems(Startup, setup)
        .run();
}

// ==================== Setup ====================

fn setup(
    mut commands: Commands,
    session: Option<Res<GameSession<RapierWorld>>>,
) {
    commands.spawn(Camera2d);

    let Some(session) = session else {
        return;
    };
    let half = session.config().player_half_extent;

    commands.spawn((
        Sprite::from_color(PLAYER_COLOR, Vec2::splat(half * 2.0)),
        Transform::default(),
        PlayerSprite,
    ));

    for (index, segment) in session.terrain().segments().iter().enumerate() {
        let Some(bounds) = session.physics().shape_bounds(segment.shape) else {
            continue;
        };
        let color = if segment.image == ImageId::GROUND {
            GROUND_COLOR
        } else {
            EARTH_COLOR
        };
        let mut sprite = Sprite::from_color(color, bounds.size());
        // Draw origins are top-left corners
        sprite.anchor = bevy::sprite::Anchor::TopLeft;
        commands.spawn((sprite, Transform::default(), TerrainSprite(index)));
    }
}
