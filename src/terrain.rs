//! Static terrain that scrolls instead of the camera.
//!
//! A [`Terrain`] is a row of static [`TerrainSegment`]s registered with the
//! physics backend. Scrolling translates every segment body and draw origin
//! by the same delta and rehashes the static geometry in the same call, so
//! the collision pipeline can never observe a half-shifted world.

use bevy::log::{debug, info};
use bevy::prelude::*;

use crate::backend::{
    BodyId, CollisionCategory, PhysicsBackend, ShapeDesc, ShapeId, SurfaceMaterial,
};
use crate::session::SessionError;

/// Identifier of the source image a segment is drawn with.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageId(pub u32);

impl ImageId {
    /// The earth tile image.
    pub const EARTH: ImageId = ImageId(0);
    /// The flat ground slab image.
    pub const GROUND: ImageId = ImageId(1);
}

/// Description of one static terrain piece.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDesc {
    /// World position of the segment body.
    pub origin: Vec2,
    /// Closed vertex loop relative to `origin`.
    pub vertices: Vec<Vec2>,
    pub material: SurfaceMaterial,
    pub image: ImageId,
    /// Offset from `origin` to the top-left corner of the drawn image.
    pub draw_offset: Vec2,
}

impl SegmentDesc {
    /// Axis-aligned box with its top-left corner at `top_left`.
    ///
    /// The body origin sits at the box center and the image is drawn from
    /// the top-left corner.
    pub fn rect(top_left: Vec2, size: Vec2, material: SurfaceMaterial, image: ImageId) -> Self {
        let half = size * 0.5;
        Self {
            origin: top_left + half,
            vertices: vec![
                Vec2::new(-half.x, -half.y),
                Vec2::new(half.x, -half.y),
                Vec2::new(half.x, half.y),
                Vec2::new(-half.x, half.y),
            ],
            material,
            image,
            draw_offset: -half,
        }
    }
}

/// A full level: the terrain pieces in left-to-right order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelDescription {
    pub segments: Vec<SegmentDesc>,
}

impl LevelDescription {
    /// Number of tiles in [`LevelDescription::tiled_earth`].
    pub const EARTH_TILE_COUNT: usize = 180;
    /// Width and height of one earth tile.
    pub const EARTH_TILE_SIZE: f32 = 30.0;
    /// X of the first earth tile's left edge.
    pub const EARTH_START_X: f32 = 115.0;
    /// Y of the walkable surface in both presets.
    pub const SURFACE_Y: f32 = 600.0;

    /// Build a level from an explicit segment list.
    pub fn new(segments: Vec<SegmentDesc>) -> Self {
        Self { segments }
    }

    /// Row of square earth tiles.
    ///
    /// Tile `i` spans `[115 + 30 i, 145 + 30 i]` horizontally with its top
    /// surface at `y = 600`. Tiles carry friction 1 and restitution 1, so the
    /// player's own coefficients decide how it slides and bounces.
    pub fn tiled_earth() -> Self {
        let size = Vec2::splat(Self::EARTH_TILE_SIZE);
        let material = SurfaceMaterial::new(1.0, 1.0);
        let segments = (0..Self::EARTH_TILE_COUNT)
            .map(|i| {
                let left = Self::EARTH_START_X + Self::EARTH_TILE_SIZE * i as f32;
                SegmentDesc::rect(
                    Vec2::new(left, Self::SURFACE_Y),
                    size,
                    material,
                    ImageId::EARTH,
                )
            })
            .collect();
        Self { segments }
    }

    /// One flat slab of the given length starting at `x = 0`.
    pub fn single_ground(length: f32) -> Self {
        Self {
            segments: vec![SegmentDesc::rect(
                Vec2::new(0.0, Self::SURFACE_Y),
                Vec2::new(length, 100.0),
                SurfaceMaterial::new(1.0, 1.0),
                ImageId::GROUND,
            )],
        }
    }

    /// Logical horizontal extent covered by the level.
    pub fn extent(&self) -> Option<(f32, f32)> {
        self.segments.iter().fold(None, |acc, segment| {
            let xs = segment.vertices.iter().map(|v| segment.origin.x + v.x);
            let (lo, hi) = xs.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            });
            match acc {
                None => Some((lo, hi)),
                Some((a, b)) => Some((a.min(lo), b.max(hi))),
            }
        })
    }
}

/// Walkable region under a point, in logical (unscrolled) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSpan {
    /// Horizontal center of the span.
    pub ground_x: f32,
    /// Top surface.
    pub ground_y: f32,
    pub half_width: f32,
    pub height: f32,
}

impl GroundSpan {
    /// Whether `x` lies within the horizontal extent of the span.
    #[inline]
    pub fn contains_x(&self, x: f32) -> bool {
        (x - self.ground_x).abs() <= self.half_width
    }
}

/// A static terrain piece registered with the physics backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSegment {
    pub body: BodyId,
    pub shape: ShapeId,
    /// Current (scrolled) body position.
    pub origin: Vec2,
    /// Current (scrolled) top-left corner of the drawn image.
    pub draw_origin: Vec2,
    pub image: ImageId,
    /// Local bounds of the collision polygon relative to `origin`.
    local_bounds: Rect,
}

impl TerrainSegment {
    /// Span of this segment in logical coordinates, given the terrain scroll.
    pub fn ground_span(&self, scroll: f32) -> GroundSpan {
        let center = self.local_bounds.center();
        let half = self.local_bounds.half_size();
        GroundSpan {
            ground_x: self.origin.x + center.x + scroll,
            ground_y: self.origin.y + self.local_bounds.min.y,
            half_width: half.x,
            height: self.local_bounds.height(),
        }
    }
}

/// The scrollable static world.
#[derive(Debug, Clone, Default)]
pub struct Terrain {
    segments: Vec<TerrainSegment>,
    scroll: f32,
}

impl Terrain {
    /// Register every segment of `level` as static geometry.
    pub fn build<B: PhysicsBackend>(
        physics: &mut B,
        level: &LevelDescription,
    ) -> Result<Self, SessionError> {
        if level.segments.is_empty() {
            return Err(SessionError::EmptyLevel);
        }

        let mut segments = Vec::with_capacity(level.segments.len());
        for (index, desc) in level.segments.iter().enumerate() {
            let shape = ShapeDesc::polygon(desc.vertices.clone())
                .with_material(desc.material)
                .with_category(CollisionCategory::Earth);
            let local_bounds = shape
                .local_bounds()
                .ok_or(SessionError::DegenerateSegment { index })?;
            let (body, shape) = physics
                .add_static_shape(desc.origin, &shape)
                .ok_or(SessionError::DegenerateSegment { index })?;
            segments.push(TerrainSegment {
                body,
                shape,
                origin: desc.origin,
                draw_origin: desc.origin + desc.draw_offset,
                image: desc.image,
                local_bounds,
            });
        }
        physics.notify_static_moved();

        info!(segments = segments.len(), "terrain built");
        Ok(Self {
            segments,
            scroll: 0.0,
        })
    }

    /// Move everything left by `distance`.
    pub fn shift_left<B: PhysicsBackend>(&mut self, physics: &mut B, distance: f32) {
        self.shift(physics, -distance);
    }

    /// Move everything right by `distance`.
    pub fn shift_right<B: PhysicsBackend>(&mut self, physics: &mut B, distance: f32) {
        self.shift(physics, distance);
    }

    /// Translate every segment by a signed horizontal `delta` and resync the
    /// static index.
    pub fn shift<B: PhysicsBackend>(&mut self, physics: &mut B, delta: f32) {
        if delta == 0.0 {
            return;
        }
        let offset = Vec2::new(delta, 0.0);
        for segment in &mut self.segments {
            physics.translate_body(segment.body, offset);
            segment.origin += offset;
            segment.draw_origin += offset;
        }
        physics.notify_static_moved();
        self.scroll -= delta;
        debug!(delta, scroll = self.scroll, "terrain shifted");
    }

    /// Cumulative distance the terrain has moved left.
    #[inline]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn segments(&self) -> &[TerrainSegment] {
        &self.segments
    }

    /// Ground span under a logical x, if any.
    ///
    /// When spans overlap the one with the highest surface wins.
    pub fn ground_span_at(&self, logical_x: f32) -> Option<GroundSpan> {
        self.segments
            .iter()
            .map(|segment| segment.ground_span(self.scroll))
            .filter(|span| span.contains_x(logical_x))
            .min_by(|a, b| a.ground_y.total_cmp(&b.ground_y))
    }
}

#[cfg(all(test, feature = "rapier2d"))]
mod tests {
    use super::*;
    use crate::backend::PhysicsSettings;
    use crate::rapier::RapierWorld;

    fn world() -> RapierWorld {
        RapierWorld::with_settings(PhysicsSettings::default())
    }

    #[test]
    fn tiled_earth_layout() {
        let level = LevelDescription::tiled_earth();
        assert_eq!(level.segments.len(), 180);
        let (lo, hi) = level.extent().unwrap();
        assert!((lo - 115.0).abs() < 1e-4);
        assert!((hi - 5515.0).abs() < 1e-2);
    }

    #[test]
    fn build_registers_one_body_per_segment() {
        let mut physics = world();
        let terrain = Terrain::build(&mut physics, &LevelDescription::tiled_earth()).unwrap();
        assert_eq!(terrain.segments().len(), 180);
        assert_eq!(physics.body_count(), 180);
        assert_eq!(terrain.scroll(), 0.0);
    }

    #[test]
    fn empty_level_is_rejected() {
        let mut physics = world();
        let err = Terrain::build(&mut physics, &LevelDescription::default()).unwrap_err();
        assert!(matches!(err, SessionError::EmptyLevel));
    }

    #[test]
    fn degenerate_segment_is_rejected_by_index() {
        let mut physics = world();
        let mut level = LevelDescription::single_ground(200.0);
        level.segments.push(SegmentDesc {
            origin: Vec2::ZERO,
            vertices: vec![Vec2::ZERO, Vec2::X],
            material: SurfaceMaterial::default(),
            image: ImageId::GROUND,
            draw_offset: Vec2::ZERO,
        });
        let err = Terrain::build(&mut physics, &level).unwrap_err();
        assert!(matches!(err, SessionError::DegenerateSegment { index: 1 }));
    }

    #[test]
    fn ground_span_of_first_tile() {
        let mut physics = world();
        let terrain = Terrain::build(&mut physics, &LevelDescription::tiled_earth()).unwrap();
        let span = terrain.ground_span_at(125.0).unwrap();
        assert!((span.ground_x - 130.0).abs() < 1e-4);
        assert!((span.ground_y - 600.0).abs() < 1e-4);
        assert!((span.half_width - 15.0).abs() < 1e-4);
        assert!((span.height - 30.0).abs() < 1e-4);
        assert!(terrain.ground_span_at(110.0).is_none());
    }

    #[test]
    fn ground_span_is_stable_under_scroll() {
        let mut physics = world();
        let mut terrain = Terrain::build(&mut physics, &LevelDescription::tiled_earth()).unwrap();
        let before = terrain.ground_span_at(410.0).unwrap();
        terrain.shift_left(&mut physics, 123.4);
        let after = terrain.ground_span_at(410.0).unwrap();
        assert!((before.ground_x - after.ground_x).abs() < 1e-3);
        assert!((terrain.scroll() - 123.4).abs() < 1e-4);
    }

    #[test]
    fn shift_moves_bodies_draw_origins_and_bounds_together() {
        let mut physics = world();
        let mut terrain =
            Terrain::build(&mut physics, &LevelDescription::single_ground(1000.0)).unwrap();
        let segment = terrain.segments()[0].clone();

        terrain.shift_left(&mut physics, 40.0);

        let moved = &terrain.segments()[0];
        assert!((moved.origin.x - (segment.origin.x - 40.0)).abs() < 1e-4);
        assert!((moved.draw_origin.x - (segment.draw_origin.x - 40.0)).abs() < 1e-4);
        assert!((physics.body_position(moved.body).x - moved.origin.x).abs() < 1e-3);
        let bounds = physics.shape_bounds(moved.shape).unwrap();
        assert!((bounds.min.x - -40.0).abs() < 0.01, "bounds = {bounds:?}");
    }

    #[test]
    fn shift_left_then_right_restores_offsets() {
        let mut physics = world();
        let mut terrain = Terrain::build(&mut physics, &LevelDescription::tiled_earth()).unwrap();
        let before: Vec<Vec2> = terrain.segments().iter().map(|s| s.draw_origin).collect();

        terrain.shift_left(&mut physics, 0.8);
        terrain.shift_left(&mut physics, 17.25);
        terrain.shift_right(&mut physics, 17.25);
        terrain.shift_right(&mut physics, 0.8);

        for (segment, original) in terrain.segments().iter().zip(before) {
            assert!((segment.draw_origin - original).length() < 1e-3);
        }
        assert!(terrain.scroll().abs() < 1e-4);
    }
}
