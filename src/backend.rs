//! Physics backend abstraction.
//!
//! This module defines what the scroll controller needs from a rigid-body
//! engine: registering bodies and shapes, stepping the simulation, moving
//! bodies directly and keeping static geometry consistent after it has been
//! repositioned. This allows the engine to be swapped without touching the
//! controller.
//!
//! All coordinates are screen-like world units with `y` growing downward.

use bevy::prelude::*;

/// Handle to a rigid body owned by a [`PhysicsBackend`].
///
/// Handles are non-owning: the backend owns every body for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// Handle to a collision shape owned by a [`PhysicsBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

/// Collision category tag carried by a shape.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionCategory {
    /// The player-controlled body.
    Player,
    /// Static terrain.
    Earth,
}

impl CollisionCategory {
    /// Bit used for this category in collision group masks.
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            CollisionCategory::Player => 1 << 0,
            CollisionCategory::Earth => 1 << 1,
        }
    }
}

/// Surface response of a shape.
///
/// Coefficients of two touching shapes are multiplied together, so a shape
/// with zero restitution never bounces regardless of what it lands on.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMaterial {
    /// Coulomb friction coefficient.
    pub friction: f32,
    /// Restitution (bounciness) coefficient.
    pub restitution: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

impl SurfaceMaterial {
    /// Create a material from friction and restitution.
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
        }
    }
}

/// Geometry of a collision shape, local to the body it is attached to.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Convex polygon given as a closed vertex loop.
    Polygon(Vec<Vec2>),
    /// Circle centered on the body origin.
    Circle { radius: f32 },
}

/// Description of a shape to attach to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDesc {
    pub geometry: ShapeGeometry,
    pub material: SurfaceMaterial,
    pub category: Option<CollisionCategory>,
}

impl ShapeDesc {
    /// Convex polygon shape with the default material.
    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        Self {
            geometry: ShapeGeometry::Polygon(vertices),
            material: SurfaceMaterial::default(),
            category: None,
        }
    }

    /// Axis-aligned square centered on the body origin.
    pub fn square(half_extent: f32) -> Self {
        Self::polygon(vec![
            Vec2::new(-half_extent, half_extent),
            Vec2::new(half_extent, half_extent),
            Vec2::new(half_extent, -half_extent),
            Vec2::new(-half_extent, -half_extent),
        ])
    }

    /// Circle shape with the default material.
    pub fn circle(radius: f32) -> Self {
        Self {
            geometry: ShapeGeometry::Circle { radius },
            material: SurfaceMaterial::default(),
            category: None,
        }
    }

    /// Builder: set the surface material.
    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }

    /// Builder: set the collision category.
    pub fn with_category(mut self, category: CollisionCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Moment of inertia of this shape for a body of `mass`.
    pub fn moment(&self, mass: f32) -> f32 {
        match &self.geometry {
            ShapeGeometry::Polygon(vertices) => moment_for_polygon(mass, vertices),
            ShapeGeometry::Circle { radius } => moment_for_circle(mass, *radius),
        }
    }

    /// Local bounds of the geometry, or `None` for an empty polygon.
    pub fn local_bounds(&self) -> Option<Rect> {
        match &self.geometry {
            ShapeGeometry::Polygon(vertices) => {
                let first = *vertices.first()?;
                let bounds = vertices
                    .iter()
                    .fold(Rect::from_corners(first, first), |rect, v| {
                        rect.union_point(*v)
                    });
                Some(bounds)
            }
            ShapeGeometry::Circle { radius } => {
                Some(Rect::from_center_half_size(Vec2::ZERO, Vec2::splat(*radius)))
            }
        }
    }
}

/// Description of a dynamic body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Initial position in world space.
    pub position: Vec2,
    /// Initial orientation in radians.
    pub angle: f32,
    /// Mass of the body.
    pub mass: f32,
    /// Moment of inertia about the body origin.
    pub moment: f32,
}

impl BodyDesc {
    /// Create a body description with zero initial angle.
    pub fn new(position: Vec2, mass: f32, moment: f32) -> Self {
        Self {
            position,
            angle: 0.0,
            mass,
            moment,
        }
    }

    /// Builder: set the initial angle.
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// Construction-time settings of a physics world.
///
/// Gravity and solver iterations are fixed for the lifetime of the world.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct PhysicsSettings {
    /// Gravity acceleration (positive `y` pulls toward the bottom of the screen).
    pub gravity: Vec2,
    /// Constraint solver iterations per step.
    pub solver_iterations: usize,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 300.0),
            solver_iterations: 5,
        }
    }
}

/// Trait for physics backend implementations.
///
/// Implement this trait to run the scroll controller on top of a physics
/// engine. The backend owns every body and shape; callers only hold
/// [`BodyId`] and [`ShapeId`] handles.
///
/// # Example
///
/// For an example implementation, see the `rapier` module's `RapierWorld`
/// which implements this trait for Rapier2D.
pub trait PhysicsBackend: 'static + Send + Sync {
    /// Create an empty world. Settings cannot be changed afterwards.
    fn with_settings(settings: PhysicsSettings) -> Self
    where
        Self: Sized;

    /// Settings the world was created with.
    fn settings(&self) -> PhysicsSettings;

    /// Advance every body by `dt` seconds.
    fn step(&mut self, dt: f32);

    /// Register a dynamic body.
    fn add_body(&mut self, desc: BodyDesc) -> BodyId;

    /// Attach a shape to a dynamic body.
    ///
    /// Returns `None` if the geometry is degenerate or the body is unknown.
    fn add_shape(&mut self, body: BodyId, shape: &ShapeDesc) -> Option<ShapeId>;

    /// Register a static shape on its own fixed body placed at `origin`.
    ///
    /// Returns `None` if the geometry is degenerate.
    fn add_static_shape(&mut self, origin: Vec2, shape: &ShapeDesc) -> Option<(BodyId, ShapeId)>;

    /// Resynchronise static geometry after fixed bodies were repositioned.
    ///
    /// Must run after any static move and before the next step or query,
    /// otherwise collision results use stale positions.
    fn notify_static_moved(&mut self);

    /// Number of registered bodies, static and dynamic.
    fn body_count(&self) -> usize;

    /// Current position of a body.
    fn body_position(&self, body: BodyId) -> Vec2;

    /// Teleport a body.
    fn set_body_position(&mut self, body: BodyId, position: Vec2);

    /// Teleport a body by a delta.
    fn translate_body(&mut self, body: BodyId, delta: Vec2) {
        let position = self.body_position(body);
        self.set_body_position(body, position + delta);
    }

    /// Current orientation of a body in radians.
    fn body_angle(&self, body: BodyId) -> f32;

    /// Force a body to `angle` and cancel its angular velocity.
    fn lock_body_angle(&mut self, body: BodyId, angle: f32);

    /// Current linear velocity of a body.
    fn body_velocity(&self, body: BodyId) -> Vec2;

    /// Mass of a body.
    fn body_mass(&self, body: BodyId) -> f32;

    /// Clear the force accumulator of a body.
    fn reset_forces(&mut self, body: BodyId);

    /// Add a force to the accumulator of a body.
    ///
    /// Forces persist across steps until [`PhysicsBackend::reset_forces`].
    fn apply_force(&mut self, body: BodyId, force: Vec2);

    /// Current content of the force accumulator.
    fn accumulated_force(&self, body: BodyId) -> Vec2;

    /// World-space bounds of a shape as the collision pipeline currently sees it.
    fn shape_bounds(&self, shape: ShapeId) -> Option<Rect>;
}

/// Unit vector pointing along `angle` (radians, measured from +X).
#[inline]
pub fn angle_to_unit_vector(angle: f32) -> Vec2 {
    Vec2::from_angle(angle)
}

/// Moment of inertia of a solid polygon about its local origin.
///
/// Works for either winding order. Returns 0 for degenerate polygons.
pub fn moment_for_polygon(mass: f32, vertices: &[Vec2]) -> f32 {
    let mut weighted = 0.0;
    let mut area = 0.0;
    for (i, &v1) in vertices.iter().enumerate() {
        let v2 = vertices[(i + 1) % vertices.len()];
        let cross = v2.perp_dot(v1);
        weighted += cross * (v1.dot(v1) + v1.dot(v2) + v2.dot(v2));
        area += cross;
    }
    if area.abs() <= f32::EPSILON {
        return 0.0;
    }
    mass * weighted / (6.0 * area)
}

/// Moment of inertia of a solid disc about its center.
#[inline]
pub fn moment_for_circle(mass: f32, radius: f32) -> f32 {
    0.5 * mass * radius * radius
}
