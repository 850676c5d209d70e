//! Rapier2D physics backend implementation.
//!
//! This module provides the physics backend for Rapier2D.
//! Enable with the `rapier2d` feature.
//!
//! Unlike a Bevy physics plugin, [`RapierWorld`] is driven explicitly: the
//! session decides when the pipeline steps and when static geometry is
//! resynchronised after a terrain scroll.

use std::num::NonZeroUsize;

use bevy::log::debug;
use bevy::prelude::*;
use rapier2d::math::Real;
use rapier2d::prelude::*;

use crate::backend::{
    BodyDesc, BodyId, PhysicsBackend, PhysicsSettings, ShapeDesc, ShapeGeometry, ShapeId,
};

#[inline]
fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

#[inline]
fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Rapier2D physics backend.
///
/// Owns the full Rapier pipeline. Bodies and colliders are addressed through
/// the crate's [`BodyId`] / [`ShapeId`] handles, which index into the handle
/// tables kept here.
pub struct RapierWorld {
    settings: PhysicsSettings,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    body_handles: Vec<RigidBodyHandle>,
    shape_handles: Vec<ColliderHandle>,
    static_bodies: Vec<RigidBodyHandle>,
}

impl RapierWorld {
    fn body(&self, body: BodyId) -> Option<&RigidBody> {
        let handle = *self.body_handles.get(body.0 as usize)?;
        self.bodies.get(handle)
    }

    fn body_mut(&mut self, body: BodyId) -> Option<&mut RigidBody> {
        let handle = *self.body_handles.get(body.0 as usize)?;
        self.bodies.get_mut(handle)
    }

    fn register_body(&mut self, handle: RigidBodyHandle) -> BodyId {
        let id = BodyId(self.body_handles.len() as u32);
        self.body_handles.push(handle);
        id
    }

    fn register_shape(&mut self, handle: ColliderHandle) -> ShapeId {
        let id = ShapeId(self.shape_handles.len() as u32);
        self.shape_handles.push(handle);
        id
    }
}

/// Build a Rapier collider from a shape description.
///
/// Returns `None` if the polygon has no convex hull with a non-zero area.
fn build_collider(shape: &ShapeDesc) -> Option<ColliderBuilder> {
    let builder = match &shape.geometry {
        ShapeGeometry::Polygon(vertices) => {
            let area: f32 = vertices
                .iter()
                .zip(vertices.iter().cycle().skip(1))
                .map(|(a, b)| a.perp_dot(*b))
                .sum();
            if vertices.len() < 3 || area.abs() <= f32::EPSILON {
                return None;
            }
            let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y]).collect();
            ColliderBuilder::convex_hull(&points)?
        }
        ShapeGeometry::Circle { radius } => {
            if *radius <= 0.0 {
                return None;
            }
            ColliderBuilder::ball(*radius)
        }
    };

    let groups = match shape.category {
        Some(category) => {
            InteractionGroups::new(Group::from_bits_truncate(category.bits()), Group::ALL)
        }
        None => InteractionGroups::all(),
    };

    Some(
        builder
            .friction(shape.material.friction)
            .restitution(shape.material.restitution)
            // Multiply so a zero coefficient on either side wins
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .collision_groups(groups)
            .user_data(shape.category.map_or(0, |c| c.bits() as u128)),
    )
}

impl PhysicsBackend for RapierWorld {
    fn with_settings(settings: PhysicsSettings) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.num_solver_iterations =
            NonZeroUsize::new(settings.solver_iterations).unwrap_or(NonZeroUsize::MIN);

        Self {
            settings,
            gravity: to_vector(settings.gravity),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            body_handles: Vec::new(),
            shape_handles: Vec::new(),
            static_bodies: Vec::new(),
        }
    }

    fn settings(&self) -> PhysicsSettings {
        self.settings
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(desc.position))
            .rotation(desc.angle)
            .additional_mass_properties(MassProperties::new(
                point![0.0, 0.0],
                desc.mass,
                desc.moment,
            ))
            // Bodies are teleported by the controller; never let them sleep
            .can_sleep(false)
            .build();
        let handle = self.bodies.insert(body);
        self.register_body(handle)
    }

    fn add_shape(&mut self, body: BodyId, shape: &ShapeDesc) -> Option<ShapeId> {
        let parent = *self.body_handles.get(body.0 as usize)?;
        // Mass and moment come from the body description only
        let collider = build_collider(shape)?.density(0.0).build();
        let handle = self
            .colliders
            .insert_with_parent(collider, parent, &mut self.bodies);
        Some(self.register_shape(handle))
    }

    fn add_static_shape(&mut self, origin: Vec2, shape: &ShapeDesc) -> Option<(BodyId, ShapeId)> {
        let collider = build_collider(shape)?.build();
        let body = RigidBodyBuilder::fixed()
            .translation(to_vector(origin))
            .build();
        let body_handle = self.bodies.insert(body);
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        self.static_bodies.push(body_handle);
        Some((
            self.register_body(body_handle),
            self.register_shape(collider_handle),
        ))
    }

    fn notify_static_moved(&mut self) {
        for &handle in &self.static_bodies {
            let Some(body) = self.bodies.get(handle) else {
                continue;
            };
            let body_position = *body.position();
            for &collider_handle in body.colliders() {
                if let Some(collider) = self.colliders.get_mut(collider_handle) {
                    let relative = collider
                        .position_wrt_parent()
                        .copied()
                        .unwrap_or_else(Isometry::identity);
                    collider.set_position(body_position * relative);
                }
            }
        }
        self.query_pipeline.update(&self.colliders);
        debug!(
            static_bodies = self.static_bodies.len(),
            "rehashed static geometry"
        );
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_position(&self, body: BodyId) -> Vec2 {
        self.body(body)
            .map(|b| to_vec2(b.translation()))
            .unwrap_or(Vec2::ZERO)
    }

    fn set_body_position(&mut self, body: BodyId, position: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.set_translation(to_vector(position), true);
        }
    }

    fn body_angle(&self, body: BodyId) -> f32 {
        self.body(body)
            .map(|b| b.rotation().angle())
            .unwrap_or(0.0)
    }

    fn lock_body_angle(&mut self, body: BodyId, angle: f32) {
        if let Some(b) = self.body_mut(body) {
            let translation = *b.translation();
            b.set_position(Isometry::new(translation, angle), true);
            b.set_angvel(0.0, true);
        }
    }

    fn body_velocity(&self, body: BodyId) -> Vec2 {
        self.body(body)
            .map(|b| to_vec2(b.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    fn body_mass(&self, body: BodyId) -> f32 {
        self.body(body).map(|b| b.mass()).unwrap_or(0.0)
    }

    fn reset_forces(&mut self, body: BodyId) {
        if let Some(b) = self.body_mut(body) {
            b.reset_forces(true);
        }
    }

    fn apply_force(&mut self, body: BodyId, force: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.add_force(to_vector(force), true);
        }
    }

    fn accumulated_force(&self, body: BodyId) -> Vec2 {
        self.body(body)
            .map(|b| to_vec2(&b.user_force()))
            .unwrap_or(Vec2::ZERO)
    }

    fn shape_bounds(&self, shape: ShapeId) -> Option<Rect> {
        let handle = *self.shape_handles.get(shape.0 as usize)?;
        let aabb = self.colliders.get(handle)?.compute_aabb();
        Some(Rect::new(aabb.mins.x, aabb.mins.y, aabb.maxs.x, aabb.maxs.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SurfaceMaterial;

    const DT: f32 = 1.0 / 60.0;

    fn create_test_world() -> RapierWorld {
        RapierWorld::with_settings(PhysicsSettings::default())
    }

    fn spawn_box(world: &mut RapierWorld, position: Vec2, half_extent: f32) -> BodyId {
        let shape = ShapeDesc::square(half_extent);
        let body = world.add_body(BodyDesc::new(position, 1.0, shape.moment(1.0)));
        world
            .add_shape(body, &shape)
            .expect("square should be a valid polygon");
        body
    }

    #[test]
    fn rapier_world_keeps_settings() {
        let settings = PhysicsSettings {
            gravity: Vec2::new(0.0, 120.0),
            solver_iterations: 9,
        };
        let world = RapierWorld::with_settings(settings);
        assert_eq!(world.settings(), settings);
    }

    #[test]
    fn body_mass_comes_from_description() {
        let mut world = create_test_world();
        let body = spawn_box(&mut world, Vec2::ZERO, 15.0);
        world.step(DT);
        assert!((world.body_mass(body) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn gravity_pulls_bodies_down_the_screen() {
        let mut world = create_test_world();
        let body = spawn_box(&mut world, Vec2::new(10.0, 0.0), 5.0);

        for _ in 0..30 {
            world.step(DT);
        }

        let position = world.body_position(body);
        assert!(position.y > 10.0, "body should fall, y = {}", position.y);
        assert!((position.x - 10.0).abs() < 1e-3);
    }

    #[test]
    fn body_rests_on_static_slab() {
        let mut world = create_test_world();
        let slab = ShapeDesc::polygon(vec![
            Vec2::new(-200.0, -10.0),
            Vec2::new(200.0, -10.0),
            Vec2::new(200.0, 10.0),
            Vec2::new(-200.0, 10.0),
        ])
        .with_material(SurfaceMaterial::new(1.0, 1.0));
        world
            .add_static_shape(Vec2::new(0.0, 100.0), &slab)
            .expect("slab should be valid");
        let body = spawn_box(&mut world, Vec2::new(0.0, 50.0), 5.0);

        for _ in 0..240 {
            world.step(DT);
        }

        // Slab surface at y = 90, box half extent 5
        let position = world.body_position(body);
        println!("PROOF: resting y = {}", position.y);
        assert!((position.y - 85.0).abs() < 1.0, "y = {}", position.y);
    }

    #[test]
    fn forces_accumulate_until_reset() {
        let mut world = create_test_world();
        let body = spawn_box(&mut world, Vec2::ZERO, 5.0);

        world.apply_force(body, Vec2::new(0.0, -10.0));
        world.apply_force(body, Vec2::new(0.0, -5.0));
        assert!((world.accumulated_force(body) - Vec2::new(0.0, -15.0)).length() < 1e-5);

        world.step(DT);
        // Still there after a step
        assert!((world.accumulated_force(body) - Vec2::new(0.0, -15.0)).length() < 1e-5);

        world.reset_forces(body);
        assert_eq!(world.accumulated_force(body), Vec2::ZERO);
    }

    #[test]
    fn translate_body_teleports() {
        let mut world = create_test_world();
        let body = spawn_box(&mut world, Vec2::new(3.0, 4.0), 5.0);

        world.translate_body(body, Vec2::new(0.8, 0.0));
        let position = world.body_position(body);
        assert!((position - Vec2::new(3.8, 4.0)).length() < 1e-5);
    }

    #[test]
    fn lock_body_angle_sets_orientation() {
        let mut world = create_test_world();
        let body = spawn_box(&mut world, Vec2::ZERO, 5.0);

        world.lock_body_angle(body, -std::f32::consts::FRAC_PI_2);
        assert!((world.body_angle(body) + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        let mut world = create_test_world();
        let line = ShapeDesc::polygon(vec![Vec2::ZERO, Vec2::X]);
        assert!(world.add_static_shape(Vec2::ZERO, &line).is_none());
        assert!(world
            .add_static_shape(Vec2::ZERO, &ShapeDesc::circle(0.0))
            .is_none());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn polygon_collider_takes_convex_hull() {
        let mut world = create_test_world();
        let triangle = ShapeDesc::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(10.0, -10.0),
        ]);
        let (_, shape) = world
            .add_static_shape(Vec2::new(100.0, 50.0), &triangle)
            .expect("triangle should be valid");

        let bounds = world.shape_bounds(shape).unwrap();
        println!("PROOF: triangle bounds = {:?}", bounds);
        assert!((bounds.min - Vec2::new(100.0, 40.0)).length() < 0.01);
        assert!((bounds.max - Vec2::new(120.0, 50.0)).length() < 0.01);

        // Collinear points have no hull
        let flat = ShapeDesc::polygon(vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]);
        assert!(world.add_static_shape(Vec2::ZERO, &flat).is_none());
    }

    #[test]
    fn spawned_body_keeps_initial_angle() {
        let mut world = create_test_world();
        let body = world.add_body(
            BodyDesc::new(Vec2::ZERO, 1.0, 150.0).with_angle(-std::f32::consts::FRAC_PI_2),
        );
        assert!((world.body_angle(body) + std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn unknown_body_reads_as_zero() {
        let world = create_test_world();
        assert_eq!(world.body_position(BodyId(7)), Vec2::ZERO);
        assert_eq!(world.body_velocity(BodyId(7)), Vec2::ZERO);
    }

    #[test]
    fn notify_static_moved_updates_shape_bounds() {
        let mut world = create_test_world();
        let (body, shape) = world
            .add_static_shape(Vec2::ZERO, &ShapeDesc::square(10.0))
            .expect("square should be valid");

        world.translate_body(body, Vec2::new(50.0, 0.0));
        world.notify_static_moved();

        let bounds = world.shape_bounds(shape).unwrap();
        println!("PROOF: bounds after move = {:?}", bounds);
        assert!((bounds.min.x - 40.0).abs() < 0.01);
        assert!((bounds.max.x - 60.0).abs() < 0.01);
    }
}
