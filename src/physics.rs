//! Rigid-body contact detection
//!
//! Wraps a rapier2d world in pixel units. Bodies are addressed by a string
//! key built from their [`BodyTag`]; positions go in and come out as the
//! top-left corner of the entity rect. Colliders are sensors, so the world
//! only reports overlaps and gravity is the one force that moves anything.
//!
//! Built without the `physics` feature the adapter never becomes ready and
//! the level falls back to manual AABB collision.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::aabb::Rect;
use crate::sim::slab::EntityId;
use crate::sim::store::EntityKind;
use crate::tuning::PhysicsTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    Static,
    /// Moved by the simulation every frame
    Kinematic,
    /// Moved by gravity; position is read back
    Dynamic,
}

/// Which entity a body stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyTag {
    pub kind: EntityKind,
    /// `None` for the player
    pub id: Option<EntityId>,
}

impl BodyTag {
    pub fn player() -> Self {
        Self {
            kind: EntityKind::Player,
            id: None,
        }
    }

    pub fn entity(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id: Some(id) }
    }

    /// Lookup key (`player`, `enemy_3v0`, ...)
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BodyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}_{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Two bodies started touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub a: BodyTag,
    pub b: BodyTag,
}

impl Contact {
    /// The pair ordered as `(first, second)` if it joins those two kinds
    pub fn between(&self, first: EntityKind, second: EntityKind) -> Option<(BodyTag, BodyTag)> {
        if self.a.kind == first && self.b.kind == second {
            Some((self.a, self.b))
        } else if self.b.kind == first && self.a.kind == second {
            Some((self.b, self.a))
        } else {
            None
        }
    }
}

/// Pixel-space facade over the physics world
pub struct PhysicsAdapter {
    tuning: PhysicsTuning,
    /// Downward gravity in m/s²
    gravity: f32,
    world: Option<backend::World>,
    warned: bool,
}

impl PhysicsAdapter {
    pub fn new(tuning: &PhysicsTuning, gravity: f32) -> Self {
        Self {
            tuning: tuning.clone(),
            gravity,
            world: None,
            warned: false,
        }
    }

    /// Bring up the world. Failure is reported once and leaves the adapter
    /// not ready; callers then use manual collision.
    pub fn initialize(&mut self) -> bool {
        if self.world.is_some() {
            return true;
        }
        if !self.tuning.enabled {
            log::info!("Physics disabled by tuning; using manual collision");
            return false;
        }
        match backend::World::new(&self.tuning, self.gravity) {
            Ok(world) => {
                log::info!(
                    "Physics ready (scale {} px/m, gravity {:.2} m/s²)",
                    self.tuning.scale,
                    self.gravity
                );
                self.world = Some(world);
                true
            }
            Err(e) => {
                if !self.warned {
                    log::warn!("{e}; using manual collision");
                    self.warned = true;
                }
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.world.is_some()
    }

    /// Add a box body covering `rect`. Re-creating an existing key replaces it.
    pub fn create_body(&mut self, tag: BodyTag, rect: Rect, body_type: BodyType) -> bool {
        match self.world.as_mut() {
            Some(world) => {
                world.create_body(tag, rect, body_type);
                true
            }
            None => false,
        }
    }

    pub fn has_body(&self, key: &str) -> bool {
        self.world.as_ref().is_some_and(|w| w.has_body(key))
    }

    /// Top-left corner of the body's rect, in pixels
    pub fn body_position(&self, key: &str) -> Option<Vec2> {
        self.world.as_ref().and_then(|w| w.body_position(key))
    }

    /// Teleport a body so its rect's top-left is at `pos`
    pub fn set_position(&mut self, key: &str, pos: Vec2) {
        if let Some(world) = self.world.as_mut() {
            world.set_position(key, pos);
        }
    }

    pub fn body_type(&self, key: &str) -> Option<BodyType> {
        self.world.as_ref().and_then(|w| w.body_type(key))
    }

    pub fn set_body_type(&mut self, key: &str, body_type: BodyType) {
        if let Some(world) = self.world.as_mut() {
            world.set_body_type(key, body_type);
        }
    }

    pub fn remove_body(&mut self, key: &str) -> bool {
        self.world.as_mut().is_some_and(|w| w.remove_body(key))
    }

    /// Drop every body, keeping the world
    pub fn clear(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.clear();
        }
    }

    pub fn body_count(&self) -> usize {
        self.world.as_ref().map_or(0, |w| w.body_count())
    }

    /// Advance the world; returns the contacts that began, in a stable order
    pub fn step(&mut self, dt: f32) -> Vec<Contact> {
        match self.world.as_mut() {
            Some(world) => world.step(dt),
            None => Vec::new(),
        }
    }
}

#[cfg(feature = "physics")]
mod backend {
    use std::collections::HashMap;
    use std::num::NonZeroUsize;

    use glam::Vec2;
    use rapier2d::prelude::*;

    use super::{BodyTag, BodyType, Contact};
    use crate::error::{Error, Result};
    use crate::sim::aabb::Rect;
    use crate::tuning::PhysicsTuning;

    struct Body {
        handle: RigidBodyHandle,
        /// Half extents in pixels
        half: Vec2,
    }

    pub struct World {
        pipeline: PhysicsPipeline,
        gravity: Vector<Real>,
        integration_params: IntegrationParameters,
        island_manager: IslandManager,
        broad_phase: DefaultBroadPhase,
        narrow_phase: NarrowPhase,
        rigid_body_set: RigidBodySet,
        collider_set: ColliderSet,
        impulse_joint_set: ImpulseJointSet,
        multibody_joint_set: MultibodyJointSet,
        ccd_solver: CCDSolver,
        scale: f32,
        bodies: HashMap<String, Body>,
        collider_tags: HashMap<ColliderHandle, BodyTag>,
    }

    fn rigid_body_type(body_type: BodyType) -> RigidBodyType {
        match body_type {
            BodyType::Static => RigidBodyType::Fixed,
            BodyType::Kinematic => RigidBodyType::KinematicPositionBased,
            BodyType::Dynamic => RigidBodyType::Dynamic,
        }
    }

    impl World {
        pub fn new(tuning: &PhysicsTuning, gravity: f32) -> Result<Self> {
            if !(tuning.scale.is_finite() && tuning.scale > 0.0) {
                return Err(Error::Physics(format!("invalid scale {}", tuning.scale)));
            }
            let num_solver_iterations = NonZeroUsize::new(tuning.velocity_iterations)
                .ok_or_else(|| Error::Physics("velocity iterations must be non-zero".into()))?;

            let mut integration_params = IntegrationParameters::default();
            integration_params.num_solver_iterations = num_solver_iterations;
            integration_params.num_internal_pgs_iterations = tuning.position_iterations.max(1);

            Ok(Self {
                pipeline: PhysicsPipeline::new(),
                // Screen space: +y points down
                gravity: vector![0.0, gravity as Real],
                integration_params,
                island_manager: IslandManager::new(),
                broad_phase: DefaultBroadPhase::new(),
                narrow_phase: NarrowPhase::new(),
                rigid_body_set: RigidBodySet::new(),
                collider_set: ColliderSet::new(),
                impulse_joint_set: ImpulseJointSet::new(),
                multibody_joint_set: MultibodyJointSet::new(),
                ccd_solver: CCDSolver::new(),
                scale: tuning.scale,
                bodies: HashMap::new(),
                collider_tags: HashMap::new(),
            })
        }

        fn to_meters(&self, top_left: Vec2, half: Vec2) -> Vector<Real> {
            let center = (top_left + half) / self.scale;
            vector![center.x as Real, center.y as Real]
        }

        pub fn create_body(&mut self, tag: BodyTag, rect: Rect, body_type: BodyType) {
            let key = tag.key();
            self.remove_body(&key);

            let half = rect.size / 2.0;
            let rb = RigidBodyBuilder::new(rigid_body_type(body_type))
                .translation(self.to_meters(rect.pos, half))
                .lock_rotations()
                // Sensors carry no mass of their own
                .additional_mass(1.0)
                .build();
            let handle = self.rigid_body_set.insert(rb);

            let collider = ColliderBuilder::cuboid(
                (half.x / self.scale) as Real,
                (half.y / self.scale) as Real,
            )
            .sensor(true)
            .active_collision_types(ActiveCollisionTypes::all())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
            let collider_handle =
                self.collider_set
                    .insert_with_parent(collider, handle, &mut self.rigid_body_set);

            self.collider_tags.insert(collider_handle, tag);
            self.bodies.insert(key, Body { handle, half });
        }

        pub fn has_body(&self, key: &str) -> bool {
            self.bodies.contains_key(key)
        }

        pub fn body_position(&self, key: &str) -> Option<Vec2> {
            let body = self.bodies.get(key)?;
            let rb = self.rigid_body_set.get(body.handle)?;
            let t = rb.translation();
            Some(Vec2::new(t.x as f32, t.y as f32) * self.scale - body.half)
        }

        pub fn set_position(&mut self, key: &str, pos: Vec2) {
            let Some(body) = self.bodies.get(key) else {
                return;
            };
            let translation = self.to_meters(pos, body.half);
            if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
                rb.set_translation(translation, true);
            }
        }

        pub fn body_type(&self, key: &str) -> Option<BodyType> {
            let body = self.bodies.get(key)?;
            let rb = self.rigid_body_set.get(body.handle)?;
            Some(if rb.is_dynamic() {
                BodyType::Dynamic
            } else if rb.is_fixed() {
                BodyType::Static
            } else {
                BodyType::Kinematic
            })
        }

        pub fn set_body_type(&mut self, key: &str, body_type: BodyType) {
            let Some(body) = self.bodies.get(key) else {
                return;
            };
            if let Some(rb) = self.rigid_body_set.get_mut(body.handle) {
                rb.set_body_type(rigid_body_type(body_type), true);
                if body_type == BodyType::Dynamic {
                    rb.set_linvel(vector![0.0, 0.0], true);
                }
            }
        }

        pub fn remove_body(&mut self, key: &str) -> bool {
            let Some(body) = self.bodies.remove(key) else {
                return false;
            };
            if let Some(rb) = self.rigid_body_set.get(body.handle) {
                for collider in rb.colliders() {
                    self.collider_tags.remove(collider);
                }
            }
            self.rigid_body_set.remove(
                body.handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
            true
        }

        pub fn clear(&mut self) {
            let keys: Vec<String> = self.bodies.keys().cloned().collect();
            for key in keys {
                self.remove_body(&key);
            }
        }

        pub fn body_count(&self) -> usize {
            self.bodies.len()
        }

        pub fn step(&mut self, dt: f32) -> Vec<Contact> {
            self.integration_params.dt = dt as Real;

            let (collision_send, collision_recv) =
                rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
            let (force_send, _force_recv) =
                rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
            let event_handler = ChannelEventCollector::new(collision_send, force_send);

            self.pipeline.step(
                &self.gravity,
                &self.integration_params,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.rigid_body_set,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                &mut self.ccd_solver,
                None,
                &(),
                &event_handler,
            );

            let mut contacts = Vec::new();
            while let Ok(event) = collision_recv.try_recv() {
                if let CollisionEvent::Started(h1, h2, _) = event {
                    let a = self.collider_tags.get(&h1).copied();
                    let b = self.collider_tags.get(&h2).copied();
                    if let (Some(a), Some(b)) = (a, b) {
                        contacts.push(Contact {
                            a: a.min(b),
                            b: a.max(b),
                        });
                    }
                }
            }
            // Channel order is not guaranteed
            contacts.sort_by_key(|c| (c.a, c.b));
            contacts
        }
    }
}

#[cfg(not(feature = "physics"))]
mod backend {
    use glam::Vec2;

    use super::{BodyTag, BodyType, Contact};
    use crate::error::{Error, Result};
    use crate::sim::aabb::Rect;
    use crate::tuning::PhysicsTuning;

    /// No backend compiled in; cannot be constructed
    pub enum World {}

    impl World {
        pub fn new(_tuning: &PhysicsTuning, _gravity: f32) -> Result<Self> {
            Err(Error::Physics("built without the `physics` feature".into()))
        }

        pub fn create_body(&mut self, _tag: BodyTag, _rect: Rect, _body_type: BodyType) {
            match *self {}
        }

        pub fn has_body(&self, _key: &str) -> bool {
            match *self {}
        }

        pub fn body_position(&self, _key: &str) -> Option<Vec2> {
            match *self {}
        }

        pub fn set_position(&mut self, _key: &str, _pos: Vec2) {
            match *self {}
        }

        pub fn body_type(&self, _key: &str) -> Option<BodyType> {
            match *self {}
        }

        pub fn set_body_type(&mut self, _key: &str, _body_type: BodyType) {
            match *self {}
        }

        pub fn remove_body(&mut self, _key: &str) -> bool {
            match *self {}
        }

        pub fn clear(&mut self) {
            match *self {}
        }

        pub fn body_count(&self) -> usize {
            match *self {}
        }

        pub fn step(&mut self, _dt: f32) -> Vec<Contact> {
            match *self {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy_tag(index: u32) -> BodyTag {
        BodyTag::entity(EntityKind::Enemy, EntityId { index, generation: 0 })
    }

    #[test]
    fn test_tag_keys() {
        assert_eq!(BodyTag::player().key(), "player");
        assert_eq!(enemy_tag(3).key(), "enemy_3v0");
    }

    #[test]
    fn test_contact_between_orders_pair() {
        let c = Contact {
            a: BodyTag::player(),
            b: enemy_tag(1),
        };
        let (enemy, player) = c.between(EntityKind::Enemy, EntityKind::Player).unwrap();
        assert_eq!(enemy.kind, EntityKind::Enemy);
        assert_eq!(player.kind, EntityKind::Player);
        assert!(c.between(EntityKind::Asteroid, EntityKind::Player).is_none());
    }

    #[test]
    fn test_disabled_tuning_never_ready() {
        let tuning = PhysicsTuning {
            enabled: false,
            ..PhysicsTuning::default()
        };
        let mut physics = PhysicsAdapter::new(&tuning, 400.0 / 30.0);
        assert!(!physics.initialize());
        assert!(!physics.is_ready());
        assert!(!physics.create_body(BodyTag::player(), Rect::from_xywh(0.0, 0.0, 10.0, 10.0), BodyType::Kinematic));
        assert!(physics.step(1.0 / 60.0).is_empty());
        assert_eq!(physics.body_count(), 0);
    }

    #[cfg(not(feature = "physics"))]
    #[test]
    fn test_without_backend_initialize_fails() {
        let mut physics = PhysicsAdapter::new(&PhysicsTuning::default(), 400.0 / 30.0);
        assert!(!physics.initialize());
        assert!(!physics.initialize());
        assert!(!physics.is_ready());
    }

    #[cfg(feature = "physics")]
    mod rapier {
        use super::*;

        fn ready() -> PhysicsAdapter {
            let mut physics = PhysicsAdapter::new(&PhysicsTuning::default(), 400.0 / 30.0);
            assert!(physics.initialize());
            physics
        }

        #[test]
        fn test_position_round_trips_in_pixels() {
            let mut physics = ready();
            let rect = Rect::from_xywh(100.0, 200.0, 100.0, 100.0);
            assert!(physics.create_body(BodyTag::player(), rect, BodyType::Kinematic));
            let pos = physics.body_position("player").unwrap();
            assert!((pos - rect.pos).length() < 1e-3);

            physics.set_position("player", Vec2::new(100.0, 260.0));
            let pos = physics.body_position("player").unwrap();
            assert!((pos.y - 260.0).abs() < 1e-3);
        }

        #[test]
        fn test_overlap_reports_contact_once() {
            let mut physics = ready();
            physics.create_body(
                BodyTag::player(),
                Rect::from_xywh(100.0, 200.0, 100.0, 100.0),
                BodyType::Kinematic,
            );
            let bullet = BodyTag::entity(EntityKind::EnemyBullet, EntityId { index: 0, generation: 0 });
            physics.create_body(bullet, Rect::from_xywh(150.0, 230.0, 70.0, 30.0), BodyType::Kinematic);

            let contacts = physics.step(1.0 / 60.0);
            assert_eq!(contacts.len(), 1);
            assert!(contacts[0].between(EntityKind::EnemyBullet, EntityKind::Player).is_some());

            // Still overlapping: no new contact
            assert!(physics.step(1.0 / 60.0).is_empty());
        }

        #[test]
        fn test_dynamic_body_falls() {
            let mut physics = ready();
            let tag = enemy_tag(0);
            let key = tag.key();
            physics.create_body(tag, Rect::from_xywh(400.0, 100.0, 80.0, 80.0), BodyType::Kinematic);
            physics.step(1.0 / 60.0);
            assert!((physics.body_position(&key).unwrap().y - 100.0).abs() < 1e-3);

            physics.set_body_type(&key, BodyType::Dynamic);
            assert_eq!(physics.body_type(&key), Some(BodyType::Dynamic));
            for _ in 0..30 {
                physics.step(1.0 / 60.0);
            }
            assert!(physics.body_position(&key).unwrap().y > 110.0);
        }

        #[test]
        fn test_remove_and_clear() {
            let mut physics = ready();
            physics.create_body(enemy_tag(0), Rect::from_xywh(0.0, 0.0, 10.0, 10.0), BodyType::Kinematic);
            physics.create_body(enemy_tag(1), Rect::from_xywh(50.0, 0.0, 10.0, 10.0), BodyType::Kinematic);
            assert!(physics.has_body("enemy_0v0"));
            assert!(physics.remove_body("enemy_0v0"));
            assert!(!physics.remove_body("enemy_0v0"));
            assert_eq!(physics.body_count(), 1);
            physics.clear();
            assert_eq!(physics.body_count(), 0);
            assert!(physics.is_ready());
        }
    }
}
