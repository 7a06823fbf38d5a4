//! Level simulation
//!
//! All gameplay logic lives here:
//! - Entities live in generational slabs, iterated in id order
//! - Removals are deferred to the end of the frame
//! - Randomness comes from one seeded generator per level
//! - Drawing goes through [`crate::renderer::RenderContext`] only

pub mod aabb;
pub mod damage;
pub mod difficulty;
pub mod level;
pub mod slab;
pub mod state;
pub mod store;
pub mod variant;

pub use aabb::{Bounded, Rect, overlaps};
pub use damage::{BulletHit, PlayerHit};
pub use difficulty::DifficultyProfile;
pub use level::{LevelSim, LevelSnapshot};
pub use slab::{EntityId, Slab};
pub use state::{Asteroid, Enemy, Fall, Motion, Player, Poison, Projectile, Shield};
pub use store::{EntityCounts, EntityKind, EntityStore};
pub use variant::{LevelId, VariantDescriptor};
