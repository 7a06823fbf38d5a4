//! Entity store: the four transient collections of a level
//!
//! Updates move entities and flag the ones that left the playfield. Flagged
//! entries stay in their slab until [`EntityStore::compact`] runs at the end
//! of the frame; the ids it drops are kept so the physics world can release
//! the matching bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::slab::{EntityId, Slab};
use super::state::{Asteroid, Enemy, Projectile};

/// Which collection an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    PlayerBullet,
    EnemyBullet,
    Enemy,
    Asteroid,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::PlayerBullet => "playerBullet",
            EntityKind::EnemyBullet => "enemyBullet",
            EntityKind::Enemy => "enemy",
            EntityKind::Asteroid => "asteroid",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live entity counts per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub bullets: usize,
    pub enemy_bullets: usize,
    pub enemies: usize,
    pub asteroids: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    pub bullets: Slab<Projectile>,
    pub enemy_bullets: Slab<Projectile>,
    pub enemies: Slab<Enemy>,
    pub asteroids: Slab<Asteroid>,
    removed: Vec<(EntityKind, EntityId)>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Append ===

    pub fn add_bullet(&mut self, bullet: Projectile) -> EntityId {
        self.bullets.insert(bullet)
    }

    pub fn add_enemy_bullet(&mut self, bullet: Projectile) -> EntityId {
        self.enemy_bullets.insert(bullet)
    }

    pub fn add_enemy(&mut self, enemy: Enemy) -> EntityId {
        self.enemies.insert(enemy)
    }

    pub fn add_asteroid(&mut self, asteroid: Asteroid) -> EntityId {
        self.asteroids.insert(asteroid)
    }

    // === Per-frame updates ===

    /// Move player bullets right; flag the ones past `width`
    pub fn update_bullets(&mut self, dt: f32, width: f32) {
        let mut gone = Vec::new();
        for (id, bullet) in self.bullets.iter_mut() {
            bullet.pos.x += bullet.speed * dt;
            if bullet.pos.x > width {
                gone.push(id);
            }
        }
        for id in gone {
            self.bullets.mark_removed(id);
        }
    }

    /// Move enemy bullets (negative speed); flag the ones fully off the left edge
    pub fn update_enemy_bullets(&mut self, dt: f32) {
        let mut gone = Vec::new();
        for (id, bullet) in self.enemy_bullets.iter_mut() {
            bullet.pos.x += bullet.speed * dt;
            if bullet.pos.x + bullet.size.x < 0.0 {
                gone.push(id);
            }
        }
        for id in gone {
            self.enemy_bullets.mark_removed(id);
        }
    }

    /// Run `steer` on every enemy, newest first, then flag enemies that fell
    /// below `height` or left through the left edge.
    pub fn update_enemies<F>(&mut self, dt: f32, height: f32, mut steer: F)
    where
        F: FnMut(EntityId, &mut Enemy, f32),
    {
        let mut gone = Vec::new();
        for (id, enemy) in self.enemies.iter_mut().rev() {
            steer(id, enemy, dt);
            if (enemy.is_falling() && enemy.pos.y > height) || enemy.pos.x + enemy.size.x < 0.0 {
                gone.push(id);
            }
        }
        for id in gone {
            self.enemies.mark_removed(id);
        }
    }

    /// Move asteroids left and spin them; flag the ones off the left edge
    pub fn update_asteroids(&mut self, dt: f32) {
        let mut gone = Vec::new();
        for (id, asteroid) in self.asteroids.iter_mut() {
            asteroid.pos.x -= asteroid.speed * dt;
            asteroid.rotation += asteroid.rotation_speed * dt;
            if asteroid.pos.x + asteroid.size.x < 0.0 {
                gone.push(id);
            }
        }
        for id in gone {
            self.asteroids.mark_removed(id);
        }
    }

    // === Bookkeeping ===

    /// Reclaim every flagged slot. Dropped ids accumulate until
    /// [`EntityStore::take_removed`].
    pub fn compact(&mut self) {
        let removed = &mut self.removed;
        removed.extend(self.bullets.compact().into_iter().map(|id| (EntityKind::PlayerBullet, id)));
        removed.extend(
            self.enemy_bullets
                .compact()
                .into_iter()
                .map(|id| (EntityKind::EnemyBullet, id)),
        );
        removed.extend(self.enemies.compact().into_iter().map(|id| (EntityKind::Enemy, id)));
        removed.extend(self.asteroids.compact().into_iter().map(|id| (EntityKind::Asteroid, id)));
    }

    pub fn take_removed(&mut self) -> Vec<(EntityKind, EntityId)> {
        std::mem::take(&mut self.removed)
    }

    pub fn clear(&mut self) {
        self.bullets.clear();
        self.enemy_bullets.clear();
        self.enemies.clear();
        self.asteroids.clear();
        self.removed.clear();
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            bullets: self.bullets.len(),
            enemy_bullets: self.enemy_bullets.len(),
            enemies: self.enemies.len(),
            asteroids: self.asteroids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Fall, Motion};
    use glam::Vec2;
    use proptest::prelude::*;

    fn bullet(x: f32, speed: f32) -> Projectile {
        Projectile {
            pos: Vec2::new(x, 100.0),
            size: Vec2::new(50.0, 10.0),
            speed,
            poison: false,
        }
    }

    fn enemy(x: f32, y: f32) -> Enemy {
        Enemy {
            pos: Vec2::new(x, y),
            size: Vec2::new(80.0, 80.0),
            speed: 150.0,
            vertical_speed: 100.0,
            health: 3,
            max_health: 3,
            shield: None,
            fall: Fall::new(400.0),
            shoot_timer: 0.0,
            motion: Motion::Hover {
                vertical_direction: 1.0,
                center: y,
                amplitude: 100.0,
            },
        }
    }

    #[test]
    fn test_bullets_pruned_past_right_edge() {
        let mut store = EntityStore::new();
        store.add_bullet(bullet(950.0, 500.0));
        store.add_bullet(bullet(100.0, 500.0));

        store.update_bullets(0.1, 960.0);
        assert_eq!(store.counts().bullets, 1);

        store.compact();
        let removed = store.take_removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, EntityKind::PlayerBullet);
        assert!(store.take_removed().is_empty());
    }

    #[test]
    fn test_enemy_bullets_pruned_once_fully_off_left() {
        let mut store = EntityStore::new();
        // Right edge at -60 + 70 = 10, still on screen after moving 4px
        store.add_enemy_bullet(Projectile {
            size: Vec2::new(70.0, 30.0),
            ..bullet(-60.0, -40.0)
        });
        store.update_enemy_bullets(0.1);
        assert_eq!(store.counts().enemy_bullets, 1);
        store.update_enemy_bullets(2.0);
        assert_eq!(store.counts().enemy_bullets, 0);
    }

    #[test]
    fn test_enemies_pruned_after_falling_below_or_leaving_left() {
        let mut store = EntityStore::new();
        let mut falling = enemy(400.0, 539.0);
        falling.fall.start();
        store.add_enemy(falling);
        // Below the bottom but not falling: kept
        store.add_enemy(enemy(400.0, 600.0));
        store.add_enemy(enemy(-100.0, 200.0));

        let mut visited = 0;
        store.update_enemies(0.1, 540.0, |_, e, dt| {
            visited += 1;
            if e.is_falling() {
                let dy = e.fall.integrate(dt);
                e.pos.y += dy;
            }
        });
        assert_eq!(visited, 3);
        assert_eq!(store.counts().enemies, 1);
    }

    #[test]
    fn test_asteroids_move_and_rotate() {
        let mut store = EntityStore::new();
        let id = store.add_asteroid(Asteroid {
            pos: Vec2::new(500.0, 100.0),
            size: Vec2::new(50.0, 50.0),
            speed: 200.0,
            rotation: 0.0,
            rotation_speed: 2.0,
            damage: 10.0,
        });
        store.update_asteroids(0.5);
        let a = store.asteroids.get(id).unwrap();
        assert_eq!(a.pos.x, 400.0);
        assert_eq!(a.rotation, 1.0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = EntityStore::new();
        store.add_bullet(bullet(10.0, 500.0));
        store.add_enemy(enemy(10.0, 10.0));
        let id = store.add_enemy_bullet(bullet(10.0, -400.0));
        store.enemy_bullets.mark_removed(id);
        store.compact();
        store.clear();
        assert_eq!(store.counts(), EntityCounts::default());
        assert!(store.take_removed().is_empty());
    }

    proptest! {
        #[test]
        fn prop_bullets_never_survive_past_edge(xs in proptest::collection::vec(0.0f32..1200.0, 0..32), dt in 0.0f32..0.5) {
            let mut store = EntityStore::new();
            for x in &xs {
                store.add_bullet(bullet(*x, 500.0));
            }
            store.update_bullets(dt, 960.0);
            store.compact();
            prop_assert!(store.bullets.values().all(|b| b.pos.x <= 960.0));
            let removed = store.take_removed().len();
            prop_assert_eq!(removed + store.counts().bullets, xs.len());
        }
    }
}
