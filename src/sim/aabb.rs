//! Axis-aligned box overlap tests and the per-frame collision scans
//!
//! Edges that merely touch do not collide: all comparisons are strict.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::slab::{EntityId, Slab};
use super::state::{Asteroid, Enemy, Player, Projectile};

/// Rectangle given by its top-left corner and size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Inclusive point test (used for click targets)
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.pos.x && p.x <= self.right() && p.y >= self.pos.y && p.y <= self.bottom()
    }
}

/// Anything with an axis-aligned hit box
pub trait Bounded {
    fn bounds(&self) -> Rect;
}

/// True iff the boxes overlap on both axes
#[inline]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.pos.x < b.right() && a.right() > b.pos.x && a.pos.y < b.bottom() && a.bottom() > b.pos.y
}

/// Player bullets against enemies.
///
/// Falling enemies are never hit. A bullet stops at the first enemy it
/// touches and is flagged for removal after `on_hit` runs.
pub fn bullets_vs_enemies<F>(bullets: &mut Slab<Projectile>, enemies: &mut Slab<Enemy>, mut on_hit: F)
where
    F: FnMut(&Projectile, &mut Enemy, EntityId, EntityId),
{
    for bullet_id in bullets.ids().into_iter().rev() {
        let Some(bullet) = bullets.get(bullet_id) else {
            continue;
        };
        let bullet_box = bullet.bounds();

        let target = enemies
            .iter_mut()
            .rev()
            .find(|(_, enemy)| !enemy.is_falling() && overlaps(bullet_box, enemy.bounds()));

        if let Some((enemy_id, enemy)) = target {
            on_hit(bullet, enemy, bullet_id, enemy_id);
            bullets.mark_removed(bullet_id);
        }
    }
}

/// Enemy bullets against the player. Every overlapping bullet lands.
pub fn enemy_bullets_vs_player<F>(bullets: &mut Slab<Projectile>, player: &mut Player, mut on_hit: F)
where
    F: FnMut(&Projectile, &mut Player, EntityId),
{
    if player.is_falling() {
        return;
    }

    for bullet_id in bullets.ids().into_iter().rev() {
        let Some(bullet) = bullets.get(bullet_id) else {
            continue;
        };
        if overlaps(bullet.bounds(), player.bounds()) {
            on_hit(bullet, player, bullet_id);
            bullets.mark_removed(bullet_id);
        }
    }
}

/// Asteroids against the player; an asteroid is consumed by the hit
pub fn asteroids_vs_player<F>(asteroids: &mut Slab<Asteroid>, player: &mut Player, mut on_hit: F)
where
    F: FnMut(&Asteroid, &mut Player, EntityId),
{
    if player.is_falling() {
        return;
    }

    for asteroid_id in asteroids.ids().into_iter().rev() {
        let Some(asteroid) = asteroids.get(asteroid_id) else {
            continue;
        };
        if overlaps(asteroid.bounds(), player.bounds()) {
            on_hit(asteroid, player, asteroid_id);
            asteroids.mark_removed(asteroid_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Fall, Motion};
    use crate::tuning::PlayerTuning;
    use proptest::prelude::*;

    fn enemy_at(x: f32, y: f32) -> Enemy {
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

    fn bullet_at(x: f32, y: f32) -> Projectile {
        Projectile {
            pos: Vec2::new(x, y),
            size: Vec2::new(50.0, 10.0),
            speed: 500.0,
            poison: false,
        }
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        let right = Rect::from_xywh(10.0, 0.0, 10.0, 10.0);
        let below = Rect::from_xywh(0.0, 10.0, 10.0, 10.0);
        assert!(!overlaps(a, right));
        assert!(!overlaps(a, below));
        assert!(overlaps(a, Rect::from_xywh(9.9, 9.9, 10.0, 10.0)));
    }

    #[test]
    fn test_contains_point_is_inclusive() {
        let r = Rect::from_xywh(20.0, 20.0, 10.0, 5.0);
        assert!(r.contains_point(Vec2::new(30.0, 25.0)));
        assert!(!r.contains_point(Vec2::new(30.1, 25.0)));
    }

    #[test]
    fn test_bullet_hits_at_most_one_enemy() {
        let mut bullets = Slab::new();
        let mut enemies = Slab::new();
        bullets.insert(bullet_at(410.0, 230.0));
        enemies.insert(enemy_at(400.0, 200.0));
        enemies.insert(enemy_at(420.0, 200.0));

        let mut hits = 0;
        bullets_vs_enemies(&mut bullets, &mut enemies, |_, enemy, _, _| {
            enemy.health -= 1;
            hits += 1;
        });
        assert_eq!(hits, 1);
        assert!(bullets.is_empty());
        assert_eq!(enemies.values().filter(|e| e.health == 2).count(), 1);
    }

    #[test]
    fn test_falling_enemies_are_immune() {
        let mut bullets = Slab::new();
        let mut enemies = Slab::new();
        bullets.insert(bullet_at(410.0, 230.0));
        let mut e = enemy_at(400.0, 200.0);
        e.fall.start();
        enemies.insert(e);

        bullets_vs_enemies(&mut bullets, &mut enemies, |_, _, _, _| {
            panic!("falling enemy was selected");
        });
        assert_eq!(bullets.len(), 1);
    }

    #[test]
    fn test_player_takes_every_overlapping_enemy_bullet() {
        let mut player = Player::new(&PlayerTuning::default());
        let mut bullets = Slab::new();
        bullets.insert(Projectile {
            speed: -400.0,
            ..bullet_at(120.0, 220.0)
        });
        bullets.insert(Projectile {
            speed: -400.0,
            ..bullet_at(130.0, 260.0)
        });
        bullets.insert(bullet_at(600.0, 260.0));

        let mut hits = 0;
        enemy_bullets_vs_player(&mut bullets, &mut player, |_, p, _| {
            p.health -= 10.0;
            hits += 1;
        });
        assert_eq!(hits, 2);
        assert_eq!(player.health, 80.0);
        assert_eq!(bullets.len(), 1);
    }

    #[test]
    fn test_falling_player_is_skipped() {
        let mut player = Player::new(&PlayerTuning::default());
        player.fall.start();
        let mut bullets = Slab::new();
        bullets.insert(bullet_at(120.0, 220.0));
        let mut asteroids = Slab::new();
        asteroids.insert(Asteroid {
            pos: Vec2::new(120.0, 220.0),
            size: Vec2::new(50.0, 50.0),
            speed: 200.0,
            rotation: 0.0,
            rotation_speed: 1.0,
            damage: 10.0,
        });

        enemy_bullets_vs_player(&mut bullets, &mut player, |_, _, _| panic!("hit while falling"));
        asteroids_vs_player(&mut asteroids, &mut player, |_, _, _| panic!("hit while falling"));
        assert_eq!(bullets.len(), 1);
        assert_eq!(asteroids.len(), 1);
    }

    #[test]
    fn test_asteroid_consumed_on_hit() {
        let mut player = Player::new(&PlayerTuning::default());
        let mut asteroids = Slab::new();
        asteroids.insert(Asteroid {
            pos: Vec2::new(150.0, 250.0),
            size: Vec2::new(50.0, 50.0),
            speed: 200.0,
            rotation: 0.0,
            rotation_speed: 1.0,
            damage: 10.0,
        });
        asteroids_vs_player(&mut asteroids, &mut player, |a, p, _| p.health -= a.damage);
        assert_eq!(player.health, 90.0);
        assert!(asteroids.is_empty());
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (-500.0f32..500.0, -500.0f32..500.0, 0.0f32..200.0, 0.0f32..200.0)
            .prop_map(|(x, y, w, h)| Rect::from_xywh(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(a in arb_rect(), b in arb_rect()) {
            prop_assert_eq!(overlaps(a, b), overlaps(b, a));
        }

        #[test]
        fn prop_shared_vertical_edge_never_overlaps(a in arb_rect(), h in 0.0f32..200.0, dy in -100.0f32..100.0, w in 0.0f32..200.0) {
            let b = Rect::new(Vec2::new(a.right(), a.pos.y + dy), Vec2::new(w, h));
            prop_assert!(!overlaps(a, b));
        }
    }
}
