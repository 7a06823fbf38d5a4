//! Hit resolution shared by the AABB scans and the physics contact listener

use serde::{Deserialize, Serialize};

use super::state::{Asteroid, Enemy, Player, Poison, Projectile};

/// Outcome of a player bullet striking an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletHit {
    /// Enemy was already falling
    Ignored,
    /// Absorbed by the shield
    ShieldHit { remaining: u32 },
    Damaged { remaining: u32 },
    /// Health reached zero; the enemy has started falling
    Destroyed,
}

/// Outcome of something striking the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerHit {
    /// Player was already falling
    Ignored,
    Damaged { poisoned: bool },
    /// Health reached zero; the player has started falling
    Lethal { poisoned: bool },
}

impl PlayerHit {
    pub fn landed(&self) -> bool {
        !matches!(self, PlayerHit::Ignored)
    }
}

/// One point of damage, taken from the shield first
pub fn apply_bullet_hit(enemy: &mut Enemy) -> BulletHit {
    if enemy.is_falling() {
        return BulletHit::Ignored;
    }

    if let Some(shield) = enemy.shield.as_mut().filter(|s| s.is_up()) {
        shield.health -= 1;
        log::debug!("Shield hit ({}/{})", shield.health, shield.max_health);
        return BulletHit::ShieldHit {
            remaining: shield.health,
        };
    }

    enemy.health = enemy.health.saturating_sub(1);
    if enemy.health == 0 {
        enemy.fall.start();
        return BulletHit::Destroyed;
    }
    log::debug!("Enemy hit ({}/{})", enemy.health, enemy.max_health);
    BulletHit::Damaged {
        remaining: enemy.health,
    }
}

/// Subtract `damage` from the player, arming poison if the bullet carries it
pub fn apply_enemy_bullet_hit(
    player: &mut Player,
    poison: &mut Poison,
    bullet: &Projectile,
    damage: f32,
) -> PlayerHit {
    damage_player(player, poison, damage, bullet.poison)
}

/// Asteroid impact. Never poisons.
pub fn apply_asteroid_hit(player: &mut Player, poison: &mut Poison, asteroid: &Asteroid) -> PlayerHit {
    damage_player(player, poison, asteroid.damage, false)
}

/// Poison damage at a tick boundary
pub fn apply_poison_tick(player: &mut Player, damage: f32) -> PlayerHit {
    if player.is_falling() {
        return PlayerHit::Ignored;
    }
    player.health -= damage;
    if player.check_lethal() {
        PlayerHit::Lethal { poisoned: true }
    } else {
        PlayerHit::Damaged { poisoned: true }
    }
}

fn damage_player(player: &mut Player, poison: &mut Poison, damage: f32, poisons: bool) -> PlayerHit {
    if player.is_falling() {
        return PlayerHit::Ignored;
    }

    player.health -= damage;
    if poisons {
        poison.apply();
        log::debug!("Player poisoned for {:.1}s", poison.max_duration);
    }
    log::debug!("Player hit ({:.0}/{:.0})", player.health, player.max_health);

    if player.check_lethal() {
        PlayerHit::Lethal { poisoned: poisons }
    } else {
        PlayerHit::Damaged { poisoned: poisons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Fall, Motion, Shield};
    use crate::tuning::{PlayerTuning, PoisonTuning};
    use glam::Vec2;

    fn enemy(health: u32, shield: Option<u32>) -> Enemy {
        Enemy {
            pos: Vec2::new(400.0, 200.0),
            size: Vec2::new(120.0, 60.0),
            speed: 150.0,
            vertical_speed: 100.0,
            health,
            max_health: health,
            shield: shield.map(Shield::new),
            fall: Fall::new(400.0),
            shoot_timer: 0.0,
            motion: Motion::Hover {
                vertical_direction: 1.0,
                center: 200.0,
                amplitude: 100.0,
            },
        }
    }

    fn enemy_bullet(poison: bool) -> Projectile {
        Projectile {
            pos: Vec2::ZERO,
            size: Vec2::new(70.0, 30.0),
            speed: -400.0,
            poison,
        }
    }

    #[test]
    fn test_shield_absorbs_before_health() {
        let mut e = enemy(5, Some(3));
        for expected in [2, 1, 0] {
            assert_eq!(
                apply_bullet_hit(&mut e),
                BulletHit::ShieldHit {
                    remaining: expected
                }
            );
        }
        assert_eq!(e.shield.map(|s| s.health), Some(0));
        assert_eq!(e.health, 5);

        assert_eq!(apply_bullet_hit(&mut e), BulletHit::Damaged { remaining: 4 });
        assert_eq!(e.health, 4);
    }

    #[test]
    fn test_last_hit_starts_fall_and_further_hits_are_ignored() {
        let mut e = enemy(1, None);
        assert_eq!(apply_bullet_hit(&mut e), BulletHit::Destroyed);
        assert!(e.is_falling());
        assert_eq!(e.fall.speed, 0.0);
        assert_eq!(apply_bullet_hit(&mut e), BulletHit::Ignored);
        assert_eq!(e.health, 0);
    }

    #[test]
    fn test_enemy_bullet_damages_and_poisons() {
        let mut player = Player::new(&PlayerTuning::default());
        let mut poison = Poison::new(&PoisonTuning::default());

        let hit = apply_enemy_bullet_hit(&mut player, &mut poison, &enemy_bullet(false), 10.0);
        assert_eq!(hit, PlayerHit::Damaged { poisoned: false });
        assert!(!poison.active);

        let hit = apply_enemy_bullet_hit(&mut player, &mut poison, &enemy_bullet(true), 10.0);
        assert_eq!(hit, PlayerHit::Damaged { poisoned: true });
        assert!(poison.active);
        assert_eq!(player.health, 80.0);
    }

    #[test]
    fn test_lethal_hit_then_immune_while_falling() {
        let mut player = Player::new(&PlayerTuning::default());
        let mut poison = Poison::new(&PoisonTuning::default());
        player.health = 5.0;

        let hit = apply_enemy_bullet_hit(&mut player, &mut poison, &enemy_bullet(false), 10.0);
        assert_eq!(hit, PlayerHit::Lethal { poisoned: false });
        assert!(player.is_falling());

        let asteroid = Asteroid {
            pos: Vec2::ZERO,
            size: Vec2::splat(50.0),
            speed: 200.0,
            rotation: 0.0,
            rotation_speed: 0.0,
            damage: 10.0,
        };
        assert!(!apply_asteroid_hit(&mut player, &mut poison, &asteroid).landed());
        assert!(!apply_poison_tick(&mut player, 0.5).landed());
        assert_eq!(player.health, -5.0);
    }

    #[test]
    fn test_poison_tick_can_kill() {
        let mut player = Player::new(&PlayerTuning::default());
        player.health = 0.5;
        assert_eq!(apply_poison_tick(&mut player, 0.5), PlayerHit::Lethal { poisoned: true });
    }
}
