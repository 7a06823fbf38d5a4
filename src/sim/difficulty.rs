//! Per-level difficulty tables

use serde::{Deserialize, Serialize};

use super::variant::LevelId;
use crate::settings::Difficulty;

/// Enemy pressure for one level at one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// Enemies to destroy to finish the level (also the spawn cap)
    pub max_enemies: u32,
    /// Seconds between spawns
    pub spawn_interval: f32,
    /// Seconds between shots of one enemy
    pub shoot_cooldown: f32,
    pub enemy_health: u32,
    /// Health removed from the player per enemy bullet
    pub enemy_damage: f32,
}

const fn profile(
    max_enemies: u32,
    spawn_interval: f32,
    shoot_cooldown: f32,
    enemy_health: u32,
    enemy_damage: f32,
) -> DifficultyProfile {
    DifficultyProfile {
        max_enemies,
        spawn_interval,
        shoot_cooldown,
        enemy_health,
        enemy_damage,
    }
}

/// Easy, medium, hard
type Table = [DifficultyProfile; 3];

const LEVEL_1: Table = [
    profile(10, 3.0, 2.0, 2, 5.0),
    profile(20, 2.0, 1.5, 3, 10.0),
    profile(30, 1.5, 1.0, 5, 15.0),
];

const LEVEL_2: Table = [
    profile(15, 2.5, 1.8, 3, 8.0),
    profile(25, 2.0, 1.3, 4, 12.0),
    profile(35, 1.5, 1.0, 6, 18.0),
];

// Fewer, tougher enemies
const LEVEL_3: Table = [
    profile(8, 3.0, 1.8, 5, 10.0),
    profile(12, 2.5, 1.5, 8, 15.0),
    profile(15, 2.0, 1.2, 12, 20.0),
];

impl DifficultyProfile {
    pub fn lookup(level: LevelId, difficulty: Difficulty) -> Self {
        let table = match level {
            LevelId::One => &LEVEL_1,
            LevelId::Two => &LEVEL_2,
            LevelId::Three => &LEVEL_3,
        };
        match difficulty {
            Difficulty::Easy => table[0],
            Difficulty::Medium => table[1],
            Difficulty::Hard => table[2],
        }
    }

    /// Resolve a raw tier name; unknown names use medium
    pub fn for_tier(level: LevelId, tier: &str) -> Self {
        Self::lookup(level, Difficulty::from_str_or_default(tier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_level_one() {
        let p = DifficultyProfile::for_tier(LevelId::One, "dificil");
        assert_eq!(p.max_enemies, 30);
        assert_eq!(p.enemy_health, 5);
        assert_eq!(p.enemy_damage, 15.0);
        assert_eq!(p.spawn_interval, 1.5);
    }

    #[test]
    fn test_unknown_tier_is_medium() {
        for level in LevelId::ALL {
            assert_eq!(
                DifficultyProfile::for_tier(level, "nightmare"),
                DifficultyProfile::lookup(level, Difficulty::Medium)
            );
        }
        assert_eq!(DifficultyProfile::for_tier(LevelId::Two, "").max_enemies, 25);
    }

    #[test]
    fn test_level_three_is_fewer_but_tougher() {
        let l1 = DifficultyProfile::lookup(LevelId::One, Difficulty::Medium);
        let l3 = DifficultyProfile::lookup(LevelId::Three, Difficulty::Medium);
        assert!(l3.max_enemies < l1.max_enemies);
        assert!(l3.enemy_health > l1.enemy_health);
        assert_eq!(l3.shoot_cooldown, 1.5);
    }
}
