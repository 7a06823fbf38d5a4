//! Data-driven game balance
//!
//! Every gameplay constant that is not part of a difficulty table lives here.
//! Defaults reproduce the shipped game; a JSON document may override any
//! subset of fields.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Top-left corner at level start
    pub start: Vec2,
    pub size: Vec2,
    /// Vertical speed (px/s)
    pub speed: f32,
    pub max_health: f32,
    /// Fall acceleration once destroyed (px/s²)
    pub fall_acceleration: f32,
    /// Seconds between shots
    pub shoot_cooldown: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            start: Vec2::new(100.0, 200.0),
            size: Vec2::new(100.0, 100.0),
            speed: 300.0,
            max_health: 100.0,
            fall_acceleration: 400.0,
            shoot_cooldown: 0.2,
        }
    }
}

/// Fields missing from a JSON override fall back to the player projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub size: Vec2,
    /// Unsigned speed; direction is applied by the shooter
    pub speed: f32,
}

impl ProjectileTuning {
    fn player() -> Self {
        Self {
            size: Vec2::new(50.0, 10.0),
            speed: 500.0,
        }
    }

    fn enemy() -> Self {
        Self {
            size: Vec2::new(70.0, 30.0),
            speed: 400.0,
        }
    }
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self::player()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub speed: f32,
    pub vertical_speed: f32,
    /// Full oscillation band around the spawn height (levels 1-2)
    pub vertical_amplitude: f32,
    /// Keep-out band at the top and bottom of the viewport when spawning
    pub spawn_margin: f32,
    /// Approaching enemies stop this far right of the player's right edge
    pub hold_distance: f32,
    pub fall_acceleration: f32,
    /// Direction reversal interval is `reversal_min + U(0, reversal_jitter)`
    pub reversal_min: f32,
    pub reversal_jitter: f32,
    /// Level 3 horizontal band: `[player.x + min_x_offset, width - max_x_inset]`
    pub min_x_offset: f32,
    pub max_x_inset: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            speed: 150.0,
            vertical_speed: 100.0,
            vertical_amplitude: 100.0,
            spawn_margin: 50.0,
            hold_distance: 50.0,
            fall_acceleration: 400.0,
            reversal_min: 2.0,
            reversal_jitter: 3.0,
            min_x_offset: 100.0,
            max_x_inset: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoisonTuning {
    pub max_duration: f32,
    pub damage_per_second: f32,
    pub tick_interval: f32,
}

impl Default for PoisonTuning {
    fn default() -> Self {
        Self {
            max_duration: 5.0,
            damage_per_second: 1.0,
            tick_interval: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsteroidTuning {
    pub spawn_interval: f32,
    /// Concurrent cap
    pub max_alive: usize,
    pub min_size: f32,
    pub max_size: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Rotation speed is drawn from `±max_rotation_speed` (rad/s)
    pub max_rotation_speed: f32,
    pub damage: f32,
}

impl Default for AsteroidTuning {
    fn default() -> Self {
        Self {
            spawn_interval: 4.0,
            max_alive: 4,
            min_size: 40.0,
            max_size: 70.0,
            min_speed: 150.0,
            max_speed: 250.0,
            max_rotation_speed: 2.0,
            damage: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Try to bring up the rigid-body backend at level construction
    pub enabled: bool,
    /// Pixels per physics meter
    pub scale: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            scale: 30.0,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }
}

/// Complete balance sheet for a level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub viewport: Vec2,
    pub player: PlayerTuning,
    pub bullet: ProjectileTuning,
    pub enemy_bullet: ProjectileTuning,
    pub enemy: EnemyTuning,
    pub poison: PoisonTuning,
    pub asteroid: AsteroidTuning,
    pub physics: PhysicsTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            viewport: Vec2::new(VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            player: PlayerTuning::default(),
            bullet: ProjectileTuning::player(),
            enemy_bullet: ProjectileTuning::enemy(),
            enemy: EnemyTuning::default(),
            poison: PoisonTuning::default(),
            asteroid: AsteroidTuning::default(),
            physics: PhysicsTuning::default(),
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override on top of the defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Physics gravity in m/s², chosen so bodies fall like the manual path
    pub fn physics_gravity(&self) -> f32 {
        self.enemy.fall_acceleration / self.physics.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_game() {
        let t = Tuning::default();
        assert_eq!(t.viewport, Vec2::new(960.0, 540.0));
        assert_eq!(t.player.max_health, 100.0);
        assert_eq!(t.bullet.speed, 500.0);
        assert_eq!(t.enemy_bullet.size, Vec2::new(70.0, 30.0));
        assert_eq!(t.poison.tick_interval, 0.5);
    }

    #[test]
    fn test_partial_override() {
        let t = Tuning::from_json(r#"{ "player": { "speed": 450.0 }, "physics": { "enabled": false } }"#)
            .unwrap();
        assert_eq!(t.player.speed, 450.0);
        // Untouched fields keep their defaults
        assert_eq!(t.player.max_health, 100.0);
        assert!(!t.physics.enabled);
        assert_eq!(t.physics.scale, 30.0);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
