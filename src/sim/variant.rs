//! Level variants as data
//!
//! The three levels share one simulation; what differs is captured in a
//! static [`VariantDescriptor`]: enemy hull size, steering rule, spawn
//! extras, projectile flavour and the asset manifest.

use std::fmt;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyProfile;
use super::state::{Asteroid, Enemy, Fall, Motion, Player, Projectile, Shield};
use crate::assets::AssetEntry;
use crate::error::{Error, Result};
use crate::tuning::Tuning;

/// Playable level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelId {
    One,
    Two,
    Three,
}

impl LevelId {
    pub const ALL: [LevelId; 3] = [LevelId::One, LevelId::Two, LevelId::Three];

    pub fn number(&self) -> u8 {
        match self {
            LevelId::One => 1,
            LevelId::Two => 2,
            LevelId::Three => 3,
        }
    }

    /// Scene name used by the state manager (`level1` ...)
    pub fn scene_name(&self) -> &'static str {
        match self {
            LevelId::One => "level1",
            LevelId::Two => "level2",
            LevelId::Three => "level3",
        }
    }

    pub fn descriptor(&self) -> &'static VariantDescriptor {
        match self {
            LevelId::One => &LEVEL_1,
            LevelId::Two => &LEVEL_2,
            LevelId::Three => &LEVEL_3,
        }
    }
}

impl TryFrom<u8> for LevelId {
    type Error = Error;

    fn try_from(n: u8) -> Result<Self> {
        match n {
            1 => Ok(LevelId::One),
            2 => Ok(LevelId::Two),
            3 => Ok(LevelId::Three),
            other => Err(Error::UnknownLevel(other)),
        }
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.number())
    }
}

/// How enemies of a level move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionRule {
    /// Approach, then bob around the spawn height
    Hover,
    /// Patrol a horizontal band with timed reversals
    Patrol,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldRule {
    /// Probability a spawned enemy carries a shield
    pub chance: f64,
    pub points: u32,
}

/// Where a background layer is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Stretched over the whole viewport
    Fill,
    /// Scaled image resting on the bottom edge at `x`
    Ground { x: f32, scale: f32 },
    /// Scaled image with its top-left corner at `pos`
    At { pos: Vec2, scale: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundLayer {
    pub key: &'static str,
    pub path: &'static str,
    pub placement: Placement,
}

/// Everything that distinguishes one level from another
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDescriptor {
    pub level: LevelId,
    pub enemy_size: Vec2,
    pub motion: MotionRule,
    pub shield: Option<ShieldRule>,
    /// Probability an enemy bullet is poisoned
    pub poison_chance: f64,
    pub asteroids: bool,
    /// Image key of this level's enemy ship
    pub enemy_image: &'static str,
    pub enemy_image_path: &'static str,
    pub layers: &'static [BackgroundLayer],
}

pub const PLAYER_IMAGE: &str = "player_ship";
pub const BULLET_IMAGE: &str = "bullet";
pub const ENEMY_BULLET_IMAGE: &str = "enemy_bullet";
pub const MENU_IMAGE: &str = "menu";

const SHARED_ASSETS: [AssetEntry; 4] = [
    AssetEntry::new(PLAYER_IMAGE, "assets/images/naves/nave_terrestre.png"),
    AssetEntry::new(BULLET_IMAGE, "assets/images/naves/bala.gif"),
    AssetEntry::new(ENEMY_BULLET_IMAGE, "assets/images/naves/bala_enemiga.png"),
    AssetEntry::new(MENU_IMAGE, "assets/images/ui/menu.png"),
];

static LEVEL_1_LAYERS: [BackgroundLayer; 4] = [
    BackgroundLayer {
        key: "backdrop_1",
        path: "assets/images/escenarios/escenario_n1.jpg",
        placement: Placement::Fill,
    },
    BackgroundLayer {
        key: "building_1",
        path: "assets/images/escenarios/edificio1_n1.png",
        placement: Placement::Ground { x: 100.0, scale: 0.8 },
    },
    BackgroundLayer {
        key: "building_2",
        path: "assets/images/escenarios/edificio2_n1.png",
        placement: Placement::Ground { x: 400.0, scale: 0.8 },
    },
    BackgroundLayer {
        key: "building_3",
        path: "assets/images/escenarios/edificio3_n1.png",
        placement: Placement::Ground { x: 700.0, scale: 0.8 },
    },
];

static LEVEL_2_LAYERS: [BackgroundLayer; 3] = [
    BackgroundLayer {
        key: "backdrop_2",
        path: "assets/images/escenarios/escenario_n2.jpg",
        placement: Placement::Fill,
    },
    BackgroundLayer {
        key: "earth",
        path: "assets/images/escenarios/tierra.png",
        placement: Placement::At {
            pos: Vec2::new(150.0, 100.0),
            scale: 0.6,
        },
    },
    BackgroundLayer {
        key: "moon",
        path: "assets/images/escenarios/luna.png",
        placement: Placement::At {
            pos: Vec2::new(600.0, 150.0),
            scale: 0.4,
        },
    },
];

static LEVEL_3_LAYERS: [BackgroundLayer; 4] = [
    BackgroundLayer {
        key: "backdrop_3",
        path: "assets/images/escenarios/escenario_n3.jpg",
        placement: Placement::Fill,
    },
    BackgroundLayer {
        key: "rover",
        path: "assets/images/escenarios/carro.png",
        placement: Placement::Ground { x: 50.0, scale: 0.4 },
    },
    BackgroundLayer {
        key: "mothership",
        path: "assets/images/escenarios/nave_escenario.png",
        placement: Placement::At {
            pos: Vec2::new(500.0, 0.0),
            scale: 0.8,
        },
    },
    BackgroundLayer {
        key: "ufos",
        path: "assets/images/escenarios/ovnis.png",
        placement: Placement::At {
            pos: Vec2::new(350.0, 0.0),
            scale: 0.8,
        },
    },
];

static LEVEL_1: VariantDescriptor = VariantDescriptor {
    level: LevelId::One,
    enemy_size: Vec2::new(80.0, 80.0),
    motion: MotionRule::Hover,
    shield: None,
    poison_chance: 0.0,
    asteroids: false,
    enemy_image: "enemy_ship_1",
    enemy_image_path: "assets/images/naves/nave_extraterrestre_n1.png",
    layers: &LEVEL_1_LAYERS,
};

static LEVEL_2: VariantDescriptor = VariantDescriptor {
    level: LevelId::Two,
    enemy_size: Vec2::new(80.0, 80.0),
    motion: MotionRule::Hover,
    shield: None,
    poison_chance: 0.2,
    asteroids: false,
    enemy_image: "enemy_ship_2",
    enemy_image_path: "assets/images/naves/nave_extraterrestre_n2.png",
    layers: &LEVEL_2_LAYERS,
};

static LEVEL_3: VariantDescriptor = VariantDescriptor {
    level: LevelId::Three,
    enemy_size: Vec2::new(120.0, 60.0),
    motion: MotionRule::Patrol,
    shield: Some(ShieldRule {
        chance: 0.3,
        points: 3,
    }),
    poison_chance: 0.35,
    asteroids: true,
    enemy_image: "enemy_ship_3",
    enemy_image_path: "assets/images/naves/nave_extraterrestre_n3.png",
    layers: &LEVEL_3_LAYERS,
};

/// Read-only context for steering one enemy
#[derive(Debug, Clone, Copy)]
pub struct SteerContext {
    pub viewport: Vec2,
    /// Right edge of the player's ship
    pub player_right: f32,
    pub hold_distance: f32,
    pub reversal_min: f32,
    pub reversal_jitter: f32,
}

/// `lo + U(0,1) * (hi - lo)`; tolerates an empty or inverted range
fn uniform<R: Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    lo + rng.random::<f32>() * (hi - lo).max(0.0)
}

fn random_sign<R: Rng>(rng: &mut R) -> f32 {
    if rng.random_bool(0.5) { 1.0 } else { -1.0 }
}

impl VariantDescriptor {
    /// Every image this level needs
    pub fn manifest(&self) -> Vec<AssetEntry> {
        let mut entries: Vec<AssetEntry> = self
            .layers
            .iter()
            .map(|l| AssetEntry::new(l.key, l.path))
            .collect();
        entries.push(AssetEntry::new(self.enemy_image, self.enemy_image_path));
        entries.extend(SHARED_ASSETS);
        entries
    }

    /// Build a new enemy entering from the right edge
    pub fn spawn_enemy<R: Rng>(
        &self,
        tuning: &Tuning,
        profile: &DifficultyProfile,
        player: &Player,
        rng: &mut R,
    ) -> Enemy {
        let viewport = tuning.viewport;
        let margin = tuning.enemy.spawn_margin;
        let y = uniform(rng, margin, viewport.y - self.enemy_size.y - margin);
        let vertical_direction = random_sign(rng);

        let motion = match self.motion {
            MotionRule::Hover => Motion::Hover {
                vertical_direction,
                center: y,
                amplitude: tuning.enemy.vertical_amplitude,
            },
            MotionRule::Patrol => Motion::Patrol {
                horizontal_direction: -1.0,
                vertical_direction,
                min_x: player.pos.x + tuning.enemy.min_x_offset,
                max_x: viewport.x - tuning.enemy.max_x_inset,
                reversal_timer: 0.0,
                reversal_interval: uniform(
                    rng,
                    tuning.enemy.reversal_min,
                    tuning.enemy.reversal_min + tuning.enemy.reversal_jitter,
                ),
            },
        };

        let shield = self
            .shield
            .filter(|rule| rng.random_bool(rule.chance.clamp(0.0, 1.0)))
            .map(|rule| Shield::new(rule.points));

        Enemy {
            pos: Vec2::new(viewport.x, y),
            size: self.enemy_size,
            speed: tuning.enemy.speed,
            vertical_speed: tuning.enemy.vertical_speed,
            health: profile.enemy_health,
            max_health: profile.enemy_health,
            shield,
            fall: Fall::new(tuning.enemy.fall_acceleration),
            shoot_timer: uniform(rng, 0.0, profile.shoot_cooldown),
            motion,
        }
    }

    /// Bullet fired leftward from the enemy's nose
    pub fn enemy_bullet<R: Rng>(&self, tuning: &Tuning, enemy: &Enemy, rng: &mut R) -> Projectile {
        let size = tuning.enemy_bullet.size;
        let poison = self.poison_chance > 0.0 && rng.random_bool(self.poison_chance.clamp(0.0, 1.0));
        Projectile {
            pos: Vec2::new(enemy.pos.x, enemy.pos.y + enemy.size.y / 2.0 - size.y / 2.0),
            size,
            speed: -tuning.enemy_bullet.speed,
            poison,
        }
    }

    /// Asteroid entering from the right at a random height
    pub fn spawn_asteroid<R: Rng>(&self, tuning: &Tuning, rng: &mut R) -> Asteroid {
        let a = &tuning.asteroid;
        let size = uniform(rng, a.min_size, a.max_size);
        let y = uniform(rng, 0.0, tuning.viewport.y - size);
        Asteroid {
            pos: Vec2::new(tuning.viewport.x, y),
            size: Vec2::splat(size),
            speed: uniform(rng, a.min_speed, a.max_speed),
            rotation: 0.0,
            rotation_speed: uniform(rng, -a.max_rotation_speed, a.max_rotation_speed),
            damage: a.damage,
        }
    }
}

/// Advance one living enemy by its motion rule
pub fn steer<R: Rng>(enemy: &mut Enemy, ctx: &SteerContext, rng: &mut R, dt: f32) {
    let max_y = ctx.viewport.y - enemy.size.y;

    let vertical_direction = match &mut enemy.motion {
        Motion::Hover {
            vertical_direction,
            center,
            amplitude,
        } => {
            if enemy.pos.x > ctx.player_right + ctx.hold_distance {
                enemy.pos.x -= enemy.speed * dt;
            }
            enemy.pos.y += *vertical_direction * enemy.vertical_speed * dt;
            if (enemy.pos.y - *center).abs() > *amplitude / 2.0 {
                *vertical_direction = -*vertical_direction;
            }
            vertical_direction
        }
        Motion::Patrol {
            horizontal_direction,
            vertical_direction,
            min_x,
            max_x,
            reversal_timer,
            reversal_interval,
        } => {
            *reversal_timer += dt;
            if *reversal_timer >= *reversal_interval {
                *horizontal_direction = -*horizontal_direction;
                *reversal_timer = 0.0;
                *reversal_interval =
                    uniform(rng, ctx.reversal_min, ctx.reversal_min + ctx.reversal_jitter);
            }

            enemy.pos.x += *horizontal_direction * enemy.speed * dt;
            if enemy.pos.x < *min_x {
                enemy.pos.x = *min_x;
                *horizontal_direction = 1.0;
            }
            if enemy.pos.x > *max_x {
                enemy.pos.x = *max_x;
                *horizontal_direction = -1.0;
            }

            enemy.pos.y += *vertical_direction * enemy.vertical_speed * dt;
            vertical_direction
        }
    };

    if enemy.pos.y < 0.0 {
        enemy.pos.y = 0.0;
        *vertical_direction = 1.0;
    }
    if enemy.pos.y > max_y {
        enemy.pos.y = max_y;
        *vertical_direction = -1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Difficulty;
    use crate::tuning::PlayerTuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ctx() -> SteerContext {
        SteerContext {
            viewport: Vec2::new(960.0, 540.0),
            player_right: 200.0,
            hold_distance: 50.0,
            reversal_min: 2.0,
            reversal_jitter: 3.0,
        }
    }

    #[test]
    fn test_level_numbers() {
        for level in LevelId::ALL {
            assert_eq!(LevelId::try_from(level.number()).unwrap(), level);
            assert_eq!(level.descriptor().level, level);
        }
        assert!(matches!(LevelId::try_from(4), Err(Error::UnknownLevel(4))));
        assert!(matches!(LevelId::try_from(0), Err(Error::UnknownLevel(0))));
    }

    #[test]
    fn test_manifest_has_level_specific_and_shared_images() {
        let m = LevelId::Three.descriptor().manifest();
        let keys: Vec<&str> = m.iter().map(|e| e.key).collect();
        assert!(keys.contains(&"enemy_ship_3"));
        assert!(keys.contains(&PLAYER_IMAGE));
        assert!(keys.contains(&MENU_IMAGE));
        assert_eq!(m.len(), 4 + 1 + SHARED_ASSETS.len());
    }

    #[test]
    fn test_spawn_stays_inside_margins() {
        let tuning = Tuning::default();
        let player = Player::new(&PlayerTuning::default());
        let mut rng = Pcg32::seed_from_u64(7);
        for level in LevelId::ALL {
            let d = level.descriptor();
            let profile = DifficultyProfile::lookup(level, Difficulty::Medium);
            for _ in 0..200 {
                let e = d.spawn_enemy(&tuning, &profile, &player, &mut rng);
                assert_eq!(e.pos.x, 960.0);
                assert!(e.pos.y >= 50.0);
                assert!(e.pos.y <= 540.0 - d.enemy_size.y - 50.0);
                assert!(e.shoot_timer >= 0.0 && e.shoot_timer <= profile.shoot_cooldown);
                if level != LevelId::Three {
                    assert!(e.shield.is_none());
                }
            }
        }
    }

    #[test]
    fn test_level_one_never_poisons() {
        let tuning = Tuning::default();
        let player = Player::new(&PlayerTuning::default());
        let mut rng = Pcg32::seed_from_u64(1);
        let d = LevelId::One.descriptor();
        let profile = DifficultyProfile::lookup(LevelId::One, Difficulty::Hard);
        let e = d.spawn_enemy(&tuning, &profile, &player, &mut rng);
        for _ in 0..100 {
            let b = d.enemy_bullet(&tuning, &e, &mut rng);
            assert!(!b.poison);
            assert_eq!(b.speed, -400.0);
            assert_eq!(b.pos.y, e.pos.y + 40.0 - 15.0);
        }
    }

    #[test]
    fn test_hover_holds_distance_from_player() {
        let tuning = Tuning::default();
        let player = Player::new(&PlayerTuning::default());
        let mut rng = Pcg32::seed_from_u64(3);
        let d = LevelId::One.descriptor();
        let profile = DifficultyProfile::lookup(LevelId::One, Difficulty::Medium);
        let mut e = d.spawn_enemy(&tuning, &profile, &player, &mut rng);

        for _ in 0..2000 {
            steer(&mut e, &ctx(), &mut rng, 1.0 / 60.0);
            assert!(e.pos.y >= 0.0 && e.pos.y <= 540.0 - e.size.y);
        }
        // Stops within one step of the hold line
        assert!(e.pos.x <= 250.0);
        assert!(e.pos.x > 250.0 - 150.0 / 60.0 - 1e-3);
    }

    #[test]
    fn test_patrol_stays_in_band() {
        let tuning = Tuning::default();
        let player = Player::new(&PlayerTuning::default());
        let mut rng = Pcg32::seed_from_u64(11);
        let d = LevelId::Three.descriptor();
        let profile = DifficultyProfile::lookup(LevelId::Three, Difficulty::Medium);
        let mut e = d.spawn_enemy(&tuning, &profile, &player, &mut rng);

        for _ in 0..3000 {
            steer(&mut e, &ctx(), &mut rng, 1.0 / 60.0);
            assert!(e.pos.x >= 200.0 && e.pos.x <= 860.0);
            if let Motion::Patrol {
                reversal_interval, ..
            } = e.motion
            {
                assert!((2.0..=5.0).contains(&reversal_interval));
            }
        }
    }

    #[test]
    fn test_asteroid_ranges() {
        let tuning = Tuning::default();
        let mut rng = Pcg32::seed_from_u64(5);
        let d = LevelId::Three.descriptor();
        for _ in 0..100 {
            let a = d.spawn_asteroid(&tuning, &mut rng);
            assert!((40.0..=70.0).contains(&a.size.x));
            assert!((150.0..=250.0).contains(&a.speed));
            assert!(a.rotation_speed.abs() <= 2.0);
            assert!(a.pos.y + a.size.y <= 540.0 + 1e-3);
        }
    }
}
