//! Entity types and per-level status effects

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::{Bounded, Rect};
use crate::consts::TIMER_EPSILON;
use crate::tuning::{PlayerTuning, PoisonTuning};

/// Gravity-only descent shared by the player and enemies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fall {
    pub active: bool,
    pub speed: f32,
    pub acceleration: f32,
}

impl Fall {
    pub fn new(acceleration: f32) -> Self {
        Self {
            active: false,
            speed: 0.0,
            acceleration,
        }
    }

    /// Enter the falling state from rest
    pub fn start(&mut self) {
        self.active = true;
        self.speed = 0.0;
    }

    /// Accelerate, then return the vertical displacement for this frame
    pub fn integrate(&mut self, dt: f32) -> f32 {
        self.speed += self.acceleration * dt;
        self.speed * dt
    }
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub size: Vec2,
    /// Vertical speed magnitude (px/s)
    pub speed: f32,
    pub velocity_y: f32,
    pub health: f32,
    pub max_health: f32,
    pub fall: Fall,
    /// Terminal state: fell past the bottom edge
    pub destroyed: bool,
}

impl Player {
    pub fn new(tuning: &PlayerTuning) -> Self {
        Self {
            pos: tuning.start,
            size: tuning.size,
            speed: tuning.speed,
            velocity_y: 0.0,
            health: tuning.max_health,
            max_health: tuning.max_health,
            fall: Fall::new(tuning.fall_acceleration),
            destroyed: false,
        }
    }

    pub fn is_falling(&self) -> bool {
        self.fall.active
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }

    /// Start falling if health is spent. Returns true on the transition.
    pub fn check_lethal(&mut self) -> bool {
        if self.health <= 0.0 && !self.fall.active {
            self.fall.start();
            return true;
        }
        false
    }
}

impl Bounded for Player {
    fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// Secondary hit-point pool, depleted before health
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shield {
    pub health: u32,
    pub max_health: u32,
}

impl Shield {
    pub fn new(points: u32) -> Self {
        Self {
            health: points,
            max_health: points,
        }
    }

    pub fn is_up(&self) -> bool {
        self.health > 0
    }
}

/// Per-variant steering state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Approach from the right, then bob around a fixed height (levels 1-2)
    Hover {
        vertical_direction: f32,
        center: f32,
        amplitude: f32,
    },
    /// Drift back and forth inside a band, reversing on a timer (level 3)
    Patrol {
        horizontal_direction: f32,
        vertical_direction: f32,
        min_x: f32,
        max_x: f32,
        reversal_timer: f32,
        reversal_interval: f32,
    },
}

/// An enemy ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub vertical_speed: f32,
    pub health: u32,
    pub max_health: u32,
    pub shield: Option<Shield>,
    pub fall: Fall,
    /// Seconds since the last shot
    pub shoot_timer: f32,
    pub motion: Motion,
}

impl Enemy {
    pub fn is_falling(&self) -> bool {
        self.fall.active
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health == 0 {
            0.0
        } else {
            self.health as f32 / self.max_health as f32
        }
    }
}

impl Bounded for Enemy {
    fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// A bullet; `speed` is signed (positive travels right)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    /// Arms the poison effect on the player when it hits
    pub poison: bool,
}

impl Bounded for Projectile {
    fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// Tumbling hazard (level 3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asteroid {
    pub pos: Vec2,
    pub size: Vec2,
    /// Leftward speed (px/s)
    pub speed: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub damage: f32,
}

impl Bounded for Asteroid {
    fn bounds(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }
}

/// Damage-over-time status on the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poison {
    pub active: bool,
    /// Seconds remaining
    pub duration: f32,
    pub max_duration: f32,
    pub damage_per_second: f32,
    /// Seconds accumulated toward the next tick
    pub tick_timer: f32,
    pub tick_interval: f32,
}

/// What one [`Poison::advance`] call produced
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoisonTick {
    /// Damage due this frame (only at tick boundaries)
    pub damage: Option<f32>,
    /// The effect ran out this frame
    pub expired: bool,
}

impl Poison {
    pub fn new(tuning: &PoisonTuning) -> Self {
        Self {
            active: false,
            duration: 0.0,
            max_duration: tuning.max_duration,
            damage_per_second: tuning.damage_per_second,
            tick_timer: 0.0,
            tick_interval: tuning.tick_interval,
        }
    }

    /// Arm the effect, or refresh its duration and tick phase
    pub fn apply(&mut self) {
        self.active = true;
        self.duration = self.max_duration;
        self.tick_timer = 0.0;
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.duration = 0.0;
        self.tick_timer = 0.0;
    }

    pub fn damage_per_tick(&self) -> f32 {
        self.damage_per_second * self.tick_interval
    }

    pub fn advance(&mut self, dt: f32) -> PoisonTick {
        if !self.active {
            return PoisonTick::default();
        }

        let mut out = PoisonTick::default();
        self.duration -= dt;
        self.tick_timer += dt;
        if self.tick_timer + TIMER_EPSILON >= self.tick_interval {
            self.tick_timer = 0.0;
            out.damage = Some(self.damage_per_tick());
        }

        if self.duration <= TIMER_EPSILON {
            self.active = false;
            self.duration = 0.0;
            out.expired = true;
        }
        out
    }
}
