//! SPACE 404 XY - gameplay simulation core
//!
//! Core modules:
//! - `sim`: Per-level simulation (entities, collisions, difficulty, level loop)
//! - `physics`: Optional rigid-body backend for contact detection
//! - `assets`: Asset registry and load tickets
//! - `scene`: Scene lifecycle host and transitions
//! - `renderer`: Backend-agnostic draw lists
//! - `tuning`: Data-driven game balance

pub mod assets;
pub mod audio;
pub mod error;
pub mod input;
pub mod physics;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{Error, Result};
pub use settings::{Difficulty, Settings};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Logical viewport size; input coordinates arrive pre-scaled to it
    pub const VIEWPORT_WIDTH: f32 = 960.0;
    pub const VIEWPORT_HEIGHT: f32 = 540.0;

    /// Fixed simulation step (seconds)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Cap on simulation steps per rendered frame
    pub const MAX_SUBSTEPS: u32 = 4;
    /// Largest frame delta accepted by the native runner (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Slack used when comparing accumulated f32 timers against intervals
    pub const TIMER_EPSILON: f32 = 1e-4;

    /// Falling entities are drawn rotated by this angle (radians)
    pub const FALLING_ROTATION: f32 = std::f32::consts::FRAC_PI_4;

    /// Player blinks below this health fraction
    pub const LOW_HEALTH_FRACTION: f32 = 0.3;
    /// Blink half-period in milliseconds
    pub const LOW_HEALTH_BLINK_MS: f64 = 200.0;
}
