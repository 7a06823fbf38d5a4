//! Keyboard flags and on-screen touch buttons
//!
//! All coordinates are in logical viewport units; the host scales pointer
//! positions before delivering them.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Keys the level reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Up,
    Down,
    Shoot,
    Pause,
}

impl Key {
    /// Map a DOM-style key name (`ArrowUp`, `Escape`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowUp" => Some(Key::Up),
            "ArrowDown" => Some(Key::Down),
            "ArrowRight" => Some(Key::Shoot),
            "Escape" => Some(Key::Pause),
            _ => None,
        }
    }
}

/// Held movement/fire keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub shoot: bool,
}

impl KeyState {
    /// Record a press or release. Returns false for keys that are not held.
    pub fn set(&mut self, key: Key, pressed: bool) -> bool {
        match key {
            Key::Up => self.up = pressed,
            Key::Down => self.down = pressed,
            Key::Shoot => self.shoot = pressed,
            Key::Pause => return false,
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchButtonId {
    Up,
    Down,
    Shoot,
}

/// Pointer identity; the mouse counts as one more touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerId {
    Mouse,
    Touch(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchButton {
    pub id: TouchButtonId,
    pub center: Vec2,
    pub radius: f32,
    pub pressed: bool,
}

impl TouchButton {
    fn new(id: TouchButtonId, x: f32, y: f32, radius: f32) -> Self {
        Self {
            id,
            center: Vec2::new(x, y),
            radius,
            pressed: false,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.distance(self.center) <= self.radius
    }
}

/// Circular on-screen buttons with per-pointer tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouchControls {
    buttons: [TouchButton; 3],
    #[serde(skip)]
    active: HashMap<PointerId, TouchButtonId>,
    pub enabled: bool,
}

impl Default for TouchControls {
    fn default() -> Self {
        Self {
            buttons: [
                TouchButton::new(TouchButtonId::Up, 50.0, 350.0, 40.0),
                TouchButton::new(TouchButtonId::Down, 50.0, 450.0, 40.0),
                TouchButton::new(TouchButtonId::Shoot, 860.0, 400.0, 50.0),
            ],
            active: HashMap::new(),
            enabled: true,
        }
    }
}

impl TouchControls {
    pub fn buttons(&self) -> &[TouchButton] {
        &self.buttons
    }

    fn button_mut(&mut self, id: TouchButtonId) -> &mut TouchButton {
        // Buttons are stored in declaration order
        &mut self.buttons[id as usize]
    }

    /// Move a button (HUD layout editor)
    pub fn set_position(&mut self, id: TouchButtonId, center: Vec2) {
        self.button_mut(id).center = center;
    }

    /// Press the first button under `p`. Returns true if one was hit.
    pub fn touch_start(&mut self, p: Vec2, pointer: PointerId) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(hit) = self.buttons.iter_mut().find(|b| b.contains(p)) else {
            return false;
        };
        hit.pressed = true;
        self.active.insert(pointer, hit.id);
        true
    }

    /// Release the pointer's button once it slides outside
    pub fn touch_move(&mut self, p: Vec2, pointer: PointerId) {
        let Some(&id) = self.active.get(&pointer) else {
            return;
        };
        let button = self.button_mut(id);
        if !button.contains(p) {
            button.pressed = false;
            self.active.remove(&pointer);
        }
    }

    pub fn touch_end(&mut self, pointer: PointerId) {
        if let Some(id) = self.active.remove(&pointer) {
            self.button_mut(id).pressed = false;
        }
    }

    pub fn is_pressed(&self, id: TouchButtonId) -> bool {
        self.buttons[id as usize].pressed
    }

    pub fn reset(&mut self) {
        for b in &mut self.buttons {
            b.pressed = false;
        }
        self.active.clear();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
    }
}

/// Input delivered to the current scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    /// Mouse click or tap start
    Click { pos: Vec2, pointer: PointerId },
    PointerMove { pos: Vec2, pointer: PointerId },
    PointerUp { pointer: PointerId },
}
