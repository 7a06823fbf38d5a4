//! Backend-agnostic rendering
//!
//! Scenes describe a frame as a list of [`DrawCommand`]s. The host replays
//! them on whatever surface it owns (canvas, GPU, terminal).

pub mod hud;

use glam::Vec2;
use serde::Serialize;

use crate::sim::aabb::Rect;

/// RGBA, 0.0 - 1.0
pub type Color = [f32; 4];

pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];
pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];

/// Build a color from 0xRRGGBB plus alpha
pub const fn rgb(hex: u32, alpha: f32) -> Color {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        alpha,
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
    },
    /// Image stretched over `rect`, rotated about its center
    Image {
        key: String,
        rect: Rect,
        rotation: f32,
        alpha: f32,
    },
    /// Irregular rock outline (asteroids)
    Rock {
        rect: Rect,
        rotation: f32,
        color: Color,
    },
    Circle {
        center: Vec2,
        radius: f32,
        fill: Color,
        stroke: Option<Color>,
    },
    Text {
        pos: Vec2,
        text: String,
        size: f32,
        color: Color,
        centered: bool,
    },
}

/// Drawing surface handed to `render`
pub trait RenderContext {
    fn draw(&mut self, cmd: DrawCommand);

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.draw(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.draw(DrawCommand::StrokeRect { rect, color, width });
    }

    fn image(&mut self, key: &str, rect: Rect, rotation: f32, alpha: f32) {
        self.draw(DrawCommand::Image {
            key: key.to_string(),
            rect,
            rotation,
            alpha,
        });
    }

    fn text(&mut self, pos: Vec2, text: &str, size: f32, color: Color) {
        self.draw(DrawCommand::Text {
            pos,
            text: text.to_string(),
            size,
            color,
            centered: false,
        });
    }
}

/// Recorded frame
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Image keys in draw order
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Image { key, .. } => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl RenderContext for DrawList {
    fn draw(&mut self, cmd: DrawCommand) {
        self.commands.push(cmd);
    }
}
