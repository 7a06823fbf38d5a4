//! HUD widgets: bars, poison warning, touch buttons, loading screen

use glam::Vec2;

use super::{BLACK, Color, DrawCommand, RenderContext, WHITE, rgb};
use crate::input::{TouchButtonId, TouchControls};
use crate::sim::aabb::Rect;

pub const BAR_WIDTH: f32 = 200.0;
pub const BAR_HEIGHT: f32 = 20.0;
/// Gap between the bars and the right edge
pub const BAR_MARGIN: f32 = 15.0;
pub const PROGRESS_BAR_Y: f32 = 20.0;
pub const HEALTH_BAR_Y: f32 = 60.0;

const BAR_BACKGROUND: Color = [0.2, 0.2, 0.2, 0.8];
pub const PROGRESS_FILL: Color = rgb(0x44bbdd, 1.0);
pub const HEALTH_FILL: Color = rgb(0x00ff00, 1.0);
const POISON: Color = rgb(0xa000ff, 1.0);

/// Right-aligned HUD bar at height `y`
pub fn bar_rect(viewport_width: f32, y: f32) -> Rect {
    Rect::from_xywh(viewport_width - BAR_WIDTH - BAR_MARGIN, y, BAR_WIDTH, BAR_HEIGHT)
}

/// Labelled percentage bar; `percent` is clamped to `[0, 100]`
pub fn progress_bar(ctx: &mut dyn RenderContext, rect: Rect, percent: f32, fill: Color, label: &str) {
    let percent = percent.clamp(0.0, 100.0);
    ctx.fill_rect(rect, BAR_BACKGROUND);
    ctx.fill_rect(
        Rect::new(rect.pos, Vec2::new(rect.size.x * percent / 100.0, rect.size.y)),
        fill,
    );
    ctx.stroke_rect(rect, WHITE, 2.0);
    ctx.text(rect.pos - Vec2::new(0.0, 5.0), &format!("{label}:"), 12.0, WHITE);
    ctx.draw(DrawCommand::Text {
        pos: rect.center() + Vec2::new(0.0, 4.0),
        text: format!("{}%", percent.round()),
        size: 11.0,
        color: WHITE,
        centered: true,
    });
}

/// Small bar above an enemy, colored by remaining health
pub fn health_bar(ctx: &mut dyn RenderContext, rect: Rect, fraction: f32) {
    let fraction = fraction.clamp(0.0, 1.0);
    let color = if fraction > 0.6 {
        rgb(0x00ff00, 1.0)
    } else if fraction > 0.3 {
        rgb(0xffff00, 1.0)
    } else {
        rgb(0xff0000, 1.0)
    };
    ctx.fill_rect(rect, [0.0, 0.0, 0.0, 0.5]);
    ctx.fill_rect(Rect::new(rect.pos, Vec2::new(rect.size.x * fraction, rect.size.y)), color);
    ctx.stroke_rect(rect, WHITE, 1.0);
}

/// Pulsing warning with a countdown bar under it
pub fn poison_indicator(ctx: &mut dyn RenderContext, pos: Vec2, remaining: f32, max: f32, time_ms: f64) {
    let alpha = ((time_ms / 200.0).sin() * 0.3 + 0.7) as f32;
    let mut color = POISON;
    color[3] = alpha;
    ctx.text(pos, "SYSTEMS DAMAGED", 14.0, color);

    let fraction = if max > 0.0 { (remaining / max).clamp(0.0, 1.0) } else { 0.0 };
    let bar = Rect::from_xywh(pos.x, pos.y + 5.0, BAR_WIDTH, 8.0);
    ctx.fill_rect(bar, [0.0, 0.0, 0.0, 0.5]);
    ctx.fill_rect(Rect::new(bar.pos, Vec2::new(bar.size.x * fraction, bar.size.y)), POISON);
    ctx.stroke_rect(bar, rgb(0xff00ff, 1.0), 1.0);
}

pub fn touch_controls(ctx: &mut dyn RenderContext, controls: &TouchControls) {
    if !controls.enabled {
        return;
    }
    for button in controls.buttons() {
        let (outer, inner, stroke) = if button.pressed {
            ([0.4, 0.6, 1.0, 0.6], [0.47, 0.7, 1.0, 0.8], rgb(0x66ccff, 1.0))
        } else {
            ([0.2, 0.2, 0.2, 0.5], [0.3, 0.3, 0.3, 0.7], WHITE)
        };
        ctx.draw(DrawCommand::Circle {
            center: button.center,
            radius: button.radius,
            fill: outer,
            stroke: Some(stroke),
        });
        ctx.draw(DrawCommand::Circle {
            center: button.center,
            radius: button.radius - 10.0,
            fill: inner,
            stroke: None,
        });
        let icon = match button.id {
            TouchButtonId::Up => "▲",
            TouchButtonId::Down => "▼",
            TouchButtonId::Shoot => "●",
        };
        ctx.draw(DrawCommand::Text {
            pos: button.center,
            text: icon.to_string(),
            size: button.radius * 0.8,
            color: WHITE,
            centered: true,
        });
    }
}

/// Spinner, caption and a bar keyed to loader progress
pub fn loading_screen(ctx: &mut dyn RenderContext, viewport: Vec2, level_number: u8, progress: f32, time_ms: f64) {
    ctx.fill_rect(Rect::new(Vec2::ZERO, viewport), rgb(0x0f0f10, 1.0));

    let center = viewport / 2.0;
    let spin = (time_ms / 1000.0 * 2.0) as f32;
    for i in 0..8 {
        let angle = spin + std::f32::consts::TAU * i as f32 / 8.0;
        let mut color = PROGRESS_FILL;
        color[3] = 1.0 - i as f32 * 0.12;
        ctx.draw(DrawCommand::Circle {
            center: center + Vec2::from_angle(angle) * 30.0,
            radius: 5.0,
            fill: color,
            stroke: None,
        });
    }

    ctx.draw(DrawCommand::Text {
        pos: center + Vec2::new(0.0, 80.0),
        text: format!("Loading level {level_number}..."),
        size: 24.0,
        color: [0.93, 0.93, 0.93, 1.0],
        centered: true,
    });

    let bar = Rect::from_xywh((viewport.x - 400.0) / 2.0, center.y + 120.0, 400.0, 20.0);
    ctx.stroke_rect(bar, [0.93, 0.93, 0.93, 1.0], 2.0);
    ctx.fill_rect(
        Rect::new(bar.pos, Vec2::new(bar.size.x * progress.clamp(0.0, 1.0), bar.size.y)),
        PROGRESS_FILL,
    );
}

/// Plain black backdrop
pub fn clear(ctx: &mut dyn RenderContext, viewport: Vec2) {
    ctx.fill_rect(Rect::new(Vec2::ZERO, viewport), BLACK);
}
