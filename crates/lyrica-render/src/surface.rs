//! 2D drawing surfaces the renderer paints onto.
//!
//! [`RecordingSurface`] captures draw commands for inspection;
//! [`RasterSurface`] rasterizes them into a [`FrameBuffer`] on the CPU.

use std::path::Path;

use fontdue::Font;
use lyrica_core::frame::FrameBuffer;
use lyrica_core::{Color, LyricaError, LyricaResult, Point2D, Rect, Viewport};
use serde::{Deserialize, Serialize};

use crate::text::{rasterize_line, FontSpec};

/// How a text run is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextPaint {
    Solid(Color),
    /// Horizontal gradient from `x0` to `x1` with stops at offsets in `[0, 1]`.
    Gradient {
        x0: f64,
        x1: f64,
        stops: Vec<(f64, Color)>,
    },
}

impl TextPaint {
    /// Color at horizontal position `x`.
    pub fn color_at(&self, x: f64) -> Color {
        match self {
            TextPaint::Solid(c) => *c,
            TextPaint::Gradient { x0, x1, stops } => {
                let Some(first) = stops.first() else {
                    return Color::TRANSPARENT;
                };
                let span = x1 - x0;
                let t = if span > 0.0 { (x - x0) / span } else { 0.0 };
                if t <= first.0 {
                    return first.1;
                }
                for pair in stops.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    if t <= b.0 {
                        let width = b.0 - a.0;
                        let local = if width > 0.0 { (t - a.0) / width } else { 1.0 };
                        return a.1.lerp(&b.1, local as f32);
                    }
                }
                stops.last().map(|s| s.1).unwrap_or(Color::TRANSPARENT)
            }
        }
    }
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        color: Color,
    },
    RoundedRect {
        rect: Rect,
        radius: f64,
        color: Color,
    },
    Circle {
        center: Point2D,
        radius: f64,
        color: Color,
        glow: f64,
    },
    Text {
        text: String,
        origin: Point2D,
        font: FontSpec,
        paint: TextPaint,
        glow: f64,
    },
}

pub trait DrawSurface {
    /// Prepare a frame of `viewport` size. An error means the surface is not
    /// available and the frame is skipped.
    fn begin_frame(&mut self, viewport: Viewport) -> LyricaResult<()>;

    fn clear(&mut self, color: Color);

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Color);

    fn fill_circle(&mut self, center: Point2D, radius: f64, color: Color, glow: f64);

    /// Draw `text` with its top-left corner at `origin`.
    fn fill_text(&mut self, text: &str, origin: Point2D, font: &FontSpec, paint: &TextPaint, glow: f64);

    fn end_frame(&mut self) {}
}

/// Records commands instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
    pub frames: usize,
    unavailable: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent frames fail to begin, as a lost context would.
    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    pub fn texts(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Text { .. }))
    }

    pub fn to_json(&self) -> LyricaResult<String> {
        Ok(serde_json::to_string_pretty(&self.commands)?)
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_frame(&mut self, viewport: Viewport) -> LyricaResult<()> {
        if self.unavailable {
            return Err(LyricaError::RenderSurface("recording surface unavailable".into()));
        }
        if viewport.is_empty() {
            return Err(LyricaError::RenderSurface(format!(
                "zero-sized viewport {}x{}",
                viewport.width, viewport.height
            )));
        }
        self.commands.clear();
        self.frames += 1;
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear { color });
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Color) {
        self.commands.push(DrawCommand::RoundedRect { rect, radius, color });
    }

    fn fill_circle(&mut self, center: Point2D, radius: f64, color: Color, glow: f64) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
            glow,
        });
    }

    fn fill_text(&mut self, text: &str, origin: Point2D, font: &FontSpec, paint: &TextPaint, glow: f64) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            origin,
            font: font.clone(),
            paint: paint.clone(),
            glow,
        });
    }
}

/// Software rasterizer over a [`FrameBuffer`].
///
/// Uses fontdue glyphs when a font is loaded and solid per-character blocks
/// otherwise, so output stays deterministic without any font file.
pub struct RasterSurface {
    frame: FrameBuffer,
    font: Option<Font>,
    char_width_ratio: f64,
}

impl RasterSurface {
    pub fn new(font: Option<Font>) -> Self {
        Self {
            frame: FrameBuffer::new(1, 1),
            font,
            char_width_ratio: 0.5,
        }
    }

    /// Per-character advance used by block glyphs, relative to font size.
    pub fn with_char_width_ratio(mut self, ratio: f64) -> Self {
        self.char_width_ratio = ratio;
        self
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Write the current frame as a PNG.
    pub fn save_png(&self, path: &Path) -> LyricaResult<()> {
        let img = image::RgbaImage::from_raw(
            self.frame.width,
            self.frame.height,
            self.frame.data.clone(),
        )
        .ok_or_else(|| LyricaError::RenderSurface("frame buffer size mismatch".into()))?;
        img.save(path)
            .map_err(|e| LyricaError::Other(format!("failed to write {}: {}", path.display(), e)))
    }

    fn fill_blocks(&mut self, text: &str, origin: Point2D, font: &FontSpec, paint: &TextPaint) {
        let advance = font.size * self.char_width_ratio;
        let mut x = origin.x;
        for ch in text.chars() {
            if !ch.is_whitespace() {
                let color = paint.color_at(x + advance / 2.0);
                self.frame.fill_rect(
                    x + advance * 0.1,
                    origin.y + font.size * 0.2,
                    advance * 0.8,
                    font.size * 0.7,
                    &color,
                );
            }
            x += advance;
        }
    }
}

impl DrawSurface for RasterSurface {
    fn begin_frame(&mut self, viewport: Viewport) -> LyricaResult<()> {
        if viewport.is_empty() || !viewport.width.is_finite() || !viewport.height.is_finite() {
            return Err(LyricaError::RenderSurface(format!(
                "cannot rasterize a {}x{} frame",
                viewport.width, viewport.height
            )));
        }
        let w = viewport.width.ceil() as u32;
        let h = viewport.height.ceil() as u32;
        if self.frame.width != w || self.frame.height != h {
            self.frame = FrameBuffer::new(w, h);
        }
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.frame.fill(&color);
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Color) {
        let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        let y0 = rect.y.floor().max(0.0) as i64;
        let y1 = (rect.bottom().ceil() as i64).min(self.frame.height as i64);
        let x0 = rect.x.floor().max(0.0) as i64;
        let x1 = (rect.right().ceil() as i64).min(self.frame.width as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                let cx = px as f64 + 0.5;
                let cy = py as f64 + 0.5;
                if !rect.contains(Point2D::new(cx, cy)) {
                    continue;
                }
                // Distance into the nearest corner circle, if in a corner.
                let dx = (rect.x + r - cx).max(cx - (rect.right() - r)).max(0.0);
                let dy = (rect.y + r - cy).max(cy - (rect.bottom() - r)).max(0.0);
                let coverage = if dx > 0.0 && dy > 0.0 {
                    (r - (dx * dx + dy * dy).sqrt() + 0.5).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                self.frame.blend_pixel(px, py, &color, coverage as f32);
            }
        }
    }

    fn fill_circle(&mut self, center: Point2D, radius: f64, color: Color, glow: f64) {
        if glow > 0.0 {
            let halo = radius + glow / 2.0;
            self.fill_rounded_rect(
                Rect::new(center.x - halo, center.y - halo, halo * 2.0, halo * 2.0),
                halo,
                color.fade(0.15),
            );
        }
        self.fill_rounded_rect(
            Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0),
            radius,
            color,
        );
    }

    fn fill_text(&mut self, text: &str, origin: Point2D, font: &FontSpec, paint: &TextPaint, _glow: f64) {
        match &self.font {
            Some(f) => rasterize_line(
                &mut self.frame,
                f,
                text,
                font.size as f32,
                origin.x,
                origin.y,
                |x| paint.color_at(x),
            ),
            None => self.fill_blocks(text, origin, font, paint),
        }
    }
}
