//! Text measurement and glyph rasterization.
//! Uses fontdue for CPU-side glyph metrics and coverage bitmaps.
//! Layout only ever needs advance widths, so measurement sits behind the
//! [`TextMeasure`] trait and can be swapped for the character-width
//! heuristic when no font is available.

use std::cell::Cell;
use std::path::Path;

use fontdue::{Font, FontSettings};
use lyrica_core::frame::FrameBuffer;
use lyrica_core::{Color, LyricaError, LyricaResult};
use serde::{Deserialize, Serialize};

/// Font selection for one run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    /// Font size in pixels.
    pub size: f64,
    pub weight: u16,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f64, weight: u16) -> Self {
        Self {
            family: family.into(),
            size,
            weight,
        }
    }

    /// The same font at `scale` times the size.
    pub fn scaled(&self, scale: f64) -> FontSpec {
        FontSpec {
            size: self.size * scale,
            ..self.clone()
        }
    }
}

/// Measures the advance width of a run of text.
pub trait TextMeasure {
    fn measure(&self, text: &str, font: &FontSpec) -> LyricaResult<f64>;
}

/// Estimates widths from a fixed per-character ratio of the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicMeasurer {
    pub char_width_ratio: f64,
}

impl HeuristicMeasurer {
    pub fn new(char_width_ratio: f64) -> Self {
        Self { char_width_ratio }
    }
}

impl Default for HeuristicMeasurer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TextMeasure for HeuristicMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> LyricaResult<f64> {
        Ok(text.chars().count() as f64 * font.size * self.char_width_ratio)
    }
}

/// Measures with real glyph advances from a loaded font file.
pub struct FontdueMeasurer {
    font: Font,
}

impl FontdueMeasurer {
    pub fn from_bytes(data: &[u8]) -> LyricaResult<Self> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| LyricaError::Layout(format!("failed to parse font: {}", e)))?;
        Ok(Self { font })
    }

    /// Load a font from a file path.
    pub fn load(path: &Path) -> LyricaResult<Self> {
        let data = std::fs::read(path)?;
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|e| {
            LyricaError::Layout(format!("failed to parse font {}: {}", path.display(), e))
        })?;
        tracing::debug!("loaded font {}", path.display());
        Ok(Self { font })
    }

    pub fn font(&self) -> &Font {
        &self.font
    }
}

impl TextMeasure for FontdueMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> LyricaResult<f64> {
        let px = font.size as f32;
        let mut width = 0.0f64;
        for ch in text.chars() {
            if !ch.is_whitespace() && self.font.lookup_glyph_index(ch) == 0 {
                return Err(LyricaError::Layout(format!(
                    "font has no glyph for {:?}",
                    ch
                )));
            }
            width += self.font.metrics(ch, px).advance_width as f64;
        }
        Ok(width)
    }
}

/// Wraps a measurer so that every failure degrades to the heuristic.
///
/// Only the first failure is logged.
pub struct FallbackMeasurer<'a> {
    primary: &'a dyn TextMeasure,
    fallback: HeuristicMeasurer,
    warned: Cell<bool>,
}

impl<'a> FallbackMeasurer<'a> {
    pub fn new(primary: &'a dyn TextMeasure, fallback: HeuristicMeasurer) -> Self {
        Self {
            primary,
            fallback,
            warned: Cell::new(false),
        }
    }

    /// Width of `text`, never failing.
    pub fn width(&self, text: &str, font: &FontSpec) -> f64 {
        match self.primary.measure(text, font) {
            Ok(w) if w.is_finite() && w >= 0.0 => w,
            result => {
                if !self.warned.replace(true) {
                    let reason = match result {
                        Err(e) => e.to_string(),
                        Ok(w) => format!("measurer returned {}", w),
                    };
                    tracing::warn!("text measurement unavailable, using heuristic widths: {}", reason);
                }
                self.fallback
                    .measure(text, font)
                    .unwrap_or(0.0)
            }
        }
    }

    pub fn fell_back(&self) -> bool {
        self.warned.get()
    }
}

/// Rasterize a single line of text into a frame buffer with its top edge at
/// `(x, y)`. `paint` picks the color for each glyph column, which lets callers
/// sweep gradients across the run.
pub fn rasterize_line(
    fb: &mut FrameBuffer,
    font: &Font,
    text: &str,
    font_size: f32,
    x: f64,
    y: f64,
    paint: impl Fn(f64) -> Color,
) {
    let ascent = font
        .horizontal_line_metrics(font_size)
        .map(|m| m.ascent)
        .unwrap_or(font_size * 0.8);
    let baseline = y + ascent as f64;
    let mut cursor_x = x;

    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, font_size);
        let glyph_x = cursor_x.round() as i64 + metrics.xmin as i64;
        let glyph_y = baseline.round() as i64 - (metrics.height as i64 + metrics.ymin as i64);

        for gy in 0..metrics.height {
            for gx in 0..metrics.width {
                let coverage = bitmap[gy * metrics.width + gx];
                if coverage == 0 {
                    continue;
                }
                let px = glyph_x + gx as i64;
                let py = glyph_y + gy as i64;
                let color = paint(px as f64);
                fb.blend_pixel(px, py, &color, coverage as f32 / 255.0);
            }
        }

        cursor_x += metrics.advance_width as f64;
    }
}
