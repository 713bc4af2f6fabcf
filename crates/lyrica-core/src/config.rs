use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Color, LyricaError, LyricaResult};

/// User-facing lyric display settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Syllables lasting longer than this are split into per-letter runs.
    pub split_threshold_ms: f64,
    /// Maximum upward lift of a whole-syllable run while it is sung, in px.
    pub max_translate_up_word: f64,
    /// Maximum upward lift of a single split letter, in px.
    pub max_translate_up_letter: f64,
    /// Bias added to the auto-scroll centering target, in px.
    pub scroll_offset: f64,
    /// Prefer the romanized text variant when a syllable has one.
    pub force_romanized: bool,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            split_threshold_ms: 1000.0,
            max_translate_up_word: 2.0,
            max_translate_up_letter: 2.0,
            scroll_offset: 16.0,
            force_romanized: false,
        }
    }
}

/// Geometry knobs for the layout engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub font_family: String,
    /// Pixel size of one `rem`.
    pub root_font_size: f64,
    /// Preferred lead font size as a fraction of the viewport width.
    pub preferred_width_fraction: f64,
    pub min_font_rem: f64,
    pub max_font_rem: f64,
    /// Background vocal font size relative to the lead size.
    pub background_font_ratio: f64,
    /// Credits font size relative to the background size.
    pub credits_font_ratio: f64,
    pub lead_font_weight: u16,
    pub background_font_weight: u16,
    pub line_height_multiplier: f64,
    /// Extra vertical gap between groups, in units of the background font size.
    pub group_gap_multiplier: f64,
    pub padding_top_fraction: f64,
    pub padding_bottom_fraction: f64,
    pub padding_horizontal_fraction: f64,
    /// Instrumental gaps strictly longer than this get an interlude line.
    pub interlude_threshold_ms: f64,
    pub interlude_dot_count: usize,
    pub interlude_dot_gap: f64,
    pub interlude_dot_amplitude: f64,
    /// Also insert an interlude between track start and the first block.
    pub lead_in_interlude: bool,
    pub show_credits: bool,
    /// Per-character width, relative to font size, used when measurement fails.
    pub average_char_width_ratio: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_family: "LucidLyrics".to_string(),
            root_font_size: 16.0,
            preferred_width_fraction: 0.07,
            min_font_rem: 1.85,
            max_font_rem: 3.5,
            background_font_ratio: 24.0 / 36.0,
            credits_font_ratio: 0.75,
            lead_font_weight: 700,
            background_font_weight: 600,
            line_height_multiplier: 1.18,
            group_gap_multiplier: 0.8,
            padding_top_fraction: 0.25,
            padding_bottom_fraction: 0.45,
            padding_horizontal_fraction: 0.05,
            interlude_threshold_ms: 2000.0,
            interlude_dot_count: 3,
            interlude_dot_gap: 8.0,
            interlude_dot_amplitude: 6.0,
            lead_in_interlude: true,
            show_credits: true,
            average_char_width_ratio: 0.5,
        }
    }
}

/// Timing and smoothing of the per-frame animation state.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// How long a sung run takes to fade its highlight back to zero.
    pub fade_ms: f64,
    /// A group counts as active this long before its first line starts.
    pub pre_active_ms: f64,
    /// ...and this long after a line ends.
    pub post_active_ms: f64,
    /// A group is fully past once progress exceeds its end by this much.
    pub past_grace_ms: f64,
    pub active_alpha: f64,
    pub past_alpha: f64,
    pub idle_alpha: f64,
    pub active_scale: f64,
    pub alpha_smoothing: f64,
    pub scale_smoothing: f64,
    pub hover_smoothing: f64,
    pub interlude_show_delay_ms: f64,
    pub interlude_glow_max_blur: f64,
    pub active_glow_blur: f64,
    pub hover_card_padding_x: f64,
    pub hover_card_padding_y: f64,
    pub hover_card_radius: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade_ms: 1000.0,
            pre_active_ms: 200.0,
            post_active_ms: 500.0,
            past_grace_ms: 500.0,
            active_alpha: 1.0,
            past_alpha: 0.4,
            idle_alpha: 0.5,
            active_scale: 1.02,
            alpha_smoothing: 0.2,
            scale_smoothing: 0.15,
            hover_smoothing: 0.15,
            interlude_show_delay_ms: 300.0,
            interlude_glow_max_blur: 16.0,
            active_glow_blur: 12.0,
            hover_card_padding_x: 16.0,
            hover_card_padding_y: 12.0,
            hover_card_radius: 16.0,
        }
    }
}

/// Auto-scroll control loop settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub smoothing: f64,
    /// Inactivity after a user scroll before auto-scroll may resume.
    pub user_scroll_timeout_ms: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.1,
            user_scroll_timeout_ms: 1000.0,
        }
    }
}

/// Palette used by the renderer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColorConfig {
    pub base_text: Color,
    pub past_text: Color,
    pub active_glow: Color,
    pub gradient_tail: Color,
    pub hover_card: Color,
    pub interlude_dot: Color,
    pub background: Color,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            base_text: Color::white(0.4),
            past_text: Color::white(0.4),
            active_glow: Color::white(0.8),
            gradient_tail: Color::white(0.1),
            hover_card: Color::white(0.1),
            interlude_dot: Color::white(1.0),
            background: Color::TRANSPARENT,
        }
    }
}

/// Complete engine configuration, loadable from a TOML file where every
/// section and field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct LyricaConfig {
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub colors: ColorConfig,
}

impl LyricaConfig {
    pub fn from_toml_str(contents: &str) -> LyricaResult<Self> {
        toml::from_str(contents).map_err(|e| LyricaError::config(e.to_string(), "<inline>"))
    }

    pub fn to_toml_string(&self) -> LyricaResult<String> {
        toml::to_string_pretty(self).map_err(|e| LyricaError::config(e.to_string(), "<inline>"))
    }

    pub fn load_from_file(path: &Path) -> LyricaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| LyricaError::config(e.to_string(), path))
    }

    pub fn save_to_file(&self, path: &Path) -> LyricaResult<()> {
        let contents = self.to_toml_string()?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
