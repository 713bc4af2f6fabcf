//! Paints one frame of layout and visual state onto a [`DrawSurface`].
//!
//! Rendering reads the layout and never mutates it. Only lines inside the
//! viewport are drawn.

use lyrica_core::{Color, LyricaConfig, Point2D};

use crate::hit_test::HoverCard;
use crate::layout::{ElementKind, Layout, LayoutElement, LayoutLine};
use crate::surface::{DrawSurface, TextPaint};
use crate::text::FontSpec;
use crate::timeline::{
    dot_visual, element_status, fill_fraction, interlude_opacity, ElementStatus, GroupVisual,
    VisualState,
};

/// Alpha applied to credits text and interlude dots.
const SECONDARY_ALPHA: f32 = 0.8;
/// Width of the soft gradient edge either side of the fill point.
const SWEEP_EDGE: f64 = 0.1;

/// Everything needed to paint one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameScene<'a> {
    pub layout: &'a Layout,
    pub visual: &'a VisualState,
    pub scroll_offset: f64,
    pub hover: &'a HoverCard,
    pub config: &'a LyricaConfig,
}

/// Uniform scale about a pivot, applied to a whole line.
#[derive(Debug, Clone, Copy)]
struct LineTransform {
    pivot: Point2D,
    scale: f64,
}

impl LineTransform {
    fn apply(&self, p: Point2D) -> Point2D {
        Point2D::new(
            self.pivot.x + (p.x - self.pivot.x) * self.scale,
            self.pivot.y + (p.y - self.pivot.y) * self.scale,
        )
    }
}

/// Paint `scene` onto `surface`. Returns `false` when the surface could not
/// begin a frame; the caller simply tries again next frame.
pub fn render_frame(surface: &mut dyn DrawSurface, scene: &FrameScene<'_>) -> bool {
    if let Err(e) = surface.begin_frame(scene.layout.viewport) {
        if e.is_recoverable() {
            tracing::debug!("skipping frame: {}", e);
        } else {
            tracing::warn!("skipping frame: {}", e);
        }
        return false;
    }
    surface.clear(scene.config.colors.background);

    paint_hover_card(surface, scene);

    let visible = scene.layout.visible_lines(scene.scroll_offset);
    for line_index in visible {
        let line = &scene.layout.lines[line_index];
        if line.line_group.is_credits() {
            paint_credits(surface, scene, line);
        } else if line.is_interlude {
            paint_interlude(surface, scene, line);
        } else {
            paint_text_line(surface, scene, line);
        }
    }

    surface.end_frame();
    true
}

fn paint_hover_card(surface: &mut dyn DrawSurface, scene: &FrameScene<'_>) {
    let hover = scene.hover;
    if !hover.visible() {
        return;
    }
    let group_scale = hover
        .group
        .and_then(|id| scene.visual.group(id))
        .map_or(1.0, |g| g.scale);
    let rect = hover
        .rect
        .offset_y(-scene.scroll_offset)
        .scale_about_center(hover.scale() * group_scale);
    let color = scene.config.colors.hover_card.fade(hover.progress as f32);
    surface.fill_rounded_rect(rect, scene.config.animation.hover_card_radius, color);
}

fn paint_credits(surface: &mut dyn DrawSurface, scene: &FrameScene<'_>, line: &LayoutLine) {
    let y = line.y - scene.scroll_offset;
    let paint = TextPaint::Solid(scene.config.colors.past_text.fade(SECONDARY_ALPHA));
    for el in scene.layout.line_elements(line) {
        surface.fill_text(&el.text, Point2D::new(line.x + el.x, y), &el.font, &paint, 0.0);
    }
}

fn paint_interlude(surface: &mut dyn DrawSurface, scene: &FrameScene<'_>, line: &LayoutLine) {
    let animation = &scene.config.animation;
    let progress = scene.visual.progress_ms;
    let opacity = interlude_opacity(line.window(), progress, animation.interlude_show_delay_ms);
    if opacity <= 0.0 {
        return;
    }
    let color = scene
        .config
        .colors
        .interlude_dot
        .fade(opacity as f32 * SECONDARY_ALPHA);
    let center_y = line.y - scene.scroll_offset + line.height / 2.0;

    for el in scene.layout.line_elements(line) {
        if el.kind != ElementKind::Dot {
            continue;
        }
        let dot = dot_visual(el, progress, animation.interlude_glow_max_blur);
        let r = el.width / 2.0;
        let center = Point2D::new(line.x + el.x + r, center_y - dot.lift);
        surface.fill_circle(center, r * dot.scale, color, dot.glow);
    }
}

fn paint_text_line(surface: &mut dyn DrawSurface, scene: &FrameScene<'_>, line: &LayoutLine) {
    let layout = scene.layout;
    let colors = &scene.config.colors;
    let group = scene
        .visual
        .group_at(line.group_index)
        .copied()
        .unwrap_or(GroupVisual {
            id: line.line_group,
            alpha: 1.0,
            scale: 1.0,
            active: false,
            fully_past: false,
        });

    let y = line.y - scene.scroll_offset;
    let transform = LineTransform {
        pivot: Point2D::new(line.x + line.width / 2.0, y + line.height / 2.0),
        scale: group.scale,
    };
    let alpha = group.alpha as f32;
    let base = if group.fully_past {
        colors.past_text
    } else {
        colors.base_text
    };
    let base_paint = TextPaint::Solid(base.fade(alpha));

    let elements = layout.line_elements(line);
    let origin_of = |offset: usize, el: &LayoutElement| {
        let lift = scene
            .visual
            .element(line.elements.start + offset)
            .map_or(0.0, |v| v.lift);
        transform.apply(Point2D::new(line.x + el.x, y - lift))
    };

    for (offset, el) in elements.iter().enumerate() {
        let font = el.font.scaled(group.scale);
        surface.fill_text(&el.text, origin_of(offset, el), &font, &base_paint, 0.0);
    }

    if !group.active {
        return;
    }

    // Highlight pass, one word at a time.
    let animation = &scene.config.animation;
    let progress = scene.visual.progress_ms;
    let mut word_start = 0;
    while word_start < elements.len() {
        let word = elements[word_start].word_group;
        let word_end = elements[word_start..]
            .iter()
            .position(|e| e.word_group != word)
            .map_or(elements.len(), |n| word_start + n);
        let run = &elements[word_start..word_end];

        if word.is_some() {
            let window = run
                .iter()
                .map(LayoutElement::window)
                .reduce(|a, b| a.union(&b))
                .unwrap_or_else(|| run[0].window());
            let paint = match element_status(window, progress) {
                ElementStatus::Future => None,
                ElementStatus::Active => {
                    let left = transform.apply(Point2D::new(line.x + run[0].x, y)).x;
                    let last = &run[run.len() - 1];
                    let right = transform
                        .apply(Point2D::new(line.x + last.x + last.width, y))
                        .x;
                    Some((
                        sweep_paint(
                            window.fraction(progress),
                            left,
                            right,
                            colors.active_glow.fade(alpha),
                            colors.gradient_tail.fade(alpha),
                        ),
                        animation.active_glow_blur,
                    ))
                }
                ElementStatus::Past => {
                    let fill = fill_fraction(window, progress, animation.fade_ms);
                    (fill > 0.0).then(|| {
                        (
                            TextPaint::Solid(colors.active_glow.fade(alpha * fill as f32)),
                            animation.active_glow_blur * fill,
                        )
                    })
                }
            };
            if let Some((paint, glow)) = paint {
                for (i, el) in run.iter().enumerate() {
                    let font: FontSpec = el.font.scaled(group.scale);
                    surface.fill_text(&el.text, origin_of(word_start + i, el), &font, &paint, glow);
                }
            }
        }
        word_start = word_end;
    }
}

/// Gradient mask for a word swept up to `fill` of its width.
fn sweep_paint(fill: f64, x0: f64, x1: f64, glow: Color, tail: Color) -> TextPaint {
    let fill = fill.clamp(0.0, 1.0);
    TextPaint::Gradient {
        x0,
        x1,
        stops: vec![
            (0.0, glow),
            ((fill - SWEEP_EDGE).max(0.0), glow),
            (fill, tail),
            ((fill + SWEEP_EDGE).min(1.0), Color::TRANSPARENT),
        ],
    }
}
