//! Per-frame animation state derived from layout geometry and progress.
//!
//! Element status and fill are pure functions of the playback position, so
//! seeks need no special handling. Group alpha and scale are smoothed across
//! frames and carry over through [`VisualState`].

use std::ops::Range;

use lyrica_core::math::approach;
use lyrica_core::{AnimationConfig, Millis, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::layout::{group_slot, ElementKind, GroupId, GroupSpan, Layout, LayoutElement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementStatus {
    Future,
    Active,
    Past,
}

/// Status of a window at `progress`; both bounds are inclusive.
pub fn element_status(window: TimeWindow, progress: Millis) -> ElementStatus {
    if progress < window.start {
        ElementStatus::Future
    } else if progress <= window.end {
        ElementStatus::Active
    } else {
        ElementStatus::Past
    }
}

/// Highlight sweep of a window: rises linearly across the window, then
/// decays back to zero over `fade_ms` once the window has passed.
pub fn fill_fraction(window: TimeWindow, progress: Millis, fade_ms: Millis) -> f64 {
    match element_status(window, progress) {
        ElementStatus::Future => 0.0,
        ElementStatus::Active => window.fraction(progress),
        ElementStatus::Past => {
            if fade_ms <= 0.0 {
                return 0.0;
            }
            (1.0 - (progress - window.end) / fade_ms).clamp(0.0, 1.0)
        }
    }
}

/// Triangular envelope over local progress `p`, peaking at 1 when `p` is 0.5
/// and zero outside `(0, 1)`.
pub fn dot_envelope(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        0.0
    } else if p <= 0.5 {
        p / 0.5
    } else {
        1.0 - (p - 0.5) / 0.5
    }
}

/// Animated pose of one interlude dot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotVisual {
    /// Local progress through the dot's own window.
    pub progress: f64,
    /// Upward translation in pixels.
    pub lift: f64,
    /// Glow blur radius in pixels.
    pub glow: f64,
    /// Radius multiplier.
    pub scale: f64,
}

pub fn dot_visual(element: &LayoutElement, progress: Millis, max_glow: f64) -> DotVisual {
    let p = element.window().fraction(progress);
    let envelope = dot_envelope(p);
    let scale = if p > 0.0 && p <= 0.5 {
        0.75 + p / 2.0
    } else if p > 0.5 && p < 1.0 {
        1.0 - (p - 0.5) / 0.5 / 4.0
    } else {
        0.7
    };
    DotVisual {
        progress: p,
        lift: element.amplitude_cap * envelope,
        glow: (max_glow * envelope).clamp(0.0, max_glow),
        scale: scale.clamp(0.0, 1.0),
    }
}

/// Whole-interlude opacity: fades in over the first `show_delay_ms` of the
/// gap and out over the last, zero outside it.
pub fn interlude_opacity(window: TimeWindow, progress: Millis, show_delay_ms: Millis) -> f64 {
    let into = progress - window.start;
    let total = window.duration();
    if into < 0.0 || into >= total {
        return 0.0;
    }
    if show_delay_ms <= 0.0 {
        return 1.0;
    }
    let opacity = if into < show_delay_ms {
        into / show_delay_ms
    } else if into > total - show_delay_ms {
        (total - into) / show_delay_ms
    } else {
        1.0
    };
    opacity.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementVisual {
    pub status: ElementStatus,
    pub fill: f64,
    /// Upward translation in pixels.
    pub lift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupVisual {
    pub id: GroupId,
    pub alpha: f64,
    pub scale: f64,
    /// Within the pre/post activity window.
    pub active: bool,
    pub fully_past: bool,
}

impl GroupVisual {
    fn idle(id: GroupId) -> Self {
        Self {
            id,
            alpha: 1.0,
            scale: 1.0,
            active: false,
            fully_past: false,
        }
    }
}

/// Transient per-frame state. Never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualState {
    pub progress_ms: Millis,
    /// Element index range covered by `elements`.
    pub element_range: Range<usize>,
    pub elements: Vec<ElementVisual>,
    /// Parallel to [`Layout::groups`].
    pub groups: Vec<GroupVisual>,
    pub primary_group: Option<GroupId>,
}

impl VisualState {
    /// Visual of the element at arena index `index`, if it was in the
    /// visible window this frame.
    pub fn element(&self, index: usize) -> Option<&ElementVisual> {
        if !self.element_range.contains(&index) {
            return None;
        }
        self.elements.get(index - self.element_range.start)
    }

    pub fn group_at(&self, group_index: usize) -> Option<&GroupVisual> {
        self.groups.get(group_index)
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupVisual> {
        self.groups.get(group_slot(id, self.groups.len())?).filter(|g| g.id == id)
    }

    pub fn is_group_active(&self, id: GroupId) -> bool {
        self.group(id).is_some_and(|g| g.active)
    }
}

/// Derives [`VisualState`] frames from a layout.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    config: AnimationConfig,
}

impl Timeline {
    pub fn new(config: AnimationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Visual for one element, independent of any previous frame.
    pub fn element_visual(&self, element: &LayoutElement, progress: Millis) -> ElementVisual {
        let window = element.window();
        let status = element_status(window, progress);
        let fill = fill_fraction(window, progress, self.config.fade_ms);
        let lift = match element.kind {
            ElementKind::Dot => dot_visual(element, progress, self.config.interlude_glow_max_blur).lift,
            ElementKind::Credits => 0.0,
            ElementKind::Syllable | ElementKind::Letter => element.amplitude_cap * fill,
        };
        ElementVisual { status, fill, lift }
    }

    fn group_is_active(&self, layout: &Layout, span: &GroupSpan, progress: Millis) -> bool {
        let (pre, post) = (self.config.pre_active_ms, self.config.post_active_ms);
        // Lines are only consulted for groups whose overall window is near.
        span.window.contains_with_grace(progress, pre, post)
            && layout
                .group_lines(span)
                .iter()
                .any(|line| line.window().contains_with_grace(progress, pre, post))
    }

    /// The group the view should follow: the last group in document order
    /// that has started, else the first active group, else the first group.
    pub fn primary_group(&self, layout: &Layout, progress: Millis, active: &[bool]) -> Option<GroupId> {
        let started = layout
            .groups
            .iter()
            .rev()
            .find(|g| !g.id.is_credits() && g.window.start <= progress);
        if let Some(g) = started {
            return Some(g.id);
        }
        layout
            .groups
            .iter()
            .zip(active)
            .find(|(g, &a)| a && !g.id.is_credits())
            .map(|(g, _)| g.id)
            .or_else(|| layout.groups.first().map(|g| g.id))
    }

    /// Advance one frame. `prev` is consumed so its buffers are reused.
    ///
    /// Per-element work covers only `visible` lines; group smoothing covers
    /// every group.
    pub fn tick(
        &self,
        layout: &Layout,
        progress: Millis,
        prev: VisualState,
        visible: Range<usize>,
    ) -> VisualState {
        let VisualState {
            elements: mut element_buf,
            groups: prev_groups,
            ..
        } = prev;

        let element_range = layout.elements_for_lines(&visible);
        element_buf.clear();
        element_buf.extend(
            layout.elements[element_range.clone()]
                .iter()
                .map(|e| self.element_visual(e, progress)),
        );

        let mut groups = Vec::with_capacity(layout.groups.len());
        let mut active = Vec::with_capacity(layout.groups.len());
        for (i, span) in layout.groups.iter().enumerate() {
            let is_active = self.group_is_active(layout, span, progress);
            active.push(is_active);

            if !span.is_animated() {
                let mut g = GroupVisual::idle(span.id);
                g.active = is_active;
                groups.push(g);
                continue;
            }

            let fully_past = span
                .text_end
                .is_some_and(|end| end > 0.0 && progress > end + self.config.past_grace_ms);
            let target_alpha = if is_active {
                self.config.active_alpha
            } else if fully_past {
                self.config.past_alpha
            } else {
                self.config.idle_alpha
            };
            let target_scale = if is_active { self.config.active_scale } else { 1.0 };

            let (alpha, scale) = match prev_groups.get(i).filter(|g| g.id == span.id) {
                Some(p) => (
                    approach(p.alpha, target_alpha, self.config.alpha_smoothing),
                    approach(p.scale, target_scale, self.config.scale_smoothing),
                ),
                // First observation starts at the target.
                None => (target_alpha, target_scale),
            };

            groups.push(GroupVisual {
                id: span.id,
                alpha,
                scale,
                active: is_active,
                fully_past,
            });
        }

        let primary_group = self.primary_group(layout, progress, &active);

        VisualState {
            progress_ms: progress,
            element_range,
            elements: element_buf,
            groups,
            primary_group,
        }
    }
}
