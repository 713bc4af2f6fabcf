//! Auto-scroll control loop with user-override detection.
//!
//! The controller keeps the primary group centered by easing the actual
//! offset toward a target every frame. User scrolling suspends that until an
//! inactivity timer elapses with the primary group back inside the visible
//! band. The timer is a deadline on the frame clock, so tests drive it with
//! plain timestamps.

use lyrica_core::math::approach;
use lyrica_core::{Millis, Rect, ScrollConfig};

use crate::layout::{GroupSpan, Layout};

#[derive(Debug, Clone)]
pub struct ScrollController {
    config: ScrollConfig,
    /// Bias added to the centering target.
    bias: f64,
    actual: f64,
    target: f64,
    max: f64,
    auto_scroll: bool,
    timer_deadline: Option<Millis>,
    sync_available: bool,
}

impl ScrollController {
    pub fn new(config: ScrollConfig, bias: f64) -> Self {
        Self {
            config,
            bias,
            actual: 0.0,
            target: 0.0,
            max: 0.0,
            auto_scroll: true,
            timer_deadline: None,
            sync_available: false,
        }
    }

    pub fn set_config(&mut self, config: ScrollConfig, bias: f64) {
        self.config = config;
        self.bias = bias;
    }

    pub fn actual_offset(&self) -> f64 {
        self.actual
    }

    pub fn target_offset(&self) -> f64 {
        self.target
    }

    pub fn max_offset(&self) -> f64 {
        self.max
    }

    pub fn auto_scroll_enabled(&self) -> bool {
        self.auto_scroll
    }

    pub fn sync_available(&self) -> bool {
        self.sync_available
    }

    pub fn timer_pending(&self) -> bool {
        self.timer_deadline.is_some()
    }

    fn clamp(&self, offset: f64) -> f64 {
        offset.clamp(0.0, self.max)
    }

    /// Adopt a new scroll range, keeping the current offsets inside it.
    pub fn set_max_offset(&mut self, max: f64) {
        self.max = max.max(0.0);
        self.actual = self.clamp(self.actual);
        self.target = self.clamp(self.target);
    }

    /// Jump to the top and re-enable auto-scroll. Used on document replacement.
    pub fn reset(&mut self, max: f64) {
        self.max = max.max(0.0);
        self.actual = 0.0;
        self.target = 0.0;
        self.auto_scroll = true;
        self.timer_deadline = None;
        self.sync_available = false;
    }

    pub fn cancel_timer(&mut self) {
        self.timer_deadline = None;
    }

    /// A user wheel or drag: suspend auto-scroll immediately, move the target
    /// by `delta` and restart the inactivity timer.
    pub fn on_user_scroll(&mut self, delta: f64, now: Millis) {
        self.auto_scroll = false;
        self.target = self.clamp(self.target + delta);
        self.timer_deadline = Some(now + self.config.user_scroll_timeout_ms);
    }

    /// Manual resume: enable auto-scroll unconditionally.
    pub fn resume(&mut self) {
        self.auto_scroll = true;
        self.timer_deadline = None;
        self.sync_available = false;
    }

    /// Centering target for a group, clamped to the scroll range.
    pub fn target_for(&self, group: &GroupSpan, viewport_height: f64) -> f64 {
        self.clamp(group.center_y() - viewport_height / 2.0 + self.bias)
    }

    /// Whether `group` overlaps the band between the top and bottom padding at
    /// the current offset.
    pub fn in_band(&self, layout: &Layout, group: &GroupSpan) -> bool {
        let band_top = self.actual + layout.padding.top;
        let band_bottom = self.actual + layout.viewport.height - layout.padding.bottom;
        Rect::new(0.0, group.top, 0.0, group.height()).intersects_band(band_top, band_bottom)
    }

    /// Advance one frame at clock time `now`, following `primary`.
    pub fn update(&mut self, layout: &Layout, primary: Option<&GroupSpan>, now: Millis) {
        self.max = layout.max_scroll_offset;

        if self.auto_scroll {
            if let Some(group) = primary {
                self.target = self.target_for(group, layout.viewport.height);
            }
        }
        self.target = self.clamp(self.target);
        self.actual = self.clamp(approach(self.actual, self.target, self.config.smoothing));

        let Some(group) = primary else {
            self.sync_available = false;
            return;
        };
        let in_band = self.in_band(layout, group);

        if let Some(deadline) = self.timer_deadline {
            if now >= deadline {
                self.timer_deadline = None;
                if in_band {
                    tracing::debug!("auto-scroll resumed after inactivity");
                    self.auto_scroll = true;
                }
            }
        }

        if self.auto_scroll {
            self.sync_available = false;
            return;
        }

        self.sync_available = !in_band;
        if in_band {
            if self.timer_deadline.is_none() {
                self.timer_deadline = Some(now + self.config.user_scroll_timeout_ms);
            }
        } else {
            // Out of band: resuming needs a fresh quiet period once it returns.
            self.timer_deadline = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;
    use crate::text::HeuristicMeasurer;
    use lyrica_core::{LyricaConfig, Viewport};
    use lyrica_ir::DocumentBuilder;

    fn long_layout() -> Layout {
        let mut b = DocumentBuilder::new();
        for i in 0..40 {
            b = b.line(i as f64, 0.5, &["line"]);
        }
        compute_layout(
            &b.build(),
            &LyricaConfig::default(),
            Viewport::new(800.0, 600.0),
            &HeuristicMeasurer::default(),
        )
    }

    fn controller() -> ScrollController {
        ScrollController::new(ScrollConfig::default(), 16.0)
    }

    #[test]
    fn test_target_centers_group() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        let g = &layout.groups[20];
        let expected = g.top - 300.0 + g.height() / 2.0 + 16.0;
        assert!((s.target_for(g, 600.0) - expected).abs() < 1e-9);
        // Clamped at the top.
        assert_eq!(s.target_for(&layout.groups[0], 600.0), 0.0);
    }

    #[test]
    fn test_converges_within_bounded_frames() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        let g = &layout.groups[20];
        let mut frames = 0;
        while (s.actual_offset() - s.target_offset()).abs() > 0.5 || frames == 0 {
            s.update(&layout, Some(g), frames as f64 * 16.0);
            frames += 1;
            assert!(frames < 200, "did not converge");
        }
        assert!(s.target_offset() > 0.0);
    }

    #[test]
    fn test_wheel_suspends_and_moves_target() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        let g = &layout.groups[0];
        s.update(&layout, Some(g), 0.0);

        s.on_user_scroll(500.0, 16.0);
        assert!(!s.auto_scroll_enabled());
        assert_eq!(s.target_offset(), 500.0);
        assert!(s.timer_pending());

        s.on_user_scroll(-10_000.0, 32.0);
        assert_eq!(s.target_offset(), 0.0);
    }

    #[test]
    fn test_no_resume_until_timer_and_band() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        let g = &layout.groups[0];

        // Scroll far away from the active group.
        s.on_user_scroll(2000.0, 0.0);
        let mut now = 0.0;
        for _ in 0..300 {
            now += 16.0;
            s.update(&layout, Some(g), now);
        }
        assert!(!s.auto_scroll_enabled(), "resumed while out of band");
        assert!(s.sync_available());
        assert!(!s.timer_pending());

        // Scroll back so the group is in band; resume after the quiet period.
        s.on_user_scroll(-2000.0, now);
        let resume_at = now + 1000.0;
        let mut resumed_at = None;
        while now < resume_at + 2000.0 {
            now += 16.0;
            s.update(&layout, Some(g), now);
            if s.auto_scroll_enabled() && resumed_at.is_none() {
                resumed_at = Some(now);
            }
        }
        let resumed_at = resumed_at.expect("auto-scroll should resume");
        assert!(resumed_at >= resume_at);
        assert!(!s.sync_available());
    }

    #[test]
    fn test_wheel_halts_convergence_next_frame() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        let g = &layout.groups[20];
        s.update(&layout, Some(g), 0.0);
        let before = s.target_offset();
        s.on_user_scroll(0.0, 16.0);
        s.update(&layout, Some(&layout.groups[30]), 32.0);
        assert_eq!(s.target_offset(), before);
    }

    #[test]
    fn test_manual_resume() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        s.on_user_scroll(2000.0, 0.0);
        s.update(&layout, Some(&layout.groups[0]), 16.0);
        s.resume();
        assert!(s.auto_scroll_enabled());
        assert!(!s.timer_pending());
        assert!(!s.sync_available());
    }

    #[test]
    fn test_reset_jumps_to_top() {
        let layout = long_layout();
        let mut s = controller();
        s.reset(layout.max_scroll_offset);
        for i in 0..100 {
            s.update(&layout, Some(&layout.groups[30]), i as f64 * 16.0);
        }
        assert!(s.actual_offset() > 0.0);
        s.reset(layout.max_scroll_offset);
        assert_eq!(s.actual_offset(), 0.0);
        assert_eq!(s.target_offset(), 0.0);
    }
}
