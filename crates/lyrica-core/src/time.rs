use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback position or duration in milliseconds.
pub type Millis = f64;

/// Convert document seconds to engine milliseconds.
pub fn seconds_to_millis(seconds: f64) -> Millis {
    seconds * 1000.0
}

/// A closed time interval `[start, end]` in milliseconds.
///
/// Both bounds are inclusive: a window is active at exactly `start` and at
/// exactly `end`, and becomes past once progress moves beyond `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Millis,
    pub end: Millis,
}

impl TimeWindow {
    /// Create a window. `end` is raised to `start` if it lies before it.
    pub fn new(start: Millis, end: Millis) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Create a window from document seconds.
    pub fn from_seconds(start: f64, end: f64) -> Self {
        Self::new(seconds_to_millis(start), seconds_to_millis(end))
    }

    /// Length of the window.
    pub fn duration(&self) -> Millis {
        self.end - self.start
    }

    /// Whether `progress` lies inside the window, bounds included.
    pub fn contains(&self, progress: Millis) -> bool {
        progress >= self.start && progress <= self.end
    }

    /// Whether `progress` lies inside the window widened by `lead` before the
    /// start and `trail` after the end.
    pub fn contains_with_grace(&self, progress: Millis, lead: Millis, trail: Millis) -> bool {
        progress >= self.start - lead && progress <= self.end + trail
    }

    /// Normalized position of `progress` in the window, clamped to `[0, 1]`.
    /// A zero-length window reports 1 once reached.
    pub fn fraction(&self, progress: Millis) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return if progress >= self.start { 1.0 } else { 0.0 };
        }
        ((progress - self.start) / duration).clamp(0.0, 1.0)
    }

    /// The `index`-th of `count` equal slices of this window.
    pub fn slice(&self, index: usize, count: usize) -> TimeWindow {
        let count = count.max(1) as f64;
        let step = self.duration() / count;
        let start = self.start + index as f64 * step;
        TimeWindow::new(start, start + step)
    }

    /// Smallest window covering both.
    pub fn union(&self, other: &TimeWindow) -> TimeWindow {
        TimeWindow::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", format_millis(self.start), format_millis(self.end))
    }
}

/// Format a playback position as `mm:ss.mmm`.
pub fn format_millis(ms: Millis) -> String {
    let total_ms = ms.max(0.0) as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let rest = total_ms % 1_000;
    format!("{:02}:{:02}.{:03}", minutes, secs, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_from_seconds() {
        let w = TimeWindow::from_seconds(1.5, 2.0);
        assert!((w.start - 1500.0).abs() < 1e-9);
        assert!((w.duration() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let w = TimeWindow::new(100.0, 200.0);
        assert!(w.contains(100.0));
        assert!(w.contains(200.0));
        assert!(!w.contains(99.9));
        assert!(!w.contains(200.1));
    }

    #[test]
    fn test_window_fraction() {
        let w = TimeWindow::new(0.0, 300.0);
        assert!((w.fraction(150.0) - 0.5).abs() < 1e-9);
        assert_eq!(w.fraction(-10.0), 0.0);
        assert_eq!(w.fraction(1000.0), 1.0);
        assert_eq!(TimeWindow::new(50.0, 50.0).fraction(50.0), 1.0);
    }

    #[test]
    fn test_window_slices_cover_window() {
        let w = TimeWindow::new(10_000.0, 12_500.0);
        let last = w.slice(2, 3);
        assert!((w.slice(0, 3).start - 10_000.0).abs() < 1e-9);
        assert!((last.end - 12_500.0).abs() < 1e-6);
    }

    #[test]
    fn test_reversed_window_is_clamped() {
        let w = TimeWindow::new(500.0, 100.0);
        assert_eq!(w.end, 500.0);
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(61_500.0), "01:01.500");
        assert_eq!(format!("{}", TimeWindow::new(0.0, 1000.0)), "[00:00.000, 00:01.000]");
    }
}
