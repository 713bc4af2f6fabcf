//! Simulated playback: drives the engine on the manual frame clock with the
//! playback position following the clock, as a real player would.

use lyrica_core::Millis;
use lyrica_render::{LyricsEngine, ManualScheduler};

/// Finite targets in ascending order, without duplicates.
pub fn sorted_targets(at: &[f64]) -> Vec<Millis> {
    let mut targets: Vec<Millis> = at.iter().copied().filter(|t| t.is_finite()).collect();
    targets.sort_by(|a, b| a.total_cmp(b));
    targets.dedup();
    targets
}

/// Step frames until the clock reaches `target`. The final frame's progress
/// is pinned to `target` exactly. Returns the number of frames ticked.
pub fn advance_to(engine: &mut LyricsEngine<ManualScheduler>, target: Millis) -> usize {
    let mut frames = 0;
    while engine.scheduler().now() < target {
        let Some((_, now)) = engine.scheduler_mut().step() else {
            break;
        };
        engine.tick(now, now.min(target));
        frames += 1;
    }
    if frames == 0 {
        // Already past the target clock: still show the requested position.
        let now = engine.scheduler().now();
        engine.tick(now, target);
    }
    frames
}
