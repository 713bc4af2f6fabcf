//! The engine: owns the layout and every piece of per-frame state, and
//! wires inputs through timeline, scroll, hit testing and rendering.

use lyrica_core::{LyricaConfig, Millis, Point2D, Viewport};
use lyrica_ir::LyricDocument;

use crate::hit_test::{device_to_content, hit_test, seek_target, HoverCard, SeekRequest};
use crate::layout::{compute_layout, GroupId, Layout};
use crate::renderer::{render_frame, FrameScene};
use crate::scheduler::{TickHandle, TickScheduler};
use crate::scroll::ScrollController;
use crate::surface::DrawSurface;
use crate::text::TextMeasure;
use crate::timeline::{Timeline, VisualState};

/// Frame-driven lyrics view.
///
/// Layout is recomputed only on structural change (document, viewport or
/// config). Each frame derives visual state from the layout and the playback
/// position supplied by the host.
pub struct LyricsEngine<S: TickScheduler> {
    config: LyricaConfig,
    document: LyricDocument,
    viewport: Viewport,
    measurer: Box<dyn TextMeasure>,
    scheduler: S,
    layout: Layout,
    timeline: Timeline,
    visual: VisualState,
    scroll: ScrollController,
    pointer: Option<Point2D>,
    hovered: Option<GroupId>,
    hover_card: HoverCard,
    tick_handle: Option<TickHandle>,
    running: bool,
}

impl<S: TickScheduler> LyricsEngine<S> {
    pub fn new(
        config: LyricaConfig,
        viewport: Viewport,
        measurer: Box<dyn TextMeasure>,
        scheduler: S,
    ) -> Self {
        let layout = Layout::empty(viewport, &config);
        let timeline = Timeline::new(config.animation.clone());
        let scroll = ScrollController::new(config.scroll.clone(), config.lyrics.scroll_offset);
        Self {
            config,
            document: LyricDocument::default(),
            viewport,
            measurer,
            scheduler,
            layout,
            timeline,
            visual: VisualState::default(),
            scroll,
            pointer: None,
            hovered: None,
            hover_card: HoverCard::default(),
            tick_handle: None,
            running: false,
        }
    }

    /// Begin requesting frame ticks.
    pub fn start(&mut self) {
        self.running = true;
        self.schedule();
    }

    /// Stop ticking and drop timers. The engine can be started again.
    pub fn dispose(&mut self) {
        self.running = false;
        self.cancel_pending();
        self.hover_card.reset();
        self.pointer = None;
        self.hovered = None;
    }

    fn schedule(&mut self) {
        if self.running && self.tick_handle.is_none() {
            self.tick_handle = Some(self.scheduler.request_tick());
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.cancel_tick(handle);
        }
        self.scroll.cancel_timer();
    }

    fn relayout(&mut self) {
        self.layout = compute_layout(
            &self.document,
            &self.config,
            self.viewport,
            self.measurer.as_ref(),
        );
    }

    /// Replace the document: re-layout, jump to the top, re-enable
    /// auto-scroll and forget all transient state.
    pub fn set_document(&mut self, document: LyricDocument) {
        self.cancel_pending();
        self.document = document;
        self.relayout();
        self.scroll.reset(self.layout.max_scroll_offset);
        self.visual = VisualState::default();
        self.hover_card.reset();
        self.hovered = None;
        tracing::debug!(
            "document replaced: {} lines, {} groups",
            self.layout.lines.len(),
            self.layout.groups.len()
        );
        self.schedule();
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.cancel_pending();
        self.viewport = viewport;
        self.relayout();
        self.scroll.set_max_offset(self.layout.max_scroll_offset);
        self.hover_card.reset();
        self.schedule();
    }

    pub fn set_config(&mut self, config: LyricaConfig) {
        self.cancel_pending();
        self.timeline = Timeline::new(config.animation.clone());
        self.scroll
            .set_config(config.scroll.clone(), config.lyrics.scroll_offset);
        self.config = config;
        self.relayout();
        self.scroll.set_max_offset(self.layout.max_scroll_offset);
        self.schedule();
    }

    /// Advance one frame at clock time `now` with the host's playback
    /// position. Does nothing while stopped.
    pub fn tick(&mut self, now: Millis, progress: Millis) {
        if !self.running {
            return;
        }
        self.tick_handle = None;

        let visible = self.layout.visible_lines(self.scroll.actual_offset());
        let prev = std::mem::take(&mut self.visual);
        self.visual = self.timeline.tick(&self.layout, progress, prev, visible);

        let primary = self
            .visual
            .primary_group
            .and_then(|id| self.layout.group_span(id));
        self.scroll.update(&self.layout, primary, now);

        // Content moves under a still pointer while scrolling.
        self.hovered = self.hit(self.pointer);
        self.hover_card
            .update(&self.layout, self.hovered, self.timeline.config());

        self.schedule();
    }

    /// Paint the current state. Returns `false` if the surface skipped the frame.
    pub fn paint(&self, surface: &mut dyn DrawSurface) -> bool {
        let scene = FrameScene {
            layout: &self.layout,
            visual: &self.visual,
            scroll_offset: self.scroll.actual_offset(),
            hover: &self.hover_card,
            config: &self.config,
        };
        render_frame(surface, &scene)
    }

    /// [`tick`](Self::tick) then [`paint`](Self::paint).
    pub fn frame(&mut self, now: Millis, progress: Millis, surface: &mut dyn DrawSurface) -> bool {
        self.tick(now, progress);
        self.paint(surface)
    }

    fn hit(&self, pointer: Option<Point2D>) -> Option<GroupId> {
        let point = device_to_content(pointer?, self.scroll.actual_offset());
        hit_test(&self.layout, point)
    }

    /// Wheel or drag by `delta` pixels at clock time `now`.
    pub fn on_wheel(&mut self, delta: f64, now: Millis) {
        self.scroll.on_user_scroll(delta, now);
    }

    pub fn on_pointer_move(&mut self, point: Point2D) {
        self.pointer = Some(point);
        self.hovered = self.hit(self.pointer);
    }

    pub fn on_pointer_leave(&mut self) {
        self.pointer = None;
        self.hovered = None;
    }

    /// A click on a lyric group seeks to its first syllable and re-enables
    /// auto-scroll. Clicks elsewhere are ignored.
    pub fn on_click(&mut self, point: Point2D) -> Option<SeekRequest> {
        let group = self.hit(Some(point))?;
        let timestamp_ms = seek_target(&self.layout, group)?;
        tracing::debug!("seek to {}ms via group {}", timestamp_ms, group);
        self.scroll.resume();
        Some(SeekRequest { timestamp_ms })
    }

    pub fn resume_auto_scroll(&mut self) {
        self.scroll.resume();
    }

    /// Whether a "sync" affordance should be offered: auto-scroll is off and
    /// the primary group is out of view.
    pub fn sync_available(&self) -> bool {
        self.scroll.sync_available()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &LyricaConfig {
        &self.config
    }

    pub fn document(&self) -> &LyricDocument {
        &self.document
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn visual_state(&self) -> &VisualState {
        &self.visual
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    pub fn hovered_group(&self) -> Option<GroupId> {
        self.hovered
    }

    pub fn hover_card(&self) -> &HoverCard {
        &self.hover_card
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

impl<S: TickScheduler> Drop for LyricsEngine<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::surface::RecordingSurface;
    use crate::text::HeuristicMeasurer;
    use lyrica_ir::DocumentBuilder;

    fn long_doc() -> LyricDocument {
        let mut b = DocumentBuilder::new();
        for i in 0..40 {
            b = b.line(i as f64, 0.5, &["some", "words"]);
        }
        b.songwriter("someone").build()
    }

    fn engine() -> LyricsEngine<ManualScheduler> {
        let mut engine = LyricsEngine::new(
            LyricaConfig::default(),
            Viewport::new(800.0, 600.0),
            Box::new(HeuristicMeasurer::default()),
            ManualScheduler::default(),
        );
        engine.set_document(long_doc());
        engine
    }

    /// Step the scheduler, feeding each fired tick with `progress`.
    fn run(engine: &mut LyricsEngine<ManualScheduler>, frames: usize, progress: Millis) -> Millis {
        let mut now = engine.scheduler().now();
        for _ in 0..frames {
            if let Some((_, t)) = engine.scheduler_mut().step() {
                now = t;
                engine.tick(now, progress);
            }
        }
        now
    }

    #[test]
    fn test_start_requests_single_tick() {
        let mut e = engine();
        assert_eq!(e.scheduler().pending(), 0);
        e.start();
        e.start();
        assert_eq!(e.scheduler().pending(), 1);
        run(&mut e, 3, 0.0);
        assert_eq!(e.scheduler().pending(), 1);
    }

    #[test]
    fn test_dispose_cancels_tick() {
        let mut e = engine();
        e.start();
        e.dispose();
        assert!(!e.is_running());
        assert_eq!(e.scheduler().pending(), 0);
        e.tick(16.0, 0.0);
        assert!(e.visual_state().groups.is_empty());
    }

    #[test]
    fn test_follows_playback() {
        let mut e = engine();
        e.start();
        run(&mut e, 300, 30_000.0);
        assert!(e.scroll().actual_offset() > 0.0);
        assert!(e.scroll().auto_scroll_enabled());
    }

    #[test]
    fn test_click_seeks_and_resumes_after_wheel() {
        let mut e = engine();
        e.start();
        let now = run(&mut e, 5, 0.0);
        e.on_wheel(400.0, now);
        run(&mut e, 60, 0.0);
        assert!(!e.scroll().auto_scroll_enabled());

        let offset = e.scroll().actual_offset();
        let (&id, rect) = e
            .layout()
            .group_bounding_boxes
            .iter()
            .find(|(_, r)| r.y > offset + 50.0 && r.bottom() < offset + 550.0)
            .expect("a group inside the viewport");
        let click = Point2D::new(rect.center().x, rect.center().y - offset);
        let expected = seek_target(e.layout(), id).unwrap();

        let seek = e.on_click(click).expect("click should seek");
        assert_eq!(seek.timestamp_ms, expected);
        assert!(e.scroll().auto_scroll_enabled());
    }

    #[test]
    fn test_click_on_empty_space_is_ignored() {
        let mut e = engine();
        assert_eq!(e.on_click(Point2D::new(-10.0, -10.0)), None);
    }

    #[test]
    fn test_set_document_resets_scroll() {
        let mut e = engine();
        e.start();
        run(&mut e, 300, 30_000.0);
        assert!(e.scroll().actual_offset() > 0.0);
        e.set_document(long_doc());
        assert_eq!(e.scroll().actual_offset(), 0.0);
        assert!(e.visual_state().groups.is_empty());
        assert_eq!(e.scheduler().pending(), 1);
    }

    #[test]
    fn test_resize_relayouts() {
        let mut e = engine();
        let before = e.layout().max_scroll_offset;
        e.resize(Viewport::new(400.0, 300.0));
        assert_eq!(e.layout().viewport, Viewport::new(400.0, 300.0));
        assert_ne!(e.layout().max_scroll_offset, before);
    }

    #[test]
    fn test_hover_follows_pointer() {
        let mut e = engine();
        e.start();
        run(&mut e, 1, 0.0);
        let (&id, rect) = e.layout().group_bounding_boxes.iter().next().unwrap();
        e.on_pointer_move(rect.center());
        assert_eq!(e.hovered_group(), Some(id));
        run(&mut e, 30, 0.0);
        assert!(e.hover_card().visible());
        e.on_pointer_leave();
        run(&mut e, 60, 0.0);
        assert!(!e.hover_card().visible());
    }

    #[test]
    fn test_frame_paints() {
        let mut e = engine();
        e.start();
        let mut surface = RecordingSurface::new();
        assert!(e.frame(16.0, 500.0, &mut surface));
        assert!(surface.texts().count() > 0);
    }
}
