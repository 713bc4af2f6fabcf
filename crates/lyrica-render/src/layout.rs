//! Layout engine: turns a lyric document into positioned lines and elements.
//!
//! Layout is a pure function of the document, the configuration, the
//! viewport and the text measurer. It runs only on structural change and
//! produces immutable geometry; everything per-frame reads from it.
//!
//! Elements live in one flat arena ([`Layout::elements`]); lines and groups
//! refer to them by index range.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use lyrica_core::{LyricaConfig, Millis, Rect, TimeWindow, Viewport};
use lyrica_ir::{validate_block, ContentBlock, LyricDocument, Syllable, VocalPart};
use serde::{Deserialize, Serialize};

use crate::text::{FallbackMeasurer, FontSpec, HeuristicMeasurer, TextMeasure};

/// Identifier shared by every line synthesized from one content block, or by
/// one interlude line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i32);

impl GroupId {
    /// The trailing credits block. Never animated by playback.
    pub const CREDITS: GroupId = GroupId(-1);

    pub fn is_credits(&self) -> bool {
        *self == Self::CREDITS
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an element draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// A whole syllable.
    Syllable,
    /// One character of a split syllable or of a letter-wrapped word.
    Letter,
    /// An interlude dot.
    Dot,
    /// A line of credits text.
    Credits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Right,
    Center,
}

/// A positioned text run or interlude dot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutElement {
    pub text: String,
    /// Horizontal offset from the owning line's origin.
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub start: Millis,
    pub end: Millis,
    /// Maximum upward lift while the element is animated.
    pub amplitude_cap: f64,
    pub is_lead: bool,
    pub kind: ElementKind,
    /// Unique per word across the whole layout. `None` for dots and credits.
    pub word_group: Option<u32>,
    pub line_group: GroupId,
    pub font: FontSpec,
}

impl LayoutElement {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutLine {
    /// Index range into [`Layout::elements`].
    pub elements: Range<usize>,
    /// Line origin in content space.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub start: Millis,
    pub end: Millis,
    pub align: Align,
    pub is_interlude: bool,
    pub line_group: GroupId,
    /// Index into [`Layout::groups`].
    pub group_index: usize,
    pub bounding_box: Rect,
}

impl LayoutLine {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Contiguous run of lines sharing one group id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpan {
    pub id: GroupId,
    /// Index range into [`Layout::lines`].
    pub lines: Range<usize>,
    pub top: f64,
    pub bottom: f64,
    /// Union of the group's line windows.
    pub window: TimeWindow,
    /// Latest end among the group's text lines, `None` for interludes and credits.
    pub text_end: Option<Millis>,
    pub is_interlude: bool,
}

impl GroupSpan {
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Whether the group takes part in playback-driven animation.
    pub fn is_animated(&self) -> bool {
        !self.is_interlude && !self.id.is_credits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub bottom: f64,
    pub horizontal: f64,
}

impl Padding {
    pub fn for_viewport(viewport: Viewport, config: &LyricaConfig) -> Self {
        let layout = &config.layout;
        Self {
            top: viewport.height * layout.padding_top_fraction,
            bottom: viewport.height * layout.padding_bottom_fraction,
            horizontal: viewport.width * layout.padding_horizontal_fraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FontSizes {
    pub lead: f64,
    pub background: f64,
    pub credits: f64,
    pub dot: f64,
}

impl FontSizes {
    /// Responsive sizes: the lead size follows the viewport width between the
    /// configured rem bounds, everything else is a ratio of it.
    pub fn for_viewport(viewport: Viewport, config: &LyricaConfig) -> Self {
        let layout = &config.layout;
        let min_px = layout.min_font_rem * layout.root_font_size;
        let max_px = layout.max_font_rem * layout.root_font_size;
        let preferred = layout.preferred_width_fraction * viewport.width;
        let lead = preferred.min(max_px).max(min_px);
        let background = lead * layout.background_font_ratio;
        Self {
            lead,
            background,
            credits: background * layout.credits_font_ratio,
            dot: background / 1.5,
        }
    }
}

/// Immutable geometry for one document, viewport and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub viewport: Viewport,
    pub padding: Padding,
    pub fonts: FontSizes,
    pub elements: Vec<LayoutElement>,
    pub lines: Vec<LayoutLine>,
    pub groups: Vec<GroupSpan>,
    /// Hit-test boxes for text groups, in content space.
    pub group_bounding_boxes: BTreeMap<GroupId, Rect>,
    pub max_scroll_offset: f64,
    /// Tallest line, used to bound visibility searches.
    pub max_line_height: f64,
}

impl Layout {
    pub fn empty(viewport: Viewport, config: &LyricaConfig) -> Self {
        Self {
            viewport,
            padding: Padding::for_viewport(viewport, config),
            fonts: FontSizes::for_viewport(viewport, config),
            elements: Vec::new(),
            lines: Vec::new(),
            groups: Vec::new(),
            group_bounding_boxes: BTreeMap::new(),
            max_scroll_offset: 0.0,
            max_line_height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_elements(&self, line: &LayoutLine) -> &[LayoutElement] {
        &self.elements[line.elements.clone()]
    }

    /// Group ids are allocated densely in document order, so a non-credits
    /// id is also its index into [`Layout::groups`]. Credits come last.
    pub fn group_span(&self, id: GroupId) -> Option<&GroupSpan> {
        self.groups.get(group_slot(id, self.groups.len())?).filter(|g| g.id == id)
    }

    pub fn group_lines(&self, span: &GroupSpan) -> &[LayoutLine] {
        &self.lines[span.lines.clone()]
    }

    /// Contiguous range of lines that intersect the viewport when the
    /// content is scrolled by `scroll_offset`.
    pub fn visible_lines(&self, scroll_offset: f64) -> Range<usize> {
        let top = scroll_offset;
        let bottom = scroll_offset + self.viewport.height;
        let start = self
            .lines
            .partition_point(|l| l.y + self.max_line_height < top);
        let end = self.lines.partition_point(|l| l.y <= bottom);
        start..end.max(start)
    }

    /// Element index range covered by a range of lines.
    pub fn elements_for_lines(&self, lines: &Range<usize>) -> Range<usize> {
        if lines.is_empty() {
            return 0..0;
        }
        let first = &self.lines[lines.start];
        let last = &self.lines[lines.end - 1];
        first.elements.start..last.elements.end
    }

    pub fn to_json(&self) -> lyrica_core::LyricaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Index of group `id` in a group list of length `len`.
pub(crate) fn group_slot(id: GroupId, len: usize) -> Option<usize> {
    if id.is_credits() {
        len.checked_sub(1)
    } else {
        usize::try_from(id.0).ok()
    }
}

/// Lay out `document` into `viewport`.
///
/// Deterministic: identical inputs produce identical geometry. Malformed
/// blocks are skipped and measurement failures fall back to a heuristic,
/// so this never fails.
pub fn compute_layout(
    document: &LyricDocument,
    config: &LyricaConfig,
    viewport: Viewport,
    measurer: &dyn TextMeasure,
) -> Layout {
    if viewport.is_empty() || document.is_empty() {
        return Layout::empty(viewport, config);
    }

    let measure = FallbackMeasurer::new(
        measurer,
        HeuristicMeasurer::new(config.layout.average_char_width_ratio),
    );
    let mut builder = LayoutBuilder::new(config, viewport, &measure);

    let mut skipped = 0usize;
    for (index, block) in document.content.iter().enumerate() {
        if let Err(e) = validate_block(index, block) {
            tracing::warn!("skipping content block: {}", e);
            skipped += 1;
            continue;
        }
        builder.push_block(block);
    }

    if config.layout.show_credits && !document.songwriters.is_empty() {
        builder.push_credits(&document.songwriters);
    }

    let layout = builder.finish();
    tracing::debug!(
        "layout: {} lines, {} elements, {} groups, {} blocks skipped, max scroll {:.1}",
        layout.lines.len(),
        layout.elements.len(),
        layout.groups.len(),
        skipped,
        layout.max_scroll_offset
    );
    layout
}

struct Word<'d> {
    syllables: &'d [Syllable],
    width: f64,
}

/// Line currently being filled.
#[derive(Default)]
struct PendingLine {
    start_index: usize,
    width: f64,
    height: f64,
}

struct LayoutBuilder<'a> {
    config: &'a LyricaConfig,
    viewport: Viewport,
    padding: Padding,
    fonts: FontSizes,
    measure: &'a FallbackMeasurer<'a>,
    available_width: f64,
    elements: Vec<LayoutElement>,
    lines: Vec<LayoutLine>,
    current_y: f64,
    last_end: Millis,
    next_group: i32,
    next_word: u32,
}

impl<'a> LayoutBuilder<'a> {
    fn new(config: &'a LyricaConfig, viewport: Viewport, measure: &'a FallbackMeasurer<'a>) -> Self {
        let padding = Padding::for_viewport(viewport, config);
        Self {
            config,
            viewport,
            padding,
            fonts: FontSizes::for_viewport(viewport, config),
            measure,
            available_width: (viewport.width - padding.horizontal * 2.0).max(0.0),
            elements: Vec::new(),
            lines: Vec::new(),
            current_y: padding.top,
            last_end: 0.0,
            next_group: 0,
            next_word: 0,
        }
    }

    fn group_gap(&self) -> f64 {
        self.fonts.background * self.config.layout.group_gap_multiplier
    }

    fn allocate_group(&mut self) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        id
    }

    fn push_block(&mut self, block: &ContentBlock) {
        let Some(window) = block.window() else {
            return;
        };

        if !self.lines.is_empty() {
            self.current_y += self.group_gap();
        }

        let gap = window.start - self.last_end;
        let lead_in_allowed = !self.lines.is_empty() || self.config.layout.lead_in_interlude;
        if lead_in_allowed && gap > self.config.layout.interlude_threshold_ms {
            self.push_interlude(TimeWindow::new(self.last_end, window.start), block.opposite_aligned);
        }

        let group = self.allocate_group();
        self.push_part(&block.lead, true, group, block.opposite_aligned);
        for part in &block.background {
            self.push_part(part, false, group, block.opposite_aligned);
        }

        self.last_end = window.end;
    }

    fn push_interlude(&mut self, gap: TimeWindow, opposite_aligned: bool) {
        let config = self.config;
        let layout = &config.layout;
        let count = layout.interlude_dot_count.max(1);
        let dot = self.fonts.dot;
        let dots_width = count as f64 * dot + (count - 1) as f64 * layout.interlude_dot_gap;
        let (align, x) = if opposite_aligned {
            (
                Align::Right,
                self.viewport.width - dots_width - self.padding.horizontal,
            )
        } else {
            (Align::Left, self.padding.horizontal)
        };

        let group = self.allocate_group();
        let start_index = self.elements.len();
        let font = FontSpec::new(layout.font_family.clone(), dot, layout.background_font_weight);
        for i in 0..count {
            let slice = gap.slice(i, count);
            self.elements.push(LayoutElement {
                text: String::new(),
                x: i as f64 * (dot + layout.interlude_dot_gap),
                width: dot,
                height: dot,
                start: slice.start,
                end: slice.end,
                amplitude_cap: layout.interlude_dot_amplitude,
                is_lead: false,
                kind: ElementKind::Dot,
                word_group: None,
                line_group: group,
                font: font.clone(),
            });
        }

        let height = dot * layout.line_height_multiplier;
        self.lines.push(LayoutLine {
            elements: start_index..self.elements.len(),
            x,
            y: self.current_y,
            width: dots_width,
            height,
            start: gap.start,
            end: gap.end,
            align,
            is_interlude: true,
            line_group: group,
            group_index: 0,
            bounding_box: Rect::new(x, self.current_y, dots_width, height),
        });
        self.current_y += height * (1.0 + layout.group_gap_multiplier);
    }

    fn part_font(&self, is_lead: bool) -> FontSpec {
        let layout = &self.config.layout;
        if is_lead {
            FontSpec::new(layout.font_family.clone(), self.fonts.lead, layout.lead_font_weight)
        } else {
            FontSpec::new(
                layout.font_family.clone(),
                self.fonts.background,
                layout.background_font_weight,
            )
        }
    }

    fn display_text<'s>(&self, syllable: &'s Syllable) -> &'s str {
        syllable.display_text(self.config.lyrics.force_romanized)
    }

    /// Split a part into words: a word ends at the first syllable that is not
    /// marked as continuing into the next one.
    fn words<'d>(&self, part: &'d VocalPart, font: &FontSpec) -> Vec<Word<'d>> {
        let mut words = Vec::new();
        let mut begin = 0;
        for (i, s) in part.syllables.iter().enumerate() {
            let last = i + 1 == part.syllables.len();
            if !s.is_part_of_word || last {
                let syllables = &part.syllables[begin..=i];
                let text: String = syllables.iter().map(|s| self.display_text(s)).collect();
                words.push(Word {
                    syllables,
                    width: self.measure.width(&text, font),
                });
                begin = i + 1;
            }
        }
        words
    }

    fn push_part(&mut self, part: &VocalPart, is_lead: bool, group: GroupId, opposite_aligned: bool) {
        if part.is_empty() {
            return;
        }
        let font = self.part_font(is_lead);
        let advance = font.size * self.config.layout.line_height_multiplier;
        let space = self.measure.width(" ", &font);
        let split_threshold = self.config.lyrics.split_threshold_ms;

        let mut line = PendingLine {
            start_index: self.elements.len(),
            ..Default::default()
        };

        for word in self.words(part, &font) {
            self.next_word += 1;
            let word_id = self.next_word;

            if word.width > self.available_width {
                // Too wide for any line: wrap it character by character.
                self.flush_line(&mut line, group, opposite_aligned, advance);
                for s in word.syllables {
                    let text = self.display_text(s);
                    let count = text.chars().count();
                    for (i, ch) in text.chars().enumerate() {
                        let letter = ch.to_string();
                        // A glyph wider than the whole line is squeezed to fit.
                        let width = self.measure.width(&letter, &font).min(self.available_width);
                        if line.width > 0.0 && line.width + width > self.available_width {
                            self.flush_line(&mut line, group, opposite_aligned, advance);
                        }
                        let slice = s.window().slice(i, count);
                        self.push_element(
                            &mut line,
                            letter,
                            width,
                            slice,
                            ElementKind::Letter,
                            is_lead,
                            word_id,
                            group,
                            &font,
                        );
                    }
                }
                continue;
            }

            if line.width > 0.0 && line.width + space + word.width > self.available_width {
                self.flush_line(&mut line, group, opposite_aligned, advance);
            }
            if line.width > 0.0 {
                line.width += space;
            }

            for s in word.syllables {
                let text = self.display_text(s);
                let window = s.window();
                let count = text.chars().count();
                if window.duration() > split_threshold && count > 1 {
                    for (i, ch) in text.chars().enumerate() {
                        let letter = ch.to_string();
                        let width = self.measure.width(&letter, &font);
                        self.push_element(
                            &mut line,
                            letter,
                            width,
                            window.slice(i, count),
                            ElementKind::Letter,
                            is_lead,
                            word_id,
                            group,
                            &font,
                        );
                    }
                } else {
                    let width = self.measure.width(text, &font);
                    self.push_element(
                        &mut line,
                        text.to_string(),
                        width,
                        window,
                        ElementKind::Syllable,
                        is_lead,
                        word_id,
                        group,
                        &font,
                    );
                }
            }
        }

        self.flush_line(&mut line, group, opposite_aligned, advance);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_element(
        &mut self,
        line: &mut PendingLine,
        text: String,
        width: f64,
        window: TimeWindow,
        kind: ElementKind,
        is_lead: bool,
        word_id: u32,
        group: GroupId,
        font: &FontSpec,
    ) {
        let amplitude_cap = match kind {
            ElementKind::Letter => self.config.lyrics.max_translate_up_letter,
            _ => self.config.lyrics.max_translate_up_word,
        };
        self.elements.push(LayoutElement {
            text,
            x: line.width,
            width,
            height: font.size,
            start: window.start,
            end: window.end,
            amplitude_cap,
            is_lead,
            kind,
            word_group: Some(word_id),
            line_group: group,
            font: font.clone(),
        });
        line.width += width;
        line.height = line.height.max(font.size);
    }

    fn flush_line(&mut self, line: &mut PendingLine, group: GroupId, opposite_aligned: bool, advance: f64) {
        let range = line.start_index..self.elements.len();
        if range.is_empty() {
            return;
        }
        let elements = &self.elements[range.clone()];
        let start = elements.iter().map(|e| e.start).fold(f64::INFINITY, f64::min);
        let end = elements.iter().map(|e| e.end).fold(f64::NEG_INFINITY, f64::max);
        let (align, x) = if opposite_aligned {
            (
                Align::Right,
                self.viewport.width - line.width - self.padding.horizontal,
            )
        } else {
            (Align::Left, self.padding.horizontal)
        };

        self.lines.push(LayoutLine {
            elements: range,
            x,
            y: self.current_y,
            width: line.width,
            height: line.height,
            start,
            end,
            align,
            is_interlude: false,
            line_group: group,
            group_index: 0,
            bounding_box: Rect::new(x, self.current_y, line.width, line.height),
        });
        self.current_y += advance;
        *line = PendingLine {
            start_index: self.elements.len(),
            ..Default::default()
        };
    }

    fn push_credits(&mut self, songwriters: &[String]) {
        let config = self.config;
        let layout = &config.layout;
        self.current_y += self.group_gap() * 2.0;

        let font = FontSpec::new(
            layout.font_family.clone(),
            self.fonts.credits,
            layout.background_font_weight,
        );
        let height = font.size * layout.line_height_multiplier;
        let space = self.measure.width(" ", &font);
        let text = format!("Credits: {}", songwriters.join(", "));

        let mut rows: Vec<Vec<&str>> = Vec::new();
        let mut row: Vec<&str> = Vec::new();
        let mut row_width = 0.0;
        for word in text.split(' ') {
            let width = self.measure.width(word, &font);
            if !row.is_empty() && row_width + space + width > self.available_width {
                rows.push(std::mem::take(&mut row));
                row_width = 0.0;
            }
            if !row.is_empty() {
                row_width += space;
            }
            row.push(word);
            row_width += width;
        }
        if !row.is_empty() {
            rows.push(row);
        }

        // Credits sit after the last sung syllable so they read as past.
        let at = self.last_end;
        for row in rows {
            let line_text = row.join(" ");
            let width = self.measure.width(&line_text, &font);
            let x = (self.viewport.width - width) / 2.0;
            let index = self.elements.len();
            self.elements.push(LayoutElement {
                text: line_text,
                x: 0.0,
                width,
                height: font.size,
                start: at,
                end: at,
                amplitude_cap: 0.0,
                is_lead: false,
                kind: ElementKind::Credits,
                word_group: None,
                line_group: GroupId::CREDITS,
                font: font.clone(),
            });
            self.lines.push(LayoutLine {
                elements: index..index + 1,
                x,
                y: self.current_y,
                width,
                height,
                start: at,
                end: at,
                align: Align::Center,
                is_interlude: false,
                line_group: GroupId::CREDITS,
                group_index: 0,
                bounding_box: Rect::new(x, self.current_y, width, height),
            });
            self.current_y += height;
        }
    }

    fn finish(self) -> Layout {
        let mut lines = self.lines;
        let mut groups: Vec<GroupSpan> = Vec::new();
        let mut boxes = BTreeMap::new();

        let mut i = 0;
        while i < lines.len() {
            let id = lines[i].line_group;
            let mut j = i;
            while j < lines.len() && lines[j].line_group == id {
                lines[j].group_index = groups.len();
                j += 1;
            }
            let span_lines = &lines[i..j];
            let top = span_lines.iter().map(|l| l.y).fold(f64::INFINITY, f64::min);
            let bottom = span_lines
                .iter()
                .map(LayoutLine::bottom)
                .fold(f64::NEG_INFINITY, f64::max);
            let window = span_lines
                .iter()
                .map(LayoutLine::window)
                .reduce(|a, b| a.union(&b))
                .unwrap_or_else(|| TimeWindow::new(0.0, 0.0));
            let is_interlude = span_lines.iter().all(|l| l.is_interlude);
            let text_end = span_lines
                .iter()
                .filter(|l| !l.is_interlude)
                .map(|l| l.end)
                .reduce(f64::max);

            let span = GroupSpan {
                id,
                lines: i..j,
                top,
                bottom,
                window,
                text_end: if id.is_credits() { None } else { text_end },
                is_interlude,
            };
            if span.is_animated() {
                boxes.insert(
                    id,
                    Rect::new(self.padding.horizontal, top, self.available_width, bottom - top),
                );
            }
            groups.push(span);
            i = j;
        }

        let max_scroll_offset = lines
            .last()
            .map(|l| (l.y + self.padding.bottom - self.viewport.height).max(0.0))
            .unwrap_or(0.0);
        let max_line_height = lines.iter().map(|l| l.height).fold(0.0, f64::max);

        Layout {
            viewport: self.viewport,
            padding: self.padding,
            fonts: self.fonts,
            elements: self.elements,
            lines,
            groups,
            group_bounding_boxes: boxes,
            max_scroll_offset,
            max_line_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyrica_ir::{BlockBuilder, DocumentBuilder};

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn layout_of(doc: &LyricDocument) -> Layout {
        compute_layout(doc, &LyricaConfig::default(), viewport(), &HeuristicMeasurer::default())
    }

    #[test]
    fn test_font_sizes_clamp() {
        let cfg = LyricaConfig::default();
        let narrow = FontSizes::for_viewport(Viewport::new(100.0, 600.0), &cfg);
        assert!((narrow.lead - 1.85 * 16.0).abs() < 1e-9);
        let wide = FontSizes::for_viewport(Viewport::new(2000.0, 600.0), &cfg);
        assert!((wide.lead - 3.5 * 16.0).abs() < 1e-9);
        let mid = FontSizes::for_viewport(Viewport::new(600.0, 600.0), &cfg);
        assert!((mid.lead - 42.0).abs() < 1e-9);
        assert!((mid.background - 28.0).abs() < 1e-9);
        assert!((mid.credits - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_document_and_viewport() {
        assert!(layout_of(&LyricDocument::default()).is_empty());
        let doc = DocumentBuilder::new().line(0.0, 0.5, &["a"]).build();
        let layout = compute_layout(
            &doc,
            &LyricaConfig::default(),
            Viewport::new(0.0, 600.0),
            &HeuristicMeasurer::default(),
        );
        assert!(layout.is_empty());
        assert_eq!(layout.max_scroll_offset, 0.0);
    }

    #[test]
    fn test_syllables_join_into_word() {
        let block = BlockBuilder::new()
            .syllable(Syllable::new("Hel", 0.0, 0.3).joined())
            .syllable(Syllable::new("lo", 0.3, 0.6))
            .build();
        let doc = DocumentBuilder::new().block(block).build();
        let layout = layout_of(&doc);
        let text: Vec<_> = layout.lines.iter().filter(|l| !l.is_interlude).collect();
        assert_eq!(text.len(), 1);
        let els = layout.line_elements(text[0]);
        assert_eq!(els.len(), 2);
        assert_eq!(els[0].word_group, els[1].word_group);
        assert_eq!(els[1].x, els[0].width);
        assert_eq!(text[0].start, 0.0);
        assert!((text[0].end - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_unterminated_syllables_form_a_word() {
        let block = BlockBuilder::new()
            .syllable(Syllable::new("a", 0.0, 0.1))
            .syllable(Syllable::new("b", 0.1, 0.2).joined())
            .syllable(Syllable::new("c", 0.2, 0.3).joined())
            .build();
        let layout = layout_of(&DocumentBuilder::new().block(block).build());
        let ids: Vec<_> = layout.elements.iter().map(|e| e.word_group).collect();
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);
    }

    #[test]
    fn test_long_syllable_splits_into_letters() {
        let block = BlockBuilder::new()
            .syllable(Syllable::new("ooh", 0.0, 3.0))
            .syllable(Syllable::new("x", 3.0, 5.0))
            .build();
        let layout = layout_of(&DocumentBuilder::new().block(block).build());
        let letters: Vec<_> = layout
            .elements
            .iter()
            .filter(|e| e.kind == ElementKind::Letter)
            .collect();
        assert_eq!(letters.len(), 3);
        assert!((letters[1].start - 1000.0).abs() < 1e-9);
        assert!((letters[1].end - 2000.0).abs() < 1e-9);
        assert_eq!(letters[0].amplitude_cap, 2.0);
        // A single character is never split.
        let x = layout.elements.iter().find(|e| e.text == "x").unwrap();
        assert_eq!(x.kind, ElementKind::Syllable);
    }

    #[test]
    fn test_split_threshold_is_exclusive() {
        let block = BlockBuilder::new()
            .syllable(Syllable::new("ab", 0.0, 1.0))
            .build();
        let layout = layout_of(&DocumentBuilder::new().block(block).build());
        assert_eq!(layout.elements.len(), 1);
        assert_eq!(layout.elements[0].kind, ElementKind::Syllable);
    }

    #[test]
    fn test_wrapping_never_overflows() {
        let doc = DocumentBuilder::new()
            .line(0.0, 0.2, &["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"])
            .line(2.0, 0.5, &["Supercalifragilisticexpialidocious"])
            .build();
        let vp = Viewport::new(320.0, 600.0);
        let layout = compute_layout(&doc, &LyricaConfig::default(), vp, &HeuristicMeasurer::default());
        let available = vp.width - 2.0 * layout.padding.horizontal;
        assert!(layout.lines.len() > 2);
        for line in &layout.lines {
            assert!(line.width <= available + 1e-9, "line overflows: {}", line.width);
            for e in layout.line_elements(line) {
                assert!(e.x + e.width <= line.width + 1e-9);
            }
        }
        let letters = layout
            .elements
            .iter()
            .filter(|e| e.kind == ElementKind::Letter)
            .count();
        assert_eq!(letters, "Supercalifragilisticexpialidocious".len());
    }

    #[test]
    fn test_letter_wider_than_viewport_is_clamped() {
        let doc = DocumentBuilder::new().line(0.0, 0.5, &["wide", "word"]).build();
        let vp = Viewport::new(10.0, 600.0);
        let layout = compute_layout(&doc, &LyricaConfig::default(), vp, &HeuristicMeasurer::default());
        let available = vp.width - 2.0 * layout.padding.horizontal;
        assert!(layout.fonts.lead > available);
        assert_eq!(layout.elements.len(), 8);
        for line in &layout.lines {
            assert!(line.width <= available + 1e-9, "line overflows: {}", line.width);
            for e in layout.line_elements(line) {
                assert_eq!(e.kind, ElementKind::Letter);
                assert!(e.width > 0.0 && e.width <= available + 1e-9);
            }
        }
    }

    #[test]
    fn test_element_times_ordered_within_words_and_lines() {
        let wrapped = BlockBuilder::new()
            .syllable(Syllable::new("Super", 3.0, 3.4).joined())
            .syllable(Syllable::new("califragilistic", 3.4, 5.5).joined())
            .syllable(Syllable::new("expialidocious", 5.5, 6.0))
            .background(vec![
                Syllable::new("(su", 3.2, 3.5).joined(),
                Syllable::new("per)", 3.5, 3.9),
                Syllable::new("yeah", 4.0, 6.5),
            ])
            .build();
        let doc = DocumentBuilder::new()
            .line(0.0, 0.2, &["the", "quick", "brown", "fox", "jumps", "over"])
            .block(wrapped)
            .line(10.0, 0.4, &["after", "a", "long", "pause"])
            .songwriter("A. Writer")
            .build();
        let layout = compute_layout(
            &doc,
            &LyricaConfig::default(),
            Viewport::new(400.0, 600.0),
            &HeuristicMeasurer::default(),
        );

        for kind in [ElementKind::Syllable, ElementKind::Letter, ElementKind::Dot, ElementKind::Credits] {
            assert!(
                layout.elements.iter().any(|e| e.kind == kind),
                "no {kind:?} element laid out"
            );
        }
        assert!(layout.elements.iter().any(|e| !e.is_lead));

        for e in &layout.elements {
            assert!(e.start <= e.end, "{:?} has start after end", e.text);
        }
        for line in &layout.lines {
            for pair in layout.line_elements(line).windows(2) {
                assert!(pair[0].start <= pair[1].start, "line starts go backwards");
            }
        }
        let mut by_word: BTreeMap<u32, Vec<&LayoutElement>> = BTreeMap::new();
        for e in &layout.elements {
            if let Some(word) = e.word_group {
                by_word.entry(word).or_default().push(e);
            }
        }
        for (word, elements) in by_word {
            for pair in elements.windows(2) {
                assert!(pair[0].start <= pair[1].start, "word {word} starts go backwards");
            }
        }
    }

    #[test]
    fn test_missing_timestamp_block_skipped() {
        let doc = LyricDocument::from_json(
            r#"{"Content": [
                {"Lead": {"Syllables": [{"Text": "good", "StartTime": 0.0, "EndTime": 0.5}]}},
                {"Lead": {"Syllables": [{"Text": "bad", "StartTime": 1.0}]}},
                {"Lead": {"Syllables": [{"Text": "later", "StartTime": 1.5, "EndTime": 2.0}]}}
            ]}"#,
        )
        .unwrap();
        let layout = layout_of(&doc);
        let texts: Vec<_> = layout.elements.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["good", "later"]);
        assert!(layout.elements.iter().all(|e| e.end.is_finite()));
    }

    #[test]
    fn test_group_span_lookup_by_id() {
        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["a"])
            .line(5.0, 0.5, &["b"])
            .songwriter("Someone")
            .build();
        let layout = layout_of(&doc);
        assert!(layout.groups.len() >= 4);
        for span in &layout.groups {
            assert_eq!(layout.group_span(span.id), Some(span));
        }
        assert!(layout.group_span(GroupId(99)).is_none());
        assert!(Layout::empty(viewport(), &LyricaConfig::default())
            .group_span(GroupId::CREDITS)
            .is_none());
    }

    #[test]
    fn test_interlude_inserted_only_above_threshold() {
        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["a"])
            .line(2.5, 0.5, &["b"])
            .line(5.0, 0.5, &["c"])
            .build();
        let layout = layout_of(&doc);
        // 0.5 -> 2.5 is exactly 2000 ms, 3.0 -> 5.0 is 2000 ms.
        assert!(layout.lines.iter().all(|l| !l.is_interlude));

        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["a"])
            .line(2.501, 0.5, &["b"])
            .build();
        let layout = layout_of(&doc);
        assert_eq!(layout.lines.iter().filter(|l| l.is_interlude).count(), 1);
    }

    #[test]
    fn test_lead_in_interlude() {
        let doc = DocumentBuilder::new().line(5.0, 0.5, &["late"]).build();
        let layout = layout_of(&doc);
        assert!(layout.lines[0].is_interlude);
        assert_eq!(layout.lines[0].start, 0.0);

        let mut cfg = LyricaConfig::default();
        cfg.layout.lead_in_interlude = false;
        let layout = compute_layout(&doc, &cfg, viewport(), &HeuristicMeasurer::default());
        assert!(!layout.lines[0].is_interlude);
    }

    #[test]
    fn test_interlude_aligned_to_next_block() {
        let next = BlockBuilder::new()
            .words(13.0, 0.5, &["b"])
            .opposite_aligned()
            .build();
        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["a"])
            .block(next)
            .build();
        let layout = layout_of(&doc);
        let interlude = layout.lines.iter().find(|l| l.is_interlude).unwrap();
        assert_eq!(interlude.align, Align::Right);
        let expected_x = 800.0 - interlude.width - layout.padding.horizontal;
        assert!((interlude.x - expected_x).abs() < 1e-9);
        let last = layout.lines.last().unwrap();
        assert_eq!(last.align, Align::Right);
        assert!((last.x + last.width - (800.0 - layout.padding.horizontal)).abs() < 1e-9);
    }

    #[test]
    fn test_groups_and_boxes() {
        let block = BlockBuilder::new()
            .words(0.0, 0.5, &["lead"])
            .background(vec![Syllable::new("bg", 0.2, 0.8)])
            .build();
        let doc = DocumentBuilder::new()
            .block(block)
            .line(5.0, 0.5, &["next"])
            .songwriter("Someone")
            .build();
        let layout = layout_of(&doc);

        let first = &layout.groups[0];
        assert_eq!(first.lines.len(), 2);
        assert!(!layout.lines[1].elements.is_empty());
        assert!(!layout.elements[layout.lines[1].elements.start].is_lead);

        // lead+bg group, interlude, next, credits
        assert_eq!(layout.groups.len(), 4);
        assert!(layout.groups[1].is_interlude);
        assert_eq!(layout.groups.last().unwrap().id, GroupId::CREDITS);
        assert_eq!(layout.group_bounding_boxes.len(), 2);

        let bx = layout.group_bounding_boxes[&first.id];
        assert_eq!(bx.x, layout.padding.horizontal);
        assert_eq!(bx.width, 800.0 - 2.0 * layout.padding.horizontal);
        assert_eq!(bx.y, first.top);
        assert_eq!(bx.bottom(), first.bottom);

        let ids: std::collections::HashSet<_> =
            layout.elements.iter().filter_map(|e| e.word_group).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_credits_line() {
        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["a"])
            .songwriter("A. Writer")
            .songwriter("B. Writer")
            .build();
        let layout = layout_of(&doc);
        let credits = layout.lines.last().unwrap();
        assert_eq!(credits.line_group, GroupId::CREDITS);
        assert_eq!(credits.align, Align::Center);
        assert_eq!(layout.line_elements(credits)[0].text, "Credits: A. Writer, B. Writer");
        assert!((credits.x - (800.0 - credits.width) / 2.0).abs() < 1e-9);

        let mut cfg = LyricaConfig::default();
        cfg.layout.show_credits = false;
        let layout = compute_layout(&doc, &cfg, viewport(), &HeuristicMeasurer::default());
        assert!(layout.lines.iter().all(|l| !l.line_group.is_credits()));
    }

    #[test]
    fn test_line_y_strictly_increasing() {
        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["one", "two"])
            .line(1.0, 0.5, &["three"])
            .line(10.0, 0.5, &["four"])
            .songwriter("x")
            .build();
        let layout = layout_of(&doc);
        for pair in layout.lines.windows(2) {
            assert!(pair[1].y > pair[0].y);
        }
        assert_eq!(layout.lines[0].y, 600.0 * 0.25);
    }

    #[test]
    fn test_max_scroll_offset() {
        let words: Vec<String> = (0..40).map(|i| format!("w{i}")).collect();
        let mut b = DocumentBuilder::new();
        for (i, w) in words.iter().enumerate() {
            b = b.line(i as f64, 0.5, &[w.as_str()]);
        }
        let layout = layout_of(&b.build());
        let last = layout.lines.last().unwrap();
        let expected = last.y + 600.0 * 0.45 - 600.0;
        assert!((layout.max_scroll_offset - expected).abs() < 1e-9);

        let short = layout_of(&DocumentBuilder::new().line(0.0, 0.5, &["a"]).build());
        assert_eq!(short.max_scroll_offset, 0.0);
    }

    #[test]
    fn test_malformed_block_skipped() {
        let bad = BlockBuilder::new()
            .syllable(Syllable::new("bad", 2.0, 1.0))
            .build();
        let doc = DocumentBuilder::new()
            .line(0.0, 0.5, &["good"])
            .block(bad)
            .line(1.0, 0.5, &["fine"])
            .build();
        let layout = layout_of(&doc);
        assert_eq!(layout.groups.len(), 2);
        assert!(layout.elements.iter().all(|e| e.text != "bad"));
    }

    #[test]
    fn test_force_romanized() {
        let block = BlockBuilder::new()
            .syllable(Syllable::new("愛", 0.0, 0.5).with_romanized("ai"))
            .build();
        let doc = DocumentBuilder::new().block(block).build();
        let mut cfg = LyricaConfig::default();
        cfg.lyrics.force_romanized = true;
        let layout = compute_layout(&doc, &cfg, viewport(), &HeuristicMeasurer::default());
        assert_eq!(layout.elements[0].text, "ai");
        assert_eq!(layout_of(&doc).elements[0].text, "愛");
    }

    #[test]
    fn test_visible_lines() {
        let mut b = DocumentBuilder::new();
        for i in 0..60 {
            b = b.line(i as f64, 0.5, &["word"]);
        }
        let layout = layout_of(&b.build());
        let all = layout.visible_lines(0.0);
        assert_eq!(all.start, 0);
        assert!(all.end < layout.lines.len());
        for i in all.clone() {
            assert!(layout.lines[i].y <= 600.0);
        }

        let scrolled = layout.visible_lines(1000.0);
        assert!(scrolled.start > 0);
        assert!(layout.lines[scrolled.start].bottom() + layout.max_line_height >= 1000.0);
        let elements = layout.elements_for_lines(&scrolled);
        assert_eq!(elements.start, layout.lines[scrolled.start].elements.start);
    }
}
