use std::path::Path;

use lyrica_core::{LyricaResult, TimeWindow};
use serde::{Deserialize, Serialize};

/// The smallest timed unit of text. Times are in seconds from track start.
///
/// Field names follow the provider's wire format (`Text`, `StartTime`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Syllable {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romanized_text: Option<String>,
    /// `true` when the next syllable continues the same word.
    #[serde(default)]
    pub is_part_of_word: bool,
    /// NaN when absent from the source; validation rejects the block.
    #[serde(default = "missing_time", skip_serializing_if = "is_missing")]
    pub start_time: f64,
    #[serde(default = "missing_time", skip_serializing_if = "is_missing")]
    pub end_time: f64,
}

fn missing_time() -> f64 {
    f64::NAN
}

fn is_missing(t: &f64) -> bool {
    t.is_nan()
}

impl Syllable {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            romanized_text: None,
            is_part_of_word: false,
            start_time,
            end_time,
        }
    }

    /// Mark this syllable as continuing into the next one.
    pub fn joined(mut self) -> Self {
        self.is_part_of_word = true;
        self
    }

    pub fn with_romanized(mut self, romanized: impl Into<String>) -> Self {
        self.romanized_text = Some(romanized.into());
        self
    }

    /// The text to display: the romanized variant when preferred and present.
    pub fn display_text(&self, prefer_romanized: bool) -> &str {
        match &self.romanized_text {
            Some(r) if prefer_romanized && !r.is_empty() => r,
            _ => &self.text,
        }
    }

    /// Time window in milliseconds.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_seconds(self.start_time, self.end_time)
    }
}

/// One voice's ordered syllables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VocalPart {
    #[serde(default)]
    pub syllables: Vec<Syllable>,
}

impl VocalPart {
    pub fn new(syllables: Vec<Syllable>) -> Self {
        Self { syllables }
    }

    pub fn is_empty(&self) -> bool {
        self.syllables.is_empty()
    }

    /// Start of the first syllable, in seconds.
    pub fn start(&self) -> Option<f64> {
        self.syllables.first().map(|s| s.start_time)
    }

    /// End of the last syllable, in seconds.
    pub fn end(&self) -> Option<f64> {
        self.syllables.last().map(|s| s.end_time)
    }
}

/// A lead part plus optional background parts sung concurrently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentBlock {
    #[serde(default)]
    pub lead: VocalPart,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background: Vec<VocalPart>,
    #[serde(default)]
    pub opposite_aligned: bool,
}

impl ContentBlock {
    /// Lead first, then background parts in order.
    pub fn parts(&self) -> impl Iterator<Item = &VocalPart> {
        std::iter::once(&self.lead).chain(self.background.iter())
    }

    /// All syllables of all parts.
    pub fn syllables(&self) -> impl Iterator<Item = &Syllable> {
        self.parts().flat_map(|p| p.syllables.iter())
    }

    /// Union of every syllable window, in milliseconds. `None` for an empty block.
    pub fn window(&self) -> Option<TimeWindow> {
        self.syllables()
            .map(Syllable::window)
            .reduce(|acc, w| acc.union(&w))
    }
}

/// A complete synchronized-lyrics document for one track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LyricDocument {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, rename = "SongWriters", skip_serializing_if = "Vec::is_empty")]
    pub songwriters: Vec<String>,
    #[serde(default)]
    pub start_time: f64,
}

impl LyricDocument {
    pub fn from_json(json: &str) -> LyricaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> LyricaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from_file(path: &Path) -> LyricaResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let doc = Self::from_json(&contents)?;
        tracing::debug!(
            "loaded {} content blocks from {}",
            doc.content.len(),
            path.display()
        );
        Ok(doc)
    }

    pub fn is_empty(&self) -> bool {
        self.content.iter().all(|b| b.syllables().next().is_none())
    }

    /// End of the last sung syllable, in milliseconds.
    pub fn end_millis(&self) -> f64 {
        self.content
            .iter()
            .filter_map(ContentBlock::window)
            .map(|w| w.end)
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDER_JSON: &str = r#"{
        "Type": "Syllable",
        "id": "abc",
        "StartTime": 0.5,
        "EndTime": 4.0,
        "SongWriters": ["A. Writer", "B. Writer"],
        "Content": [
            {
                "Type": "Vocal",
                "OppositeAligned": false,
                "Lead": {
                    "StartTime": 0.5,
                    "EndTime": 1.1,
                    "Syllables": [
                        {"Text": "Hel", "RomanizedText": "", "IsPartOfWord": true, "StartTime": 0.5, "EndTime": 0.8},
                        {"Text": "lo", "IsPartOfWord": false, "StartTime": 0.8, "EndTime": 1.1}
                    ]
                },
                "Background": [
                    {"Syllables": [{"Text": "(oh)", "IsPartOfWord": false, "StartTime": 1.0, "EndTime": 4.0}]}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_provider_format() {
        let doc = LyricDocument::from_json(PROVIDER_JSON).unwrap();
        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.songwriters, vec!["A. Writer", "B. Writer"]);
        let block = &doc.content[0];
        assert_eq!(block.lead.syllables.len(), 2);
        assert!(block.lead.syllables[0].is_part_of_word);
        assert_eq!(block.background.len(), 1);
    }

    #[test]
    fn test_block_window_spans_all_parts() {
        let doc = LyricDocument::from_json(PROVIDER_JSON).unwrap();
        let w = doc.content[0].window().unwrap();
        assert!((w.start - 500.0).abs() < 1e-9);
        assert!((w.end - 4000.0).abs() < 1e-9);
        assert!((doc.end_millis() - 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_text_prefers_non_empty_romanization() {
        let s = Syllable::new("愛", 0.0, 1.0).with_romanized("ai");
        assert_eq!(s.display_text(true), "ai");
        assert_eq!(s.display_text(false), "愛");
        let empty = Syllable::new("x", 0.0, 1.0).with_romanized("");
        assert_eq!(empty.display_text(true), "x");
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = LyricDocument::from_json("{\"Content\": 5}").unwrap_err();
        assert!(matches!(err, lyrica_core::LyricaError::Serialization(_)));
    }

    #[test]
    fn test_missing_timestamp_keeps_document() {
        let json = r#"{"Content": [
            {"Lead": {"Syllables": [{"Text": "good", "StartTime": 0.0, "EndTime": 0.5}]}},
            {"Lead": {"Syllables": [{"Text": "bad", "StartTime": 1.0}]}}
        ]}"#;
        let doc = LyricDocument::from_json(json).unwrap();
        assert_eq!(doc.content.len(), 2);
        let bad = &doc.content[1].lead.syllables[0];
        assert_eq!(bad.start_time, 1.0);
        assert!(bad.end_time.is_nan());

        let round_trip = LyricDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert!(round_trip.content[1].lead.syllables[0].end_time.is_nan());
    }

    #[test]
    fn test_empty_document() {
        assert!(LyricDocument::default().is_empty());
        assert_eq!(LyricDocument::default().end_millis(), 0.0);
    }
}
