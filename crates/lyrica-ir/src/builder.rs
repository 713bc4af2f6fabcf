use crate::document::{ContentBlock, LyricDocument, Syllable, VocalPart};

/// A builder for constructing a lyric document programmatically.
/// Useful for tests, fixtures and synthetic documents.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: LyricDocument,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a content block.
    pub fn block(mut self, block: ContentBlock) -> Self {
        self.document.content.push(block);
        self
    }

    /// Append a block whose lead part sings `words` back to back, each word
    /// lasting `word_secs`, starting at `start`.
    pub fn line(self, start: f64, word_secs: f64, words: &[&str]) -> Self {
        self.block(BlockBuilder::new().words(start, word_secs, words).build())
    }

    pub fn songwriter(mut self, name: impl Into<String>) -> Self {
        self.document.songwriters.push(name.into());
        self
    }

    pub fn build(mut self) -> LyricDocument {
        if let Some(start) = self
            .document
            .content
            .iter()
            .filter_map(|b| b.lead.start())
            .reduce(f64::min)
        {
            self.document.start_time = start;
        }
        self.document
    }
}

/// A builder for one content block.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    block: ContentBlock,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a syllable to the lead part.
    pub fn syllable(mut self, syllable: Syllable) -> Self {
        self.block.lead.syllables.push(syllable);
        self
    }

    /// Append whole words to the lead, one syllable each, back to back.
    pub fn words(mut self, start: f64, word_secs: f64, words: &[&str]) -> Self {
        let mut t = start;
        for w in words {
            self.block
                .lead
                .syllables
                .push(Syllable::new(*w, t, t + word_secs));
            t += word_secs;
        }
        self
    }

    /// Add a background part.
    pub fn background(mut self, syllables: Vec<Syllable>) -> Self {
        self.block.background.push(VocalPart::new(syllables));
        self
    }

    pub fn opposite_aligned(mut self) -> Self {
        self.block.opposite_aligned = true;
        self
    }

    pub fn build(self) -> ContentBlock {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_builder_timing() {
        let doc = DocumentBuilder::new()
            .line(1.0, 0.5, &["one", "two", "three"])
            .build();
        let lead = &doc.content[0].lead;
        assert_eq!(lead.syllables.len(), 3);
        assert_eq!(lead.start(), Some(1.0));
        assert_eq!(lead.end(), Some(2.5));
        assert_eq!(doc.start_time, 1.0);
    }

    #[test]
    fn test_block_builder_parts() {
        let block = BlockBuilder::new()
            .syllable(Syllable::new("Hel", 0.0, 0.3).joined())
            .syllable(Syllable::new("lo", 0.3, 0.6))
            .background(vec![Syllable::new("hey", 0.2, 0.5)])
            .opposite_aligned()
            .build();
        assert!(block.opposite_aligned);
        assert_eq!(block.parts().count(), 2);
        assert!(block.lead.syllables[0].is_part_of_word);
    }
}
