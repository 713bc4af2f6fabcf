use crate::document::{ContentBlock, LyricDocument};
use lyrica_core::{LyricaError, LyricaResult};

/// Validate a single content block for timing consistency.
///
/// A block is rejected when it has no syllables at all, when any syllable
/// carries a missing, non-finite or reversed time window, or when syllable starts go
/// backwards within one vocal part.
pub fn validate_block(index: usize, block: &ContentBlock) -> LyricaResult<()> {
    if block.syllables().next().is_none() {
        return Err(LyricaError::data(index, "block has no syllables"));
    }

    for (part_idx, part) in block.parts().enumerate() {
        let mut prev_start = f64::NEG_INFINITY;
        for (syl_idx, s) in part.syllables.iter().enumerate() {
            if s.start_time.is_nan() || s.end_time.is_nan() {
                return Err(LyricaError::data(
                    index,
                    format!("part {part_idx} syllable {syl_idx} is missing a timestamp"),
                ));
            }
            if !s.start_time.is_finite() || !s.end_time.is_finite() {
                return Err(LyricaError::data(
                    index,
                    format!("part {part_idx} syllable {syl_idx} has a non-finite timestamp"),
                ));
            }
            if s.end_time < s.start_time {
                return Err(LyricaError::data(
                    index,
                    format!(
                        "part {part_idx} syllable {syl_idx} ends ({}) before it starts ({})",
                        s.end_time, s.start_time
                    ),
                ));
            }
            if s.start_time < prev_start {
                return Err(LyricaError::data(
                    index,
                    format!("part {part_idx} syllable {syl_idx} starts before its predecessor"),
                ));
            }
            prev_start = s.start_time;
        }
    }

    Ok(())
}

/// Validate every block of a document, collecting all problems.
pub fn validate_document(document: &LyricDocument) -> Result<(), Vec<LyricaError>> {
    let errors: Vec<LyricaError> = document
        .content
        .iter()
        .enumerate()
        .filter_map(|(i, block)| validate_block(i, block).err())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
