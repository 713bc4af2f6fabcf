//! # lyrica-ir
//!
//! The Lyrica document model: timed syllables grouped into vocal parts and
//! content blocks, as delivered by a lyrics provider.
//!
//! Documents are immutable once handed to the engine; a new track replaces
//! the whole document.

pub mod builder;
pub mod document;
pub mod validate;

pub use builder::{BlockBuilder, DocumentBuilder};
pub use document::{ContentBlock, LyricDocument, Syllable, VocalPart};
pub use validate::{validate_block, validate_document};
