//! # lyrica-render
//!
//! The Lyrica view engine. Lays out a validated lyric document once per
//! structural change, then derives animation, scroll and hover state every
//! frame and paints it onto a draw surface. Single-threaded and CPU-only.

pub mod engine;
pub mod layout;
pub mod renderer;
pub mod scheduler;
pub mod scroll;
pub mod surface;
pub mod text;
pub mod timeline;

pub use engine::LyricsEngine;
pub use hit_test::{HoverCard, SeekRequest};
pub use layout::{compute_layout, GroupId, Layout, LayoutElement, LayoutLine};
pub use renderer::{render_frame, FrameScene};
pub use scheduler::{ManualScheduler, TickHandle, TickScheduler};
pub use scroll::ScrollController;
pub use surface::{DrawCommand, DrawSurface, RasterSurface, RecordingSurface, TextPaint};
pub use text::{FontSpec, FontdueMeasurer, HeuristicMeasurer, TextMeasure};
pub use timeline::{ElementStatus, Timeline, VisualState};
