//! # lyrica-core
//!
//! Core types and primitives for the Lyrica synchronized-lyrics engine.
//! This crate contains foundational types shared across all Lyrica crates:
//! playback time, geometry, colors, the raster frame buffer, content hashing,
//! configuration and error types.

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod math;
pub mod time;

pub use config::*;

pub use color::Color;
pub use error::{LyricaError, LyricaResult};
pub use frame::FrameBuffer;
pub use math::{Point2D, Rect, Size2D, Viewport};
pub use time::{Millis, TimeWindow};
