//! Channel layer for pattern matching and PTY operations.
//!
//! This module handles the interactive session management,
//! including pattern-based prompt detection and ANSI stripping.

mod ansi;
mod buffer;
pub mod patterns;
mod pty;

pub use ansi::AnsiStripper;
pub use buffer::PatternBuffer;
pub use pty::{PtyChannel, PtyConfig, SessionSink};
