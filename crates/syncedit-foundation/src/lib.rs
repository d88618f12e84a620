//! Foundation Layer - shared types for the syncedit workspace
//!
//! This crate provides the building blocks every other crate depends on:
//! - Error handling (`SyncEditError`, `SyncEditResult`)
//! - Spans and edit operations over byte offsets, plus the `TextBuffer`
//!   mutation capability and an in-memory `Document`
//! - Host capability traits (`RoleProvider`, `MarkerSink`) and the values
//!   passed through them

pub mod capabilities;
pub mod error;
pub mod text;

// Re-export commonly used types for convenience
pub use capabilities::{
    ActiveMarker, GroupId, GroupMarker, MarkerSink, Notice, NullSink, RecordingSink, Rgb,
    RoleProvider, StyleRun, StyleRuns,
};
pub use error::*;
pub use text::{Bias, Document, EditOperation, Span, TextBuffer};
