//! Capability traits supplied by the host editor
//!
//! The engine never depends on the host's syntax engine or renderer directly.
//! It only asks two narrow questions of the host:
//!
//! - **Role lookup** ([`RoleProvider`]): what structural role label (e.g.
//!   `"Id"`, `"Comment"`, `"Keyword"`) does the character at an offset have?
//! - **Marker rendering** ([`MarkerSink`]): show these groups, spans, carets
//!   and status notices.

use crate::text::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Role Lookup Capability
// ============================================================================

/// Per-character structural role lookup, answered by the host's lexer.
pub trait RoleProvider {
    /// `false` while the host has not finished analyzing the document.
    fn is_ready(&self) -> bool {
        true
    }

    /// Role label of the character starting at byte `offset`, or `None` when
    /// the host assigns no role (plain text).
    fn role_of(&self, offset: usize) -> Option<&str>;
}

/// A labelled byte range produced by a host lexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRun {
    pub span: Span,
    pub label: String,
}

/// Role provider backed by a sorted list of non-overlapping style runs.
#[derive(Debug, Clone)]
pub struct StyleRuns {
    runs: Vec<StyleRun>,
    ready: bool,
}

impl Default for StyleRuns {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleRuns {
    pub fn new() -> Self {
        Self {
            runs: Vec::new(),
            ready: true,
        }
    }

    pub fn from_runs(mut runs: Vec<StyleRun>) -> Self {
        runs.sort_by_key(|run| run.span.start);
        Self { runs, ready: true }
    }

    /// Builder-style helper for tests and scripted hosts.
    pub fn with_run(mut self, start: usize, end: usize, label: impl Into<String>) -> Self {
        self.push(Span::new(start, end), label);
        self
    }

    pub fn push(&mut self, span: Span, label: impl Into<String>) {
        let label = label.into();
        let at = self.runs.partition_point(|run| run.span.start < span.start);
        self.runs.insert(at, StyleRun { span, label });
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn runs(&self) -> &[StyleRun] {
        &self.runs
    }
}

impl RoleProvider for StyleRuns {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn role_of(&self, offset: usize) -> Option<&str> {
        let idx = self.runs.partition_point(|run| run.span.end <= offset);
        self.runs
            .get(idx)
            .filter(|run| run.span.start <= offset && offset < run.span.end)
            .map(|run| run.label.as_str())
    }
}

// ============================================================================
// Marker Rendering Capability
// ============================================================================

/// Stable identifier of an occurrence group within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Background color handed to the marker renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Light pastel color for the `index`-th group.
    ///
    /// Hues are spread by the golden angle so neighbouring groups stay
    /// distinguishable; the result is deterministic for a given index.
    pub fn light_for(index: usize) -> Self {
        let hue = (index as f64 * 137.508) % 360.0;
        hsl_to_rgb(hue, 0.65, 0.82)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb(channel(r), channel(g), channel(b))
}

/// Passive highlight of one group while no group is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMarker {
    pub group: GroupId,
    pub text: String,
    pub color: Option<Rgb>,
    pub spans: Vec<Span>,
    /// Only groups with two or more members can be activated.
    pub editable: bool,
}

/// Bordered highlight and carets of the group being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMarker {
    pub group: GroupId,
    pub spans: Vec<Span>,
    pub carets: Vec<usize>,
}

/// Status line messages surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// Session started; `editable` groups can be clicked.
    Activated { groups: usize, editable: usize },
    MakeSelectionFirst,
    NoEditableIdentifiers,
    /// Structural mode found no labelled characters in the selection.
    NoSyntaxTokens,
    StillParsing,
    NotAWord,
    InvalidConfig { key: String },
    Deactivated,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Activated { .. } => write!(
                f,
                "Sync Editing: Click an ID to edit, click gutter icon or press Esc to exit."
            ),
            Notice::MakeSelectionFirst => write!(f, "Sync Editing: Make selection first"),
            Notice::NoEditableIdentifiers => {
                write!(f, "Sync Editing: No editable identifiers found in selection")
            }
            Notice::NoSyntaxTokens => {
                write!(f, "Sync Editing: No syntax tokens found in selection")
            }
            Notice::StillParsing => {
                write!(f, "Sync Editing: Document is still being parsed, try again")
            }
            Notice::NotAWord => write!(f, "Sync Editing: Not a word! Click on ID to edit it."),
            Notice::InvalidConfig { key } => {
                write!(f, "Sync Editing: Invalid {} config - using fallback", key)
            }
            Notice::Deactivated => write!(f, "Sync Editing: Deactivated"),
        }
    }
}

/// Renderer for group highlights, carets and notices.
pub trait MarkerSink {
    /// Remove every marker owned by the engine.
    fn clear(&mut self);

    /// Show passive group highlights (Selected state).
    fn show_groups(&mut self, markers: &[GroupMarker]);

    /// Show the active group with its carets (Editing state).
    fn show_active(&mut self, marker: &ActiveMarker);

    fn notify(&mut self, notice: Notice);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MarkerSink for NullSink {
    fn clear(&mut self) {}
    fn show_groups(&mut self, _markers: &[GroupMarker]) {}
    fn show_active(&mut self, _marker: &ActiveMarker) {}
    fn notify(&mut self, _notice: Notice) {}
}

/// Sink that keeps the latest rendered state, for tests and headless hosts.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RecordingSink {
    pub groups: Vec<GroupMarker>,
    pub active: Option<ActiveMarker>,
    pub notices: Vec<Notice>,
    pub clears: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }
}

impl MarkerSink for RecordingSink {
    fn clear(&mut self) {
        self.groups.clear();
        self.active = None;
        self.clears += 1;
    }

    fn show_groups(&mut self, markers: &[GroupMarker]) {
        self.groups = markers.to_vec();
    }

    fn show_active(&mut self, marker: &ActiveMarker) {
        self.active = Some(marker.clone());
    }

    fn notify(&mut self, notice: Notice) {
        tracing::debug!(%notice, "Notice");
        self.notices.push(notice);
    }
}
