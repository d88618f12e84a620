//! Sync-edit engine: rename every occurrence of an identifier inside a
//! selected block by editing just one of them.
//!
//! Pipeline, leaves first:
//!
//! 1. [`scanner`] finds identifier occurrences in the block, either from the
//!    host's role labels or with the identifier pattern alone
//! 2. [`grouper`] partitions them by (optionally case-folded) text
//! 3. [`session`] runs the per-document state machine over those groups
//! 4. [`sync`] mirrors caret-level edits to every member of the active group
//!
//! [`registry`] keeps one state machine per open document.

pub mod block;
pub mod grouper;
pub mod registry;
pub mod scanner;
pub mod session;
pub mod sync;

pub use block::Block;
pub use grouper::{Group, Groups, Occurrence, OccurrenceId};
pub use registry::SessionRegistry;
pub use scanner::{has_role_labels, scan, RawOccurrence};
pub use session::{
    EventOutcome, HostContext, InputEvent, Key, Session, SessionState, SyncEditor,
};
pub use sync::{Direction, MirrorOp, Movement, Synchronizer};
