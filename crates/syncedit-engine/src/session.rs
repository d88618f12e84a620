//! Per-document sync-edit state machine.
//!
//! ```text
//!   Idle ──Activate──▶ Selected ──Click──▶ Editing ──Click other group──▶ (Switching) ──▶ Editing
//!    ▲                    │  ▲                │
//!    └──Activate/Esc/─────┘  └──caret leaves──┘
//!       close/invalidate       the group
//! ```
//!
//! Events are handled one at a time to completion. Scanning and grouping run
//! once, when the session starts; later edits only rebase spans.

use crate::block::Block;
use crate::grouper::{Groups, OccurrenceId};
use crate::scanner::{has_role_labels, scan};
use crate::sync::{Direction, MirrorOp, Movement, Synchronizer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use syncedit_config::{DisplayOptions, Policy, SyncEditConfig};
use syncedit_foundation::{
    EditOperation, GroupId, GroupMarker, MarkerSink, Notice, RoleProvider, Rgb, Span,
    SyncEditResult, TextBuffer,
};
use tracing::{debug, info};

/// Keys the engine distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Printable text typed at the caret.
    Text(String),
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Enter,
    Escape,
}

/// Host events routed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    /// The user selected `start..end`; an empty range clears the selection.
    SelectionMade { start: usize, end: usize },
    /// Toggle: start a session over the selection, or exit the running one.
    Activate,
    Click { offset: usize },
    Key { key: Key },
    /// The host moved the caret by other means (Home/End, mouse drag, ...).
    CaretMoved { offset: usize },
    /// The host applied `edit` itself.
    TextChanged { edit: EditOperation },
    DocumentClosed,
    SelectionInvalidated,
}

/// What the host should do with the event after the engine saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Consumed; any document change has been applied by the engine.
    Handled,
    /// Not consumed; the host performs its default behaviour.
    Forwarded,
    /// Consumed and suppressed; the host must not act on it.
    Rejected,
}

/// Observable session state. Switching between groups happens inside a
/// single event and is only visible in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Selected,
    Editing { group: GroupId },
}

/// Host capabilities lent to the engine for one event.
pub struct HostContext<'a> {
    pub buffer: &'a mut dyn TextBuffer,
    pub roles: &'a dyn RoleProvider,
    pub sink: &'a mut dyn MarkerSink,
}

impl<'a> HostContext<'a> {
    pub fn new(
        buffer: &'a mut dyn TextBuffer,
        roles: &'a dyn RoleProvider,
        sink: &'a mut dyn MarkerSink,
    ) -> Self {
        Self {
            buffer,
            roles,
            sink,
        }
    }
}

/// A running sync-edit session over one block.
#[derive(Debug)]
pub struct Session {
    block: Block,
    policy: Policy,
    display: DisplayOptions,
    groups: Groups,
    active: Option<Synchronizer>,
}

impl Session {
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    pub fn active(&self) -> Option<&Synchronizer> {
        self.active.as_ref()
    }

    fn state(&self) -> SessionState {
        match &self.active {
            None => SessionState::Selected,
            Some(sync) => SessionState::Editing { group: sync.group() },
        }
    }

    /// Passive markers for every group, colored by position.
    pub fn group_markers(&self) -> Vec<GroupMarker> {
        self.groups
            .iter()
            .enumerate()
            .map(|(index, group)| GroupMarker {
                group: group.id(),
                text: group.text().to_string(),
                color: self.display.use_colors.then(|| Rgb::light_for(index)),
                spans: self.groups.spans_of(group.id()),
                editable: group.editable(),
            })
            .collect()
    }

    fn render(&self, sink: &mut dyn MarkerSink) {
        sink.clear();
        if self.display.use_colors {
            sink.show_groups(&self.group_markers());
        }
        if let Some(sync) = &self.active {
            sink.show_active(&sync.marker(&self.groups));
        }
    }

    fn begin_editing(&mut self, occurrence: OccurrenceId, offset: usize) -> SyncEditResult<()> {
        self.active = Some(Synchronizer::activate(&self.groups, occurrence, offset)?);
        Ok(())
    }

    /// Store the active group's current text and stop editing it.
    fn commit(&mut self, document: &str) {
        if let Some(sync) = self.active.take() {
            let kept = self.groups.commit(sync.group(), document, &self.policy);
            debug!(group = %sync.group(), kept = %kept, "Committed group");
        }
    }
}

/// Sync-edit state machine for one document.
#[derive(Debug)]
pub struct SyncEditor {
    config: Arc<SyncEditConfig>,
    language: Option<String>,
    selection: Option<Span>,
    session: Option<Session>,
}

impl SyncEditor {
    pub fn new(config: Arc<SyncEditConfig>, language: Option<String>) -> Self {
        Self {
            config,
            language,
            selection: None,
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, Session::state)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn selection(&self) -> Option<Span> {
        self.selection
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Settings used by the next activation. A running session keeps the
    /// policy it started with.
    pub fn set_config(&mut self, config: Arc<SyncEditConfig>) {
        self.config = config;
    }

    pub fn handle(
        &mut self,
        event: InputEvent,
        host: &mut HostContext<'_>,
    ) -> SyncEditResult<EventOutcome> {
        let before = self.state();
        let outcome = match event {
            InputEvent::SelectionMade { start, end } => self.on_selection(start, end),
            InputEvent::Activate => {
                if self.session.is_some() {
                    self.exit(host);
                    EventOutcome::Handled
                } else {
                    self.start(host)?
                }
            }
            InputEvent::Click { offset } => self.on_click(offset, host)?,
            InputEvent::Key { key } => self.on_key(key, host)?,
            InputEvent::CaretMoved { offset } => self.on_caret_moved(offset, host),
            InputEvent::TextChanged { edit } => self.on_text_changed(&edit, host),
            InputEvent::DocumentClosed | InputEvent::SelectionInvalidated => {
                self.selection = None;
                if self.session.is_some() {
                    self.exit(host);
                    EventOutcome::Handled
                } else {
                    EventOutcome::Forwarded
                }
            }
        };

        let after = self.state();
        if before != after {
            info!(from = ?before, to = ?after, "Sync-edit transition");
        }
        Ok(outcome)
    }

    fn on_selection(&mut self, start: usize, end: usize) -> EventOutcome {
        if self.session.is_none() {
            self.selection = (start != end).then(|| Span::new(start.min(end), start.max(end)));
        }
        EventOutcome::Forwarded
    }

    fn start(&mut self, host: &mut HostContext<'_>) -> SyncEditResult<EventOutcome> {
        let Some(selection) = self.selection else {
            host.sink.notify(Notice::MakeSelectionFirst);
            return Ok(EventOutcome::Handled);
        };

        let resolved = self.config.resolve(self.language.as_deref());
        for warning in &resolved.warnings {
            host.sink.notify(Notice::InvalidConfig {
                key: warning.key().to_string(),
            });
        }

        let block = Block::capture(host.buffer.text(), selection)?;
        let raw = match scan(&block, &resolved.policy, host.roles) {
            Ok(raw) => raw,
            Err(e) if e.is_host_not_ready() => {
                info!("Host still parsing, not starting session");
                host.sink.notify(Notice::StillParsing);
                return Ok(EventOutcome::Handled);
            }
            Err(e) => return Err(e),
        };

        let groups = Groups::build(raw, &resolved.policy);
        let editable = groups.editable_count();
        if editable == 0 {
            let notice = if resolved.policy.uses_structural_mode()
                && !has_role_labels(&block, host.roles)
            {
                Notice::NoSyntaxTokens
            } else {
                Notice::NoEditableIdentifiers
            };
            host.sink.notify(notice);
            return Ok(EventOutcome::Handled);
        }

        info!(
            language = self.language.as_deref().unwrap_or("<none>"),
            block_start = selection.start,
            block_end = selection.end,
            groups = groups.len(),
            editable,
            "Sync-edit session started"
        );
        let session = Session {
            block,
            policy: resolved.policy,
            display: resolved.display,
            groups,
            active: None,
        };
        session.render(host.sink);
        host.sink.notify(Notice::Activated {
            groups: session.groups.len(),
            editable,
        });
        self.selection = None;
        self.session = Some(session);
        Ok(EventOutcome::Handled)
    }

    /// Leave the session; text edits stay as they are.
    fn exit(&mut self, host: &mut HostContext<'_>) {
        if self.session.take().is_some() {
            host.sink.clear();
            host.sink.notify(Notice::Deactivated);
            info!("Sync-edit session ended");
        }
    }

    fn on_click(
        &mut self,
        offset: usize,
        host: &mut HostContext<'_>,
    ) -> SyncEditResult<EventOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Ok(EventOutcome::Forwarded);
        };

        let target = session.groups.find_editable_at(offset);
        let active_group = session.active.as_ref().map(Synchronizer::group);
        let target_group = target
            .and_then(|id| session.groups.occurrence(id))
            .map(|o| o.group);

        match (target, active_group) {
            (Some(occurrence), None) => {
                session.begin_editing(occurrence, offset)?;
            }
            (Some(_), Some(active)) if target_group == Some(active) => {
                if let Some(sync) = session.active.as_mut() {
                    sync.place_caret(&session.groups, offset);
                }
            }
            (Some(occurrence), Some(active)) => {
                info!(from = %active, "Switching active group");
                session.commit(host.buffer.text());
                session.begin_editing(occurrence, offset)?;
            }
            (None, _) => {
                session.commit(host.buffer.text());
                session.render(host.sink);
                host.sink.notify(Notice::NotAWord);
                return Ok(EventOutcome::Forwarded);
            }
        }

        session.render(host.sink);
        Ok(EventOutcome::Handled)
    }

    fn on_key(&mut self, key: Key, host: &mut HostContext<'_>) -> SyncEditResult<EventOutcome> {
        let Some(session) = self.session.as_mut() else {
            return Ok(EventOutcome::Forwarded);
        };

        let op = match key {
            Key::Escape => {
                self.exit(host);
                return Ok(EventOutcome::Handled);
            }
            _ if session.active.is_none() => return Ok(EventOutcome::Forwarded),
            Key::Text(text) => MirrorOp::Insert(text),
            Key::Backspace => MirrorOp::DeleteBackward,
            Key::Delete => MirrorOp::DeleteForward,
            Key::Left => return Ok(Self::move_carets(session, Direction::Left, host)),
            Key::Right => return Ok(Self::move_carets(session, Direction::Right, host)),
            rejected @ (Key::Up | Key::Down | Key::PageUp | Key::PageDown | Key::Enter) => {
                debug!(key = ?rejected, "Key rejected while editing");
                return Ok(EventOutcome::Rejected);
            }
        };

        let Session {
            groups,
            block,
            active,
            ..
        } = &mut *session;
        let Some(sync) = active.as_mut() else {
            return Ok(EventOutcome::Forwarded);
        };
        match sync.apply(&op, groups, block, host.buffer)? {
            Some(_) => {
                session.render(host.sink);
                Ok(EventOutcome::Handled)
            }
            None => Ok(EventOutcome::Rejected),
        }
    }

    fn move_carets(
        session: &mut Session,
        direction: Direction,
        host: &mut HostContext<'_>,
    ) -> EventOutcome {
        let Some(sync) = session.active.as_mut() else {
            return EventOutcome::Forwarded;
        };
        match sync.move_carets(&session.groups, host.buffer.text(), direction) {
            Movement::Moved => {
                session.render(host.sink);
                EventOutcome::Handled
            }
            Movement::LeftSpan => {
                session.commit(host.buffer.text());
                session.render(host.sink);
                EventOutcome::Forwarded
            }
        }
    }

    fn on_caret_moved(&mut self, offset: usize, host: &mut HostContext<'_>) -> EventOutcome {
        let Some(session) = self.session.as_mut() else {
            return EventOutcome::Forwarded;
        };
        let Some(sync) = session.active.as_mut() else {
            return EventOutcome::Forwarded;
        };

        if sync.place_caret(&session.groups, offset) {
            session.render(host.sink);
            return EventOutcome::Handled;
        }
        // Carets of the active group no longer follow the host caret; a
        // following Click may start another group.
        session.commit(host.buffer.text());
        session.render(host.sink);
        EventOutcome::Forwarded
    }

    fn on_text_changed(
        &mut self,
        edit: &EditOperation,
        host: &mut HostContext<'_>,
    ) -> EventOutcome {
        let Some(session) = self.session.as_mut() else {
            return EventOutcome::Forwarded;
        };

        let dropped = session.groups.rebase(edit, None);
        session.block.rebase(edit);
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "External edit touched occurrences");
        }

        let still_editing = session
            .active
            .as_mut()
            .map(|sync| sync.retain_live(&session.groups));
        if still_editing == Some(false) {
            info!("Active group lost its members, leaving edit mode");
            session.commit(host.buffer.text());
        }
        session.render(host.sink);
        EventOutcome::Handled
    }
}
