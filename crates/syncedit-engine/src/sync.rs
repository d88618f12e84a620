//! Mirrors caret-level edits across every member of the active group.
//!
//! Every member carries its own caret at the same offset relative to the
//! member's start. An operation is planned against all members first and
//! only applied once every member accepted it; if the buffer fails midway,
//! the edits already made are undone in reverse order.

use crate::block::Block;
use crate::grouper::{Groups, OccurrenceId};
use syncedit_foundation::{
    ActiveMarker, EditOperation, GroupId, Span, SyncEditError, SyncEditResult, TextBuffer,
};
use tracing::{debug, trace, warn};

/// A caret-level edit requested at the primary caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOp {
    Insert(String),
    DeleteBackward,
    DeleteForward,
}

/// Horizontal caret movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Result of a caret movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Moved,
    /// The primary caret would leave its span; nothing moved.
    LeftSpan,
}

/// One member's share of a planned operation, in span-relative terms.
#[derive(Debug)]
struct MemberEdit {
    member: usize,
    /// Offset of the edit inside the member's span.
    at: usize,
    /// Inserted text or deleted byte count.
    insert: Option<String>,
    delete: usize,
    caret_after: usize,
}

/// Synchronizer for the group currently being edited.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    group: GroupId,
    members: Vec<OccurrenceId>,
    carets: Vec<usize>,
    primary: usize,
}

impl Synchronizer {
    /// Start editing the group of `primary`, with every caret placed at the
    /// offset `offset` has inside the primary span.
    pub fn activate(groups: &Groups, primary: OccurrenceId, offset: usize) -> SyncEditResult<Self> {
        let occurrence = groups
            .occurrence(primary)
            .ok_or_else(|| SyncEditError::internal(format!("unknown occurrence {}", primary.0)))?;
        let group = groups.group(occurrence.group).ok_or_else(|| {
            SyncEditError::internal(format!("occurrence {} has no group", primary.0))
        })?;
        let members = group.members().to_vec();
        let primary_index = members
            .iter()
            .position(|m| *m == primary)
            .ok_or_else(|| SyncEditError::internal("primary occurrence is not a group member"))?;

        let mut sync = Self {
            group: group.id(),
            carets: vec![0; members.len()],
            members,
            primary: primary_index,
        };
        sync.place_relative(groups, offset.saturating_sub(occurrence.span.start));
        debug!(
            group = %sync.group,
            members = sync.members.len(),
            "Activated group"
        );
        Ok(sync)
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn members(&self) -> &[OccurrenceId] {
        &self.members
    }

    pub fn primary(&self) -> OccurrenceId {
        self.members[self.primary]
    }

    /// Caret offsets relative to each member's start.
    pub fn relative_carets(&self) -> &[usize] {
        &self.carets
    }

    /// Absolute caret offsets, one per member in document order.
    pub fn carets(&self, groups: &Groups) -> Vec<usize> {
        self.members
            .iter()
            .zip(&self.carets)
            .filter_map(|(m, rel)| groups.span(*m).map(|s| s.start + rel))
            .collect()
    }

    pub fn marker(&self, groups: &Groups) -> ActiveMarker {
        ActiveMarker {
            group: self.group,
            spans: self.spans(groups),
            carets: self.carets(groups),
        }
    }

    pub fn spans(&self, groups: &Groups) -> Vec<Span> {
        self.members.iter().filter_map(|m| groups.span(*m)).collect()
    }

    /// Forget members dropped from `groups` by an external edit. Returns
    /// `false` once fewer than two members are left.
    pub fn retain_live(&mut self, groups: &Groups) -> bool {
        let primary = self.primary();
        let (members, carets): (Vec<_>, Vec<_>) = self
            .members
            .iter()
            .zip(&self.carets)
            .filter(|(m, _)| groups.occurrence(**m).is_some_and(|o| o.group == self.group))
            .map(|(m, c)| (*m, *c))
            .unzip();
        self.primary = members.iter().position(|m| *m == primary).unwrap_or(0);
        self.members = members;
        self.carets = carets;
        self.members.len() >= 2
    }

    /// Move the carets to `offset` when it lies inside one of the members.
    /// Returns `false` if no member contains it.
    pub fn place_caret(&mut self, groups: &Groups, offset: usize) -> bool {
        let Some((index, span)) = self
            .members
            .iter()
            .enumerate()
            .filter_map(|(i, m)| groups.span(*m).map(|s| (i, s)))
            .find(|(_, s)| s.contains_caret(offset))
        else {
            return false;
        };
        self.primary = index;
        self.place_relative(groups, offset - span.start);
        true
    }

    fn place_relative(&mut self, groups: &Groups, relative: usize) {
        for (caret, member) in self.carets.iter_mut().zip(&self.members) {
            let len = groups.span(*member).map_or(0, |s| s.len());
            *caret = relative.min(len);
        }
    }

    /// Move every caret one character left or right inside its own span.
    pub fn move_carets(
        &mut self,
        groups: &Groups,
        document: &str,
        direction: Direction,
    ) -> Movement {
        let texts: Vec<&str> = self
            .spans(groups)
            .iter()
            .map(|s| s.slice(document).unwrap_or(""))
            .collect();
        if texts.len() != self.members.len() {
            return Movement::LeftSpan;
        }

        let step = |text: &str, rel: usize| -> Option<usize> {
            match direction {
                Direction::Left => text.get(..rel)?.chars().next_back().map(|c| rel - c.len_utf8()),
                Direction::Right => text.get(rel..)?.chars().next().map(|c| rel + c.len_utf8()),
            }
        };

        if step(texts[self.primary], self.carets[self.primary]).is_none() {
            return Movement::LeftSpan;
        }
        for (caret, text) in self.carets.iter_mut().zip(&texts) {
            if let Some(next) = step(*text, *caret) {
                *caret = next;
            }
        }
        trace!(?direction, carets = ?self.carets, "Moved carets");
        Movement::Moved
    }

    /// Apply `op` at every member.
    ///
    /// Returns the edits made in application order, or `Ok(None)` when the
    /// operation is rejected and nothing changed.
    pub fn apply(
        &mut self,
        op: &MirrorOp,
        groups: &mut Groups,
        block: &mut Block,
        buffer: &mut dyn TextBuffer,
    ) -> SyncEditResult<Option<Vec<EditOperation>>> {
        let Some(plan) = self.plan(op, groups, buffer.text()) else {
            debug!(?op, group = %self.group, "Rejected edit at span boundary");
            return Ok(None);
        };
        if plan.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let saved_spans = groups.spans();
        let saved_block = block.clone();
        let mut undo: Vec<EditOperation> = Vec::with_capacity(plan.len());
        let mut applied = Vec::with_capacity(plan.len());

        for edit in &plan {
            let member = self.members[edit.member];
            let result = match groups.span(member) {
                Some(span) => {
                    let position = span.start + edit.at;
                    let operation = match &edit.insert {
                        Some(text) => EditOperation::insert(position, text.clone()),
                        None => EditOperation::delete(position, edit.delete),
                    };
                    buffer.apply(&operation).map(|inverse| (span, operation, inverse))
                }
                None => Err(SyncEditError::internal("active member vanished during edit")),
            };

            let (span, operation, inverse) = match result {
                Ok(applied) => applied,
                Err(e) => {
                    warn!(error = %e, group = %self.group, "Mirrored edit failed, rolling back");
                    rollback(buffer, &undo);
                    groups.restore_spans(&saved_spans);
                    *block = saved_block;
                    return Err(e);
                }
            };
            undo.push(inverse);

            let new_end = (span.end as isize + operation.delta()) as usize;
            groups.set_span(member, Span::new(span.start, new_end));
            groups.rebase(&operation, Some(member));
            block.rebase(&operation);
            applied.push(operation);
        }

        for edit in &plan {
            self.carets[edit.member] = edit.caret_after;
        }
        trace!(
            group = %self.group,
            edits = applied.len(),
            carets = ?self.carets,
            "Mirrored edit"
        );
        Ok(Some(applied))
    }

    /// Plan `op` for every member in document order. `None` rejects it.
    fn plan(&self, op: &MirrorOp, groups: &Groups, document: &str) -> Option<Vec<MemberEdit>> {
        if let MirrorOp::Insert(text) = op {
            if text.is_empty() {
                return Some(Vec::new());
            }
        }

        let mut plan = Vec::with_capacity(self.members.len());
        for (index, (member, rel)) in self.members.iter().zip(&self.carets).enumerate() {
            let span = groups.span(*member)?;
            let text = span.slice(document)?;
            let rel = *rel;
            let edit = match op {
                MirrorOp::Insert(inserted) => MemberEdit {
                    member: index,
                    at: rel,
                    insert: Some(inserted.clone()),
                    delete: 0,
                    caret_after: rel + inserted.len(),
                },
                MirrorOp::DeleteBackward => {
                    let width = text.get(..rel)?.chars().next_back()?.len_utf8();
                    MemberEdit {
                        member: index,
                        at: rel - width,
                        insert: None,
                        delete: width,
                        caret_after: rel - width,
                    }
                }
                MirrorOp::DeleteForward => {
                    let width = text.get(rel..)?.chars().next()?.len_utf8();
                    MemberEdit {
                        member: index,
                        at: rel,
                        insert: None,
                        delete: width,
                        caret_after: rel,
                    }
                }
            };
            plan.push(edit);
        }
        Some(plan)
    }
}

/// Undo already applied edits, newest first.
fn rollback(buffer: &mut dyn TextBuffer, undo: &[EditOperation]) {
    for inverse in undo.iter().rev() {
        if let Err(e) = buffer.apply(inverse) {
            warn!(error = %e, "Rollback edit failed");
        }
    }
}
