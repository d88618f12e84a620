//! Grouping of occurrences by normalized text.
//!
//! Occurrences live in an arena addressed by [`OccurrenceId`]. Groups refer
//! to their members by id, so rebasing a span after an edit never has to
//! touch the group structure.

use crate::scanner::RawOccurrence;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use syncedit_config::Policy;
use syncedit_foundation::{EditOperation, GroupId, Span};
use tracing::debug;

/// Index of an occurrence in the session arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OccurrenceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub span: Span,
    pub group: GroupId,
}

/// Occurrences sharing the same normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    id: GroupId,
    text: String,
    members: Vec<OccurrenceId>,
}

impl Group {
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Normalized text shared by every member.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Member ids in document order.
    pub fn members(&self) -> &[OccurrenceId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Singletons are shown but can never be activated.
    pub fn editable(&self) -> bool {
        self.members.len() >= 2
    }
}

/// All occurrences of a session and their partition into groups.
#[derive(Debug, Clone, Default)]
pub struct Groups {
    occurrences: Vec<Option<Occurrence>>,
    groups: BTreeMap<GroupId, Group>,
}

impl Groups {
    /// Partition scanner output. Group ids follow first-occurrence order.
    pub fn build(raw: Vec<RawOccurrence>, policy: &Policy) -> Self {
        let mut by_text: HashMap<String, GroupId> = HashMap::new();
        let mut groups: BTreeMap<GroupId, Group> = BTreeMap::new();
        let mut occurrences = Vec::with_capacity(raw.len());

        for (idx, found) in raw.into_iter().enumerate() {
            let key = policy.normalize(&found.text).into_owned();
            let next_id = GroupId(by_text.len() as u32);
            let id = *by_text.entry(key.clone()).or_insert(next_id);
            groups
                .entry(id)
                .or_insert_with(|| Group {
                    id,
                    text: key,
                    members: Vec::new(),
                })
                .members
                .push(OccurrenceId(idx));
            occurrences.push(Some(Occurrence {
                span: found.span,
                group: id,
            }));
        }

        let built = Self {
            occurrences,
            groups,
        };
        debug!(
            occurrences = built.occurrences.len(),
            groups = built.groups.len(),
            editable = built.editable_count(),
            "Grouped occurrences"
        );
        built
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn editable_count(&self) -> usize {
        self.groups.values().filter(|g| g.editable()).count()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn occurrence(&self, id: OccurrenceId) -> Option<&Occurrence> {
        self.occurrences.get(id.0).and_then(Option::as_ref)
    }

    pub fn span(&self, id: OccurrenceId) -> Option<Span> {
        self.occurrence(id).map(|o| o.span)
    }

    /// Groups ordered by their first member's position.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        let mut ordered: Vec<&Group> = self.groups.values().collect();
        ordered.sort_by_key(|g| {
            g.members
                .first()
                .and_then(|m| self.span(*m))
                .map(|s| s.start)
        });
        ordered.into_iter()
    }

    /// Current spans of a group's members, in document order.
    pub fn spans_of(&self, id: GroupId) -> Vec<Span> {
        self.group(id)
            .map(|g| g.members.iter().filter_map(|m| self.span(*m)).collect())
            .unwrap_or_default()
    }

    /// Live occurrences in document order.
    pub fn live(&self) -> impl Iterator<Item = (OccurrenceId, &Occurrence)> {
        self.occurrences
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| o.as_ref().map(|o| (OccurrenceId(idx), o)))
    }

    /// Occurrence under a caret at `offset`.
    ///
    /// Bounds are inclusive, so two adjacent spans can both contain the
    /// offset. The span starting at `offset` wins, then the shorter span,
    /// then the earlier one.
    pub fn find_at(&self, offset: usize) -> Option<OccurrenceId> {
        self.find_where(offset, |_| true)
    }

    /// Like [`Groups::find_at`], considering only editable groups.
    pub fn find_editable_at(&self, offset: usize) -> Option<OccurrenceId> {
        self.find_where(offset, |group| group.editable())
    }

    fn find_where(&self, offset: usize, accept: impl Fn(&Group) -> bool) -> Option<OccurrenceId> {
        self.live()
            .filter(|(_, o)| o.span.contains_caret(offset))
            .filter(|(_, o)| self.group(o.group).is_some_and(&accept))
            .min_by_key(|(id, o)| (o.span.start != offset, o.span.len(), *id))
            .map(|(id, _)| id)
    }

    /// Whether every member of `id` currently reads the same under `policy`.
    pub fn is_consistent(&self, id: GroupId, document: &str, policy: &Policy) -> bool {
        let mut texts = self
            .spans_of(id)
            .into_iter()
            .map(|span| span.slice(document).map(|t| policy.normalize(t).into_owned()));
        match texts.next() {
            None => true,
            Some(first) => first.is_some() && texts.all(|t| t == first),
        }
    }

    pub(crate) fn set_span(&mut self, id: OccurrenceId, span: Span) {
        if let Some(Some(occurrence)) = self.occurrences.get_mut(id.0) {
            occurrence.span = span;
        }
    }

    /// Rebase every live occurrence except `skip` through `edit`.
    ///
    /// Occurrences whose text the edit touches are dropped from their groups
    /// and returned.
    pub(crate) fn rebase(
        &mut self,
        edit: &EditOperation,
        skip: Option<OccurrenceId>,
    ) -> Vec<OccurrenceId> {
        let mut touched = Vec::new();
        for (idx, slot) in self.occurrences.iter_mut().enumerate() {
            let id = OccurrenceId(idx);
            if Some(id) == skip {
                continue;
            }
            if let Some(occurrence) = slot {
                match occurrence.span.rebase(edit) {
                    Some(span) => occurrence.span = span,
                    None => touched.push(id),
                }
            }
        }
        for id in &touched {
            self.remove(*id);
        }
        touched
    }

    fn remove(&mut self, id: OccurrenceId) {
        let Some(occurrence) = self.occurrences.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if let Some(group) = self.groups.get_mut(&occurrence.group) {
            group.members.retain(|m| *m != id);
            if group.members.is_empty() {
                self.groups.remove(&occurrence.group);
            }
        }
        debug!(occurrence = id.0, group = %occurrence.group, "Dropped occurrence");
    }

    /// Record the current text of group `id` as its stored text.
    ///
    /// When another group already holds that text the two merge; the group
    /// that appeared first in the document survives and its id is returned.
    pub(crate) fn commit(&mut self, id: GroupId, document: &str, policy: &Policy) -> GroupId {
        let Some(text) = self
            .spans_of(id)
            .first()
            .and_then(|span| span.slice(document))
            .map(|text| policy.normalize(text).into_owned())
        else {
            return id;
        };

        let collision = self
            .groups
            .values()
            .find(|g| g.id != id && g.text == text)
            .map(|g| g.id);

        let Some(other) = collision else {
            if let Some(group) = self.groups.get_mut(&id) {
                group.text = text;
            }
            return id;
        };

        let (keep, absorb) = if other < id { (other, id) } else { (id, other) };
        let Some(absorbed) = self.groups.remove(&absorb) else {
            return id;
        };
        for member in &absorbed.members {
            if let Some(Some(occurrence)) = self.occurrences.get_mut(member.0) {
                occurrence.group = keep;
            }
        }
        let occurrences = &self.occurrences;
        if let Some(group) = self.groups.get_mut(&keep) {
            group.text = text;
            group.members.extend(absorbed.members);
            group
                .members
                .sort_by_key(|m| occurrences[m.0].map(|o| o.span.start));
        }
        debug!(kept = %keep, absorbed = %absorb, "Merged groups after rename");
        keep
    }

    /// Snapshot of every occurrence span, for rollback.
    pub(crate) fn spans(&self) -> Vec<Option<Span>> {
        self.occurrences.iter().map(|o| o.map(|o| o.span)).collect()
    }

    pub(crate) fn restore_spans(&mut self, saved: &[Option<Span>]) {
        for (slot, span) in self.occurrences.iter_mut().zip(saved) {
            if let (Some(occurrence), Some(span)) = (slot, span) {
                occurrence.span = *span;
            }
        }
    }
}
