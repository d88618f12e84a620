//! Identifier discovery inside a block.
//!
//! Two strategies:
//!
//! - **Structural**: the host's role labels decide which character runs are
//!   identifiers; the identifier pattern then trims each accepted run.
//! - **Pattern**: every match of the identifier pattern in the block.

use crate::block::Block;
use serde::Serialize;
use std::ops::Range;
use syncedit_config::Policy;
use syncedit_foundation::{RoleProvider, Span, SyncEditError, SyncEditResult};
use tracing::debug;

/// One identifier found by the scanner, before grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawOccurrence {
    pub span: Span,
    pub text: String,
}

/// Scan `block` for identifier occurrences, in document order.
pub fn scan(
    block: &Block,
    policy: &Policy,
    roles: &dyn RoleProvider,
) -> SyncEditResult<Vec<RawOccurrence>> {
    let occurrences = if policy.uses_structural_mode() {
        if !roles.is_ready() {
            return Err(SyncEditError::HostNotReady);
        }
        scan_structural(block, policy, roles)
    } else {
        scan_pattern(block, policy)
    };

    debug!(
        structural = policy.uses_structural_mode(),
        block_start = block.start(),
        block_len = block.snapshot().len(),
        occurrences = occurrences.len(),
        "Scanned block"
    );
    Ok(occurrences)
}

fn scan_pattern(block: &Block, policy: &Policy) -> Vec<RawOccurrence> {
    let mut out = Vec::new();
    collect_matches(block, policy, 0..block.snapshot().len(), &mut out);
    out
}

fn scan_structural(block: &Block, policy: &Policy, roles: &dyn RoleProvider) -> Vec<RawOccurrence> {
    let mut out = Vec::new();
    for (range, label) in role_runs(block, roles) {
        if policy.accepts_role(label) {
            collect_matches(block, policy, range, &mut out);
        }
    }
    out
}

/// Emit identifier matches inside `range` (relative to the block).
fn collect_matches(
    block: &Block,
    policy: &Policy,
    range: Range<usize>,
    out: &mut Vec<RawOccurrence>,
) {
    let base = block.start() + range.start;
    let text = &block.snapshot()[range];
    for found in policy.identifier_pattern().find_iter(text) {
        if found.is_empty() {
            continue;
        }
        out.push(RawOccurrence {
            span: Span::new(base + found.start(), base + found.end()),
            text: found.as_str().to_string(),
        });
    }
}

/// Whether the host labelled any character inside `block`.
pub fn has_role_labels(block: &Block, roles: &dyn RoleProvider) -> bool {
    block
        .snapshot()
        .char_indices()
        .any(|(idx, _)| roles.role_of(block.start() + idx).is_some())
}

/// Maximal runs of characters sharing a role label. Unlabelled characters
/// break runs and never form one.
fn role_runs<'r>(block: &Block, roles: &'r dyn RoleProvider) -> Vec<(Range<usize>, &'r str)> {
    let text = block.snapshot();
    let mut runs = Vec::new();
    let mut current: Option<(usize, &'r str)> = None;

    for (idx, _) in text.char_indices() {
        let label = roles.role_of(block.start() + idx);
        match (current, label) {
            (Some((_, open)), Some(label)) if open == label => {}
            _ => {
                if let Some((start, open)) = current.take() {
                    runs.push((start..idx, open));
                }
                current = label.map(|label| (idx, label));
            }
        }
    }
    if let Some((start, open)) = current {
        runs.push((start..text.len(), open));
    }
    runs
}
