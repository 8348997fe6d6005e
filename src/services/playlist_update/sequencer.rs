//! Turns a diff into concrete index steps over an array-backed sequence.
//!
//! Steps always come out as REMOVE (original position descending), then ADD (target slot
//! ascending), then MOVE (target slot ascending), whatever order the diff lists them in.
//!
//! Every track that survives the removals carries the target slot it has to end up in. An ADD is
//! inserted right after the nearest preceding slot that is already in place and not scheduled to
//! move; a MOVE is relocated right after its nearest preceding slot. Applying all steps therefore
//! reproduces the target order exactly, and with no out-of-order tracks an ADD lands on its target
//! position clamped to the current length.

use std::collections::HashSet;

use crate::domain::{OperationKind, PlaylistDiff, PlaylistOperation, Track, UnchangedTrack};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("{kind} position {position} is outside a sequence of {len} tracks")]
    PositionOutOfRange {
        kind: OperationKind,
        position: usize,
        len: usize,
    },
    #[error("Current position {0} is claimed by more than one operation")]
    DuplicateCurrentPosition(usize),
    #[error("Target slot {0} is claimed by more than one operation")]
    DuplicateTargetSlot(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step<'a> {
    Remove {
        op: &'a PlaylistOperation,
        index: usize,
    },
    Insert {
        op: &'a PlaylistOperation,
        index: usize,
    },
    /// Take the track at `from`, then insert it at `to` in the shortened sequence.
    Relocate {
        op: &'a PlaylistOperation,
        from: usize,
        to: usize,
    },
}

impl<'a> Step<'a> {
    pub fn operation(&self) -> &'a PlaylistOperation {
        match self {
            Step::Remove { op, .. } | Step::Insert { op, .. } | Step::Relocate { op, .. } => op,
        }
    }

    /// Index, in the sequence before the relocation, of the track the moved one lands in front
    /// of. This is how reorder endpoints usually express a move.
    pub fn insert_before(&self) -> Option<usize> {
        match self {
            Step::Relocate { from, to, .. } if to >= from => Some(to + 1),
            Step::Relocate { to, .. } => Some(*to),
            _ => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Step::Relocate { from, to, .. } if from == to)
    }
}

/// Index right after the last entry whose slot is before `slot` and satisfies `eligible`.
fn anchor_after(work: &[Option<usize>], slot: usize, eligible: impl Fn(usize) -> bool) -> usize {
    work.iter()
        .rposition(|entry| entry.is_some_and(|s| s < slot && eligible(s)))
        .map_or(0, |i| i + 1)
}

/// A track of the diff as seen by the membership filter of [`sequence_operations`].
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Operation(&'a PlaylistOperation),
    Unchanged(&'a UnchangedTrack),
}

impl<'a> Member<'a> {
    pub fn track(&self) -> &'a Track {
        match self {
            Member::Operation(op) => op.track(),
            Member::Unchanged(unchanged) => &unchanged.track,
        }
    }

    pub fn external_uri(&self) -> Option<&'a str> {
        match self {
            Member::Operation(op) => op.external_uri(),
            Member::Unchanged(_) => None,
        }
    }
}

/// Sequences the operations of `diff` over the sub-sequence of tracks for which `present`
/// returns true.
///
/// Tracks outside that sub-sequence are dropped before any index is computed: their current
/// positions do not count and their operations produce no steps. With `|_| true` the steps cover
/// the whole diff.
pub fn sequence_operations<'a>(
    diff: &'a PlaylistDiff,
    mut present: impl FnMut(Member<'a>) -> bool,
) -> Result<Vec<Step<'a>>, SequenceError> {
    let mut work: Vec<Option<usize>> = vec![None; diff.current_len];
    let mut kept = vec![true; diff.current_len];
    let mut claimed_current = vec![false; diff.current_len];
    let mut claimed_slots = vec![false; diff.target_len];

    let mut claim_current = |kind: OperationKind, position: usize| -> Result<(), SequenceError> {
        let claimed = claimed_current
            .get_mut(position)
            .ok_or(SequenceError::PositionOutOfRange {
                kind,
                position,
                len: diff.current_len,
            })?;
        if std::mem::replace(claimed, true) {
            return Err(SequenceError::DuplicateCurrentPosition(position));
        }
        Ok(())
    };
    let mut claim_slot = |kind: OperationKind, slot: usize| -> Result<(), SequenceError> {
        let claimed = claimed_slots
            .get_mut(slot)
            .ok_or(SequenceError::PositionOutOfRange {
                kind,
                position: slot,
                len: diff.target_len,
            })?;
        if std::mem::replace(claimed, true) {
            return Err(SequenceError::DuplicateTargetSlot(slot));
        }
        Ok(())
    };

    for unchanged in &diff.unchanged {
        claim_current(OperationKind::Move, unchanged.current_position)?;
        claim_slot(OperationKind::Move, unchanged.target_position)?;
        if present(Member::Unchanged(unchanged)) {
            work[unchanged.current_position] = Some(unchanged.target_position);
        } else {
            kept[unchanged.current_position] = false;
        }
    }

    let mut removes = Vec::new();
    let mut adds = Vec::new();
    let mut moves = Vec::new();
    for op in &diff.operations {
        match op {
            PlaylistOperation::Remove { old_position, .. } => {
                claim_current(OperationKind::Remove, *old_position)?;
                if present(Member::Operation(op)) {
                    removes.push(op);
                } else {
                    kept[*old_position] = false;
                }
            }
            PlaylistOperation::Add { position, .. } => {
                claim_slot(OperationKind::Add, *position)?;
                if present(Member::Operation(op)) {
                    adds.push(op);
                }
            }
            PlaylistOperation::Move {
                old_position,
                position,
                ..
            } => {
                claim_current(OperationKind::Move, *old_position)?;
                claim_slot(OperationKind::Move, *position)?;
                if present(Member::Operation(op)) {
                    work[*old_position] = Some(*position);
                    moves.push(op);
                } else {
                    kept[*old_position] = false;
                }
            }
        }
    }

    removes.sort_by_key(|op| std::cmp::Reverse(op.position()));
    adds.sort_by_key(|op| op.position());
    moves.sort_by_key(|op| op.position());

    let mut work: Vec<Option<usize>> = work
        .into_iter()
        .zip(&kept)
        .filter_map(|(entry, &keep)| keep.then_some(entry))
        .collect();
    let moving: HashSet<usize> = moves.iter().map(|op| op.position()).collect();
    let mut steps = Vec::with_capacity(diff.operations.len());

    for op in removes {
        // descending order keeps lower original indices valid
        let index = kept[..op.position()].iter().filter(|&&kept| kept).count();
        work.remove(index);
        steps.push(Step::Remove { op, index });
    }

    for op in adds {
        let slot = op.position();
        let index = anchor_after(&work, slot, |s| !moving.contains(&s));
        work.insert(index, Some(slot));
        steps.push(Step::Insert { op, index });
    }

    for op in moves {
        let slot = op.position();
        let Some(from) = work.iter().position(|entry| *entry == Some(slot)) else {
            continue;
        };
        work.remove(from);
        let to = anchor_after(&work, slot, |_| true);
        work.insert(to, Some(slot));
        steps.push(Step::Relocate { op, from, to });
    }

    Ok(steps)
}

/// Applies steps to `items`, building inserted items with `make`.
pub fn apply_steps<T>(
    items: &mut Vec<T>,
    steps: &[Step<'_>],
    mut make: impl FnMut(&PlaylistOperation) -> T,
) {
    for step in steps {
        match *step {
            Step::Remove { index, .. } => {
                items.remove(index);
            }
            Step::Insert { op, index } => items.insert(index, make(op)),
            Step::Relocate { from, to, .. } => {
                let item = items.remove(from);
                items.insert(to, item);
            }
        }
    }
}
