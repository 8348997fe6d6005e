use std::fmt;

use super::track::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Add,
    Remove,
    Move,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Add => "ADD",
            OperationKind::Remove => "REMOVE",
            OperationKind::Move => "MOVE",
        })
    }
}

/// A single structural change to a playlist.
///
/// `Remove::old_position` indexes the current sequence as it was when the diff was computed.
/// `Add::position` and `Move::position` are slots in the target sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistOperation {
    Add {
        track: Track,
        position: usize,
    },
    Remove {
        track: Track,
        old_position: usize,
        external_uri: Option<String>,
    },
    Move {
        track: Track,
        old_position: usize,
        position: usize,
        external_uri: Option<String>,
    },
}

impl PlaylistOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PlaylistOperation::Add { .. } => OperationKind::Add,
            PlaylistOperation::Remove { .. } => OperationKind::Remove,
            PlaylistOperation::Move { .. } => OperationKind::Move,
        }
    }

    pub fn track(&self) -> &Track {
        match self {
            PlaylistOperation::Add { track, .. }
            | PlaylistOperation::Remove { track, .. }
            | PlaylistOperation::Move { track, .. } => track,
        }
    }

    /// Target slot for ADD/MOVE, original index for REMOVE.
    pub fn position(&self) -> usize {
        match self {
            PlaylistOperation::Add { position, .. } | PlaylistOperation::Move { position, .. } => {
                *position
            }
            PlaylistOperation::Remove { old_position, .. } => *old_position,
        }
    }

    pub fn old_position(&self) -> Option<usize> {
        match self {
            PlaylistOperation::Add { .. } => None,
            PlaylistOperation::Remove { old_position, .. }
            | PlaylistOperation::Move { old_position, .. } => Some(*old_position),
        }
    }

    pub fn external_uri(&self) -> Option<&str> {
        match self {
            PlaylistOperation::Add { .. } => None,
            PlaylistOperation::Remove { external_uri, .. }
            | PlaylistOperation::Move { external_uri, .. } => external_uri.as_deref(),
        }
    }
}

impl fmt::Display for PlaylistOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistOperation::Add { track, position } => {
                write!(f, "ADD '{}' at {}", track, position)
            }
            PlaylistOperation::Remove {
                track,
                old_position,
                ..
            } => write!(f, "REMOVE '{}' from {}", track, old_position),
            PlaylistOperation::Move {
                track,
                old_position,
                position,
                ..
            } => write!(f, "MOVE '{}' {} -> {}", track, old_position, position),
        }
    }
}

/// A matched track that keeps its place in the relative order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnchangedTrack {
    pub track: Track,
    pub current_position: usize,
    pub target_position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistDiff {
    pub operations: Vec<PlaylistOperation>,
    pub unchanged: Vec<UnchangedTrack>,
    pub api_call_estimate: usize,
    /// Share of the target reached through identity matches, in `[0, 1]`.
    pub confidence_score: f64,
    pub current_len: usize,
    pub target_len: usize,
}

impl PlaylistDiff {
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }

    pub fn operations_of(&self, kind: OperationKind) -> impl Iterator<Item = &PlaylistOperation> {
        self.operations.iter().filter(move |op| op.kind() == kind)
    }

    /// Copy of the diff without the ADD operations that target `slots`.
    pub fn without_adds_at(&self, slots: &[usize]) -> PlaylistDiff {
        let mut diff = self.clone();
        diff.operations.retain(|op| {
            !matches!(op, PlaylistOperation::Add { position, .. } if slots.contains(position))
        });
        diff
    }
}
