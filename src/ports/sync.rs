use tokio_util::sync::CancellationToken;

use crate::domain::{Connector, MetadataPatch, Playlist, PlaylistDiff, UpdateOptions};

/// Per-run inputs handed to every sync service.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub options: UpdateOptions,
    /// Remote calls this service may still make in the current run.
    pub call_budget: usize,
    pub cancellation: CancellationToken,
    /// An earlier sync failed part way, so the remote may not match the stored playlist. The
    /// service compares against the remote contents instead of applying the diff.
    pub reconcile: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutcome {
    pub patch: MetadataPatch,
    pub api_calls_made: usize,
    pub conflicts: usize,
    /// Non-fatal problems, e.g. tracks the platform has no id for.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("{connector} request failed after {completed_calls} calls: {reason}")]
    Transport {
        connector: Connector,
        completed_calls: usize,
        reason: String,
    },
    #[error("{connector} playlist changed remotely (stored version {expected}, remote {actual})")]
    Conflict {
        connector: Connector,
        expected: String,
        actual: String,
        completed_calls: usize,
    },
    #[error("{connector} sync stopped: API call budget of {budget} exhausted")]
    BudgetExhausted {
        connector: Connector,
        budget: usize,
        completed_calls: usize,
    },
    #[error("{connector} sync cancelled after {completed_calls} calls")]
    Cancelled {
        connector: Connector,
        completed_calls: usize,
    },
    #[error("{connector} playlist holds an item at position {position} that is not a track")]
    UnaddressableItem {
        connector: Connector,
        position: usize,
        completed_calls: usize,
    },
    #[error("{connector} cannot apply diff: {reason}")]
    InvalidDiff { connector: Connector, reason: String },
}

impl SyncError {
    /// Remote calls that completed before the failure.
    pub fn completed_calls(&self) -> usize {
        match self {
            SyncError::Transport {
                completed_calls, ..
            }
            | SyncError::Conflict {
                completed_calls, ..
            }
            | SyncError::BudgetExhausted {
                completed_calls, ..
            }
            | SyncError::Cancelled {
                completed_calls, ..
            }
            | SyncError::UnaddressableItem {
                completed_calls, ..
            } => *completed_calls,
            SyncError::InvalidDiff { .. } => 0,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict { .. })
    }
}

/// Pushes a computed diff to one external platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SyncService: Send + Sync {
    fn connector(&self) -> Connector;

    /// Whether `playlist` is linked to this service's platform.
    fn supports(&self, playlist: &Playlist) -> bool;

    async fn sync(
        &self,
        playlist: &Playlist,
        diff: &PlaylistDiff,
        context: &SyncContext,
    ) -> Result<SyncOutcome, SyncError>;
}
