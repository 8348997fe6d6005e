use serde::{Deserialize, Serialize};

/// Largest batch the reference external API accepts per call.
pub const PLATFORM_BATCH_LIMIT: usize = 100;

/// Where an update is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OperationTarget {
    /// Only the local store.
    LocalOnly,
    /// The local store, then every linked connector.
    #[default]
    RemoteEnabled,
    /// Same propagation as `RemoteEnabled`; every linked connector must be served.
    Bidirectional,
}

impl OperationTarget {
    pub fn is_remote(&self) -> bool {
        !matches!(self, OperationTarget::LocalOnly)
    }
}

/// What to do when a connector's version token no longer matches the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Apply the local changes against the remote's current version.
    #[default]
    LocalWins,
    /// Leave the remote untouched.
    RemoteWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    PlatformId,
    Isrc,
    Fuzzy,
    #[default]
    Comprehensive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOptions {
    pub target: OperationTarget,
    pub conflict_policy: ConflictPolicy,
    pub strategy: MatchStrategy,
    pub dry_run: bool,
    pub batch_size: usize,
    pub max_api_calls: usize,
    pub sync_external: bool,
    pub fail_on_track_error: bool,
}

impl UpdateOptions {
    pub fn local_only() -> Self {
        Self {
            target: OperationTarget::LocalOnly,
            sync_external: false,
            ..Self::default()
        }
    }

    /// Whether this run should reach any SyncService at all.
    pub fn syncs_remote(&self) -> bool {
        self.target.is_remote() && self.sync_external
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            target: OperationTarget::default(),
            conflict_policy: ConflictPolicy::default(),
            strategy: MatchStrategy::default(),
            dry_run: false,
            batch_size: PLATFORM_BATCH_LIMIT,
            max_api_calls: 500,
            sync_external: true,
            fail_on_track_error: false,
        }
    }
}
