use super::sequencer::SequenceError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Playlist reference is empty")]
    EmptyPlaylistRef,
    #[error("Target track sequence is empty")]
    EmptyTarget,
    #[error("Batch size must be at least 1")]
    BatchSizeZero,
    #[error("Batch size {batch_size} exceeds the platform limit of {limit}")]
    BatchSizeExceedsLimit { batch_size: usize, limit: usize },
    #[error("Max API calls must be at least 1")]
    MaxApiCallsTooLow,
    #[error("Playlist {playlist_id} is not linked to any attached sync service")]
    NoRemotePlaylist { playlist_id: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Playlist not found: {0}")]
    NotFound(String),
    #[error("Failed to persist playlist {playlist_id}: {cause:#}")]
    Persistence {
        playlist_id: i64,
        cause: color_eyre::Report,
    },
    #[error("Failed to save track '{title}': {cause:#}")]
    TrackPersistence {
        title: String,
        cause: color_eyre::Report,
    },
    #[error("Failed to load playlist: {0:#}")]
    Lookup(color_eyre::Report),
    #[error("Update cancelled before any change was made")]
    Cancelled,
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
