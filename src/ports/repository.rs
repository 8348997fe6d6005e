use color_eyre::eyre::Result;

use crate::domain::{Connector, Playlist, Track};

/// Durable playlist storage.
///
/// Implementations live in `persistence` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Playlist>>;

    async fn get_by_connector(
        &self,
        connector: Connector,
        external_id: &str,
    ) -> Result<Option<Playlist>>;

    /// Inserts a new playlist and returns it with its assigned id.
    async fn save(&self, playlist: &Playlist) -> Result<Playlist>;

    /// Replaces the stored playlist `id` atomically: tracks, connector ids and metadata.
    async fn update(&self, id: i64, playlist: &Playlist) -> Result<Playlist>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrackRepository: Send + Sync {
    /// Upserts a track, keyed by any of its connector track ids when it has one.
    async fn save(&self, track: &Track) -> Result<Track>;
}
