use color_eyre::eyre::Result;

/// One entry of a removal request. Spotify removes the item at each listed position, so
/// duplicates of a uri elsewhere in the playlist are left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyTrackRemoval {
    pub uri: String,
    pub positions: Vec<usize>,
}

/// One page of playlist items. `uris` holds `None` for entries Spotify no longer resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotifyItemsPage {
    pub uris: Vec<Option<String>>,
    pub total: usize,
}

/// Port trait wrapping the Spotify playlist endpoints used by the sync service.
///
/// Implementations live in `services::spotify::client` (production) or test mocks. Every mutating
/// call returns the playlist's new snapshot id.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyPlaylistClient: Send + Sync {
    async fn snapshot_id(&self, playlist_id: &str) -> Result<String>;

    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SpotifyItemsPage>;

    async fn add_items(&self, playlist_id: &str, uris: &[String], position: usize)
    -> Result<String>;

    async fn remove_items(
        &self,
        playlist_id: &str,
        items: &[SpotifyTrackRemoval],
        snapshot_id: &str,
    ) -> Result<String>;

    /// Moves the item at `range_start` so that it lands in front of the item currently at
    /// `insert_before`.
    async fn reorder_items(
        &self,
        playlist_id: &str,
        range_start: usize,
        insert_before: usize,
        snapshot_id: &str,
    ) -> Result<String>;
}
