use color_eyre::eyre::{Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ports::spotify::{SpotifyItemsPage, SpotifyPlaylistClient, SpotifyTrackRemoval};

pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1/";

#[derive(Debug, Clone, Deserialize)]
struct SnapshotResponse {
    snapshot_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemTrack {
    uri: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistItem {
    track: Option<ItemTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistItemsResponse {
    items: Vec<PlaylistItem>,
    total: usize,
}

impl From<PlaylistItemsResponse> for SpotifyItemsPage {
    fn from(res: PlaylistItemsResponse) -> Self {
        Self {
            uris: res
                .items
                .into_iter()
                .map(|item| item.track.map(|track| track.uri))
                .collect(),
            total: res.total,
        }
    }
}

#[derive(Debug, Serialize)]
struct AddItemsRequest<'a> {
    uris: &'a [String],
    position: usize,
}

#[derive(Debug, Serialize)]
struct RemovedTrack<'a> {
    uri: &'a str,
    positions: &'a [usize],
}

#[derive(Debug, Serialize)]
struct RemoveItemsRequest<'a> {
    tracks: Vec<RemovedTrack<'a>>,
    snapshot_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ReorderItemsRequest<'a> {
    range_start: usize,
    insert_before: usize,
    range_length: usize,
    snapshot_id: &'a str,
}

/// Spotify Web API adapter authenticated with a bearer token.
pub struct SpotifyWebClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl SpotifyWebClient {
    pub fn new(base_url: &str, access_token: impl Into<String>) -> Result<Self> {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(&base_url)
                .wrap_err_with(|| format!("Invalid Spotify API URL: {}", base_url))?,
            access_token: access_token.into(),
        })
    }

    fn playlist_url(&self, playlist_id: &str, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("playlists/{}{}", playlist_id, path))
            .wrap_err("Failed to build Spotify playlist URL")
    }
}

#[async_trait::async_trait]
impl SpotifyPlaylistClient for SpotifyWebClient {
    async fn snapshot_id(&self, playlist_id: &str) -> Result<String> {
        let mut url = self.playlist_url(playlist_id, "")?;
        url.query_pairs_mut().append_pair("fields", "snapshot_id");

        let res = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<SnapshotResponse>()
            .await
            .wrap_err("Failed to deserialize Spotify playlist snapshot")?;

        Ok(res.snapshot_id)
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<SpotifyItemsPage> {
        let mut url = self.playlist_url(playlist_id, "/tracks")?;
        url.query_pairs_mut()
            .append_pair("fields", "total,items(track(uri))")
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());

        let res = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<PlaylistItemsResponse>()
            .await
            .wrap_err("Failed to deserialize Spotify playlist items")?;

        Ok(res.into())
    }

    async fn add_items(
        &self,
        playlist_id: &str,
        uris: &[String],
        position: usize,
    ) -> Result<String> {
        let url = self.playlist_url(playlist_id, "/tracks")?;

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&AddItemsRequest { uris, position })
            .send()
            .await?
            .error_for_status()?
            .json::<SnapshotResponse>()
            .await
            .wrap_err("Failed to deserialize Spotify add items response")?;

        Ok(res.snapshot_id)
    }

    async fn remove_items(
        &self,
        playlist_id: &str,
        items: &[SpotifyTrackRemoval],
        snapshot_id: &str,
    ) -> Result<String> {
        let url = self.playlist_url(playlist_id, "/tracks")?;
        let body = RemoveItemsRequest {
            tracks: items
                .iter()
                .map(|item| RemovedTrack {
                    uri: &item.uri,
                    positions: &item.positions,
                })
                .collect(),
            snapshot_id,
        };

        let res = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<SnapshotResponse>()
            .await
            .wrap_err("Failed to deserialize Spotify remove items response")?;

        Ok(res.snapshot_id)
    }

    async fn reorder_items(
        &self,
        playlist_id: &str,
        range_start: usize,
        insert_before: usize,
        snapshot_id: &str,
    ) -> Result<String> {
        let url = self.playlist_url(playlist_id, "/tracks")?;

        let res = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&ReorderItemsRequest {
                range_start,
                insert_before,
                range_length: 1,
                snapshot_id,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<SnapshotResponse>()
            .await
            .wrap_err("Failed to deserialize Spotify reorder response")?;

        Ok(res.snapshot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_url() {
        let client = SpotifyWebClient::new("http://localhost:8080/v1", "token").unwrap();

        assert_eq!(
            client.playlist_url("abc", "/tracks").unwrap().as_str(),
            "http://localhost:8080/v1/playlists/abc/tracks"
        );
    }

    #[test]
    fn test_remove_request_shape() {
        let positions = [3, 1];
        let body = RemoveItemsRequest {
            tracks: vec![RemovedTrack {
                uri: "spotify:track:1",
                positions: &positions,
            }],
            snapshot_id: "snap",
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "tracks": [{ "uri": "spotify:track:1", "positions": [3, 1] }],
                "snapshot_id": "snap"
            })
        );
    }

    #[test]
    fn test_items_page_keeps_unresolved_entries() {
        let res: PlaylistItemsResponse = serde_json::from_value(serde_json::json!({
            "items": [
                { "track": { "uri": "spotify:track:1" } },
                { "track": null },
            ],
            "total": 7
        }))
        .unwrap();

        let page = SpotifyItemsPage::from(res);
        assert_eq!(page.uris, vec![Some("spotify:track:1".to_string()), None]);
        assert_eq!(page.total, 7);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(SpotifyWebClient::new("not a url", "token").is_err());
    }
}
