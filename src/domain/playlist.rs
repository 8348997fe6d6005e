use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::track::{Connector, ConnectorMap, TrackSequence};

/// Typed playlist metadata; replaces an open string-keyed map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistMetadata {
    /// Version/snapshot token last returned by each connector.
    pub version_tokens: ConnectorMap,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Connectors whose last sync failed, so the remote may differ from the stored tracks.
    #[serde(default)]
    pub pending_sync: BTreeSet<Connector>,
}

impl PlaylistMetadata {
    pub fn version_token(&self, connector: Connector) -> Option<&str> {
        self.version_tokens.get(connector)
    }

    pub fn is_sync_pending(&self, connector: Connector) -> bool {
        self.pending_sync.contains(&connector)
    }

    /// Records the outcome of a sync; returns whether the marker changed.
    pub fn set_sync_pending(&mut self, connector: Connector, pending: bool) -> bool {
        if pending {
            self.pending_sync.insert(connector)
        } else {
            self.pending_sync.remove(&connector)
        }
    }

    pub fn apply(&mut self, patch: &MetadataPatch) {
        self.version_tokens.merge(&patch.version_tokens);
        if patch.synced_at.is_some() {
            self.last_synced_at = patch.synced_at;
        }
    }
}

/// Metadata produced by one remote sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub version_tokens: ConnectorMap,
    pub synced_at: Option<DateTime<Utc>>,
}

impl MetadataPatch {
    pub fn version_token(connector: Connector, token: impl Into<String>) -> Self {
        let mut version_tokens = ConnectorMap::new();
        version_tokens.insert(connector, token);
        Self {
            version_tokens,
            synced_at: Some(Utc::now()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.version_tokens.is_empty() && self.synced_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tracks: TrackSequence,
    /// External playlist ids per connector.
    pub connector_ids: ConnectorMap,
    pub metadata: PlaylistMetadata,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            tracks: TrackSequence::default(),
            connector_ids: ConnectorMap::new(),
            metadata: PlaylistMetadata::default(),
        }
    }

    pub fn external_id(&self, connector: Connector) -> Option<&str> {
        self.connector_ids.get(connector)
    }

    pub fn with_tracks(self, tracks: TrackSequence) -> Self {
        Self { tracks, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_patch_merges_tokens() {
        let mut metadata = PlaylistMetadata::default();
        metadata.version_tokens.insert(Connector::Spotify, "snap-1");
        metadata.version_tokens.insert(Connector::Plex, "plex-1");

        metadata.apply(&MetadataPatch::version_token(Connector::Spotify, "snap-2"));

        assert_eq!(metadata.version_token(Connector::Spotify), Some("snap-2"));
        assert_eq!(metadata.version_token(Connector::Plex), Some("plex-1"));
        assert!(metadata.last_synced_at.is_some());
    }

    #[test]
    fn test_sync_pending_marker() {
        let mut metadata = PlaylistMetadata::default();

        assert!(metadata.set_sync_pending(Connector::Spotify, true));
        assert!(!metadata.set_sync_pending(Connector::Spotify, true));
        assert!(metadata.is_sync_pending(Connector::Spotify));
        assert!(!metadata.is_sync_pending(Connector::Plex));

        assert!(metadata.set_sync_pending(Connector::Spotify, false));
        assert!(!metadata.is_sync_pending(Connector::Spotify));
    }

    #[test]
    fn test_empty_patch_keeps_sync_time() {
        let mut metadata = PlaylistMetadata {
            last_synced_at: Some(Utc::now()),
            ..Default::default()
        };
        let before = metadata.last_synced_at;

        metadata.apply(&MetadataPatch::default());

        assert_eq!(metadata.last_synced_at, before);
    }
}
