use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::{DeriveActiveEnum, EnumIter, StringLen};
use serde::{Deserialize, Serialize};

/// An external music service a playlist or track can be linked to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Connector {
    #[sea_orm(string_value = "spotify")]
    Spotify,
    #[sea_orm(string_value = "plex")]
    Plex,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::Spotify => "spotify",
            Connector::Plex => "plex",
        }
    }

    /// Builds the connector-native URI for a track id.
    pub fn track_uri(&self, external_id: &str) -> String {
        match self {
            Connector::Spotify => format!("spotify:track:{}", external_id),
            Connector::Plex => format!("/library/metadata/{}", external_id),
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Connector {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spotify" => Ok(Connector::Spotify),
            "plex" => Ok(Connector::Plex),
            other => Err(color_eyre::eyre::eyre!("Unknown connector: {}", other)),
        }
    }
}

/// Connector-keyed string values: external ids on tracks and playlists, version tokens in
/// playlist metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorMap(BTreeMap<Connector, String>);

impl ConnectorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, connector: Connector) -> Option<&str> {
        self.0.get(&connector).map(String::as_str)
    }

    pub fn insert(&mut self, connector: Connector, value: impl Into<String>) -> Option<String> {
        self.0.insert(connector, value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in connector order.
    pub fn iter(&self) -> impl Iterator<Item = (Connector, &str)> {
        self.0.iter().map(|(connector, value)| (*connector, value.as_str()))
    }

    /// Overwrites entries with the ones in `other`.
    pub fn merge(&mut self, other: &ConnectorMap) {
        for (connector, value) in other.iter() {
            self.insert(connector, value);
        }
    }
}

impl FromIterator<(Connector, String)> for ConnectorMap {
    fn from_iter<I: IntoIterator<Item = (Connector, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Local id, `None` until the track has been persisted.
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u32>,
    #[serde(default)]
    pub isrc: Option<String>,
    /// Platform-native track ids.
    #[serde(default)]
    pub connector_ids: ConnectorMap,
}

impl Track {
    pub fn new(title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            artists,
            album: None,
            duration_ms: None,
            isrc: None,
            connector_ids: ConnectorMap::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.isrc = Some(isrc.into());
        self
    }

    pub fn with_connector_id(mut self, connector: Connector, external_id: impl Into<String>) -> Self {
        self.connector_ids.insert(connector, external_id);
        self
    }

    pub fn connector_id(&self, connector: Connector) -> Option<&str> {
        self.connector_ids.get(connector)
    }

    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    /// URI of the first linked connector, in connector order.
    pub fn primary_uri(&self) -> Option<String> {
        self.connector_ids
            .iter()
            .next()
            .map(|(connector, external_id)| connector.track_uri(external_id))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary_artist() {
            Some(artist) => write!(f, "{} - {}", artist, self.title),
            None => f.write_str(&self.title),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceMetadata {
    /// Where the sequence came from, e.g. a file name or a connector.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSequence {
    tracks: Vec<Track>,
    #[serde(default)]
    metadata: SequenceMetadata,
}

impl TrackSequence {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            metadata: SequenceMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: SequenceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn metadata(&self) -> &SequenceMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

impl From<Vec<Track>> for TrackSequence {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}
