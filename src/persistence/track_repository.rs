use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::database::Database;
use crate::domain::{ConnectorMap, Track};
use crate::entities;
use crate::ports::repository::TrackRepository;

pub struct SeaTrackRepository {
    db: Arc<Database>,
}

impl SeaTrackRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl TrackRepository for SeaTrackRepository {
    async fn save(&self, track: &Track) -> Result<Track> {
        save_track(&self.db.conn, track).await
    }
}

/// Finds the stored track for `track`: by local id first, then by any connector id.
async fn find_existing(
    conn: &impl ConnectionTrait,
    track: &Track,
) -> Result<Option<entities::track::Model>> {
    if let Some(id) = track.id
        && let Some(model) = entities::track::Entity::find_by_id(id)
            .one(conn)
            .await
            .wrap_err("Failed to fetch track")?
    {
        return Ok(Some(model));
    }

    for (connector, external_id) in track.connector_ids.iter() {
        let Some(link) =
            entities::track_connector_id::Entity::find_by_id((connector, external_id.to_string()))
                .one(conn)
                .await
                .wrap_err("Failed to fetch track connector id")?
        else {
            continue;
        };

        return entities::track::Entity::find_by_id(link.track_id)
            .one(conn)
            .await
            .wrap_err("Failed to fetch track");
    }

    Ok(None)
}

/// Upserts a track and its connector ids, returning it with its local id set.
pub(crate) async fn save_track(conn: &impl ConnectionTrait, track: &Track) -> Result<Track> {
    let artists = serde_json::to_string(&track.artists).wrap_err("Failed to encode artists")?;
    let duration_ms = track.duration_ms.map(i64::from);

    let id = match find_existing(conn, track).await? {
        Some(existing) => {
            let id = existing.id;
            let mut model: entities::track::ActiveModel = existing.into();
            model.title = Set(track.title.clone());
            model.artists = Set(artists);
            model.album = Set(track.album.clone());
            model.duration_ms = Set(duration_ms);
            model.isrc = Set(track.isrc.clone());
            model.updated_at = Set(Utc::now().timestamp());
            model
                .update(conn)
                .await
                .wrap_err_with(|| format!("Failed to update track '{}'", track.title))?;
            id
        }
        None => {
            let model = entities::track::ActiveModel {
                title: Set(track.title.clone()),
                artists: Set(artists),
                album: Set(track.album.clone()),
                duration_ms: Set(duration_ms),
                isrc: Set(track.isrc.clone()),
                ..Default::default()
            };
            model
                .insert(conn)
                .await
                .wrap_err_with(|| format!("Failed to insert track '{}'", track.title))?
                .id
        }
    };

    for (connector, external_id) in track.connector_ids.iter() {
        let existing =
            entities::track_connector_id::Entity::find_by_id((connector, external_id.to_string()))
                .one(conn)
                .await
                .wrap_err("Failed to fetch track connector id")?;
        if existing.is_some() {
            continue;
        }

        entities::track_connector_id::ActiveModel {
            connector: Set(connector),
            external_id: Set(external_id.to_string()),
            track_id: Set(id),
        }
        .insert(conn)
        .await
        .wrap_err("Failed to link track connector id")?;
    }

    Ok(track.clone().with_id(id))
}

/// Loads tracks by id, keyed by id so callers can lay them out in any order.
pub(crate) async fn load_tracks(
    conn: &impl ConnectionTrait,
    ids: &[i64],
) -> Result<HashMap<i64, Track>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let models = entities::track::Entity::find()
        .filter(entities::track::Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await
        .wrap_err("Failed to fetch tracks")?;

    let mut connector_ids: HashMap<i64, ConnectorMap> = HashMap::new();
    for link in entities::track_connector_id::Entity::find()
        .filter(entities::track_connector_id::Column::TrackId.is_in(ids.iter().copied()))
        .all(conn)
        .await
        .wrap_err("Failed to fetch track connector ids")?
    {
        connector_ids
            .entry(link.track_id)
            .or_default()
            .insert(link.connector, link.external_id);
    }

    models
        .into_iter()
        .map(|model| -> Result<(i64, Track)> {
            let artists: Vec<String> = serde_json::from_str(&model.artists)
                .wrap_err_with(|| format!("Invalid artists for track {}", model.id))?;
            let track = Track {
                id: Some(model.id),
                title: model.title,
                artists,
                album: model.album,
                duration_ms: model.duration_ms.map(u32::try_from).transpose()?,
                isrc: model.isrc,
                connector_ids: connector_ids.remove(&model.id).unwrap_or_default(),
            };
            Ok((model.id, track))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Connector;
    use crate::test_utils::test_db;

    #[tokio::test]
    async fn test_save_assigns_id() {
        let db = test_db().await;
        let repo = SeaTrackRepository::new(db.clone());

        let saved = repo
            .save(&Track::new("Glory Box", vec!["Portishead".into()]).with_isrc("GBAAN9400045"))
            .await
            .unwrap();

        let id = saved.id.unwrap();
        let loaded = load_tracks(&db.conn, &[id]).await.unwrap();
        assert_eq!(loaded[&id].title, "Glory Box");
        assert_eq!(loaded[&id].artists, vec!["Portishead".to_string()]);
        assert_eq!(loaded[&id].isrc.as_deref(), Some("GBAAN9400045"));
    }

    #[tokio::test]
    async fn test_upsert_by_connector_id() {
        let db = test_db().await;
        let repo = SeaTrackRepository::new(db.clone());

        let first = repo
            .save(
                &Track::new("Roads", vec!["Portishead".into()])
                    .with_connector_id(Connector::Spotify, "abc"),
            )
            .await
            .unwrap();
        let second = repo
            .save(
                &Track::new("Roads (Live)", vec!["Portishead".into()])
                    .with_connector_id(Connector::Spotify, "abc")
                    .with_connector_id(Connector::Plex, "77"),
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);

        let id = second.id.unwrap();
        let loaded = load_tracks(&db.conn, &[id]).await.unwrap();
        assert_eq!(loaded[&id].title, "Roads (Live)");
        assert_eq!(loaded[&id].connector_id(Connector::Plex), Some("77"));
        assert_eq!(loaded[&id].connector_id(Connector::Spotify), Some("abc"));
    }

    #[tokio::test]
    async fn test_long_durations_are_stored() {
        let db = test_db().await;
        let repo = SeaTrackRepository::new(db.clone());

        let mut track = Track::new("Endless", vec!["Drone".into()]);
        track.duration_ms = Some(u32::MAX);
        let id = repo.save(&track).await.unwrap().id.unwrap();

        let loaded = load_tracks(&db.conn, &[id]).await.unwrap();
        assert_eq!(loaded[&id].duration_ms, Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_tracks_without_ids_are_inserted() {
        let db = test_db().await;
        let repo = SeaTrackRepository::new(db);

        let a = repo
            .save(&Track::new("Sour Times", vec!["Portishead".into()]))
            .await
            .unwrap();
        let b = repo
            .save(&Track::new("Sour Times", vec!["Portishead".into()]))
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
    }
}
