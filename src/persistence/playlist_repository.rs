use std::collections::BTreeSet;
use std::sync::Arc;

use color_eyre::eyre::{OptionExt, Result, WrapErr, eyre};
use tracing::{debug, warn};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use super::track_repository::{load_tracks, save_track};
use crate::database::Database;
use crate::domain::{Connector, ConnectorMap, Playlist, PlaylistMetadata, TrackSequence};
use crate::entities;
use crate::ports::repository::PlaylistRepository;

pub struct SeaPlaylistRepository {
    db: Arc<Database>,
}

impl SeaPlaylistRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

async fn load_playlist(
    conn: &impl ConnectionTrait,
    model: entities::playlist::Model,
) -> Result<Playlist> {
    let slots = entities::playlist_track::Entity::find()
        .filter(entities::playlist_track::Column::PlaylistId.eq(model.id))
        .order_by_asc(entities::playlist_track::Column::Position)
        .all(conn)
        .await
        .wrap_err("Failed to fetch playlist tracks")?;

    let ids: Vec<i64> = slots.iter().map(|slot| slot.track_id).collect();
    let by_id = load_tracks(conn, &ids).await?;
    let tracks = slots
        .iter()
        .map(|slot| {
            by_id.get(&slot.track_id).cloned().ok_or_else(|| {
                eyre!(
                    "Playlist {} references missing track {}",
                    model.id,
                    slot.track_id
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut connector_ids = ConnectorMap::new();
    let mut version_tokens = ConnectorMap::new();
    let mut pending_sync = BTreeSet::new();
    for link in entities::playlist_connector::Entity::find()
        .filter(entities::playlist_connector::Column::PlaylistId.eq(model.id))
        .all(conn)
        .await
        .wrap_err("Failed to fetch playlist connectors")?
    {
        if let Some(token) = link.version_token {
            version_tokens.insert(link.connector, token);
        }
        if link.sync_pending {
            pending_sync.insert(link.connector);
        }
        connector_ids.insert(link.connector, link.external_id);
    }

    Ok(Playlist {
        id: model.id,
        name: model.name,
        description: model.description,
        tracks: TrackSequence::new(tracks),
        connector_ids,
        metadata: PlaylistMetadata {
            version_tokens,
            last_synced_at: model.last_synced_at,
            pending_sync,
        },
    })
}

/// Rewrites the slots and connector links of `playlist_id`. Tracks without a local id have no row
/// to point at and are left out.
async fn write_contents(
    txn: &impl ConnectionTrait,
    playlist_id: i64,
    playlist: &Playlist,
) -> Result<()> {
    entities::playlist_track::Entity::delete_many()
        .filter(entities::playlist_track::Column::PlaylistId.eq(playlist_id))
        .exec(txn)
        .await
        .wrap_err("Failed to clear playlist tracks")?;

    let mut position = 0;
    for track in playlist.tracks.tracks() {
        let Some(track_id) = track.id else {
            warn!(playlist_id, "Not storing unsaved track '{}'", track);
            continue;
        };

        entities::playlist_track::ActiveModel {
            playlist_id: Set(playlist_id),
            position: Set(position),
            track_id: Set(track_id),
        }
        .insert(txn)
        .await
        .wrap_err_with(|| format!("Failed to store track at position {}", position))?;
        position += 1;
    }

    entities::playlist_connector::Entity::delete_many()
        .filter(entities::playlist_connector::Column::PlaylistId.eq(playlist_id))
        .exec(txn)
        .await
        .wrap_err("Failed to clear playlist connectors")?;

    for (connector, external_id) in playlist.connector_ids.iter() {
        entities::playlist_connector::ActiveModel {
            playlist_id: Set(playlist_id),
            connector: Set(connector),
            external_id: Set(external_id.to_string()),
            version_token: Set(playlist.metadata.version_token(connector).map(str::to_string)),
            sync_pending: Set(playlist.metadata.is_sync_pending(connector)),
        }
        .insert(txn)
        .await
        .wrap_err_with(|| format!("Failed to link playlist to {}", connector))?;
    }

    Ok(())
}

#[async_trait::async_trait]
impl PlaylistRepository for SeaPlaylistRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Playlist>> {
        let Some(model) = entities::playlist::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to fetch playlist")?
        else {
            return Ok(None);
        };

        load_playlist(&self.db.conn, model).await.map(Some)
    }

    async fn get_by_connector(
        &self,
        connector: Connector,
        external_id: &str,
    ) -> Result<Option<Playlist>> {
        let link = entities::playlist_connector::Entity::find()
            .filter(entities::playlist_connector::Column::Connector.eq(connector))
            .filter(entities::playlist_connector::Column::ExternalId.eq(external_id))
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to fetch playlist connector")?;

        match link {
            Some(link) => self.get_by_id(link.playlist_id).await,
            None => Ok(None),
        }
    }

    async fn save(&self, playlist: &Playlist) -> Result<Playlist> {
        let txn = self
            .db
            .conn
            .begin()
            .await
            .wrap_err("Failed to begin transaction")?;

        let model = entities::playlist::ActiveModel {
            name: Set(playlist.name.clone()),
            description: Set(playlist.description.clone()),
            last_synced_at: Set(playlist.metadata.last_synced_at),
            ..entities::playlist::ActiveModel::new()
        }
        .insert(&txn)
        .await
        .wrap_err_with(|| format!("Failed to insert playlist '{}'", playlist.name))?;

        let mut tracks = Vec::with_capacity(playlist.tracks.len());
        for track in playlist.tracks.tracks() {
            tracks.push(match track.id {
                Some(_) => track.clone(),
                None => save_track(&txn, track).await?,
            });
        }
        let contents = playlist.clone().with_tracks(TrackSequence::new(tracks));
        write_contents(&txn, model.id, &contents).await?;

        txn.commit()
            .await
            .wrap_err("Failed to commit transaction")?;

        load_playlist(&self.db.conn, model).await
    }

    async fn update(&self, id: i64, playlist: &Playlist) -> Result<Playlist> {
        let txn = self
            .db
            .conn
            .begin()
            .await
            .wrap_err("Failed to begin transaction")?;

        let existing = entities::playlist::Entity::find_by_id(id)
            .one(&txn)
            .await
            .wrap_err("Failed to fetch playlist")?
            .ok_or_eyre("Playlist not found")?;

        let mut model: entities::playlist::ActiveModel = existing.into();
        model.name = Set(playlist.name.clone());
        model.description = Set(playlist.description.clone());
        model.last_synced_at = Set(playlist.metadata.last_synced_at);
        let model = model
            .update(&txn)
            .await
            .wrap_err_with(|| format!("Failed to update playlist {}", id))?;

        write_contents(&txn, id, playlist).await?;

        txn.commit()
            .await
            .wrap_err("Failed to commit transaction")?;

        debug!(playlist_id = id, tracks = playlist.tracks.len(), "Stored playlist");
        load_playlist(&self.db.conn, model).await
    }
}
