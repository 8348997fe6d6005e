use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{
    ConflictPolicy, Connector, MatchStrategy, MetadataPatch, Playlist, PlaylistDiff, Track,
    TrackSequence,
};
use crate::ports::spotify::{SpotifyPlaylistClient, SpotifyTrackRemoval};
use crate::ports::sync::{SyncContext, SyncError, SyncOutcome, SyncService};
use crate::services::playlist_diff::DiffCalculator;
use crate::services::playlist_update::sequencer::{Member, Step, sequence_operations};

const CONNECTOR: Connector = Connector::Spotify;
const TRACK_URI_PREFIX: &str = "spotify:track:";
const ITEMS_PAGE_SIZE: usize = 100;

fn spotify_uri(track: &Track, external_uri: Option<&str>) -> Option<String> {
    track
        .connector_id(CONNECTOR)
        .map(|id| CONNECTOR.track_uri(id))
        .or_else(|| {
            external_uri
                .filter(|uri| uri.starts_with("spotify:"))
                .map(str::to_string)
        })
}

fn member_uri(member: Member<'_>) -> Option<String> {
    spotify_uri(member.track(), member.external_uri())
}

/// Counts completed calls and gates every new one on cancellation and the remaining budget.
struct CallBudget<'a> {
    limit: usize,
    used: usize,
    cancellation: &'a CancellationToken,
}

impl CallBudget<'_> {
    fn reserve(&self) -> Result<(), SyncError> {
        if self.cancellation.is_cancelled() {
            return Err(SyncError::Cancelled {
                connector: CONNECTOR,
                completed_calls: self.used,
            });
        }
        if self.used >= self.limit {
            return Err(SyncError::BudgetExhausted {
                connector: CONNECTOR,
                budget: self.limit,
                completed_calls: self.used,
            });
        }
        Ok(())
    }

    fn complete<T>(&mut self, result: color_eyre::Result<T>) -> Result<T, SyncError> {
        match result {
            Ok(value) => {
                self.used += 1;
                Ok(value)
            }
            Err(err) => Err(SyncError::Transport {
                connector: CONNECTOR,
                completed_calls: self.used,
                reason: format!("{:#}", err),
            }),
        }
    }
}

/// Merges entries for the same uri so each uri appears once per request.
fn group_removals(chunk: &[(usize, String)]) -> Vec<SpotifyTrackRemoval> {
    let mut items: Vec<SpotifyTrackRemoval> = Vec::new();
    for (position, uri) in chunk {
        match items.iter_mut().find(|item| &item.uri == uri) {
            Some(item) => item.positions.push(*position),
            None => items.push(SpotifyTrackRemoval {
                uri: uri.clone(),
                positions: vec![*position],
            }),
        }
    }
    items
}

pub struct SpotifySyncService<C: SpotifyPlaylistClient> {
    client: C,
}

impl<C: SpotifyPlaylistClient> SpotifySyncService<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl<C: SpotifyPlaylistClient> SyncService for SpotifySyncService<C> {
    fn connector(&self) -> Connector {
        CONNECTOR
    }

    fn supports(&self, playlist: &Playlist) -> bool {
        playlist.external_id(CONNECTOR).is_some()
    }

    async fn sync(
        &self,
        playlist: &Playlist,
        diff: &PlaylistDiff,
        context: &SyncContext,
    ) -> Result<SyncOutcome, SyncError> {
        let playlist_id = playlist
            .external_id(CONNECTOR)
            .ok_or_else(|| SyncError::InvalidDiff {
                connector: CONNECTOR,
                reason: format!("playlist {} is not linked to Spotify", playlist.id),
            })?;

        let batch_size = context.options.batch_size.max(1);
        let mut budget = CallBudget {
            limit: context.call_budget,
            used: 0,
            cancellation: &context.cancellation,
        };

        let remote_diff;
        let diff = if context.reconcile {
            remote_diff = self
                .remote_diff(playlist_id, playlist, &mut budget, batch_size)
                .await?;
            &remote_diff
        } else {
            diff
        };

        // tracks without a Spotify uri cannot be on the remote playlist
        let mut warnings = Vec::new();
        let steps = sequence_operations(diff, |member| {
            let known = member_uri(member).is_some();
            if !known && let Member::Operation(op) = member {
                warnings.push(format!("Skipped {} on spotify: no Spotify track id", op));
            }
            known
        })
        .map_err(|err| SyncError::InvalidDiff {
            connector: CONNECTOR,
            reason: err.to_string(),
        })?;

        let mut removes = Vec::new();
        let mut inserts = Vec::new();
        let mut relocations = Vec::new();
        for step in &steps {
            let uri = member_uri(Member::Operation(step.operation()));
            match step {
                Step::Remove { index, .. } => removes.extend(uri.map(|uri| (*index, uri))),
                Step::Insert { index, .. } => inserts.extend(uri.map(|uri| (*index, uri))),
                Step::Relocate { from, .. } if !step.is_noop() => {
                    relocations.extend(step.insert_before().map(|before| (*from, before)))
                }
                Step::Relocate { .. } => {}
            }
        }

        budget.reserve()?;
        let remote = budget.complete(self.client.snapshot_id(playlist_id).await)?;

        // a reconciling run has just read the remote contents, so its token is expected to differ
        let mut conflicts = 0;
        if !context.reconcile
            && let Some(stored) = playlist.metadata.version_token(CONNECTOR)
            && stored != remote
        {
            match context.options.conflict_policy {
                ConflictPolicy::RemoteWins => {
                    return Err(SyncError::Conflict {
                        connector: CONNECTOR,
                        expected: stored.to_string(),
                        actual: remote,
                        completed_calls: budget.used,
                    });
                }
                ConflictPolicy::LocalWins => {
                    warn!(
                        "Spotify playlist {} changed remotely ({} -> {}), applying local changes",
                        playlist_id, stored, remote
                    );
                    conflicts += 1;
                }
            }
        }

        let mut snapshot = remote;

        // descending positions, so earlier batches never shift later ones
        for chunk in removes.chunks(batch_size) {
            let items = group_removals(chunk);
            budget.reserve()?;
            snapshot = budget.complete(
                self.client
                    .remove_items(playlist_id, &items, &snapshot)
                    .await,
            )?;
            debug!(count = chunk.len(), "Removed Spotify playlist items");
        }

        for run in inserts.chunk_by(|a, b| b.0 == a.0 + 1) {
            for chunk in run.chunks(batch_size) {
                let position = chunk[0].0;
                let uris: Vec<String> = chunk.iter().map(|(_, uri)| uri.clone()).collect();
                budget.reserve()?;
                snapshot =
                    budget.complete(self.client.add_items(playlist_id, &uris, position).await)?;
                debug!(count = uris.len(), position, "Added Spotify playlist items");
            }
        }

        for (range_start, insert_before) in relocations {
            budget.reserve()?;
            snapshot = budget.complete(
                self.client
                    .reorder_items(playlist_id, range_start, insert_before, &snapshot)
                    .await,
            )?;
        }

        info!(
            api_calls = budget.used,
            snapshot = %snapshot,
            "Synced Spotify playlist {}",
            playlist_id
        );

        Ok(SyncOutcome {
            patch: MetadataPatch::version_token(CONNECTOR, snapshot),
            api_calls_made: budget.used,
            conflicts,
            warnings,
        })
    }
}

impl<C: SpotifyPlaylistClient> SpotifySyncService<C> {
    /// Reads the remote playlist and diffs it against the tracks of `playlist` that Spotify knows.
    async fn remote_diff(
        &self,
        playlist_id: &str,
        playlist: &Playlist,
        budget: &mut CallBudget<'_>,
        batch_size: usize,
    ) -> Result<PlaylistDiff, SyncError> {
        let mut remote = Vec::new();
        loop {
            budget.reserve()?;
            let page = budget.complete(
                self.client
                    .playlist_items(playlist_id, remote.len(), ITEMS_PAGE_SIZE)
                    .await,
            )?;
            let fetched = page.uris.len();
            for uri in page.uris {
                let Some(id) = uri
                    .as_deref()
                    .and_then(|uri| uri.strip_prefix(TRACK_URI_PREFIX))
                else {
                    return Err(SyncError::UnaddressableItem {
                        connector: CONNECTOR,
                        position: remote.len(),
                        completed_calls: budget.used,
                    });
                };
                remote.push(Track::new(id, Vec::new()).with_connector_id(CONNECTOR, id));
            }
            if fetched == 0 || remote.len() >= page.total {
                break;
            }
        }

        let local: Vec<Track> = playlist
            .tracks
            .tracks()
            .iter()
            .filter(|track| track.connector_id(CONNECTOR).is_some())
            .cloned()
            .collect();
        debug!(
            remote = remote.len(),
            local = local.len(),
            "Reconciling Spotify playlist {}",
            playlist_id
        );

        Ok(DiffCalculator::new(batch_size).compute_diff(
            &TrackSequence::new(remote),
            &TrackSequence::new(local),
            MatchStrategy::PlatformId,
        ))
    }
}
