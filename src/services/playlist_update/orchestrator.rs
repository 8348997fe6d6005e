use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::command::{PlaylistRef, UpdateCommand};
use super::error::{UpdateError, ValidationError};
use super::executor::OperationExecutor;
use crate::domain::{Connector, OperationTarget, Playlist, PlaylistDiff};
use crate::ports::repository::{PlaylistRepository, TrackRepository};
use crate::ports::sync::{SyncContext, SyncService};
use crate::services::playlist_diff::DiffCalculator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Init,
    Validated,
    Diffed,
    NoChange,
    Executing,
    Persisted,
    Syncing,
    Done,
}

impl UpdatePhase {
    pub fn can_transition_to(self, next: UpdatePhase) -> bool {
        use UpdatePhase::*;

        matches!(
            (self, next),
            (Init, Validated)
                | (Validated, Diffed)
                | (Diffed, NoChange)
                | (Diffed, Done)
                | (Diffed, Executing)
                | (NoChange, Done)
                | (Executing, Persisted)
                | (Persisted, Syncing)
                | (Syncing, Done)
        )
    }
}

fn advance(phase: &mut UpdatePhase, next: UpdatePhase) {
    debug_assert!(
        phase.can_transition_to(next),
        "illegal update phase transition {:?} -> {:?}",
        phase,
        next
    );
    debug!("Update phase {:?} -> {:?}", phase, next);
    *phase = next;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Current and target already agree.
    Unchanged,
    /// Dry run: the diff was computed and nothing was applied.
    Preview,
    Applied,
}

#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub playlist: Playlist,
    pub diff: PlaylistDiff,
    pub outcome: UpdateOutcome,
    pub tracks_added: usize,
    pub tracks_removed: usize,
    pub tracks_moved: usize,
    pub api_calls_made: usize,
    pub conflicts: usize,
    pub errors: Vec<String>,
}

impl UpdateResult {
    fn without_changes(playlist: Playlist, diff: PlaylistDiff, outcome: UpdateOutcome) -> Self {
        Self {
            playlist,
            diff,
            outcome,
            tracks_added: 0,
            tracks_removed: 0,
            tracks_moved: 0,
            api_calls_made: 0,
            conflicts: 0,
            errors: Vec::new(),
        }
    }
}

/// Entry point for updating a playlist to a target track sequence.
pub struct UpdateOrchestrator<P: PlaylistRepository + ?Sized, T: TrackRepository + ?Sized> {
    playlists: Arc<P>,
    executor: OperationExecutor<T>,
    services: Vec<Arc<dyn SyncService>>,
    max_batch_size: usize,
}

impl<P: PlaylistRepository + ?Sized, T: TrackRepository + ?Sized> UpdateOrchestrator<P, T> {
    pub fn new(playlists: Arc<P>, tracks: Arc<T>, max_batch_size: usize) -> Self {
        Self {
            playlists,
            executor: OperationExecutor::new(tracks),
            services: Vec::new(),
            max_batch_size,
        }
    }

    pub fn with_service(mut self, service: Arc<dyn SyncService>) -> Self {
        self.services.push(service);
        self
    }

    pub async fn execute(&self, command: UpdateCommand) -> Result<UpdateResult, UpdateError> {
        self.execute_with_cancellation(command, CancellationToken::new())
            .await
    }

    #[instrument(skip_all, fields(playlist = %command.playlist))]
    pub async fn execute_with_cancellation(
        &self,
        command: UpdateCommand,
        cancellation: CancellationToken,
    ) -> Result<UpdateResult, UpdateError> {
        let mut phase = UpdatePhase::Init;

        command.validate(self.max_batch_size)?;
        advance(&mut phase, UpdatePhase::Validated);

        let UpdateCommand {
            playlist: reference,
            target,
            options,
        } = command;

        let playlist = self.resolve(&reference).await?;

        let services: Vec<&Arc<dyn SyncService>> = if options.syncs_remote() {
            self.services
                .iter()
                .filter(|service| service.supports(&playlist))
                .collect()
        } else {
            Vec::new()
        };
        if options.syncs_remote() && services.is_empty() {
            return Err(ValidationError::NoRemotePlaylist {
                playlist_id: playlist.id,
            }
            .into());
        }

        let diff = DiffCalculator::new(options.batch_size).compute_diff(
            &playlist.tracks,
            &target,
            options.strategy,
        );
        advance(&mut phase, UpdatePhase::Diffed);

        let pending: Vec<Connector> = services
            .iter()
            .map(|service| service.connector())
            .filter(|connector| playlist.metadata.is_sync_pending(*connector))
            .collect();

        if !diff.has_changes() && pending.is_empty() {
            advance(&mut phase, UpdatePhase::NoChange);
            advance(&mut phase, UpdatePhase::Done);
            info!("Playlist '{}' already matches the target", playlist.name);
            return Ok(UpdateResult::without_changes(
                playlist,
                diff,
                UpdateOutcome::Unchanged,
            ));
        }

        if options.dry_run {
            advance(&mut phase, UpdatePhase::Done);
            info!(
                operations = diff.operations.len(),
                api_call_estimate = diff.api_call_estimate,
                pending = ?pending,
                "Dry run for playlist '{}'",
                playlist.name
            );
            return Ok(UpdateResult::without_changes(
                playlist,
                diff,
                UpdateOutcome::Preview,
            ));
        }

        if cancellation.is_cancelled() {
            return Err(UpdateError::Cancelled);
        }

        advance(&mut phase, UpdatePhase::Executing);
        let report = self
            .executor
            .execute(&playlist.tracks, &diff, &options)
            .await?;
        let mut errors = report.errors;
        // remotes mirror what is stored, so unsaved tracks are retried everywhere next run
        let remote_diff = diff.without_adds_at(&report.unsaved);

        let playlist_id = playlist.id;
        let local = playlist
            .clone()
            .with_tracks(report.sequence.with_metadata(target.metadata().clone()));
        let mut updated = self
            .playlists
            .update(playlist_id, &local)
            .await
            .map_err(|cause| UpdateError::Persistence { playlist_id, cause })?;
        advance(&mut phase, UpdatePhase::Persisted);

        advance(&mut phase, UpdatePhase::Syncing);
        if options.target == OperationTarget::Bidirectional && options.sync_external {
            for (connector, external_id) in updated.connector_ids.iter() {
                if !services.iter().any(|service| service.connector() == connector) {
                    let message = format!(
                        "No sync service attached for {} playlist {}",
                        connector, external_id
                    );
                    warn!("{}", message);
                    errors.push(message);
                }
            }
        }

        let mut api_calls_made = 0;
        let mut conflicts = 0;
        let mut metadata_changed = false;
        for service in services {
            let connector = service.connector();
            let reconcile = updated.metadata.is_sync_pending(connector);
            if !remote_diff.has_changes() && !reconcile {
                continue;
            }
            if cancellation.is_cancelled() {
                let message = format!("{} sync skipped: update cancelled", connector);
                warn!("{}", message);
                errors.push(message);
                metadata_changed |= updated.metadata.set_sync_pending(connector, true);
                continue;
            }

            let context = SyncContext {
                options: options.clone(),
                call_budget: options.max_api_calls.saturating_sub(api_calls_made),
                cancellation: cancellation.clone(),
                reconcile,
            };

            match service.sync(&updated, &remote_diff, &context).await {
                Ok(outcome) => {
                    debug!(
                        %connector,
                        api_calls = outcome.api_calls_made,
                        conflicts = outcome.conflicts,
                        reconcile,
                        "Sync finished"
                    );
                    api_calls_made += outcome.api_calls_made;
                    conflicts += outcome.conflicts;
                    for warning in outcome.warnings {
                        warn!("{}", warning);
                        errors.push(warning);
                    }
                    if !outcome.patch.is_empty() {
                        updated.metadata.apply(&outcome.patch);
                        metadata_changed = true;
                    }
                    metadata_changed |= updated.metadata.set_sync_pending(connector, false);
                }
                Err(err) => {
                    api_calls_made += err.completed_calls();
                    if err.is_conflict() {
                        // the remote keeps its own changes, nothing to catch up on
                        conflicts += 1;
                    } else {
                        metadata_changed |= updated.metadata.set_sync_pending(connector, true);
                    }
                    warn!("{} sync failed: {}", connector, err);
                    errors.push(err.to_string());
                }
            }
        }

        if metadata_changed {
            match self.playlists.update(playlist_id, &updated).await {
                Ok(stored) => updated = stored,
                Err(err) => {
                    let message = format!("Failed to persist sync metadata: {:#}", err);
                    warn!("{}", message);
                    errors.push(message);
                }
            }
        }
        advance(&mut phase, UpdatePhase::Done);

        info!(
            added = report.tracks_added,
            removed = report.tracks_removed,
            moved = report.tracks_moved,
            api_calls_made,
            errors = errors.len(),
            "Updated playlist '{}'",
            updated.name
        );

        Ok(UpdateResult {
            playlist: updated,
            diff,
            outcome: UpdateOutcome::Applied,
            tracks_added: report.tracks_added,
            tracks_removed: report.tracks_removed,
            tracks_moved: report.tracks_moved,
            api_calls_made,
            conflicts,
            errors,
        })
    }

    async fn resolve(&self, reference: &PlaylistRef) -> Result<Playlist, UpdateError> {
        let found = match reference {
            PlaylistRef::Internal(id) => self.playlists.get_by_id(*id).await,
            PlaylistRef::Connector {
                connector,
                external_id,
            } => {
                self.playlists
                    .get_by_connector(*connector, external_id)
                    .await
            }
        }
        .map_err(UpdateError::Lookup)?;

        found.ok_or_else(|| UpdateError::NotFound(reference.to_string()))
    }
}
