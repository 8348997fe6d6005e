use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::error::UpdateError;
use super::sequencer::{apply_steps, sequence_operations};
use crate::domain::{OperationKind, PlaylistDiff, Track, TrackSequence, UpdateOptions};
use crate::ports::repository::TrackRepository;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub sequence: TrackSequence,
    pub tracks_added: usize,
    pub tracks_removed: usize,
    pub tracks_moved: usize,
    /// Target slots of added tracks that could not be saved. They sit in `sequence` unsaved and
    /// are not stored with the playlist.
    pub unsaved: Vec<usize>,
    pub errors: Vec<String>,
}

/// Applies a diff to the local track sequence.
pub struct OperationExecutor<T: TrackRepository + ?Sized> {
    tracks: Arc<T>,
}

impl<T: TrackRepository + ?Sized> OperationExecutor<T> {
    pub fn new(tracks: Arc<T>) -> Self {
        Self { tracks }
    }

    /// Saves every added track, then rebuilds `current` into the target order.
    ///
    /// A track that fails to save is kept unsaved and the failure recorded, unless
    /// `fail_on_track_error` is set, in which case nothing is applied. The executor does not retry
    /// the save; the next run sees the track as missing and adds it again.
    pub async fn execute(
        &self,
        current: &TrackSequence,
        diff: &PlaylistDiff,
        options: &UpdateOptions,
    ) -> Result<ExecutionReport, UpdateError> {
        let steps = sequence_operations(diff, |_| true)?;
        let mut errors = Vec::new();
        let mut unsaved = Vec::new();

        let mut saved: HashMap<usize, Track> = HashMap::new();
        for op in diff.operations_of(OperationKind::Add) {
            let track = op.track();
            match self.tracks.save(track).await {
                Ok(stored) => {
                    saved.insert(op.position(), stored);
                }
                Err(cause) if options.fail_on_track_error => {
                    return Err(UpdateError::TrackPersistence {
                        title: track.title.clone(),
                        cause,
                    });
                }
                Err(err) => {
                    warn!("Failed to save track '{}': {:#}", track, err);
                    errors.push(format!("Failed to save track '{}': {:#}", track, err));
                    unsaved.push(op.position());
                }
            }
        }

        let mut tracks = current.tracks().to_vec();
        apply_steps(&mut tracks, &steps, |op| {
            saved
                .remove(&op.position())
                .unwrap_or_else(|| op.track().clone())
        });

        let count = |kind: OperationKind| {
            steps
                .iter()
                .filter(|step| step.operation().kind() == kind)
                .count()
        };
        let report = ExecutionReport {
            tracks_added: count(OperationKind::Add) - unsaved.len(),
            tracks_removed: count(OperationKind::Remove),
            tracks_moved: count(OperationKind::Move),
            sequence: TrackSequence::new(tracks),
            unsaved,
            errors,
        };

        debug!(
            added = report.tracks_added,
            removed = report.tracks_removed,
            moved = report.tracks_moved,
            "Applied operations locally"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connector, MatchStrategy};
    use crate::ports::repository::MockTrackRepository;
    use crate::services::playlist_diff::DiffCalculator;
    use color_eyre::eyre::eyre;

    fn t(id: &str) -> Track {
        Track::new(format!("Track {}", id), vec!["Artist".into()])
            .with_connector_id(Connector::Spotify, id)
    }

    fn seq(ids: &[&str]) -> TrackSequence {
        TrackSequence::new(ids.iter().map(|id| t(id)).collect())
    }

    fn ids(sequence: &TrackSequence) -> Vec<&str> {
        sequence
            .tracks()
            .iter()
            .map(|track| track.connector_id(Connector::Spotify).unwrap())
            .collect()
    }

    fn diff(current: &TrackSequence, target: &TrackSequence) -> PlaylistDiff {
        DiffCalculator::new(100).compute_diff(current, target, MatchStrategy::Comprehensive)
    }

    #[tokio::test]
    async fn test_applies_diff_and_stores_added_tracks() {
        let mut repo = MockTrackRepository::new();
        repo.expect_save()
            .times(2)
            .returning(|track| Ok(track.clone().with_id(42)));

        let current = seq(&["a", "b", "c"]);
        let target = seq(&["c", "x", "a", "y"]);
        let diff = diff(&current, &target);

        let report = OperationExecutor::new(Arc::new(repo))
            .execute(&current, &diff, &UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&report.sequence), vec!["c", "x", "a", "y"]);
        assert_eq!(report.tracks_added, 2);
        assert_eq!(report.tracks_removed, 1);
        assert_eq!(report.tracks_moved, 1);
        assert!(report.errors.is_empty());
        assert_eq!(report.sequence.tracks()[1].id, Some(42));
        assert_eq!(report.sequence.tracks()[3].id, Some(42));
    }

    #[tokio::test]
    async fn test_track_failure_is_recorded() {
        let mut repo = MockTrackRepository::new();
        repo.expect_save().returning(|track| {
            if track.connector_id(Connector::Spotify) == Some("x") {
                Err(eyre!("disk full"))
            } else {
                Ok(track.clone().with_id(1))
            }
        });

        let current = seq(&["a"]);
        let target = seq(&["a", "x", "y"]);
        let diff = diff(&current, &target);

        let report = OperationExecutor::new(Arc::new(repo))
            .execute(&current, &diff, &UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&report.sequence), vec!["a", "x", "y"]);
        assert_eq!(report.sequence.tracks()[1].id, None);
        assert_eq!(report.unsaved, vec![1]);
        assert_eq!(report.tracks_added, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("disk full"));
    }

    #[tokio::test]
    async fn test_track_failure_aborts_when_strict() {
        let mut repo = MockTrackRepository::new();
        repo.expect_save().returning(|_| Err(eyre!("disk full")));

        let current = seq(&["a"]);
        let target = seq(&["x"]);
        let diff = diff(&current, &target);
        let options = UpdateOptions {
            fail_on_track_error: true,
            ..UpdateOptions::default()
        };

        let err = OperationExecutor::new(Arc::new(repo))
            .execute(&current, &diff, &options)
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateError::TrackPersistence { .. }));
    }

    #[tokio::test]
    async fn test_reorder_only_touches_no_repository() {
        let mut repo = MockTrackRepository::new();
        repo.expect_save().never();

        let current = seq(&["a", "b", "c"]);
        let target = seq(&["c", "b", "a"]);
        let diff = diff(&current, &target);

        let report = OperationExecutor::new(Arc::new(repo))
            .execute(&current, &diff, &UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(ids(&report.sequence), vec!["c", "b", "a"]);
        assert_eq!(report.tracks_moved, 2);
    }
}
