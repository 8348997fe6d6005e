use tracing::debug;

use super::matcher::match_tracks;
use super::reorder::longest_increasing_subsequence;
use crate::domain::{
    MatchStrategy, OperationKind, PlaylistDiff, PlaylistOperation, TrackSequence, UnchangedTrack,
};

/// ADD and REMOVE are batched `batch_size` per call, every MOVE is its own call.
pub fn estimate_api_calls(adds: usize, removes: usize, moves: usize, batch_size: usize) -> usize {
    let batch_size = batch_size.max(1);
    adds.div_ceil(batch_size) + removes.div_ceil(batch_size) + moves
}

pub fn confidence_score(matched: usize, operations: usize) -> f64 {
    if operations == 0 {
        return 1.0;
    }
    matched as f64 / (matched + operations) as f64
}

#[derive(Debug, Clone)]
pub struct DiffCalculator {
    batch_size: usize,
}

impl DiffCalculator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Computes the operations turning `current` into `target`.
    ///
    /// Operations are listed REMOVE (current order), ADD (target order), MOVE (target order).
    /// Matched tracks on the longest run already in target order stay put; every other matched
    /// track gets exactly one MOVE.
    pub fn compute_diff(
        &self,
        current: &TrackSequence,
        target: &TrackSequence,
        strategy: MatchStrategy,
    ) -> PlaylistDiff {
        let matches = match_tracks(current.tracks(), target.tracks(), strategy);

        let mut operations = Vec::new();

        for &i in &matches.unmatched_current {
            let track = current.tracks()[i].clone();
            operations.push(PlaylistOperation::Remove {
                external_uri: track.primary_uri(),
                track,
                old_position: i,
            });
        }

        for &j in &matches.unmatched_target {
            operations.push(PlaylistOperation::Add {
                track: target.tracks()[j].clone(),
                position: j,
            });
        }

        // pairs are ordered by target index
        let current_positions: Vec<usize> =
            matches.pairs.iter().map(|pair| pair.current_index).collect();
        let mut stays = vec![false; matches.pairs.len()];
        for k in longest_increasing_subsequence(&current_positions) {
            stays[k] = true;
        }

        let mut unchanged = Vec::new();
        for (pair, stays) in matches.pairs.iter().zip(stays) {
            let track = current.tracks()[pair.current_index].clone();
            if stays {
                unchanged.push(UnchangedTrack {
                    track,
                    current_position: pair.current_index,
                    target_position: pair.target_index,
                });
            } else {
                operations.push(PlaylistOperation::Move {
                    external_uri: track.primary_uri(),
                    track,
                    old_position: pair.current_index,
                    position: pair.target_index,
                });
            }
        }

        let mut diff = PlaylistDiff {
            operations,
            unchanged,
            api_call_estimate: 0,
            confidence_score: 1.0,
            current_len: current.len(),
            target_len: target.len(),
        };
        diff.api_call_estimate = estimate_api_calls(
            diff.count(OperationKind::Add),
            diff.count(OperationKind::Remove),
            diff.count(OperationKind::Move),
            self.batch_size,
        );
        diff.confidence_score = confidence_score(matches.pairs.len(), diff.operations.len());

        debug!(
            adds = diff.count(OperationKind::Add),
            removes = diff.count(OperationKind::Remove),
            moves = diff.count(OperationKind::Move),
            unchanged = diff.unchanged.len(),
            api_call_estimate = diff.api_call_estimate,
            "Computed playlist diff"
        );

        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connector, Track};
    use proptest::prelude::*;

    fn t(id: usize) -> Track {
        Track::new(format!("Track {}", id), vec!["Artist".into()])
            .with_connector_id(Connector::Spotify, format!("t{}", id))
    }

    fn seq(ids: &[usize]) -> TrackSequence {
        TrackSequence::new(ids.iter().map(|&id| t(id)).collect())
    }

    fn diff(current: &[usize], target: &[usize]) -> PlaylistDiff {
        DiffCalculator::new(100).compute_diff(
            &seq(current),
            &seq(target),
            MatchStrategy::Comprehensive,
        )
    }

    #[test]
    fn test_identical_sequences_have_no_changes() {
        let diff = diff(&[1, 2], &[1, 2]);

        assert!(!diff.has_changes());
        assert_eq!(diff.confidence_score, 1.0);
        assert_eq!(diff.api_call_estimate, 0);
        assert_eq!(diff.unchanged.len(), 2);
    }

    #[test]
    fn test_swap_needs_one_move() {
        let diff = diff(&[1, 2], &[2, 1]);

        assert_eq!(diff.operations.len(), 1);
        assert_eq!(diff.count(OperationKind::Move), 1);
        assert_eq!(diff.api_call_estimate, 1);
        assert_eq!(diff.confidence_score, 2.0 / 3.0);
    }

    #[test]
    fn test_replace_one_track() {
        let diff = diff(&[1, 2], &[1, 3]);

        assert_eq!(diff.count(OperationKind::Remove), 1);
        assert_eq!(diff.count(OperationKind::Add), 1);
        assert_eq!(diff.count(OperationKind::Move), 0);
        assert_eq!(diff.api_call_estimate, 2);

        let remove = diff.operations_of(OperationKind::Remove).next().unwrap();
        assert_eq!(remove.track().connector_id(Connector::Spotify), Some("t2"));
        assert_eq!(remove.position(), 1);
        assert_eq!(remove.external_uri(), Some("spotify:track:t2"));

        let add = diff.operations_of(OperationKind::Add).next().unwrap();
        assert_eq!(add.track().connector_id(Connector::Spotify), Some("t3"));
        assert_eq!(add.position(), 1);
    }

    #[test]
    fn test_adds_are_batched() {
        let target: Vec<usize> = (0..250).collect();
        let diff = diff(&[], &target);

        assert_eq!(diff.count(OperationKind::Add), 250);
        assert_eq!(diff.api_call_estimate, 3);
        assert_eq!(diff.count(OperationKind::Move), 0);
    }

    #[test]
    fn test_empty_target_removes_everything() {
        let diff = diff(&[1, 2, 3], &[]);

        assert_eq!(diff.count(OperationKind::Remove), 3);
        assert_eq!(diff.count(OperationKind::Move), 0);
        assert_eq!(diff.confidence_score, 0.0);
    }

    #[test]
    fn test_moves_follow_lis() {
        // Current positions in target order: [3, 0, 1, 2] -> LIS [0, 1, 2] -> one move.
        let diff = diff(&[1, 2, 3, 4], &[4, 1, 2, 3]);

        assert_eq!(diff.count(OperationKind::Move), 1);
        let moved = diff.operations_of(OperationKind::Move).next().unwrap();
        assert_eq!(moved.old_position(), Some(3));
        assert_eq!(moved.position(), 0);
    }

    #[test]
    fn test_estimate_api_calls() {
        assert_eq!(estimate_api_calls(0, 0, 0, 100), 0);
        assert_eq!(estimate_api_calls(100, 0, 0, 100), 1);
        assert_eq!(estimate_api_calls(101, 1, 0, 100), 3);
        assert_eq!(estimate_api_calls(0, 0, 4, 100), 4);
        assert_eq!(estimate_api_calls(5, 5, 0, 0), 10);
    }

    fn permuted_with_changes() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
        (0usize..20, 0usize..20).prop_flat_map(|(kept, added)| {
            let current: Vec<usize> = (0..kept + 5).collect();
            (
                Just(current.clone()),
                proptest::sample::subsequence(current, 0..=kept),
                Just((100..100 + added).collect::<Vec<_>>()),
            )
                .prop_flat_map(|(current, kept, added)| {
                    let mut target = kept;
                    target.extend(added);
                    (Just(current), Just(target).prop_shuffle())
                })
        })
    }

    proptest! {
        #[test]
        fn prop_move_count_is_minimal((current, target) in permuted_with_changes()) {
            let diff = diff(&current, &target);

            let positions: Vec<usize> = target
                .iter()
                .filter_map(|id| current.iter().position(|c| c == id))
                .collect();
            let lis = longest_increasing_subsequence(&positions).len();

            prop_assert_eq!(diff.count(OperationKind::Move), positions.len() - lis);
        }

        #[test]
        fn prop_remove_then_add_reaches_target_multiset((current, target) in permuted_with_changes()) {
            let diff = diff(&current, &target);
            let mut working: Vec<usize> = current.clone();

            let mut removes: Vec<_> = diff.operations_of(OperationKind::Remove).collect();
            removes.sort_by_key(|op| std::cmp::Reverse(op.position()));
            for op in removes {
                working.remove(op.position());
            }

            let mut adds: Vec<_> = diff.operations_of(OperationKind::Add).collect();
            adds.sort_by_key(|op| op.position());
            for op in adds {
                let id = target[op.position()];
                working.insert(op.position().min(working.len()), id);
            }

            let mut expected = target.clone();
            expected.sort_unstable();
            working.sort_unstable();
            prop_assert_eq!(working, expected);
        }

        #[test]
        fn prop_confidence_in_unit_range((current, target) in permuted_with_changes()) {
            let diff = diff(&current, &target);

            prop_assert!((0.0..=1.0).contains(&diff.confidence_score));
            prop_assert_eq!(diff.has_changes(), !diff.operations.is_empty());
        }

        #[test]
        fn prop_estimate_is_monotone(adds in 0usize..500, removes in 0usize..500, moves in 0usize..50, batch in 1usize..=100) {
            let base = estimate_api_calls(adds, removes, moves, batch);

            prop_assert!(estimate_api_calls(adds + 1, removes, moves, batch) >= base);
            prop_assert!(estimate_api_calls(adds, removes + 1, moves, batch) >= base);
            prop_assert_eq!(estimate_api_calls(adds, removes, moves + 1, batch), base + 1);
        }
    }
}
