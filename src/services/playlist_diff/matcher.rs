//! Cross-connector track identity matching.
//!
//! Matching works purely on index positions of the two sequences, so a track that appears more
//! than once is never aliased: every current index and every target index is consumed at most
//! once.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use unaccent::unaccent;

use crate::domain::{Connector, MatchStrategy, Track};

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("punctuation pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackPair {
    pub current_index: usize,
    pub target_index: usize,
    /// The single strategy that produced this pair.
    pub matched_by: MatchStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Sorted by target index.
    pub pairs: Vec<TrackPair>,
    pub unmatched_current: Vec<usize>,
    pub unmatched_target: Vec<usize>,
}

/// Lower-cased, accent-free, punctuation-free form used for fuzzy keys.
pub fn normalize_text(s: &str) -> String {
    let s = unaccent(s).to_lowercase();
    let s = PUNCTUATION.replace_all(&s, " ");
    WHITESPACE.replace_all(s.trim(), " ").to_string()
}

pub fn normalize_isrc(isrc: &str) -> Option<String> {
    let normalized: String = isrc
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (!normalized.is_empty()).then_some(normalized)
}

fn fuzzy_key(track: &Track) -> Option<String> {
    let artist = normalize_text(track.primary_artist()?);
    let title = normalize_text(&track.title);
    if artist.is_empty() || title.is_empty() {
        return None;
    }
    Some(format!("{}\u{1f}{}", artist, title))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MatchKey {
    Platform(Connector, String),
    Isrc(String),
    Fuzzy(String),
}

/// Keys a track offers for one strategy, most specific first.
fn keys_for(track: &Track, strategy: MatchStrategy) -> Vec<MatchKey> {
    match strategy {
        MatchStrategy::PlatformId => track
            .connector_ids
            .iter()
            .map(|(connector, id)| MatchKey::Platform(connector, id.to_string()))
            .collect(),
        MatchStrategy::Isrc => track
            .isrc
            .as_deref()
            .and_then(normalize_isrc)
            .map(MatchKey::Isrc)
            .into_iter()
            .collect(),
        MatchStrategy::Fuzzy => fuzzy_key(track).map(MatchKey::Fuzzy).into_iter().collect(),
        MatchStrategy::Comprehensive => Vec::new(),
    }
}

fn passes(strategy: MatchStrategy) -> &'static [MatchStrategy] {
    match strategy {
        MatchStrategy::PlatformId => &[MatchStrategy::PlatformId],
        MatchStrategy::Isrc => &[MatchStrategy::Isrc],
        MatchStrategy::Fuzzy => &[MatchStrategy::Fuzzy],
        MatchStrategy::Comprehensive => &[
            MatchStrategy::PlatformId,
            MatchStrategy::Isrc,
            MatchStrategy::Fuzzy,
        ],
    }
}

/// Pairs tracks of `current` with tracks of `target`.
///
/// `Comprehensive` runs platform-id, ISRC and fuzzy passes in that order; each pass only sees the
/// indices left unmatched by the ones before it. Within a pass, targets are visited in order and
/// take the earliest still-unconsumed current track sharing a key.
pub fn match_tracks(current: &[Track], target: &[Track], strategy: MatchStrategy) -> MatchResult {
    let mut current_taken = vec![false; current.len()];
    let mut target_match: Vec<Option<(usize, MatchStrategy)>> = vec![None; target.len()];

    for &pass in passes(strategy) {
        // key -> current indices in order; consumed entries are skipped lazily
        let mut index: HashMap<MatchKey, VecDeque<usize>> = HashMap::new();
        for (i, track) in current.iter().enumerate() {
            if current_taken[i] {
                continue;
            }
            for key in keys_for(track, pass) {
                index.entry(key).or_default().push_back(i);
            }
        }
        if index.is_empty() {
            continue;
        }

        for (j, track) in target.iter().enumerate() {
            if target_match[j].is_some() {
                continue;
            }
            for key in keys_for(track, pass) {
                let Some(candidates) = index.get_mut(&key) else {
                    continue;
                };
                while candidates.front().is_some_and(|&i| current_taken[i]) {
                    candidates.pop_front();
                }
                if let Some(i) = candidates.pop_front() {
                    current_taken[i] = true;
                    target_match[j] = Some((i, pass));
                    break;
                }
            }
        }
    }

    let pairs = target_match
        .iter()
        .enumerate()
        .filter_map(|(j, m)| {
            m.map(|(i, matched_by)| TrackPair {
                current_index: i,
                target_index: j,
                matched_by,
            })
        })
        .collect();
    let unmatched_current = current_taken
        .iter()
        .enumerate()
        .filter_map(|(i, taken)| (!taken).then_some(i))
        .collect();
    let unmatched_target = target_match
        .iter()
        .enumerate()
        .filter_map(|(j, m)| m.is_none().then_some(j))
        .collect();

    MatchResult {
        pairs,
        unmatched_current,
        unmatched_target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spotify(id: &str, title: &str) -> Track {
        Track::new(title, vec!["Artist".into()]).with_connector_id(Connector::Spotify, id)
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Beyoncé - Halo!! "), "beyonce halo");
        assert_eq!(normalize_text("Don't   Stop"), "don t stop");
    }

    #[test]
    fn test_normalize_isrc() {
        assert_eq!(normalize_isrc("us-rc1-12-34567").as_deref(), Some("USRC11234567"));
        assert_eq!(normalize_isrc("--"), None);
    }

    #[test]
    fn test_platform_id_matches_in_order() {
        let current = vec![spotify("a", "A"), spotify("b", "B")];
        let target = vec![spotify("b", "B"), spotify("a", "A"), spotify("c", "C")];

        let result = match_tracks(&current, &target, MatchStrategy::PlatformId);

        assert_eq!(result.pairs.len(), 2);
        assert_eq!(result.pairs[0].current_index, 1);
        assert_eq!(result.pairs[0].target_index, 0);
        assert_eq!(result.pairs[1].current_index, 0);
        assert!(result.unmatched_current.is_empty());
        assert_eq!(result.unmatched_target, vec![2]);
    }

    #[test]
    fn test_duplicates_are_consumed_once() {
        let current = vec![spotify("a", "A"), spotify("a", "A")];
        let target = vec![spotify("a", "A"), spotify("a", "A"), spotify("a", "A")];

        let result = match_tracks(&current, &target, MatchStrategy::PlatformId);

        assert_eq!(result.pairs.len(), 2);
        assert_eq!(result.pairs[0].current_index, 0);
        assert_eq!(result.pairs[1].current_index, 1);
        assert_eq!(result.unmatched_target, vec![2]);
    }

    #[test]
    fn test_platform_id_matches_across_any_shared_connector() {
        let current = vec![Track::new("A", vec![]).with_connector_id(Connector::Plex, "10")];
        let target = vec![
            Track::new("A", vec![])
                .with_connector_id(Connector::Spotify, "zzz")
                .with_connector_id(Connector::Plex, "10"),
        ];

        let result = match_tracks(&current, &target, MatchStrategy::PlatformId);

        assert_eq!(result.pairs.len(), 1);
    }

    #[test]
    fn test_isrc_strategy_ignores_platform_ids() {
        let current = vec![spotify("a", "Song").with_isrc("USRC11234567")];
        let target = vec![spotify("a", "Song")];

        let result = match_tracks(&current, &target, MatchStrategy::Isrc);

        assert!(result.pairs.is_empty());
        assert_eq!(result.unmatched_current, vec![0]);
        assert_eq!(result.unmatched_target, vec![0]);
    }

    #[test]
    fn test_fuzzy_matches_normalized_artist_and_title() {
        let current = vec![Track::new("Café del Mar", vec!["Energy 52".into()])];
        let target = vec![Track::new("CAFE DEL MAR!", vec!["energy 52".into(), "Other".into()])];

        let result = match_tracks(&current, &target, MatchStrategy::Fuzzy);

        assert_eq!(result.pairs.len(), 1);
        assert_eq!(result.pairs[0].matched_by, MatchStrategy::Fuzzy);
    }

    #[test]
    fn test_fuzzy_requires_an_artist() {
        let current = vec![Track::new("Song", vec![])];
        let target = vec![Track::new("Song", vec![])];

        let result = match_tracks(&current, &target, MatchStrategy::Fuzzy);

        assert!(result.pairs.is_empty());
    }

    #[test]
    fn test_comprehensive_prefers_stronger_strategies() {
        // Target 0 would fuzzy-match current 0, but target 1 owns it through its platform id.
        let current = vec![
            spotify("x", "Song"),
            Track::new("Song", vec!["Artist".into()]).with_isrc("GBAAA0000001"),
        ];
        let target = vec![
            Track::new("Song", vec!["Artist".into()]),
            spotify("x", "Renamed"),
        ];

        let result = match_tracks(&current, &target, MatchStrategy::Comprehensive);

        assert_eq!(result.pairs.len(), 2);
        assert_eq!(result.pairs[0].target_index, 0);
        assert_eq!(result.pairs[0].current_index, 1);
        assert_eq!(result.pairs[0].matched_by, MatchStrategy::Fuzzy);
        assert_eq!(result.pairs[1].current_index, 0);
        assert_eq!(result.pairs[1].matched_by, MatchStrategy::PlatformId);
    }

    #[test]
    fn test_comprehensive_falls_through_to_isrc() {
        let current = vec![Track::new("A", vec!["X".into()]).with_isrc("USRC11234567")];
        let target = vec![
            Track::new("B", vec!["Y".into()])
                .with_isrc("usrc11234567")
                .with_connector_id(Connector::Spotify, "new"),
        ];

        let result = match_tracks(&current, &target, MatchStrategy::Comprehensive);

        assert_eq!(result.pairs.len(), 1);
        assert_eq!(result.pairs[0].matched_by, MatchStrategy::Isrc);
    }

    #[test]
    fn test_empty_inputs() {
        let target = vec![spotify("a", "A")];

        let result = match_tracks(&[], &target, MatchStrategy::Comprehensive);
        assert_eq!(result.unmatched_target, vec![0]);

        let result = match_tracks(&target, &[], MatchStrategy::Comprehensive);
        assert_eq!(result.unmatched_current, vec![0]);
    }
}
