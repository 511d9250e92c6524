//! Offset-histogram voting: turn the multiset of `(song_id, delta)`
//! candidates returned by the index into a single winning match.

use std::collections::HashMap;

use crate::fingerprint::spectrogram::{HOP_SIZE, WINDOW_SIZE};

/// A resolved identification, ready to hand back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub song_id: i32,
    pub song_name: String,
    pub confidence: usize,
    pub offset: i64,
    pub offset_seconds: f64,
    pub content_hash_hex: String,
}

/// Picks the `(song_id, delta)` pair with the highest vote count. Ties are
/// broken by the first pair to *reach* that count, matching the streaming
/// single-pass semantics of the reference implementation this was
/// translated from.
pub fn align_matches(candidates: impl IntoIterator<Item = (i32, i64)>) -> Option<(i32, i64, usize)> {
    let mut counts: HashMap<(i32, i64), usize> = HashMap::new();
    let mut winner: Option<(i32, i64, usize)> = None;

    for (song_id, delta) in candidates {
        let entry = counts.entry((song_id, delta)).or_insert(0);
        *entry += 1;
        let count = *entry;

        let is_new_winner = match &winner {
            None => true,
            Some((_, _, best_count)) => count > *best_count,
        };
        if is_new_winner {
            winner = Some((song_id, delta, count));
        }
    }

    winner
}

/// `round(delta * W * (1 - R) / Fs, 5)`, computed from `HOP_SIZE` directly
/// (`HOP_SIZE == W * (1 - R)`) so the formula can't drift from the
/// spectrogram's actual hop.
pub fn offset_seconds(delta: i64, sample_rate: u32) -> f64 {
    let seconds = delta as f64 * HOP_SIZE as f64 / sample_rate as f64;
    (seconds * 1e5).round() / 1e5
}

/// Weaves together `align_matches` and `offset_seconds` with an index
/// lookup to produce the final match record, or `None` if nothing matched.
pub fn resolve_match<F>(
    candidates: impl IntoIterator<Item = (i32, i64)>,
    sample_rate: u32,
    mut lookup_song: F,
) -> Option<MatchRecord>
where
    F: FnMut(i32) -> Option<(String, String)>,
{
    let (song_id, delta, confidence) = align_matches(candidates)?;
    let (song_name, content_hash_hex) = lookup_song(song_id)?;

    Some(MatchRecord {
        song_id,
        song_name,
        confidence,
        offset: delta,
        offset_seconds: offset_seconds(delta, sample_rate),
        content_hash_hex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidates_yield_no_match() {
        assert_eq!(align_matches(std::iter::empty()), None);
    }

    #[test]
    fn plurality_winner_by_count() {
        let candidates = vec![
            (1, 5), (1, 5), (1, 5),
            (2, 10), (2, 10),
        ];
        assert_eq!(align_matches(candidates), Some((1, 5, 3)));
    }

    #[test]
    fn ties_are_broken_by_first_tuple_to_reach_the_max_count() {
        // (A, 5) reaches count 2 before (B, 10) does, even though B's final
        // tally ties it.
        let candidates = vec![(1, 5), (1, 5), (2, 10), (2, 10)];
        assert_eq!(align_matches(candidates), Some((1, 5, 2)));
    }

    #[test]
    fn offset_seconds_matches_reference_value() {
        assert_eq!(offset_seconds(100, 44100), 4.64399);
        assert_eq!(WINDOW_SIZE, 4096);
    }

    #[test]
    fn resolve_match_looks_up_winner_only() {
        let candidates = vec![(7, 0), (7, 0), (9, 3)];
        let record = resolve_match(candidates, 44100, |song_id| {
            if song_id == 7 {
                Some(("track".to_string(), "ABCDEF".to_string()))
            } else {
                panic!("should never look up the non-winning song")
            }
        })
        .unwrap();
        assert_eq!(record.song_id, 7);
        assert_eq!(record.confidence, 2);
        assert_eq!(record.offset, 0);
        assert_eq!(record.offset_seconds, 0.0);
    }

    #[test]
    fn resolve_match_is_none_when_lookup_fails() {
        let candidates = vec![(1, 0)];
        let record = resolve_match(candidates, 44100, |_| None);
        assert!(record.is_none());
    }
}
