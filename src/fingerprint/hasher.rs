//! Combinatorial landmark hashing: fan each anchor peak out to its nearby
//! partners and hash each pair into a translation-invariant token.

use sha1::{Digest, Sha1};

use super::peaks::Peak;

/// Number of partner peaks considered per anchor.
pub const FAN_VALUE: usize = 15;

/// Inclusive time-delta window, in frames, between anchor and partner.
pub const MAX_TIME_DELTA: usize = 200;

/// Landmark hash width in bytes (first 10 hex chars of the SHA-1 digest).
pub const HASH_BYTES: usize = 5;

pub type Hash = [u8; HASH_BYTES];

/// One `(hash, anchor_time)` emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Landmark {
    pub hash: Hash,
    pub anchor_time: u32,
}

fn hash_triple(f_a: usize, f_b: usize, delta_t: usize) -> Hash {
    let message = format!("{f_a}|{f_b}|{delta_t}");
    let digest = Sha1::digest(message.as_bytes());

    let mut hash = [0u8; HASH_BYTES];
    hash.copy_from_slice(&digest[..HASH_BYTES]);
    hash
}

/// Peaks must already be sorted by `(time, freq)` ascending (as returned by
/// `peaks::find_peaks`).
pub fn generate_landmarks(peaks: &[Peak]) -> Vec<Landmark> {
    let mut landmarks = Vec::with_capacity(peaks.len() * FAN_VALUE);

    for (i, anchor) in peaks.iter().enumerate() {
        let partners = peaks[i + 1..].iter().take(FAN_VALUE);

        for partner in partners {
            let delta_t = partner.time - anchor.time;
            if delta_t > MAX_TIME_DELTA {
                continue;
            }
            if delta_t == 0 && partner.freq == anchor.freq {
                continue;
            }

            let hash = hash_triple(anchor.freq, partner.freq, delta_t);
            landmarks.push(Landmark {
                hash,
                anchor_time: anchor.time as u32,
            });
        }
    }

    landmarks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(time: usize, freq: usize) -> Peak {
        Peak { time, freq }
    }

    #[test]
    fn hash_is_deterministic() {
        let peaks = vec![peak(0, 10), peak(1, 20), peak(2, 30)];
        let a = generate_landmarks(&peaks);
        let b = generate_landmarks(&peaks);
        assert_eq!(a, b);
    }

    #[test]
    fn landmark_count_bounded_by_fan_value() {
        let peaks: Vec<Peak> = (0..50).map(|t| peak(t, t)).collect();
        let landmarks = generate_landmarks(&peaks);
        assert!(landmarks.len() <= peaks.len() * FAN_VALUE);
    }

    #[test]
    fn zero_delta_same_freq_is_skipped() {
        let peaks = vec![peak(5, 7), peak(5, 7)];
        let landmarks = generate_landmarks(&peaks);
        assert!(landmarks.is_empty());
    }

    #[test]
    fn zero_delta_different_freq_is_kept() {
        let peaks = vec![peak(5, 7), peak(5, 9)];
        let landmarks = generate_landmarks(&peaks);
        assert_eq!(landmarks.len(), 1);
        assert_eq!(landmarks[0].anchor_time, 5);
    }

    #[test]
    fn delta_beyond_window_is_skipped() {
        let peaks = vec![peak(0, 1), peak(MAX_TIME_DELTA + 1, 2)];
        let landmarks = generate_landmarks(&peaks);
        assert!(landmarks.is_empty());
    }

    #[test]
    fn anchor_only_fans_to_next_fan_value_partners() {
        let peaks: Vec<Peak> = (0..(FAN_VALUE * 2)).map(|t| peak(t, t)).collect();
        let landmarks = generate_landmarks(&peaks);
        let from_first_anchor = landmarks.iter().filter(|l| l.anchor_time == 0).count();
        assert_eq!(from_first_anchor, FAN_VALUE);
    }

    #[test]
    fn anchor_near_end_contributes_fewer_pairs() {
        let peaks: Vec<Peak> = (0..3).map(|t| peak(t, t)).collect();
        let landmarks = generate_landmarks(&peaks);
        // anchor 0: 2 partners, anchor 1: 1 partner, anchor 2: 0 partners
        assert_eq!(landmarks.len(), 3);
    }
}
