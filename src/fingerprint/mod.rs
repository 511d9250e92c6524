pub mod hasher;
pub mod peaks;
pub mod spectrogram;

use std::collections::HashSet;

pub use hasher::{Hash, Landmark, FAN_VALUE, HASH_BYTES, MAX_TIME_DELTA};
pub use peaks::{Peak, DEFAULT_AMPLITUDE_THRESHOLD_DB, DEFAULT_NEIGHBORHOOD_RADIUS};
pub use spectrogram::{DEFAULT_SAMPLE_RATE, HOP_SIZE, OVERLAP_RATIO, WINDOW_SIZE};

/// The in-memory fingerprint of one channel: an unordered, duplicate-free
/// set of `(hash, offset)` pairs.
pub type Fingerprint = HashSet<(Hash, u32)>;

/// Run the full pipeline — spectrogram, peak-finding, landmark hashing — on
/// one mono PCM16 channel.
pub fn fingerprint_channel(samples: &[i16]) -> Fingerprint {
    let spectrogram = spectrogram::compute(samples);
    let peaks = peaks::find_peaks(
        &spectrogram,
        DEFAULT_AMPLITUDE_THRESHOLD_DB,
        DEFAULT_NEIGHBORHOOD_RADIUS,
    );
    hasher::generate_landmarks(&peaks)
        .into_iter()
        .map(|l| (l.hash, l.anchor_time))
        .collect()
}

/// Fingerprints every channel independently and unions the results, so
/// identical landmarks produced by e.g. L/R stereo symmetry collapse into
/// one entry.
pub fn fingerprint_channels(channels: &[Vec<i16>]) -> Fingerprint {
    let mut combined = Fingerprint::new();
    for channel in channels {
        combined.extend(fingerprint_channel(channel));
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_channel(freq: f32, sample_rate: u32, num_samples: usize) -> Vec<i16> {
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                ((2.0 * PI * freq * t).sin() * i16::MAX as f32 * 0.8) as i16
            })
            .collect()
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let samples = sine_channel(880.0, DEFAULT_SAMPLE_RATE, WINDOW_SIZE * 10);
        let a = fingerprint_channel(&samples);
        let b = fingerprint_channel(&samples);
        assert_eq!(a, b);
    }

    #[test]
    fn offset_shift_invariance() {
        let samples = sine_channel(660.0, DEFAULT_SAMPLE_RATE, WINDOW_SIZE * 12);
        let baseline = fingerprint_channel(&samples);

        let k = 3usize;
        let mut shifted = vec![0i16; k * HOP_SIZE];
        shifted.extend_from_slice(&samples);
        let shifted_fp = fingerprint_channel(&shifted);

        // Every landmark from frames safely past the zero-padded boundary
        // must reappear shifted by exactly `k` frames.
        let reshifted: Fingerprint = baseline
            .iter()
            .filter(|(_, t)| *t > 4)
            .map(|(h, t)| (*h, *t + k as u32))
            .collect();

        for landmark in &reshifted {
            assert!(
                shifted_fp.contains(landmark),
                "expected shifted landmark {landmark:?} to survive the shift"
            );
        }
    }

    #[test]
    fn unions_across_channels() {
        let left = sine_channel(440.0, DEFAULT_SAMPLE_RATE, WINDOW_SIZE * 6);
        let right = left.clone();
        let mono = fingerprint_channel(&left);
        let stereo = fingerprint_channels(&[left, right]);
        assert_eq!(mono, stereo);
    }
}
