//! Extract local maxima above an amplitude floor from the spectrogram.

use super::spectrogram::{Spectrogram, MAGNITUDE_FLOOR_DB};

/// Default amplitude threshold: 10 dB above the spectrogram's floor.
pub const DEFAULT_AMPLITUDE_THRESHOLD_DB: f32 = MAGNITUDE_FLOOR_DB + 10.0;

/// Neighborhood half-width. A `(2*radius+1) x (2*radius+1)` window
/// approximates the ~20x20 footprint of an iterated 8-connected dilation.
pub const DEFAULT_NEIGHBORHOOD_RADIUS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Peak {
    pub time: usize,
    pub freq: usize,
}

/// A cell is a peak iff it equals the max over its neighborhood and exceeds
/// `threshold_db`. Peaks at `f = 0` are kept (see open question in the spec).
pub fn find_peaks(
    spectrogram: &Spectrogram,
    threshold_db: f32,
    radius: usize,
) -> Vec<Peak> {
    let num_frames = spectrogram.num_frames();
    let num_bins = spectrogram.num_bins();
    let mut peaks = Vec::new();

    for t in 0..num_frames {
        for f in 0..num_bins {
            let value = spectrogram.frames[t][f];
            if value <= threshold_db {
                continue;
            }

            let t_start = t.saturating_sub(radius);
            let t_end = (t + radius + 1).min(num_frames);
            let f_start = f.saturating_sub(radius);
            let f_end = (f + radius + 1).min(num_bins);

            let mut is_max = true;
            'neighborhood: for nt in t_start..t_end {
                for nf in f_start..f_end {
                    if spectrogram.frames[nt][nf] > value {
                        is_max = false;
                        break 'neighborhood;
                    }
                }
            }

            if is_max {
                peaks.push(Peak { time: t, freq: f });
            }
        }
    }

    // Sorted (time, freq) ascending, as the hasher requires for fan-out.
    peaks.sort();
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::spectrogram::Spectrogram;

    fn flat_spectrogram(frames: usize, bins: usize, value: f32) -> Spectrogram {
        Spectrogram {
            frames: vec![vec![value; bins]; frames],
        }
    }

    #[test]
    fn no_peaks_below_threshold() {
        let spec = flat_spectrogram(10, 10, MAGNITUDE_FLOOR_DB);
        let peaks = find_peaks(&spec, DEFAULT_AMPLITUDE_THRESHOLD_DB, DEFAULT_NEIGHBORHOOD_RADIUS);
        assert!(peaks.is_empty());
    }

    #[test]
    fn single_spike_is_one_peak() {
        let mut spec = flat_spectrogram(5, 5, MAGNITUDE_FLOOR_DB);
        spec.frames[2][2] = 0.0;
        let peaks = find_peaks(&spec, DEFAULT_AMPLITUDE_THRESHOLD_DB, 2);
        assert_eq!(peaks, vec![Peak { time: 2, freq: 2 }]);
    }

    #[test]
    fn peaks_sorted_by_time_then_freq() {
        let mut spec = flat_spectrogram(5, 5, MAGNITUDE_FLOOR_DB);
        spec.frames[0][4] = 0.0;
        spec.frames[0][1] = 0.0;
        spec.frames[3][2] = 0.0;
        let peaks = find_peaks(&spec, DEFAULT_AMPLITUDE_THRESHOLD_DB, 1);
        assert_eq!(
            peaks,
            vec![
                Peak { time: 0, freq: 1 },
                Peak { time: 0, freq: 4 },
                Peak { time: 3, freq: 2 },
            ]
        );
    }

    #[test]
    fn equal_neighbors_both_count_as_max() {
        // A plateau: every cell equals the neighborhood max, so every cell
        // passes the "equals max" test once it clears the threshold.
        let spec = flat_spectrogram(3, 3, 0.0);
        let peaks = find_peaks(&spec, DEFAULT_AMPLITUDE_THRESHOLD_DB, 1);
        assert_eq!(peaks.len(), 9);
    }
}
