//! Windowed magnitude STFT of one PCM channel.

use crate::fft::CooleyTukeyFft;

/// Window size in samples. Fixed by the hash format: ingest and query must
/// use the same value or landmarks never line up.
pub const WINDOW_SIZE: usize = 4096;

/// Overlap ratio between consecutive windows.
pub const OVERLAP_RATIO: f32 = 0.5;

/// Hop size derived from `WINDOW_SIZE` and `OVERLAP_RATIO`.
pub const HOP_SIZE: usize = (WINDOW_SIZE as f32 * (1.0 - OVERLAP_RATIO)) as usize;

/// Default sample rate assumed when none is supplied by the decoder.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Minimum magnitude, in dB, that a cell can report. Keeps every comparison
/// finite without ever dividing by zero upstream.
pub const MAGNITUDE_FLOOR_DB: f32 = -120.0;

/// `S[t][f]`: one row per STFT frame, `WINDOW_SIZE / 2 + 1` magnitude-dB
/// bins per row.
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, Vec::len)
    }
}

/// Computes the spectrogram of a mono PCM16 channel. Frames shorter than a
/// full window at the end of the signal are discarded, per spec.
pub fn compute(samples: &[i16]) -> Spectrogram {
    let fft = CooleyTukeyFft::new(WINDOW_SIZE);
    let window = fft.hann_window();

    let mut frames = Vec::new();
    let mut position = 0;

    while position + WINDOW_SIZE <= samples.len() {
        let chunk = &samples[position..position + WINDOW_SIZE];

        let windowed: Vec<f32> = chunk
            .iter()
            .zip(window.iter())
            .map(|(&sample, &w)| (sample as f32 / i16::MAX as f32) * w)
            .collect();

        let spectrum = fft.forward(&windowed);
        let magnitudes = fft.magnitude_db(&spectrum, MAGNITUDE_FLOOR_DB);

        frames.push(magnitudes);
        position += HOP_SIZE;
    }

    Spectrogram { frames }
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
    fn frame_count_matches_hop_arithmetic() {
        let samples = sine_channel(440.0, DEFAULT_SAMPLE_RATE, WINDOW_SIZE * 4);
        let spec = compute(&samples);
        let expected = (samples.len() - WINDOW_SIZE) / HOP_SIZE + 1;
        assert_eq!(spec.num_frames(), expected);
        assert_eq!(spec.num_bins(), WINDOW_SIZE / 2 + 1);
    }

    #[test]
    fn is_deterministic() {
        let samples = sine_channel(1000.0, DEFAULT_SAMPLE_RATE, WINDOW_SIZE * 8);
        let a = compute(&samples);
        let b = compute(&samples);
        assert_eq!(a.frames, b.frames);
    }

    #[test]
    fn trailing_short_samples_are_discarded() {
        let samples = vec![0i16; WINDOW_SIZE + HOP_SIZE / 2];
        let spec = compute(&samples);
        assert_eq!(spec.num_frames(), 1);
    }
}
