use std::f32::consts::PI;

use crate::fft::complex::Complex;

/// A radix-2 Cooley-Tukey FFT fixed to a single power-of-two transform size.
///
/// This is the low-level numeric engine; windowing, framing, and dB
/// conversion live in `fingerprint::spectrogram` so this type stays a pure
/// function of one chunk of samples.
pub struct CooleyTukeyFft {
    size: usize,
}

impl CooleyTukeyFft {
    pub fn new(size: usize) -> Self {
        if !size.is_power_of_two() {
            panic!("transform size must be a power of two for this implementation to work");
        }
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hann window coefficients for this transform size. Must be applied
    /// identically at ingest and query time.
    pub fn hann_window(&self) -> Vec<f32> {
        let n = self.size;
        if n == 1 {
            return vec![1.0];
        }
        (0..n)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos()))
            .collect()
    }

    /// Forward transform of a real-valued, already-windowed chunk of exactly
    /// `size` samples.
    pub fn forward(&self, windowed_chunk: &[f32]) -> Vec<Complex> {
        assert_eq!(windowed_chunk.len(), self.size, "chunk must match transform size");
        let mut buf: Vec<Complex> = windowed_chunk
            .iter()
            .map(|&sample| Complex::new(sample, 0.0))
            .collect();
        Self::cooley_tukey_fft(&mut buf);
        buf
    }

    /// `10 * log10(|FFT|^2)`, floored so downstream comparisons never see
    /// `-inf`. Only the first `size/2 + 1` bins are meaningful for a real
    /// input (the upper half is the conjugate mirror).
    pub fn magnitude_db(&self, spectrum: &[Complex], floor_db: f32) -> Vec<f32> {
        let half = self.size / 2 + 1;
        spectrum[..half]
            .iter()
            .map(|c| {
                let power = c.norm_sqr().max(1e-12);
                (10.0 * power.log10()).max(floor_db)
            })
            .collect()
    }

    fn cooley_tukey_fft(buf: &mut [Complex]) {
        let n = buf.len();

        if n <= 1 {
            return;
        }

        let mut even: Vec<Complex> = Vec::with_capacity(n / 2);
        let mut odd: Vec<Complex> = Vec::with_capacity(n / 2);

        for (i, &sample) in buf.iter().enumerate() {
            if i % 2 == 0 {
                even.push(sample);
            } else {
                odd.push(sample);
            }
        }

        Self::cooley_tukey_fft(&mut even);
        Self::cooley_tukey_fft(&mut odd);

        // P(ω)  = Pe(ω²) + ω·Po(ω²)
        // P(-ω) = Pe(ω²) - ω·Po(ω²)
        // where ω = e^(-i·2π·j/n), and -ω^j = ω^(j + n/2).
        for j in 0..n / 2 {
            let theta = (2.0 * PI * j as f32) / (n as f32);
            let omega = Complex::from_polar(1.0, -theta);

            buf[j] = even[j] + (omega * odd[j]);
            buf[j + n / 2] = even[j] - (omega * odd[j]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_peaks_at_expected_bin() {
        let size = 1024;
        let fft = CooleyTukeyFft::new(size);
        let bin = 50;
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * bin as f32 * i as f32 / size as f32).sin())
            .collect();

        let spectrum = fft.forward(&samples);
        let magnitudes = fft.magnitude_db(&spectrum, -120.0);

        let (peak_bin, _) = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(peak_bin, bin);
    }

    #[test]
    fn floor_clips_silence() {
        let size = 256;
        let fft = CooleyTukeyFft::new(size);
        let silence = vec![0.0f32; size];
        let spectrum = fft.forward(&silence);
        let magnitudes = fft.magnitude_db(&spectrum, -90.0);
        assert!(magnitudes.iter().all(|&m| m >= -90.0));
    }

    #[test]
    #[should_panic]
    fn rejects_non_power_of_two() {
        CooleyTukeyFft::new(100);
    }
}
