//! Decodes an audio file into per-channel PCM16 streams plus a content hash,
//! using `symphonia` for format probing and decode.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha1::{Digest, Sha1};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Result, SonoraError};

const HASH_BLOCK_SIZE: usize = 1024 * 1024;

pub struct DecodedAudio {
    pub channels: Vec<Vec<i16>>,
    pub sample_rate: u32,
    pub content_hash: [u8; 20],
}

impl DecodedAudio {
    pub fn content_hash_hex_upper(&self) -> String {
        hex_upper(&self.content_hash)
    }
}

/// Decodes `path` to separated PCM16 channels. If `limit_seconds` is `Some`
/// and positive, only that many seconds from the start are decoded.
pub fn decode(path: &Path, limit_seconds: Option<u64>) -> Result<DecodedAudio> {
    let content_hash = hash_file(path).map_err(|e| SonoraError::Decode {
        path: path.display().to_string(),
        source: e,
    })?;

    let (channels, sample_rate) =
        decode_samples(path, limit_seconds).map_err(|e| SonoraError::Decode {
            path: path.display().to_string(),
            source: e,
        })?;

    Ok(DecodedAudio {
        channels,
        sample_rate,
        content_hash,
    })
}

pub(crate) fn hash_file(path: &Path) -> anyhow::Result<[u8; 20]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    Ok(out)
}

fn decode_samples(path: &Path, limit_seconds: Option<u64>) -> anyhow::Result<(Vec<Vec<i16>>, u32)> {
    let file = File::open(path)?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        stream,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .first()
        .ok_or_else(|| anyhow::anyhow!("no decodable audio track found"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| anyhow::anyhow!("track has no known sample rate"))?;

    let mut decoder =
        symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let limit_samples = limit_seconds
        .filter(|&s| s > 0)
        .map(|s| s * sample_rate as u64);

    let mut channels: Vec<Vec<i16>> = Vec::new();
    let mut frames_decoded: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet)?;
        let spec = *decoded.spec();
        let num_channels = spec.channels.count();

        if channels.is_empty() {
            channels.resize(num_channels, Vec::new());
        }

        let mut sample_buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let samples = sample_buf.samples();

        for frame in samples.chunks_exact(num_channels) {
            if let Some(limit) = limit_samples {
                if frames_decoded >= limit {
                    return Ok((channels, sample_rate));
                }
            }
            for (c, &s) in frame.iter().enumerate() {
                channels[c].push(s);
            }
            frames_decoded += 1;
        }
    }

    Ok((channels, sample_rate))
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
