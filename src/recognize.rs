//! Ties decoder/capture, the fingerprinting pipeline, the index, and the
//! matcher together into the two query entry points: recognizing a file and
//! recognizing whatever a microphone has captured so far.

use std::path::Path;

use crate::audio::capture::MicrophoneCapture;
use crate::audio::decoder;
use crate::db::index::FingerprintIndex;
use crate::error::Result;
use crate::fingerprint::fingerprint_channels;
use crate::matcher::{resolve_match, MatchRecord};

/// Decodes `path`, fingerprints every channel, and resolves the best match
/// against `index`. Returns `None` if nothing in the library matches.
pub async fn recognize_file(
    index: &mut dyn FingerprintIndex,
    path: &Path,
    limit_seconds: Option<u64>,
) -> Result<Option<MatchRecord>> {
    let path = path.to_path_buf();
    let decoded = tokio::task::spawn_blocking(move || decoder::decode(&path, limit_seconds))
        .await
        .expect("decode task panicked")?;

    let query_landmarks: Vec<_> = fingerprint_channels(&decoded.channels).into_iter().collect();
    recognize_landmarks(index, &query_landmarks, decoded.sample_rate)
}

/// Fingerprints whatever a [`MicrophoneCapture`] has buffered and resolves
/// the best match. Surfaces [`crate::error::SonoraError::NoRecording`] if
/// `start` was never called or nothing has been captured yet.
pub fn recognize_capture(
    index: &mut dyn FingerprintIndex,
    capture: &MicrophoneCapture,
) -> Result<Option<MatchRecord>> {
    let channels = capture.samples()?;
    let query_landmarks: Vec<_> = fingerprint_channels(&channels).into_iter().collect();
    recognize_landmarks(index, &query_landmarks, capture.sample_rate())
}

fn recognize_landmarks(
    index: &mut dyn FingerprintIndex,
    query_landmarks: &[(crate::fingerprint::Hash, u32)],
    sample_rate: u32,
) -> Result<Option<MatchRecord>> {
    let candidates = index.return_matches(query_landmarks)?;

    let record = resolve_match(candidates, sample_rate, |song_id| {
        let song = index.get_song_by_id(song_id).ok().flatten()?;
        Some((song.name, hex_upper(&song.content_hash)))
    });

    Ok(record)
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
