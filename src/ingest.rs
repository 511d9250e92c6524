//! Ingest Orchestrator: enumerates files, fingerprints them on a bounded
//! worker pool, and commits results to the index one at a time on the
//! coordinator task.
//!
//! This is the Rust analogue of a `multiprocessing.Pool.imap_unordered`
//! orchestrator: N workers run the CPU-bound decode+fingerprint pipeline
//! concurrently, a single coordinator drains their results in completion
//! order and performs every index mutation serially. Workers never open a
//! database connection — only the coordinator does — so the fork/connection
//! invalidation concern the original model worried about doesn't arise
//! here; `tokio::task::spawn_blocking` threads share the process and its
//! connection pool is never touched off the coordinator task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::audio::decoder;
use crate::db::index::FingerprintIndex;
use crate::error::{Result, SonoraError};
use crate::fingerprint::fingerprint_channels;

const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac"];

pub struct IngestSummary {
    pub songs_indexed: usize,
    pub files_skipped_duplicate: usize,
    pub files_failed: usize,
}

struct WorkerResult {
    file: PathBuf,
    name: String,
    content_hash: [u8; 20],
    landmarks: Vec<(crate::fingerprint::Hash, u32)>,
}

/// Enumerates `path` (a file or a directory, recursively) for files whose
/// extension looks like audio.
fn enumerate_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Runs crash cleanup, enumerates `path`, and fingerprints every new file
/// across a bounded worker pool, committing each result to `index` as it
/// arrives.
pub async fn ingest_path(
    index: &mut dyn FingerprintIndex,
    path: &Path,
    limit_seconds: Option<u64>,
) -> Result<IngestSummary> {
    index.delete_unfingerprinted()?;

    let mut already_indexed: std::collections::HashSet<String> = index
        .get_fingerprinted_songs()?
        .into_iter()
        .map(|(_, _, content_hash_hex)| content_hash_hex)
        .collect();

    let files = enumerate_files(path);
    let worker_count = std::cmp::max(1, num_cpus::get().saturating_sub(1));
    let semaphore = Arc::new(Semaphore::new(worker_count));
    let (tx, mut rx) = mpsc::channel::<std::result::Result<WorkerResult, SonoraError>>(files.len().max(1));

    let mut dispatched = 0usize;
    let mut files_skipped_duplicate = 0usize;

    for file in files {
        let content_hash_hex = match precheck_content_hash(&file) {
            Ok(hex) => hex,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "failed to pre-hash file, skipping");
                continue;
            }
        };

        if already_indexed.contains(&content_hash_hex) {
            info!(file = %file.display(), "skipping already-fingerprinted file");
            files_skipped_duplicate += 1;
            continue;
        }

        dispatched += 1;
        let permit = semaphore.clone();
        let tx = tx.clone();
        let file_for_task = file.clone();

        tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closes");
            let result = match tokio::task::spawn_blocking(move || fingerprint_file(&file_for_task, limit_seconds)).await {
                Ok(inner) => inner,
                Err(join_err) => Err(SonoraError::WorkerCrash {
                    file: file.display().to_string(),
                    message: join_err.to_string(),
                }),
            };
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut songs_indexed = 0usize;
    let mut files_failed = 0usize;

    for _ in 0..dispatched {
        let Some(outcome) = rx.recv().await else {
            break;
        };

        match outcome {
            Ok(worker) => {
                let content_hash_hex = hex_upper(&worker.content_hash);
                if already_indexed.contains(&content_hash_hex) {
                    // Another dispatched file hashed identically; benign race.
                    files_skipped_duplicate += 1;
                    continue;
                }

                match commit(index, &worker) {
                    Ok(()) => {
                        already_indexed.insert(content_hash_hex);
                        songs_indexed += 1;
                    }
                    Err(e) => {
                        warn!(file = %worker.file.display(), error = %e, "commit failed, rolling back partial song");
                        let _ = index.delete_unfingerprinted();
                        files_failed += 1;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "worker failed");
                files_failed += 1;
            }
        }
    }

    Ok(IngestSummary {
        songs_indexed,
        files_skipped_duplicate,
        files_failed,
    })
}

fn precheck_content_hash(path: &Path) -> Result<String> {
    let hash = decoder::hash_file(path).map_err(|e| SonoraError::Decode {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(hex_upper(&hash))
}

fn fingerprint_file(path: &Path, limit_seconds: Option<u64>) -> Result<WorkerResult> {
    let decoded = decoder::decode(path, limit_seconds)?;
    let landmarks: Vec<(crate::fingerprint::Hash, u32)> =
        fingerprint_channels(&decoded.channels).into_iter().collect();

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(WorkerResult {
        file: path.to_path_buf(),
        name,
        content_hash: decoded.content_hash,
        landmarks,
    })
}

fn commit(index: &mut dyn FingerprintIndex, worker: &WorkerResult) -> Result<()> {
    let song_id = index.insert_song(&worker.name, &worker.content_hash)?;
    index.insert_hashes(song_id, &worker.landmarks)?;
    index.set_song_fingerprinted(song_id)?;
    Ok(())
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
