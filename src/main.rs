use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sonora::audio::capture::MicrophoneCapture;
use sonora::config::Config;
use sonora::db::{FingerprintIndex, PostgresIndex};
use sonora::ingest;
use sonora::recognize;

#[derive(Parser)]
#[command(name = "sonora", about = "Acoustic fingerprinting and recognition")]
struct Cli {
    /// Path to a config file (falls back to `config/default.toml` and
    /// `SONORA_`-prefixed environment variables).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fingerprint a file or every audio file under a directory.
    Ingest {
        path: PathBuf,
        /// Only fingerprint the first N seconds of each file.
        #[arg(long)]
        limit_seconds: Option<u64>,
    },
    /// Identify a short audio file against the index.
    Query {
        path: PathBuf,
        #[arg(long)]
        limit_seconds: Option<u64>,
    },
    /// Record from the default microphone for `duration` seconds, then
    /// identify the recording.
    Listen {
        #[arg(long, default_value_t = 10)]
        duration_secs: u64,
        #[arg(long, default_value_t = 1)]
        channels: usize,
        #[arg(long, default_value_t = 44100)]
        samplerate: u32,
    },
    /// Drop and recreate the index's tables.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_ref().and_then(|p| p.to_str());
    let config = Config::load(config_path)?;
    let mut index = PostgresIndex::connect(&config.database.connection_url())?;

    match cli.command {
        Command::Ingest { path, limit_seconds } => {
            let limit_seconds = limit_seconds.or_else(|| config.fingerprint_limit_seconds());
            let summary = ingest::ingest_path(&mut index, &path, limit_seconds).await?;
            info!(
                songs_indexed = summary.songs_indexed,
                skipped_duplicate = summary.files_skipped_duplicate,
                failed = summary.files_failed,
                "ingest complete"
            );
        }
        Command::Query { path, limit_seconds } => {
            let limit_seconds = limit_seconds.or_else(|| config.fingerprint_limit_seconds());
            match recognize::recognize_file(&mut index, &path, limit_seconds).await? {
                Some(record) => println!("{record:#?}"),
                None => println!("not found"),
            }
        }
        Command::Listen {
            duration_secs,
            channels,
            samplerate,
        } => {
            let mut capture = MicrophoneCapture::new(channels, samplerate, 1024);
            capture.start()?;
            tokio::time::sleep(Duration::from_secs(duration_secs)).await;
            capture.stop();

            match recognize::recognize_capture(&mut index, &capture)? {
                Some(record) => println!("{record:#?}"),
                None => println!("not found"),
            }
        }
        Command::Reset => {
            index.empty()?;
            info!("index reset");
        }
    }

    Ok(())
}
