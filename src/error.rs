use thiserror::Error;

/// Library-wide error type. The CLI collapses this into `anyhow::Error` at the
/// top level; everything below the CLI boundary propagates one of these.
#[derive(Debug, Error)]
pub enum SonoraError {
    #[error("failed to decode audio file {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("index I/O failure: {0}")]
    IndexIo(#[from] diesel::result::Error),

    #[error("index connection failure: {0}")]
    IndexConnection(#[from] diesel::ConnectionError),

    #[error("index schema is missing required tables/indexes: {0}")]
    IndexSchema(String),

    #[error("no recording has been captured yet")]
    NoRecording,

    #[error("worker task for {file} crashed: {message}")]
    WorkerCrash { file: String, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SonoraError>;
