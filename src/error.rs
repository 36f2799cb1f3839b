//! Error types for every stage of the conversion pipeline.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

pub type RedisError = deadpool_redis::redis::RedisError;
pub type PoolError = deadpool_redis::PoolError;

/// Failures while merging a job's fragments into one file.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no fragments found in {dir}: {source}")]
    ListFragments { dir: PathBuf, source: io::Error },

    #[error("failed to create merged file {path}: {source}")]
    CreateMerged { path: PathBuf, source: io::Error },

    #[error("failed to open fragment {path}: {source}")]
    OpenFragment { path: PathBuf, source: io::Error },

    #[error("failed to append fragment {path} to merged file: {source}")]
    AppendFragment { path: PathBuf, source: io::Error },
}

/// Failures while running the external transcoder.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to create output directory {path}: {source}")]
    CreateOutputDir { path: PathBuf, source: io::Error },

    #[error("conversion failed: could not launch transcoder: {0}")]
    Launch(#[source] io::Error),

    #[error("conversion failed ({status}), output: {output}")]
    Failed { status: ExitStatus, output: String },

    #[error("conversion failed: timed out after {limit:?}")]
    TimedOut { limit: Duration },
}

/// Anything that aborts one processing attempt.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to merge chunks: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("failed to convert to MPEG-DASH: {0}")]
    Transcode(#[from] TranscodeError),
}

/// Raw store failures surfaced by a `LedgerStore`.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Create pool error: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("queue closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}
