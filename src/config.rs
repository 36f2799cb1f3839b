//! Configuration loaded from the environment (and an optional `.env` file).

use crate::error::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Worker process configuration.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Debug-level, human-readable logs when true; JSON errors only otherwise
    pub debug: bool,
    /// Redis connection URL for the job queue
    pub redis_url: String,
    pub exchange: String,
    pub routing_key: String,
    pub queue_name: String,
    /// Names this worker's in-flight list; stable per replica
    pub consumer_name: String,
    pub postgres: PostgresConfig,
    /// Transcoder executable
    pub ffmpeg_bin: String,
    /// Cap on in-flight jobs; `None` spawns one task per delivery without limit
    pub max_concurrent_jobs: Option<usize>,
    /// Deadline for one transcoder run
    pub job_timeout: Option<Duration>,
    /// Blocking receive window, bounds how long shutdown can go unnoticed
    pub dequeue_timeout_secs: f64,
}

#[derive(Clone, Debug)]
pub struct PostgresConfig {
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub host: String,
    pub port: u16,
    pub sslmode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user, self.password, self.host, self.port, self.dbname, self.sslmode
        )
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let postgres = PostgresConfig {
            user: var("POSTGRES_USER", "user"),
            password: var("POSTGRES_PASSWORD", "password"),
            dbname: var("POSTGRES_DB", "converter"),
            host: var("POSTGRES_HOST", "host.docker.internal"),
            port: parse_or(&lookup, "POSTGRES_PORT", 5432)?,
            sslmode: var("POSTGRES_SSL_MODE", "disable"),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        };

        Ok(Self {
            debug: var("DEBUG", "false") == "true",
            redis_url: var("REDIS_URL", "redis://127.0.0.1/"),
            exchange: var("CONVERSION_EXCHANGE", "conversion_exchange"),
            routing_key: var("CONVERSION_KEY", "conversion"),
            queue_name: var("QUEUE_NAME", "video_conversion_queue"),
            consumer_name: lookup("CONSUMER_NAME")
                .or_else(|| lookup("HOSTNAME"))
                .unwrap_or_else(|| "worker".to_string()),
            postgres,
            ffmpeg_bin: var("FFMPEG_BIN", "ffmpeg"),
            max_concurrent_jobs: parse_opt(&lookup, "MAX_CONCURRENT_JOBS")?,
            job_timeout: parse_opt::<u64, _>(&lookup, "JOB_TIMEOUT_SECS")?.map(Duration::from_secs),
            dequeue_timeout_secs: parse_or(&lookup, "DEQUEUE_TIMEOUT_SECS", 1.0)?,
        })
    }

    /// Redis list the dispatcher consumes.
    pub fn queue_key(&self) -> String {
        format!("{}:{}:{}", self.exchange, self.routing_key, self.queue_name)
    }
}

fn parse_opt<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(None),
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
