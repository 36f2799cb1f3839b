use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub type JobId = i64;

/// Extension of the uploaded fragments under a job's directory.
pub const FRAGMENT_EXTENSION: &str = "chunk";
/// Assembled media, transient.
pub const MERGED_FILE_NAME: &str = "merged.mp4";
/// Subdirectory receiving the transcoder's output tree.
pub const OUTPUT_DIR_NAME: &str = "mpeg-dash";
pub const MANIFEST_FILE_NAME: &str = "output.mpd";

/// One conversion request, decoded from an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "video_id")]
    pub id: JobId,
    #[serde(rename = "path")]
    pub source_path: PathBuf,
}

impl Job {
    pub fn from_slice(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    pub fn layout(&self) -> JobLayout {
        JobLayout::new(&self.source_path)
    }
}

/// Where each pipeline stage reads and writes for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    pub source_dir: PathBuf,
    pub merged_file: PathBuf,
    pub output_dir: PathBuf,
    pub manifest: PathBuf,
}

impl JobLayout {
    pub fn new(source_dir: &Path) -> Self {
        let output_dir = source_dir.join(OUTPUT_DIR_NAME);
        Self {
            source_dir: source_dir.to_path_buf(),
            merged_file: source_dir.join(MERGED_FILE_NAME),
            manifest: output_dir.join(MANIFEST_FILE_NAME),
            output_dir,
        }
    }
}

/// Diagnostic entry persisted once per failed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub video_id: JobId,
    pub error: String,
    pub details: String,
    pub time: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(video_id: JobId, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            video_id,
            error: error.into(),
            details: details.into(),
            time: Utc::now(),
        }
    }
}
