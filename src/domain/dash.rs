//! MPEG-DASH conversion of an assembled media file.

use crate::domain::jobs::JobLayout;
use crate::error::TranscodeError;
use crate::ports::transcoder::TranscodeExecutor;
use std::process::Output;
use std::time::Duration;
use tracing::{info, warn};

/// Stdout followed by stderr, lossily decoded.
pub fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

/// Convert `layout.merged_file` into a DASH tree under `layout.output_dir`.
///
/// The merged file is removed on success only; a failed attempt keeps it for
/// inspection. Removal failures are logged and ignored.
pub async fn transcode(
    layout: &JobLayout,
    executor: &impl TranscodeExecutor,
    timeout: Option<Duration>,
) -> Result<(), TranscodeError> {
    tokio::fs::create_dir_all(&layout.output_dir)
        .await
        .map_err(|source| TranscodeError::CreateOutputDir {
            path: layout.output_dir.clone(),
            source,
        })?;

    let run = executor.run_dash(&layout.merged_file, &layout.manifest);
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .map_err(|_| TranscodeError::TimedOut { limit })?,
        None => run.await,
    }
    .map_err(TranscodeError::Launch)?;

    if !output.status.success() {
        return Err(TranscodeError::Failed {
            status: output.status,
            output: combined_output(&output),
        });
    }
    info!(path = %layout.output_dir.display(), "converted to MPEG-DASH");

    match tokio::fs::remove_file(&layout.merged_file).await {
        Ok(()) => info!(file = %layout.merged_file.display(), "removed merged file"),
        Err(e) => warn!(
            file = %layout.merged_file.display(),
            error = %e,
            "failed to remove merged file"
        ),
    }

    Ok(())
}
