use crate::ports::transcoder::TranscodeExecutor;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command as TokioCommand;
use tracing::debug;

/// Runs the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegExecutor {
    program: String,
}

impl FfmpegExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn dash_command(&self, input: &Path, manifest: &Path) -> TokioCommand {
        let mut command = TokioCommand::new(&self.program);
        // Redeliveries rerun into an existing output tree; never prompt.
        command
            .arg("-y")
            .arg("-nostdin")
            .arg("-i")
            .arg(input)
            .arg("-f")
            .arg("dash")
            .arg(manifest)
            .stdin(Stdio::null())
            // Dropping the future (timeout) must not leave ffmpeg running.
            .kill_on_drop(true);
        command
    }
}

impl Default for FfmpegExecutor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl TranscodeExecutor for FfmpegExecutor {
    async fn run_dash(&self, input: &Path, manifest: &Path) -> io::Result<Output> {
        debug!(program = %self.program, input = %input.display(), manifest = %manifest.display(), "running transcoder");
        self.dash_command(input, manifest).output().await
    }
}
