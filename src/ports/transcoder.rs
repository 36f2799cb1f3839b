use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;

/// Runs the external tool that turns assembled media into a DASH tree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeExecutor: Send + Sync {
    /// Convert `input` and write the manifest (plus segments next to it) at `manifest`.
    async fn run_dash(&self, input: &Path, manifest: &Path) -> io::Result<Output>;
}
