use async_trait::async_trait;
use dashmill::adapters::ffmpeg::FfmpegExecutor;
use dashmill::adapters::memory::{ChannelSource, MemoryLedgerStore};
use dashmill::domain::jobs::{ErrorRecord, JobId, JobLayout};
use dashmill::error::LedgerError;
use dashmill::ports::ledger::LedgerStore;
use dashmill::ports::queue::Delivery;
use dashmill::ports::transcoder::TranscodeExecutor;
use dashmill::{Dispatcher, HandleOutcome, IdempotencyLedger, JobHandler};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// Stands in for ffmpeg: records what it was fed and writes a manifest.
#[derive(Clone, Default)]
struct ScriptedTranscoder {
    calls: Arc<AtomicUsize>,
    inputs: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl TranscodeExecutor for ScriptedTranscoder {
    async fn run_dash(&self, input: &Path, manifest: &Path) -> io::Result<Output> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(fs::read(input)?);
        fs::write(manifest, "<MPD/>")?;
        fs::write(manifest.with_file_name("chunk-stream0-00001.m4s"), "seg")?;
        Ok(Output {
            status: ExitStatus::from_raw(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

fn upload_dir(root: &Path, id: i64, fragments: &[(&str, &str)]) -> PathBuf {
    let dir = root.join(id.to_string());
    fs::create_dir_all(&dir).unwrap();
    for (name, contents) in fragments {
        fs::write(dir.join(name), contents).unwrap();
    }
    dir
}

fn message(id: i64, dir: &Path) -> Delivery {
    let body = serde_json::json!({ "video_id": id, "path": dir }).to_string();
    Delivery::new(body.into_bytes())
}

#[tokio::test]
async fn test_end_to_end_through_dispatcher() {
    let root = tempdir().unwrap();
    let dir = upload_dir(
        root.path(),
        7,
        &[("2.chunk", "BB"), ("1.chunk", "A"), ("10.chunk", "CCC")],
    );

    let (sender, source) = ChannelSource::new();
    sender.send(message(7, &dir)).unwrap();
    drop(sender);

    let store = MemoryLedgerStore::new();
    let transcoder = ScriptedTranscoder::default();
    let handler = JobHandler::new(IdempotencyLedger::new(store.clone()), transcoder.clone());
    let dispatcher = Dispatcher::new(source.clone(), handler).with_receive_timeout(0.05);

    assert_eq!(dispatcher.run(CancellationToken::new()).await, 1);

    let layout = JobLayout::new(&dir);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(transcoder.inputs.lock().unwrap()[0], b"ABBCCC");
    assert!(layout.manifest.exists());
    assert!(!layout.merged_file.exists());
    assert_eq!(store.success_count(7), 1);
    assert!(store.errors().is_empty());
    assert_eq!(source.acked().len(), 1);
}

#[tokio::test]
async fn test_redelivery_after_success_is_skipped() {
    let root = tempdir().unwrap();
    let dir = upload_dir(root.path(), 11, &[("1.chunk", "x")]);

    let store = MemoryLedgerStore::new();
    let transcoder = ScriptedTranscoder::default();
    let handler = JobHandler::new(IdempotencyLedger::new(store.clone()), transcoder.clone());
    let payload = message(11, &dir).payload;

    assert_eq!(handler.handle(&payload).await, HandleOutcome::Converted);
    assert_eq!(handler.handle(&payload).await, HandleOutcome::Skipped);

    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.success_count(11), 1);
    assert!(!JobLayout::new(&dir).merged_file.exists());
}

#[tokio::test]
async fn test_duplicate_concurrent_deliveries_converge() {
    let root = tempdir().unwrap();
    let dir = upload_dir(root.path(), 21, &[("1.chunk", "a"), ("2.chunk", "b")]);

    let (sender, source) = ChannelSource::new();
    sender.send(message(21, &dir)).unwrap();
    sender.send(message(21, &dir)).unwrap();
    drop(sender);

    let store = MemoryLedgerStore::new();
    let transcoder = ScriptedTranscoder::default();
    let handler = JobHandler::new(IdempotencyLedger::new(store.clone()), transcoder.clone());
    let dispatcher = Dispatcher::new(source, handler).with_receive_timeout(0.05);

    assert_eq!(dispatcher.run(CancellationToken::new()).await, 2);

    let calls = transcoder.calls.load(Ordering::SeqCst);
    assert!((1..=2).contains(&calls));
    assert_eq!(store.success_count(21), 1);
    assert!(JobLayout::new(&dir).manifest.exists());
}

#[tokio::test]
async fn test_failures_do_not_affect_sibling_jobs() {
    let root = tempdir().unwrap();
    let good = upload_dir(root.path(), 1, &[("1.chunk", "ok")]);
    let missing = root.path().join("does-not-exist");

    let (sender, source) = ChannelSource::new();
    sender.send(Delivery::new(&b"{not json"[..])).unwrap();
    sender.send(message(2, &missing)).unwrap();
    sender.send(message(1, &good)).unwrap();
    drop(sender);

    let store = MemoryLedgerStore::new();
    let handler = JobHandler::new(
        IdempotencyLedger::new(store.clone()),
        ScriptedTranscoder::default(),
    );
    let dispatcher = Dispatcher::new(source, handler)
        .with_max_in_flight(Some(1))
        .with_receive_timeout(0.05);

    assert_eq!(dispatcher.run(CancellationToken::new()).await, 3);

    assert_eq!(store.success_count(1), 1);
    assert_eq!(store.success_count(2), 0);
    let mut reasons: Vec<String> = store.errors().into_iter().map(|e| e.error).collect();
    reasons.sort();
    assert_eq!(reasons, vec!["deserialization failed", "processing failed"]);
}

/// Memory ledger whose first success write fails.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryLedgerStore,
    failed_once: Arc<AtomicUsize>,
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn has_success(&self, job_id: JobId) -> Result<bool, LedgerError> {
        self.inner.has_success(job_id).await
    }

    async fn insert_success(&self, job_id: JobId) -> Result<(), LedgerError> {
        if self.failed_once.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(LedgerError::Unavailable("connection reset".into()));
        }
        self.inner.insert_success(job_id).await
    }

    async fn insert_error(&self, record: &ErrorRecord) -> Result<(), LedgerError> {
        self.inner.insert_error(record).await
    }
}

/// Shell stand-in for ffmpeg that refuses to replace an existing output
/// unless `-y` is given, the way the real binary does with no terminal.
fn fake_ffmpeg(root: &Path) -> PathBuf {
    let script = root.join("ffmpeg");
    fs::write(
        &script,
        r#"#!/bin/sh
overwrite=no
for arg in "$@"; do
  [ "$arg" = "-y" ] && overwrite=yes
  out="$arg"
done
if [ -e "$out" ] && [ "$overwrite" = no ]; then
  echo "File '$out' already exists. Overwrite? [y/N] Not overwriting - exiting" >&2
  exit 1
fi
echo "<MPD/>" > "$out"
"#,
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[tokio::test]
async fn test_redelivery_after_unrecorded_success_converges() {
    let root = tempdir().unwrap();
    let dir = upload_dir(root.path(), 31, &[("1.chunk", "a"), ("2.chunk", "b")]);
    let ffmpeg = fake_ffmpeg(root.path());

    let store = FlakyStore::default();
    let handler = JobHandler::new(
        IdempotencyLedger::new(store.clone()),
        FfmpegExecutor::new(ffmpeg.to_string_lossy()),
    );
    let payload = message(31, &dir).payload;

    assert_eq!(handler.handle(&payload).await, HandleOutcome::Unrecorded);
    assert!(JobLayout::new(&dir).manifest.exists());

    // The manifest from the first attempt is still there.
    assert_eq!(handler.handle(&payload).await, HandleOutcome::Converted);
    assert_eq!(handler.handle(&payload).await, HandleOutcome::Skipped);

    assert_eq!(store.inner.success_count(31), 1);
    let reasons: Vec<String> = store.inner.errors().into_iter().map(|e| e.error).collect();
    assert_eq!(reasons, vec!["failed to persist success"]);
}
