//! Fragment assembly: merge a job's uploaded chunks into one media file.

use crate::error::AssemblyError;
use regex::Regex;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

static ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Ordinal embedded in a fragment's file name: the first run of digits.
/// Names without digits, or with an unparseable run, sort as 0.
pub fn fragment_ordinal(path: &Path) -> u64 {
    let name = path.file_name().and_then(OsStr::to_str).unwrap_or_default();
    ORDINAL
        .find(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Fragment files under `dir`, in assembly order.
///
/// Entries are first sorted by name, then stably by ordinal, so ties keep a
/// deterministic order. An empty directory yields an empty list.
pub async fn list_fragments(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, AssemblyError> {
    let list_err = |source| AssemblyError::ListFragments {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_err)?;
    let mut fragments = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let path = entry.path();
        if path.extension() == Some(OsStr::new(extension)) {
            fragments.push(path);
        }
    }

    fragments.sort();
    fragments.sort_by_key(|path| fragment_ordinal(path));
    Ok(fragments)
}

/// Concatenate every fragment in `dir` into `output`, truncating it first.
///
/// Any failure aborts the remaining appends and leaves the partial output in
/// place. Fragments are never deleted here.
pub async fn assemble(dir: &Path, output: &Path, extension: &str) -> Result<u64, AssemblyError> {
    let fragments = list_fragments(dir, extension).await?;

    let file = File::create(output)
        .await
        .map_err(|source| AssemblyError::CreateMerged {
            path: output.to_path_buf(),
            source,
        })?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    for fragment in &fragments {
        let mut input = File::open(fragment)
            .await
            .map_err(|source| AssemblyError::OpenFragment {
                path: fragment.clone(),
                source,
            })?;
        written += tokio::io::copy(&mut input, &mut writer)
            .await
            .map_err(|source| AssemblyError::AppendFragment {
                path: fragment.clone(),
                source,
            })?;
        debug!(fragment = %fragment.display(), "appended fragment");
    }

    writer
        .flush()
        .await
        .map_err(|source| AssemblyError::AppendFragment {
            path: output.to_path_buf(),
            source,
        })?;

    debug!(
        fragments = fragments.len(),
        bytes = written,
        output = %output.display(),
        "merged fragments"
    );
    Ok(written)
}
