//! JSON file helpers shared by the file-backed ports.
//!
//! - 書き込みは一時ファイル経由（途中で落ちても `<name>.json` は不完全にならない）
//! - 読み取りは壊れたファイルを `None` として扱い、警告だけ出す

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::domain::QueueError;

/// Hidden sibling of `path`, unique per call.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("record");
    path.with_file_name(format!(".{name}.{}.tmp", Ulid::new()))
}

fn encode<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, QueueError> {
    serde_json::to_vec_pretty(value).map_err(|source| QueueError::Serialization {
        what: path.display().to_string(),
        source,
    })
}

async fn ensure_parent(path: &Path) -> Result<(), QueueError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| QueueError::storage(parent, e))?;
    }
    Ok(())
}

/// Write `value` to `path` unless the file already exists.
///
/// Returns `Ok(false)` when `path` exists; the existing file is untouched.
pub(crate) async fn write_json_new<T: Serialize>(path: &Path, value: &T) -> Result<bool, QueueError> {
    let bytes = encode(path, value)?;
    ensure_parent(path).await?;

    let tmp = temp_path_for(path);
    fs::write(&tmp, &bytes)
        .await
        .map_err(|e| QueueError::storage(&tmp, e))?;

    // hard_link は宛先が存在すると失敗する = 上書きしない原子的な公開
    let linked = fs::hard_link(&tmp, path).await;
    if let Err(e) = fs::remove_file(&tmp).await {
        debug!(path = %tmp.display(), error = %e, "failed to remove temp file");
    }
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(QueueError::storage(path, e)),
    }
}

/// Write `value` to `path`, replacing any previous content atomically.
pub(crate) async fn write_json_replace<T: Serialize>(path: &Path, value: &T) -> Result<(), QueueError> {
    let bytes = encode(path, value)?;
    ensure_parent(path).await?;

    let tmp = temp_path_for(path);
    fs::write(&tmp, &bytes)
        .await
        .map_err(|e| QueueError::storage(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(QueueError::storage(path, e));
    }
    Ok(())
}

/// Read and decode one file.
///
/// Missing file and undecodable content both yield `Ok(None)`; other I/O
/// failures are errors.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, QueueError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(QueueError::storage(path, e)),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping malformed record");
            Ok(None)
        }
    }
}

/// Decode every `*.json` file directly under `dir`.
///
/// A missing directory is empty. Unreadable or malformed files are skipped.
pub(crate) async fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, QueueError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(QueueError::storage(dir, e)),
    };

    let mut records = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return Err(QueueError::storage(dir, e)),
        };
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping unreadable record"),
        }
    }
    Ok(records)
}
