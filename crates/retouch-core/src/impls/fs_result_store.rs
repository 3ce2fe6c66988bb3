//! File-backed ResultStore over the worker's `results/` directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::fs_json::{read_json, read_json_dir};
use crate::domain::{QueueError, ResultDescriptor, TaskId};
use crate::ports::ResultStore;

/// Directory name under the data root.
pub const RESULTS_DIR: &str = "results";

#[derive(Debug, Clone)]
pub struct FsResultStore {
    dir: PathBuf,
}

impl FsResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ResultStore for FsResultStore {
    async fn get(&self, task_id: &TaskId) -> Result<Option<ResultDescriptor>, QueueError> {
        if task_id.validate_file_stem().is_err() {
            return Ok(None);
        }
        read_json(&self.dir.join(task_id.file_name())).await
    }

    async fn list_all(&self) -> Result<Vec<ResultDescriptor>, QueueError> {
        read_json_dir(&self.dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResultStatus;

    #[tokio::test]
    async fn absent_result_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsResultStore::new(tmp.path().join(RESULTS_DIR));
        assert!(store.get(&TaskId::new("t1")).await.unwrap().is_none());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_worker_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("t1.json"),
            r#"{"task_id": "t1", "status": "success", "output_image": "product_1_ai.png", "message": "OK"}"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("t2.json"),
            r#"{"task_id": "t2", "status": "error", "output_image": null, "message": "no mask"}"#,
        )
        .unwrap();
        let store = FsResultStore::new(tmp.path());

        let t1 = store.get(&TaskId::new("t1")).await.unwrap().unwrap();
        assert_eq!(t1.status, ResultStatus::Success);

        let mut all = store.list_all().await.unwrap();
        all.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].message.as_deref(), Some("no mask"));
    }

    #[tokio::test]
    async fn half_written_result_reads_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("t1.json"), r#"{"task_id": "t1", "sta"#).unwrap();
        let store = FsResultStore::new(tmp.path());

        assert!(store.get(&TaskId::new("t1")).await.unwrap().is_none());
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
