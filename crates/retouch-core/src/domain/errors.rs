//! Errors - エラー型と分類
//!
//! 作成系（単一タスク・バッチ投入）は fail-fast、列挙・照合系は壊れたレコードを
//! 読み飛ばして続行する。`QueueError` はその両方で使う共通のエラー型。

use std::path::PathBuf;

use thiserror::Error;

use super::ids::TaskId;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 時間をおけば通る（ロック取得待ちなど）
/// - Permanent: 入力を直さない限り通らない
/// - Infrastructure: ディスク・権限などの障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid task: {0}")]
    Validation(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("another submission is in progress; try again later")]
    Busy,

    #[error("task {0} already exists")]
    Conflict(TaskId),

    #[error("storage failure at {path:?}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl QueueError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Busy => ErrorKind::Transient,
            QueueError::Validation(_) | QueueError::NotFound { .. } | QueueError::Conflict(_) => {
                ErrorKind::Permanent
            }
            QueueError::Storage { .. } | QueueError::Serialization { .. } => {
                ErrorKind::Infrastructure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_is_transient() {
        assert_eq!(QueueError::Busy.kind(), ErrorKind::Transient);
    }

    #[test]
    fn storage_error_keeps_path_and_source() {
        let err = QueueError::storage(
            "/tmp/tasks/x.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        let msg = err.to_string();
        assert!(msg.contains("x.json"));
        assert!(msg.contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = QueueError::not_found("product", 42);
        assert_eq!(err.to_string(), "product not found: 42");
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }
}
