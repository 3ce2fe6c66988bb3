//! Result descriptor written by the external worker.

use serde::{Deserialize, Serialize};

use super::ids::{ProductId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
}

/// On-disk shape of `results/<task_id>.json`. Read-only for the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDescriptor {
    pub task_id: TaskId,
    pub status: ResultStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Relative path of the produced image; only set on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_image: Option<String>,

    /// Explicit owner, when the worker copies it over from the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
}

impl ResultDescriptor {
    pub fn success(task_id: TaskId, output_image: impl Into<String>) -> Self {
        Self {
            task_id,
            status: ResultStatus::Success,
            message: Some("OK".to_string()),
            output_image: Some(output_image.into()),
            product_id: None,
        }
    }

    pub fn error(task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            task_id,
            status: ResultStatus::Error,
            message: Some(message.into()),
            output_image: None,
            product_id: None,
        }
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_worker_output() {
        let raw = r#"{
          "task_id": "20240101_120000_501",
          "status": "success",
          "output_image": "product_501_ai.png",
          "message": "OK"
        }"#;
        let result: ResultDescriptor = serde_json::from_str(raw).unwrap();
        assert!(result.is_success());
        assert_eq!(result.output_image.as_deref(), Some("product_501_ai.png"));
        assert_eq!(result.product_id, None);
    }

    #[test]
    fn worker_may_write_null_output_on_error() {
        let raw = r#"{"task_id": "t", "status": "error", "output_image": null, "message": "boom"}"#;
        let result: ResultDescriptor = serde_json::from_str(raw).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.output_image, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let raw = r#"{"task_id": "t", "status": "pending"}"#;
        assert!(serde_json::from_str::<ResultDescriptor>(raw).is_err());
    }
}
