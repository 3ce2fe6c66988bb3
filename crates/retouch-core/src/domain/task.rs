//! Task descriptor: one requested processing job, written once and never modified.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::QueueError;
use super::ids::{ProductId, TaskId};

/// Value of the descriptor's `type` field for product photos.
pub const TYRE_TASK_KIND: &str = "tyre";

/// Lifecycle status as seen by the worker.
///
/// The core only ever writes `Pending`; the worker owns later transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Success,
    Error,
}

/// Point-in-time copy of product attributes (brand, model, sizes, season, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductSnapshot(BTreeMap<String, String>);

impl ProductSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProductSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn default_kind() -> String {
    TYRE_TASK_KIND.to_string()
}

/// On-disk shape of `<task_id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: TaskId,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    /// Owning product. Absent for manual tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,

    pub created_at: DateTime<Utc>,

    /// Backup of the source photo, relative to the data root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    pub product_data: ProductSnapshot,

    /// Where the worker should place its artifact, relative to the data root.
    #[serde(default)]
    pub output_filename: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl TaskDescriptor {
    pub fn new(task_id: TaskId, product_data: ProductSnapshot, created_at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            kind: default_kind(),
            product_id: None,
            created_at,
            original_image: None,
            template: None,
            icon: None,
            product_data,
            output_filename: String::new(),
            params: Map::new(),
        }
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_original_image(mut self, path: impl Into<String>) -> Self {
        self.original_image = Some(path.into());
        self
    }

    pub fn with_template(mut self, path: impl Into<String>) -> Self {
        self.template = Some(path.into());
        self
    }

    pub fn with_icon(mut self, path: impl Into<String>) -> Self {
        self.icon = Some(path.into());
        self
    }

    pub fn with_output_filename(mut self, path: impl Into<String>) -> Self {
        self.output_filename = path.into();
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Required fields: a usable `task_id` and a non-empty `product_data`.
    pub fn validate(&self) -> Result<(), QueueError> {
        self.task_id.validate_file_stem()?;
        if self.product_data.is_empty() {
            return Err(QueueError::Validation(format!(
                "task {} has an empty product_data",
                self.task_id
            )));
        }
        Ok(())
    }
}

/// `processed/product_<id>_ai.png`
pub fn output_filename_for(product_id: ProductId) -> String {
    format!("processed/product_{product_id}_ai.png")
}
