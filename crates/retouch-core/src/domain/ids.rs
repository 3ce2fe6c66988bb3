//! Domain identifiers.
//!
//! # TaskId
//! TaskId は不透明な文字列です。ファイル名（`<task_id>.json`）としても使うため、
//! パス区切り文字などを含む ID は `validate_file_stem()` で拒否します。
//!
//! 商品から作るタスクは `<YYYYmmdd_HHMMSS>_<product_id>` 形式になり、
//! 末尾の数値から商品を逆引きできます（明示的な `product_id` がない結果の互換用）。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::errors::QueueError;

/// Timestamp layout used as the prefix of product and manual task ids.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Identifier of a product in the host catalog.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProductId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a product category (the host resolves the category tree).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(u64);

impl CategoryId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to a media asset (background, icon, font, product photo).
///
/// The meaning of the string is owned by the `AssetResolver` port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a task descriptor; also the stem of its file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// `<YYYYmmdd_HHMMSS>_<product_id>`
    ///
    /// Two tasks for the same product within one second share an id; the task
    /// store rejects the second one with `QueueError::Conflict`.
    pub fn for_product(at: DateTime<Utc>, product_id: ProductId) -> Self {
        Self(format!("{}_{}", at.format(TIMESTAMP_FORMAT), product_id))
    }

    /// `manual_<YYYYmmdd_HHMMSS>` for tasks typed in by an operator.
    pub fn manual(at: DateTime<Utc>) -> Self {
        Self(format!("manual_{}", at.format(TIMESTAMP_FORMAT)))
    }

    /// `task_<ULID>` for tasks that carry no product identity.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let timestamp_ms = at.timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        Self(format!("task_{ulid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Product encoded in the trailing `_<digits>` segment, if any.
    ///
    /// `0` is not a valid product id and yields `None`.
    pub fn product_suffix(&self) -> Option<ProductId> {
        let (_, tail) = self.0.rsplit_once('_')?;
        if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match tail.parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(value) => Some(ProductId(value)),
        }
    }

    /// `<task_id>.json`
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }

    /// Reject ids that cannot be used verbatim as a file stem.
    pub fn validate_file_stem(&self) -> Result<(), QueueError> {
        if self.is_empty() {
            return Err(QueueError::Validation("task_id is empty".to_string()));
        }
        let bad = self.0.starts_with('.')
            || self
                .0
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control());
        if bad {
            return Err(QueueError::Validation(format!(
                "task_id {:?} cannot be used as a file name",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
