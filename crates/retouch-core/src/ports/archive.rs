//! ImageArchive port - 元画像のバックアップ
//!
//! カタログ側で画像が差し替え・削除されても、ワーカーが参照する元画像を失わないように
//! タスク作成前にコピーを取ります。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::QueueError;

/// Directory name under the data root that holds preserved originals.
pub const ORIGINALS_DIR: &str = "originals";

/// ImageArchive は ID 付きの名前で元画像を保存する
///
/// # 設計原則
/// - 同名のバックアップが既にあれば上書きしない（不変）
/// - 戻り値は保存先の絶対パス
#[async_trait]
pub trait ImageArchive: Send + Sync {
    async fn preserve(&self, source: &Path, name: &str) -> Result<PathBuf, QueueError>;
}
