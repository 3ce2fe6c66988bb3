//! Impls - ports の実装
//!
//! # ファイル実装（本番用）
//! データルート配下のディレクトリをそのまま外部ワーカーと共有します：
//! - **FsTaskStore**: `tasks/<task_id>.json`
//! - **FsResultStore**: `results/<task_id>.json`（外部ワーカーが書く）
//! - **FsImageArchive**: `originals/` への元画像の退避
//! - **FsProcessingLock**: `processing.lock`
//! - **FsAssetResolver**: メディアルート配下のパスと公開 URL
//! - **JsonFileCatalog**: ホストが書き出した商品カタログ
//!
//! # インメモリ実装（テスト用）
//! - InMemoryTaskStore / InMemoryResultStore / InMemoryCatalog / InMemoryLock など

mod fs_json;

pub mod fs_assets;
pub mod fs_lock;
pub mod fs_result_store;
pub mod fs_task_store;
pub mod json_catalog;
pub mod memory;

pub use self::fs_assets::{FsAssetResolver, FsImageArchive};
pub use self::fs_lock::{FsProcessingLock, LOCK_FILE};
pub use self::fs_result_store::{FsResultStore, RESULTS_DIR};
pub use self::fs_task_store::{FsTaskStore, TASKS_DIR};
pub use self::json_catalog::{CatalogRecord, JsonFileCatalog};
pub use self::memory::{
    InMemoryAssetResolver, InMemoryCatalog, InMemoryImageArchive, InMemoryLock,
    InMemoryResultStore, InMemoryTaskStore,
};
