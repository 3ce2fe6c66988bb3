//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! コアが触る外部のもの（記述子ディレクトリ、商品カタログ、メディア、ロック、時刻）は
//! すべてここの trait 越しに使い、実装は `impls` に置きます。
//!
//! # 設計原則
//! - タスク記述子・結果記述子は write-once
//! - 処理済みマーカーとロックは last-write-wins
//! - 全 trait は `Send + Sync`（`Arc<dyn _>` で共有する）

pub mod archive;
pub mod assets;
pub mod catalog;
pub mod clock;
pub mod lock;
pub mod result_store;
pub mod task_store;

// 主要な trait を再エクスポート
pub use self::archive::ImageArchive;
pub use self::assets::{AssetResolver, ResolvedAsset};
pub use self::catalog::ProductCatalog;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::lock::ProcessingLock;
pub use self::result_store::ResultStore;
pub use self::task_store::TaskStore;
