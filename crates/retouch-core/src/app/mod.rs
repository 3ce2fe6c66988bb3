//! App - アプリケーション層
//!
//! ports を組み合わせてキューの操作を実装します。
//!
//! # 主要コンポーネント
//! - **QueueCoordinator**: タスク作成・単体/一括投入・停止・結果照合
//! - **QueueView**: タスクと結果を突き合わせた一覧
//! - **ReconcileLoop**: 結果照合の定期実行
//! - **AppBuilder**: 設定からのワイヤリング（composition root）

pub mod builder;
pub mod coordinator;
pub mod reconcile_loop;
pub mod status;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::coordinator::{
    BatchOutcome, CoordinatorPorts, CoordinatorSettings, QueueCoordinator, SubmitOutcome,
};
pub use self::reconcile_loop::ReconcileLoop;
pub use self::status::{QueueCounts, QueueEntry, QueueView};
