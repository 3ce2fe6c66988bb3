//! retouch-core
//!
//! Queue and result reconciliation for AI product-photo retouching.
//!
//! 商品写真の加工タスクをディレクトリに書き出し、外部ワーカーが残した結果を
//! 商品の「処理済みマーカー」へ反映します。画像処理そのものは行いません。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task / result 記述子, season, style, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, ResultStore, ProductCatalog, AssetResolver, ImageArchive, ProcessingLock, Clock）
//! - **impls**: 実装（ファイル版・インメモリ版）
//! - **app**: アプリケーションロジック（QueueCoordinator, ReconcileLoop, AppBuilder, status）
//! - **config**: JSON 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use crate::app::{App, AppBuilder, QueueCoordinator};
pub use crate::config::AppConfig;
pub use crate::domain::QueueError;
