//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 設計原則
//! - ストア・ロック・カタログは起動時に一度だけ作り、`Arc` で共有する（グローバル状態なし）
//! - 差し替えたいポート（カタログ、時計、ロック）だけ builder で上書きする
//! - 起動時検証（Fail-fast）：カタログが決まらなければ build() が失敗する

use std::sync::Arc;

use crate::app::coordinator::{CoordinatorPorts, QueueCoordinator};
use crate::app::reconcile_loop::ReconcileLoop;
use crate::config::AppConfig;
use crate::domain::QueueError;
use crate::impls::{
    FsAssetResolver, FsImageArchive, FsProcessingLock, FsResultStore, FsTaskStore, JsonFileCatalog,
};
use crate::ports::{Clock, ProcessingLock, ProductCatalog, SystemClock};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no product catalog: set `catalog_path` or supply one to the builder")]
    MissingCatalog,

    #[error("failed to open the product catalog: {0}")]
    Catalog(#[source] QueueError),
}

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(config).build().await?;
/// let applied = app.coordinator().process_results().await?;
/// ```
pub struct AppBuilder {
    config: AppConfig,
    catalog: Option<Arc<dyn ProductCatalog>>,
    clock: Option<Arc<dyn Clock>>,
    lock: Option<Arc<dyn ProcessingLock>>,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            catalog: None,
            clock: None,
            lock: None,
        }
    }

    /// Use this catalog instead of opening `catalog_path`.
    pub fn catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn lock(mut self, lock: Arc<dyn ProcessingLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Wire the file-backed ports under `data_root`.
    ///
    /// # 検証
    /// - カタログが渡されず `catalog_path` も未設定なら BuildError::MissingCatalog
    pub async fn build(self) -> Result<App, BuildError> {
        let config = self.config;

        let catalog: Arc<dyn ProductCatalog> = match (self.catalog, &config.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => Arc::new(
                JsonFileCatalog::open(path)
                    .await
                    .map_err(BuildError::Catalog)?,
            ),
            (None, None) => return Err(BuildError::MissingCatalog),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let lock = self
            .lock
            .unwrap_or_else(|| Arc::new(FsProcessingLock::new(config.lock_path(), clock.clone())));

        let ports = CoordinatorPorts {
            tasks: Arc::new(FsTaskStore::new(config.tasks_dir())),
            results: Arc::new(FsResultStore::new(config.results_dir())),
            catalog,
            assets: Arc::new(FsAssetResolver::new(
                &config.media_root,
                config.media_base_url.clone(),
            )),
            archive: Arc::new(FsImageArchive::new(config.originals_dir())),
            lock,
            clock,
        };
        let coordinator = Arc::new(QueueCoordinator::new(ports, config.coordinator_settings()));

        Ok(App {
            config,
            coordinator,
        })
    }
}

/// App は構築済みのコーディネータと設定を保持
pub struct App {
    config: AppConfig,
    coordinator: Arc<QueueCoordinator>,
}

impl App {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<QueueCoordinator> {
        &self.coordinator
    }

    /// Start periodic reconciliation at the configured interval.
    ///
    /// Returns `None` when scheduling is disabled.
    pub fn spawn_reconcile_loop(&self) -> Option<ReconcileLoop> {
        self.config.schedule.enabled.then(|| {
            ReconcileLoop::spawn(self.coordinator.clone(), self.config.schedule.interval())
        })
    }
}
