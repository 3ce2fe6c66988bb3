//! QueueCoordinator - タスク作成・投入・結果照合
//!
//! # 設計原則
//! - 作成系（`create_*` / `submit_*`）は fail-fast。エラーはそのまま呼び出し側へ返す
//! - 照合（`process_results`）は無人で定期実行されるため、1 件ごとの失敗は warn で読み飛ばす
//! - ProcessingLock が守るのはタスクの「作成」だけ。照合はロック不要（冪等）
//! - 外部ワーカーは呼ばない。タスク記述子を置いたら終わり

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::status::QueueView;
use crate::domain::{
    AssetRef, CategoryId, Product, ProductId, ProductSnapshot, QueueError, ResolvedFonts, Season,
    StyleConfig, StyleOverrides, TaskDescriptor, TaskId, output_filename_for, product::attr,
};
use crate::ports::archive::ORIGINALS_DIR;
use crate::ports::{
    AssetResolver, Clock, ImageArchive, ProcessingLock, ProductCatalog, ResolvedAsset, ResultStore,
    TaskStore,
};

/// Directory prefix of background paths inside a task descriptor.
pub const TEMPLATES_DIR: &str = "templates";
/// Directory prefix of icon paths inside a task descriptor.
pub const LOGOS_DIR: &str = "logos";

/// Extension used for backups when the source photo has none.
const FALLBACK_EXTENSION: &str = "jpg";

/// Ports the coordinator is wired with.
#[derive(Clone)]
pub struct CoordinatorPorts {
    pub tasks: Arc<dyn TaskStore>,
    pub results: Arc<dyn ResultStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub assets: Arc<dyn AssetResolver>,
    pub archive: Arc<dyn ImageArchive>,
    pub lock: Arc<dyn ProcessingLock>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub style: StyleConfig,
    /// Category single submissions must belong to.
    pub category: CategoryId,
    pub single_lock_ttl: Duration,
    pub batch_lock_ttl: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            style: StyleConfig::default(),
            category: CategoryId::new(14834),
            single_lock_ttl: Duration::from_secs(10 * 60),
            batch_lock_ttl: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(TaskId),
    /// The product already carries a marker and `force` was not set.
    AlreadyProcessed(TaskId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// No unprocessed product in the category.
    NothingToDo,
    Started { created: Vec<TaskId>, failed: usize },
}

pub struct QueueCoordinator {
    ports: CoordinatorPorts,
    settings: CoordinatorSettings,
}

impl QueueCoordinator {
    pub fn new(ports: CoordinatorPorts, settings: CoordinatorSettings) -> Self {
        Self { ports, settings }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Snapshot a catalog product into a new pending task.
    ///
    /// Does not look at the processed marker or the lock; `submit_single` and
    /// `submit_batch` do that.
    pub async fn create_task_for_product(
        &self,
        product_id: ProductId,
        overrides: &StyleOverrides,
    ) -> Result<TaskId, QueueError> {
        let product = self.require_product(product_id).await?;

        let season = Season::classify(product.attribute(attr::SEASON));
        let (background_ref, icon_ref) = self.settings.style.assets_for(season)?;
        let background = self.require_asset(background_ref).await?;
        let icon = self.require_asset(icon_ref).await?;

        let image_ref = product.image.as_ref().ok_or_else(|| {
            QueueError::Validation(format!("product {product_id} has no image"))
        })?;
        let image = self.require_asset(image_ref).await?;

        let now = self.ports.clock.now();
        let task_id = TaskId::for_product(now, product_id);

        let mut params = self.settings.style.render(&self.resolve_fonts().await?);
        overrides.apply(&mut params);

        let backup_name = format!(
            "{task_id}.{}",
            image.extension().unwrap_or(FALLBACK_EXTENSION)
        );
        let descriptor = TaskDescriptor::new(task_id.clone(), snapshot_of(&product), now)
            .with_product(product_id)
            .with_original_image(format!("{ORIGINALS_DIR}/{backup_name}"))
            .with_template(asset_entry(TEMPLATES_DIR, &background))
            .with_icon(asset_entry(LOGOS_DIR, &icon))
            .with_output_filename(output_filename_for(product_id))
            .with_params(params);
        descriptor.validate()?;

        self.ports.archive.preserve(&image.path, &backup_name).await?;
        self.ports.tasks.put(&descriptor).await?;

        info!(
            task_id = %task_id,
            product_id = %product_id,
            season = ?season,
            "task created"
        );
        Ok(task_id)
    }

    /// Persist a caller-built descriptor, backing up `source_image` first.
    pub async fn create_task(
        &self,
        mut descriptor: TaskDescriptor,
        source_image: Option<&Path>,
    ) -> Result<TaskId, QueueError> {
        descriptor.validate()?;

        if let Some(source) = source_image {
            let extension = source
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or(FALLBACK_EXTENSION);
            let backup_name = format!("{}.{extension}", descriptor.task_id);
            self.ports.archive.preserve(source, &backup_name).await?;
            if descriptor.original_image.is_none() {
                descriptor.original_image = Some(format!("{ORIGINALS_DIR}/{backup_name}"));
            }
        }

        self.ports.tasks.put(&descriptor).await?;
        info!(task_id = %descriptor.task_id, "task created");
        Ok(descriptor.task_id)
    }

    /// Task typed in by an operator, with the global style as parameters.
    ///
    /// A second manual task in the same second gets a `task_<ULID>` id.
    pub async fn create_manual_task(&self, snapshot: ProductSnapshot) -> Result<TaskId, QueueError> {
        let now = self.ports.clock.now();
        let params = self.settings.style.render(&self.resolve_fonts().await?);
        let descriptor = TaskDescriptor::new(TaskId::manual(now), snapshot, now).with_params(params);
        match self.create_task(descriptor.clone(), None).await {
            Err(QueueError::Conflict(taken)) => {
                debug!(task_id = %taken, "manual id taken; generating one");
                let descriptor = TaskDescriptor {
                    task_id: TaskId::generate(now),
                    ..descriptor
                };
                self.create_task(descriptor, None).await
            }
            other => other,
        }
    }

    /// Apply successful results to the products' processed markers.
    ///
    /// Returns the number of markers that changed in this call, so a repeated
    /// call on the same results returns 0. When one product has several
    /// successful results, the greatest task id wins.
    pub async fn process_results(&self) -> Result<usize, QueueError> {
        let results = self.ports.results.list_all().await?;
        // 結果は自分の product_id か ID の末尾でも照合できるので、タスク一覧の失敗で止めない
        let owners: HashMap<TaskId, Option<ProductId>> = match self.ports.tasks.list_all().await {
            Ok(tasks) => tasks
                .into_iter()
                .map(|task| (task.task_id, task.product_id))
                .collect(),
            Err(e) => {
                warn!(error = %e, "task list unreadable; matching results by id only");
                HashMap::new()
            }
        };

        let mut latest: BTreeMap<ProductId, TaskId> = BTreeMap::new();
        for result in results.into_iter().filter(|r| r.is_success()) {
            let owner = match result.product_id {
                Some(explicit) => Some(explicit),
                None => match owners.get(&result.task_id) {
                    Some(recorded) => *recorded,
                    None => result.task_id.product_suffix(),
                },
            };
            let Some(product_id) = owner.filter(|id| id.get() != 0) else {
                debug!(task_id = %result.task_id, "result has no owning product; skipped");
                continue;
            };
            let newer = latest
                .get(&product_id)
                .is_none_or(|current| *current < result.task_id);
            if newer {
                latest.insert(product_id, result.task_id);
            }
        }

        let mut applied = 0;
        for (product_id, task_id) in latest {
            match self.apply_result(product_id, &task_id).await {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(product_id = %product_id, task_id = %task_id, error = %e, "result not applied");
                }
            }
        }

        if applied > 0 {
            info!(applied, "results reconciled");
        } else {
            debug!("no new results");
        }
        Ok(applied)
    }

    /// Create one task for `product_id` under the single-submission lock.
    pub async fn submit_single(
        &self,
        product_id: ProductId,
        force: bool,
    ) -> Result<SubmitOutcome, QueueError> {
        if self.ports.lock.is_held().await? {
            return Err(QueueError::Busy);
        }

        self.require_product(product_id).await?;
        if !self
            .ports
            .catalog
            .in_category(product_id, self.settings.category)
            .await?
        {
            return Err(QueueError::Validation(format!(
                "product {product_id} is not in category {}",
                self.settings.category
            )));
        }
        if !force {
            if let Some(marker) = self.ports.catalog.processed_marker(product_id).await? {
                info!(product_id = %product_id, marker = %marker, "already processed; skipped");
                return Ok(SubmitOutcome::AlreadyProcessed(marker));
            }
        }

        if !self.ports.lock.try_acquire(self.settings.single_lock_ttl).await? {
            return Err(QueueError::Busy);
        }
        let created = self
            .create_task_for_product(product_id, &StyleOverrides::new())
            .await;
        self.release_lock().await;

        created.map(SubmitOutcome::Submitted)
    }

    /// Create tasks for up to `limit` unprocessed products of `category`.
    ///
    /// Per-product failures are logged and counted; they do not stop the batch.
    pub async fn submit_batch(
        &self,
        category: CategoryId,
        limit: usize,
    ) -> Result<BatchOutcome, QueueError> {
        if self.ports.lock.is_held().await? {
            return Err(QueueError::Busy);
        }

        let limit = limit.max(1);
        let mut pending = Vec::new();
        for product_id in self.ports.catalog.products_in_category(category).await? {
            if pending.len() >= limit {
                break;
            }
            match self.ports.catalog.processed_marker(product_id).await {
                Ok(None) => pending.push(product_id),
                Ok(Some(_)) => {}
                Err(e) => warn!(product_id = %product_id, error = %e, "marker unreadable; skipped"),
            }
        }
        if pending.is_empty() {
            info!(category = %category, "no unprocessed products");
            return Ok(BatchOutcome::NothingToDo);
        }

        if !self.ports.lock.try_acquire(self.settings.batch_lock_ttl).await? {
            return Err(QueueError::Busy);
        }
        info!(category = %category, products = pending.len(), "batch started");

        let overrides = StyleOverrides::new();
        let mut created = Vec::with_capacity(pending.len());
        let mut failed = 0;
        for product_id in pending {
            match self.create_task_for_product(product_id, &overrides).await {
                Ok(task_id) => created.push(task_id),
                Err(e) => {
                    failed += 1;
                    warn!(product_id = %product_id, error = %e, "task not created");
                }
            }
        }
        self.release_lock().await;

        info!(created = created.len(), failed, "batch finished");
        Ok(BatchOutcome::Started { created, failed })
    }

    /// Clear the processing lock. Tasks already written stay queued.
    pub async fn stop(&self) -> Result<(), QueueError> {
        self.ports.lock.release().await?;
        info!("processing lock cleared");
        Ok(())
    }

    pub async fn is_busy(&self) -> Result<bool, QueueError> {
        self.ports.lock.is_held().await
    }

    pub async fn queue_view(&self) -> Result<QueueView, QueueError> {
        let tasks = self.ports.tasks.list_all().await?;
        let results = self.ports.results.list_all().await?;
        Ok(QueueView::build(tasks, results))
    }

    async fn require_product(&self, product_id: ProductId) -> Result<Product, QueueError> {
        self.ports
            .catalog
            .product(product_id)
            .await?
            .filter(Product::is_product)
            .ok_or_else(|| QueueError::not_found("product", product_id))
    }

    async fn require_asset(&self, asset: &AssetRef) -> Result<ResolvedAsset, QueueError> {
        self.ports
            .assets
            .resolve(asset)
            .await?
            .ok_or_else(|| QueueError::not_found("asset", asset))
    }

    /// Unresolvable fonts are passed through verbatim; unset fonts become "".
    async fn resolve_fonts(&self) -> Result<ResolvedFonts, QueueError> {
        let fonts = &self.settings.style.fonts;
        Ok(ResolvedFonts {
            bold: self.font_path(fonts.bold.as_ref()).await?,
            semibold: self.font_path(fonts.semibold.as_ref()).await?,
            regular: self.font_path(fonts.regular.as_ref()).await?,
        })
    }

    async fn font_path(&self, font: Option<&AssetRef>) -> Result<String, QueueError> {
        let Some(font) = font else {
            return Ok(String::new());
        };
        Ok(match self.ports.assets.resolve(font).await? {
            Some(resolved) => resolved.path.display().to_string(),
            None => font.as_str().to_string(),
        })
    }

    /// `Ok(true)` when the marker changed.
    async fn apply_result(&self, product_id: ProductId, task_id: &TaskId) -> Result<bool, QueueError> {
        let exists = self
            .ports
            .catalog
            .product(product_id)
            .await?
            .is_some_and(|p| p.is_product());
        if !exists {
            debug!(product_id = %product_id, task_id = %task_id, "product gone; skipped");
            return Ok(false);
        }
        let current = self.ports.catalog.processed_marker(product_id).await?;
        if current.as_ref() == Some(task_id) {
            return Ok(false);
        }
        self.ports
            .catalog
            .set_processed_marker(product_id, task_id)
            .await?;
        debug!(product_id = %product_id, task_id = %task_id, "marker set");
        Ok(true)
    }

    async fn release_lock(&self) {
        if let Err(e) = self.ports.lock.release().await {
            warn!(error = %e, "failed to release processing lock");
        }
    }
}

fn asset_entry(dir: &str, asset: &ResolvedAsset) -> String {
    format!("{dir}/{}", asset.file_name().unwrap_or_default())
}

/// Attributes copied into `product_data`. Missing attributes become "".
fn snapshot_of(product: &Product) -> ProductSnapshot {
    let diameter = product.attribute(attr::DIAMETER);
    let diameter = if diameter.is_empty() {
        String::new()
    } else {
        format!("R{diameter}")
    };
    ProductSnapshot::new()
        .with(attr::BRAND, product.attribute(attr::BRAND))
        .with(attr::MODEL, product.attribute(attr::MODEL))
        .with(attr::WIDTH, product.attribute(attr::WIDTH))
        .with(attr::HEIGHT, product.attribute(attr::HEIGHT))
        .with(attr::DIAMETER, diameter)
        .with(attr::LOAD_INDEX, product.attribute(attr::LOAD_INDEX))
        .with(attr::SPEED_INDEX, product.attribute(attr::SPEED_INDEX))
        .with(attr::SEASON, product.attribute(attr::SEASON))
}
