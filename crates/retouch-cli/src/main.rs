//! `retouch` - operator commands for the photo retouching queue.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

use retouch_core::app::{App, BatchOutcome, ReconcileLoop, SubmitOutcome};
use retouch_core::domain::{CategoryId, ProductId, ProductSnapshot, product::attr};
use retouch_core::{AppBuilder, AppConfig};

#[derive(Debug, Parser)]
#[command(
    name = "retouch",
    version,
    about = "Queue product photos for AI retouching and apply the results",
    long_about = "Writes task descriptors for an external image worker and reconciles the \
                  results it leaves behind into the product catalog."
)]
struct Opt {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `data_root` from the configuration.
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a task for one product.
    Enqueue {
        product_id: u64,
        /// Reprocess even if the product is already marked as processed.
        #[arg(long)]
        force: bool,
    },
    /// Create tasks for unprocessed products of the configured category.
    Batch {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        category: Option<u64>,
    },
    /// Clear the processing lock. Tasks already written stay queued.
    Stop,
    /// Apply finished results to the catalog.
    Reconcile,
    /// Reconcile, then list every task with its result.
    Queue {
        #[arg(long)]
        json: bool,
    },
    /// Reconcile periodically until interrupted.
    Watch,
    /// Create a task from attributes typed on the command line.
    Create {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        model: String,
        #[arg(long, default_value = "")]
        width: String,
        #[arg(long, default_value = "")]
        height: String,
        #[arg(long, default_value = "")]
        diameter: String,
        #[arg(long, default_value = "")]
        load_index: String,
        #[arg(long, default_value = "")]
        speed_index: String,
        #[arg(long, default_value = "")]
        season: String,
    },
}

fn init_tracing(debug_logging: bool) {
    let fallback = if debug_logging { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let mut config = AppConfig::load_or_default(opt.config.as_deref())?;
    if let Some(data_root) = opt.data_root {
        config.data_root = data_root;
    }
    init_tracing(config.style.debug_logging);

    let app = AppBuilder::new(config)
        .build()
        .await
        .context("failed to set up the queue")?;

    run(&app, opt.command).await
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    let coordinator = app.coordinator();

    match command {
        Command::Enqueue { product_id, force } => {
            match coordinator
                .submit_single(ProductId::new(product_id), force)
                .await?
            {
                SubmitOutcome::Submitted(task_id) => println!("queued {task_id}"),
                SubmitOutcome::AlreadyProcessed(marker) => println!(
                    "product {product_id} was already processed by {marker}; use --force to redo it"
                ),
            }
        }
        Command::Batch { limit, category } => {
            let limit = limit.unwrap_or_else(|| app.config().batch_limit());
            let category = category
                .map(CategoryId::new)
                .unwrap_or(app.config().category);
            match coordinator.submit_batch(category, limit).await? {
                BatchOutcome::NothingToDo => println!("nothing to process"),
                BatchOutcome::Started { created, failed } => {
                    println!("queued {} task(s), {failed} failed", created.len());
                }
            }
        }
        Command::Stop => {
            coordinator.stop().await?;
            println!("processing lock cleared");
        }
        Command::Reconcile => {
            let applied = coordinator.process_results().await?;
            println!("{applied} product(s) updated");
        }
        Command::Queue { json } => {
            coordinator.process_results().await?;
            let view = coordinator.queue_view().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                for entry in &view.entries {
                    println!(
                        "{}\t{}\t{} {}\t{:?}\t{}",
                        entry.task_id,
                        entry
                            .product_id
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        entry.brand,
                        entry.model,
                        entry.status,
                        entry
                            .output_image
                            .as_deref()
                            .or(entry.message.as_deref())
                            .unwrap_or(""),
                    );
                }
                println!(
                    "pending {} / success {} / error {}",
                    view.counts.pending, view.counts.success, view.counts.error
                );
            }
        }
        Command::Watch => {
            let reconcile = match app.spawn_reconcile_loop() {
                Some(reconcile) => reconcile,
                None => {
                    tracing::info!("schedule disabled in config; watching anyway");
                    ReconcileLoop::spawn(coordinator.clone(), app.config().schedule.interval())
                }
            };

            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                }
            }
            reconcile.shutdown_and_join().await;
        }
        Command::Create {
            brand,
            model,
            width,
            height,
            diameter,
            load_index,
            speed_index,
            season,
        } => {
            let snapshot = ProductSnapshot::new()
                .with(attr::BRAND, brand)
                .with(attr::MODEL, model)
                .with(attr::WIDTH, width)
                .with(attr::HEIGHT, height)
                .with(attr::DIAMETER, diameter)
                .with(attr::LOAD_INDEX, load_index)
                .with(attr::SPEED_INDEX, speed_index)
                .with(attr::SEASON, season);
            let task_id = coordinator.create_manual_task(snapshot).await?;
            println!("queued {task_id}");
        }
    }

    Ok(())
}
