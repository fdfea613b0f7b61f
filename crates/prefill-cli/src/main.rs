use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use prefill_core::app::{
    BenchmarkCapture, PrefillBuilder, PrefillOrchestrator, SelectionStore, format_bytes,
};
use prefill_core::impls::{CachedEndpointPool, CatalogBackend, JsonFileSuccessStore};
use prefill_core::{AppId, PrefillConfig, RunOptions, TargetOptions};

#[derive(Parser)]
#[command(name = "prefill", version, about = "Warm a lancache with an account's games")]
struct Cli {
    /// TOML config; defaults apply when the file does not exist
    #[arg(long, global = true, default_value = "prefill.toml")]
    config: PathBuf,

    /// JSON catalog standing in for the network client
    #[arg(long, global = true, default_value = "catalog.json")]
    catalog: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download every target app through the cache
    Prefill {
        #[command(flatten)]
        targets: TargetArgs,
        /// Ignore the success state and re-download
        #[arg(long)]
        force: bool,
        /// Resolve and queue, but transfer nothing
        #[arg(long)]
        no_download: bool,
        /// Print the per-app report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Capture the chunk queues of every target app into a workload file
    Benchmark {
        #[command(flatten)]
        targets: TargetArgs,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Replace the saved app selection
    Select { ids: Vec<u32> },

    /// Print the saved app selection
    Selected,
}

#[derive(Args)]
struct TargetArgs {
    /// Extra app ids (repeatable)
    #[arg(long = "app")]
    apps: Vec<u32>,
    /// Every app the account owns
    #[arg(long)]
    all: bool,
    /// Recently played apps
    #[arg(long)]
    recent: bool,
    /// The N most popular apps
    #[arg(long)]
    top: Option<usize>,
}

impl From<TargetArgs> for TargetOptions {
    fn from(args: TargetArgs) -> Self {
        TargetOptions {
            manual: args.apps.into_iter().map(AppId::new).collect(),
            all_owned: args.all,
            recently_played: args.recent,
            top_popular: args.top,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = PrefillConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.cmd {
        Command::Select { ids } => {
            let store = SelectionStore::new(config.selection_path());
            let ids: Vec<AppId> = ids.into_iter().map(AppId::new).collect();
            store.save(&ids).await?;
            println!("Saved {} apps to {}", ids.len(), store.path().display());
        }
        Command::Selected => {
            let store = SelectionStore::new(config.selection_path());
            for id in store.load().await? {
                println!("{}", id.get());
            }
        }
        Command::Prefill {
            targets,
            force,
            no_download,
            json,
        } => {
            let cancel = cancel_on_ctrl_c();
            let app = wire(config, &cli.catalog).await?;
            let options = RunOptions {
                force,
                no_download,
                targets: targets.into(),
            };
            let report = PrefillOrchestrator::new(app).run(&options, &cancel).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary);
                for r in report.failed() {
                    println!("  failed:  {} ({})", r.name, r.app_id);
                }
                for r in report.unowned() {
                    println!("  unowned: {} ({})", r.name, r.app_id);
                }
            }
        }
        Command::Benchmark {
            targets,
            output,
            concurrency,
        } => {
            if let Some(output) = output {
                config.benchmark.output_path = output;
            }
            if let Some(concurrency) = concurrency {
                config.benchmark.concurrency = concurrency;
            }
            let cancel = cancel_on_ctrl_c();
            let app = wire(config, &cli.catalog).await?;
            let targets: TargetOptions = targets.into();
            let report = BenchmarkCapture::new(app).run(&targets, &cancel).await?;

            println!(
                "Wrote {} ({} apps, {} requests, {})",
                report.output_path.display(),
                report.captured,
                report.requests,
                format_bytes(report.total_bytes)
            );
            println!("{}", report.summary);
            for r in report.failed() {
                println!("  failed:  {} ({})", r.name, r.app_id);
            }
            for r in report.unowned() {
                println!("  unowned: {} ({})", r.name, r.app_id);
            }
        }
    }
    Ok(())
}

async fn wire(config: PrefillConfig, catalog: &Path) -> anyhow::Result<prefill_core::app::PrefillApp> {
    let backend = Arc::new(
        CatalogBackend::load(catalog)
            .await
            .with_context(|| format!("loading catalog {}", catalog.display()))?,
    );
    let success = Arc::new(JsonFileSuccessStore::open(config.success_state_path()).await?);
    let pool = Arc::new(CachedEndpointPool::new(backend.clone()));
    info!(state_dir = %config.state_dir.display(), "engine wired");

    let app = PrefillBuilder::new(config)
        .session(backend.clone())
        .product_info(backend.clone())
        .metadata(backend.clone())
        .depots(backend.clone())
        .popular(backend.clone())
        .executor(backend)
        .endpoints(pool)
        .success_state(success)
        .build()?;
    Ok(app)
}

/// First Ctrl-C cancels the run and lets the current app finish its step;
/// a second one exits the process.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if escalate(tokio::signal::ctrl_c, token).await {
            std::process::exit(130);
        }
    });
    cancel
}

/// Cancels `token` on the first interrupt. Returns `true` once a second
/// interrupt arrives, `false` if listening fails.
async fn escalate<F, Fut>(mut interrupt: F, token: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    warn!("interrupt received, cancelling (press Ctrl-C again to exit now)");
    token.cancel();

    if interrupt().await.is_err() {
        return false;
    }
    warn!("second interrupt received, exiting");
    true
}
