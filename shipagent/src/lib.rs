//! Entry points for the federated record resolution engine: a CLI that
//! streams resolution progress, runs batches, and reconciles the local
//! cache against every configured warehouse store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use shipstore::models::{Direction, DirectionFilter, Record};
use shipstore::{CacheGateway, SqliteStore};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};
use wmsfetcher::{DateWindow, HttpWarehouseClient, SearchPlanner, WarehouseApi};

pub mod batch;
pub mod config;
pub mod progress;
pub mod resolver;
pub mod sync;

use batch::BatchRequest;
use progress::{ProgressEvent, Resolution, SearchRequest};
use resolver::Resolver;
use sync::SyncReconciler;

/// Runs the command line interface for the resolution engine.
pub async fn run_cli() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Resolve(args)) => run_resolve(args).await?,
        Some(Command::Batch(args)) => run_batch(args).await?,
        Some(Command::Sync(args)) => run_sync(args).await?,
        None => {
            println!("No subcommand provided. Use --help to see available commands.");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one search term to a shipment or return record
    Resolve(ResolveArgs),
    /// Resolve many search terms in one sequential run
    Batch(BatchArgs),
    /// Pull everything changed in a date window into the local cache
    Sync(SyncArgs),
}

#[derive(Args)]
struct CacheArgs {
    /// SQLite file backing the local record cache
    #[arg(long, env = "WAREHOUSE_CACHE_PATH", default_value = "shipcache.sqlite")]
    cache_path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Outbound,
    Inbound,
    Both,
}

impl From<DirectionArg> for DirectionFilter {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Outbound => DirectionFilter::Outbound,
            DirectionArg::Inbound => DirectionFilter::Inbound,
            DirectionArg::Both => DirectionFilter::Both,
        }
    }
}

#[derive(Args)]
struct ResolveArgs {
    /// Order id, customer name, tracking number, or other indexed term
    term: String,
    /// Restrict the search to one store
    #[arg(long)]
    store: Option<String>,
    #[arg(long, value_enum, default_value = "both")]
    direction: DirectionArg,
    #[command(flatten)]
    cache: CacheArgs,
}

#[derive(Args)]
struct BatchArgs {
    /// Search terms; each argument may itself be comma separated
    #[arg(required = true)]
    terms: Vec<String>,
    /// Restrict the search to one store
    #[arg(long)]
    store: Option<String>,
    #[arg(long, value_enum, default_value = "both")]
    direction: DirectionArg,
    #[command(flatten)]
    cache: CacheArgs,
}

#[derive(Args)]
struct SyncArgs {
    /// Pull everything changed in the last N days
    #[arg(long, default_value_t = 30, conflicts_with_all = ["from", "to"])]
    days: i64,
    /// Explicit window start (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    /// Explicit window end (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
    #[command(flatten)]
    cache: CacheArgs,
}

fn build_engine(cache_path: &Path) -> anyhow::Result<(Resolver, SyncReconciler)> {
    let federation = config::federation_from_env();
    if federation.stores.is_empty() {
        tracing::warn!("no store credentials configured; remote tiers will always miss");
    }

    let api: Arc<dyn WarehouseApi> = Arc::new(
        HttpWarehouseClient::new(federation.api_base.clone())
            .context("failed to build warehouse HTTP client")?,
    );
    let store = Arc::new(
        SqliteStore::open(cache_path)
            .with_context(|| format!("failed to open local cache at {}", cache_path.display()))?,
    );
    let gateway = Arc::new(CacheGateway::new(store));
    let planner = Arc::new(SearchPlanner::new(Arc::clone(&api), federation.clone()));
    let resolver = Resolver::new(Arc::clone(&gateway), planner);
    let reconciler = SyncReconciler::new(api, gateway, federation);
    Ok((resolver, reconciler))
}

/// Cancellation token wired to Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    token
}

async fn run_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let (resolver, _) = build_engine(&args.cache.cache_path)?;
    let request = SearchRequest {
        term: args.term,
        store: args.store,
        direction: args.direction.into(),
        cancel: cancel_on_ctrl_c(),
    };

    let mut rx = resolver.resolve(request);
    let mut resolution: Option<Resolution> = None;
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Log(line) => println!("{line}"),
            ProgressEvent::Done(done) => resolution = Some(done),
        }
    }

    match resolution {
        Some(resolution) => render_resolution(&resolution),
        None => println!("Search cancelled before completion."),
    }
    Ok(())
}

async fn run_batch(args: BatchArgs) -> anyhow::Result<()> {
    let terms: Vec<String> = args
        .terms
        .iter()
        .flat_map(|chunk| chunk.split(','))
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect();

    let (resolver, _) = build_engine(&args.cache.cache_path)?;
    let request = BatchRequest {
        terms,
        store: args.store,
        direction: args.direction.into(),
        cancel: cancel_on_ctrl_c(),
    };

    let (mut rx, handle) = resolver.resolve_many(request);
    while let Some(event) = rx.recv().await {
        if let ProgressEvent::Log(line) = event {
            println!("{line}");
        }
    }
    let report = handle.await.context("batch task failed")?;

    println!();
    if let Some(error) = &report.error {
        println!("{error}");
    }
    println!(
        "Found {} record(s); {} term(s) unresolved.",
        report.results.len(),
        report.not_found.len()
    );
    for record in &report.results {
        println!(
            "  {} [{}] via {} - {}",
            record.id, record.direction, record.store, record.status
        );
    }
    if !report.related.is_empty() {
        println!("Linked returns:");
        for record in &report.related {
            println!("  {} via {} - {}", record.id, record.store, record.status);
        }
    }
    if !report.not_found.is_empty() {
        println!("Not found: {}", report.not_found.join(", "));
    }
    Ok(())
}

async fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let window = match (args.from, args.to) {
        (Some(from), Some(to)) => DateWindow::new(from, to),
        _ => DateWindow::last_days(args.days),
    };

    let (_, reconciler) = build_engine(&args.cache.cache_path)?;
    let cancel = cancel_on_ctrl_c();
    let report = reconciler.run(&window, &cancel).await;

    println!("{}", report.message);
    for error in &report.errors {
        println!("  error: {error}");
    }
    Ok(())
}

fn render_resolution(resolution: &Resolution) {
    match (&resolution.record, &resolution.error) {
        (Some(record), _) => {
            render_record("Record", record);
            if record.direction == Direction::Outbound {
                match &resolution.related {
                    Some(related) => render_record("Linked return", related),
                    None => println!("No linked return."),
                }
            }
        }
        (None, Some(error)) => println!("Not found: {error}"),
        (None, None) => println!("Not found."),
    }
}

fn render_record(heading: &str, record: &Record) {
    println!(
        "{heading}: {} [{}] via {}",
        record.id, record.direction, record.store
    );
    println!(
        "  status: {} at {}",
        record.status,
        record.status_at.to_rfc3339()
    );
    if !record.customer_name.is_empty() {
        println!("  customer: {} {}", record.customer_name, record.customer_email);
    }
    if !record.tracking_number.is_empty() {
        println!(
            "  tracking: {} ({}) {}",
            record.tracking_number, record.courier, record.tracking_url
        );
    }
    if !record.items.is_empty() {
        println!("  items: {}", record.items.len());
    }
}
