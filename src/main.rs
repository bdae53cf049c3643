use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use polymarket_tracker::api::{router, ApiState};
use polymarket_tracker::classifier::{Classifier, SyncSummary};
use polymarket_tracker::config::Config;
use polymarket_tracker::db::Store;
use polymarket_tracker::diff::{compare_at, compare_with_details, now_ns};
use polymarket_tracker::error::Result;
use polymarket_tracker::fetcher::{parse_gamma_events, GammaClient};

#[derive(Parser, Debug)]
#[command(name = "tracker", about = "Polymarket event snapshot tracker", version)]
struct Cli {
    /// Log at debug level regardless of LOG_LEVEL.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    /// SQLite database file.
    #[arg(long, global = true)]
    db_path: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or migrate the database schema.
    Setup,
    /// Fetch events, classify them and store the retained snapshot.
    Fetch {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Compare the stored snapshot with a fresh fetch and store the differences.
    Compare {
        #[arg(long)]
        limit: Option<usize>,
        /// Max concurrent market detail requests.
        #[arg(long)]
        detail_concurrency: Option<usize>,
        /// Skip market detail requests (open interest, best bid/ask).
        #[arg(long, default_value_t = false)]
        no_details: bool,
    },
    /// Serve stored events and differences over HTTP.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(path) = &cli.db_path {
        cfg.db_path = path.clone();
    }
    if cli.verbose {
        cfg.log_level = "debug".to_string();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli.command, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

/// One store per run; it is closed whether the command succeeds or not.
async fn run(command: Command, cfg: Config) -> Result<()> {
    let store = Store::open(&cfg.db_path).await?;
    let result = dispatch(command, &cfg, &store).await;
    store.close().await;
    result
}

async fn dispatch(command: Command, cfg: &Config, store: &Store) -> Result<()> {
    match command {
        Command::Setup => {
            info!("Database tables created successfully");
            Ok(())
        }
        Command::Fetch { limit } => fetch(cfg, store, limit.unwrap_or(cfg.fetch_limit)).await,
        Command::Compare {
            limit,
            detail_concurrency,
            no_details,
        } => {
            let concurrency = detail_concurrency.unwrap_or(cfg.detail_concurrency).max(1);
            compare(cfg, store, limit.unwrap_or(cfg.fetch_limit), concurrency, no_details).await
        }
        Command::Serve => serve(cfg, store).await,
    }
}

async fn fetch(cfg: &Config, store: &Store, limit: usize) -> Result<()> {
    let client = GammaClient::new(cfg)?;

    info!("Fetching events from API...");
    let raw = client.fetch_events(limit).await;
    info!("Fetched {} events", raw.len());
    if raw.is_empty() {
        warn!("No events found");
        return Ok(());
    }

    let (kept, stats) = Classifier::default().retain_events(parse_gamma_events(&raw));
    info!(
        "[FILTER] retained={} inactive={} below_floor={} excluded={} ineligible={} markets_dropped={}",
        stats.retained,
        stats.inactive,
        stats.below_floor,
        stats.excluded,
        stats.ineligible,
        stats.markets_dropped,
    );

    let snapshots = store.snapshots();
    snapshots.save_snapshot(&kept).await?;

    let summary = SyncSummary::from_events(&kept);
    snapshots.record_sync(&summary).await?;
    info!(
        total = summary.total_events,
        financial = summary.financial_events,
        crypto = summary.crypto_events,
        politics_war = summary.politics_war_events,
        "Processed {} events (volume=${:.0}, liquidity=${:.0})",
        summary.total_events,
        summary.total_volume,
        summary.total_liquidity,
    );
    Ok(())
}

async fn compare(
    cfg: &Config,
    store: &Store,
    limit: usize,
    concurrency: usize,
    no_details: bool,
) -> Result<()> {
    let client = GammaClient::new(cfg)?;

    info!("Fetching stored events from database...");
    let stored = store.snapshots().fetch_stored_snapshot().await?;
    info!("Found {} stored events", stored.len());

    info!("Fetching fresh events from API...");
    let fresh = client.fetch_fresh_snapshot(limit).await;
    info!("Fetched {} fresh events", fresh.len());

    let compared_at = now_ns();
    let (records, _stats) = if no_details {
        compare_at(&stored, &fresh, compared_at)
    } else {
        compare_with_details(&stored, &fresh, &client, concurrency, compared_at).await
    };

    if records.is_empty() {
        info!("No differences found");
        return Ok(());
    }

    store.diff_writer().persist(&records).await?;
    Ok(())
}

async fn serve(cfg: &Config, store: &Store) -> Result<()> {
    let app = router(ApiState {
        pool: store.pool().clone(),
    });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
        })
        .await?;
    Ok(())
}
