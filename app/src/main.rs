mod cli;
mod config;
mod handler;
mod report;
mod service;

use axum::{routing::get, Router};
use clap::Parser;
use cli::{Cli, Commands, ViewCommand};
use config::AppConfig;
use connectors::{hyperliquid::HyperliquidConnector, lighter::LighterConnector};
use report::{CommonSymbols, CycleSummary, LatestPrices, StatsTable, TopDifferences};
use service::PriceService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use store::{PriceStore, StoreConfig};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.store = StoreConfig::new(db);
    }

    match cli.command {
        Commands::Run { top } => {
            let service = build_service(&config)?;
            run_cycle(&service, &config.store, top).await?;
        }
        Commands::Watch { interval, top } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or(config.watch_interval);
            let service = build_service(&config)?;
            watch(&service, &config.store, interval, top).await;
        }
        Commands::View(view) => {
            let store = PriceStore::open(&config.store)?;
            show(&store, view).await?;
        }
        Commands::Prune { days } => {
            let store = PriceStore::open(&config.store)?;
            let summary = store.prune_older_than(days).await?;
            println!(
                "Deleted {} samples and {} comparisons older than {} days",
                summary.samples, summary.comparisons, days
            );
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.api.host.clone());
            let port = port.unwrap_or(config.api.port);
            serve(&config.store, &host, port).await?;
        }
    }

    Ok(())
}

fn build_service(config: &AppConfig) -> common::Result<PriceService> {
    let hyperliquid =
        HyperliquidConnector::with_base_url(&config.hyperliquid_url, config.http_timeout)?;
    let lighter = LighterConnector::with_base_url(&config.lighter_url, config.http_timeout)?;

    Ok(PriceService::new(Arc::new(hyperliquid), Arc::new(lighter)))
}

/// One cycle with its own store handle, released when the cycle ends
async fn run_cycle(
    service: &PriceService,
    store_config: &StoreConfig,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = PriceStore::open(store_config)?;
    let report = service.run_cycle(&store).await?;

    print!("{}", CycleSummary(&report));

    match report.cycle_id() {
        Some(cycle_id) => {
            println!("\nTop {} price differences (cycle {}):", top, cycle_id);
            let differences = report.top_differences(&store, top).await?;
            print!("{}", TopDifferences(&differences));
        }
        None => println!("\nNo comparisons stored this cycle"),
    }

    println!("\nExchange statistics:");
    let stats = store.get_exchange_stats().await?;
    print!("{}", StatsTable(&stats));

    Ok(())
}

async fn watch(service: &PriceService, store_config: &StoreConfig, interval: Duration, top: usize) {
    info!("Running a fetch cycle every {}s", interval.as_secs());

    loop {
        if let Err(e) = run_cycle(service, store_config, top).await {
            error!("Fetch cycle failed: {}", e);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return;
            }
        }
    }
}

async fn show(store: &PriceStore, view: ViewCommand) -> Result<(), Box<dyn std::error::Error>> {
    match view {
        ViewCommand::Prices { exchange, limit } => {
            let prices = store.get_latest_prices(exchange).await?;
            print!("{}", LatestPrices { prices: &prices, limit });
        }
        ViewCommand::Top { limit, all } => {
            let differences = if all {
                store.get_top_differences_all_time(limit).await?
            } else {
                store.get_top_differences(limit).await?
            };
            print!("{}", TopDifferences(&differences));
        }
        ViewCommand::Stats => {
            let stats = store.get_exchange_stats().await?;
            print!("{}", StatsTable(&stats));
        }
        ViewCommand::Common => {
            let common = store.get_common_symbols().await?;
            print!("{}", CommonSymbols(&common));
        }
    }
    Ok(())
}

async fn serve(
    store_config: &StoreConfig,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(PriceStore::open(store_config)?);

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/differences", get(handler::top_differences))
        .route("/api/v1/stats", get(handler::exchange_stats))
        .route("/api/v1/prices", get(handler::latest_prices))
        .route("/api/v1/common", get(handler::common_symbols))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(store);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
