use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod dashboard;
mod db;
mod error;
mod feed;
mod model;
mod pipeline;

use config::Config;
use dashboard::AppState;
use db::Database;
use feed::ApiFootball;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let api_key = config.feed_api_key.clone().unwrap_or_default();
    let feed = Arc::new(ApiFootball::new(&api_key, &config.feed_api_url)?);

    let settings = config.pipeline_settings();
    info!(
        "Model: strong ≥{}%, value edge ≥{:.2}, gate {}/{} matches, bookmaker {}",
        settings.strong_pct,
        settings.value.threshold,
        settings.gate.high_min_matches,
        settings.gate.medium_min_matches,
        settings.bookmaker
    );
    let pipeline = Arc::new(Pipeline::new(db, feed.clone(), feed, settings));

    spawn_job(
        "snapshot",
        Duration::from_secs(config.snapshot_interval_secs),
        pipeline.clone(),
        |p| async move { p.run_snapshot_job(Utc::now().date_naive()).await.map(|_| ()) },
    );
    spawn_job(
        "evaluation",
        Duration::from_secs(config.evaluation_interval_secs),
        pipeline.clone(),
        |p| async move { p.run_evaluation_job(Utc::now().date_naive()).await.map(|_| ()) },
    );
    spawn_job(
        "odds",
        Duration::from_secs(config.odds_interval_secs),
        pipeline.clone(),
        |p| async move { p.run_odds_job(Utc::now().date_naive()).await.map(|_| ()) },
    );

    // Start the API server
    let app = dashboard::router(AppState { pipeline });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run API server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run `job` on a fixed interval in its own task. A failed run is logged and
/// retried on the next tick.
fn spawn_job<F, Fut>(name: &'static str, every: Duration, pipeline: Arc<Pipeline>, job: F)
where
    F: Fn(Arc<Pipeline>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        info!("{} job started (interval={:?})", name, every);
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Err(e) = job(pipeline.clone()).await {
                error!("{} job failed: {:#}", name, e);
            }
        }
    });
}
