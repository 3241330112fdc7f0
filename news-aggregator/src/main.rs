use anyhow::Context;
use clap::Parser;
use news_aggregator::config::mask_database_url;
use news_aggregator::{
    api, cancel, Config, Fetcher, IngestionPipeline, PgPostStore, PostStore, Scheduler,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DATABASE_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "news-aggregator", about = "Polls RSS feeds and serves the latest posts")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;

    info!("Connecting to database: {}", mask_database_url(&config.database_url));
    let store = PgPostStore::connect_with_retry(&config.database_url, DATABASE_CONNECT_TIMEOUT)
        .await
        .context("connect to database")?;
    store.setup_schema().await.context("prepare database schema")?;
    let store = Arc::new(store);

    let fetcher = Fetcher::new(config.fetch.clone()).context("build HTTP client")?;
    info!("Feed requests time out after {}s", fetcher.config().timeout_seconds);

    let pipeline = Arc::new(IngestionPipeline::new(Arc::new(fetcher), store.clone()));
    let scheduler = Scheduler::new(config.feeds.clone(), config.period, pipeline)?;

    let (cancel_handle, cancel_signal) = cancel::channel();
    let scheduler_task = tokio::spawn(scheduler.run(cancel_signal.clone()));

    let listener = tokio::net::TcpListener::bind(&config.api_host)
        .await
        .with_context(|| format!("bind {}", config.api_host))?;
    info!("HTTP server listening on {}", config.api_host);

    let read_store: Arc<dyn PostStore> = store.clone();
    let server_signal = cancel_signal.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, api::router(read_store))
            .with_graceful_shutdown(async move { server_signal.cancelled().await })
            .await
    });

    wait_for_shutdown().await;
    info!("Shutting down");
    cancel_handle.cancel();

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task failed: {}", e);
    }

    store.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
