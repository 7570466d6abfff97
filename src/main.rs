use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use strikr_backend::config::{AppConfig, LoggingConfig};
use strikr_backend::services::dedup::DedupSweep;
use strikr_backend::services::leaderboard_sync::LeaderboardSync;
use strikr_backend::services::prometheus::{PrometheusApi, PrometheusClient};
use strikr_backend::services::reconciliation::ReconciliationEngine;
use strikr_backend::services::region_resolver::RegionResolver;
use strikr_backend::services::scheduler::JobScheduler;
use strikr_backend::services::snapshot_store::SnapshotStore;
use strikr_backend::{AppServices, app, cors_layer, db};

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    if let Err(problems) = config.validate() {
        for problem in &problems {
            error!("Invalid configuration: {}", problem);
        }
        return Err(format!("{} configuration problem(s)", problems.len()).into());
    }

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    info!("Connected to sqlite database.");

    let store = SnapshotStore::new(pool);
    let upstream: Arc<dyn PrometheusApi> = Arc::new(PrometheusClient::new(&config.prometheus)?);
    let resolver = RegionResolver::new(upstream.clone(), config.prometheus.region_timeout());
    let engine = Arc::new(ReconciliationEngine::new(store.clone(), upstream.clone(), resolver));
    let sync = Arc::new(LeaderboardSync::new(
        store.clone(),
        upstream,
        engine.clone(),
        config.sync.regions.clone(),
        config.sync.page_size,
        config.sync.with_history,
    ));
    let dedup = Arc::new(DedupSweep::new(store.clone()));

    let scheduler = JobScheduler::new(
        sync.clone(),
        dedup.clone(),
        store,
        Duration::from_secs(config.sync.interval_secs),
        config.sync.on_startup,
    )
    .spawn();

    let router = app(AppServices {
        engine,
        sync,
        dedup,
        auth: config.auth.clone(),
    })
    .layer(cors_layer(&config.server.cors_origins));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Started server on {}.", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    Ok(())
}
