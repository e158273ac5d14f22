//! OrderBridge Server
//!
//! Synchronizes a multi-tenant CRM with a remote order-management system:
//! journal polling on an interval, webhook pushes as an accelerant, and a
//! durable event queue in between.

mod config;
mod shutdown;
mod state;
mod webhook;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::AppConfig;
use orderbridge_common::SlidingWindowConfig;
use orderbridge_core::{
    ClientRepository, EventQueue, EventRouter, EventRouterConfig, JournalPoller,
    MessagingGateway, OperatorNotifier, OrderRepository, ProcessorContext, ProcessorSet,
    RemoteOrderApi, StockLedger, SyncStateStore,
};
use orderbridge_infra::{
    DbManager, MessagingClient, MessagingClientConfig, PollScheduler, PollSchedulerConfig,
    RemoteApiClient, RemoteApiConfig, SqliteClientRepository, SqliteEventQueue,
    SqliteOrderRepository, SqliteStockLedger, SqliteSyncStateStore,
};
use state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// OrderBridge - CRM to order-management synchronization pipeline
#[derive(Parser, Debug)]
#[command(name = "orderbridge-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./orderbridge.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so it can feed the config overrides
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    tracing::info!("starting orderbridge-server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(&args.config).map_err(|e| {
        tracing::error!(error = %e, "failed to load configuration");
        e
    })?;
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    config.validate()?;
    tracing::info!(path = %args.config.display(), tenants = config.tenants.len(), "configuration loaded");

    let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
    db.run_migrations()?;
    tracing::info!(path = %config.database.path.display(), "database ready");

    let queue: Arc<dyn EventQueue> = Arc::new(SqliteEventQueue::new(db.clone()));
    let state_store: Arc<dyn SyncStateStore> = Arc::new(SqliteSyncStateStore::new(db.clone()));
    let clients: Arc<dyn ClientRepository> = Arc::new(SqliteClientRepository::new(db.clone()));
    let orders: Arc<dyn OrderRepository> = Arc::new(SqliteOrderRepository::new(db.clone()));
    let stock: Arc<dyn StockLedger> = Arc::new(SqliteStockLedger::new(db.clone()));

    let tokens = config
        .tenants
        .iter()
        .map(|t| (t.id.clone(), t.remote_token.clone()))
        .collect();
    let remote: Arc<dyn RemoteOrderApi> = Arc::new(RemoteApiClient::new(
        RemoteApiConfig {
            base_url: config.remote.base_url.clone(),
            timeout: Duration::from_secs(config.remote.timeout_secs),
            rate_limit: SlidingWindowConfig {
                max_calls: config.sync.rate_limit_max_calls,
                window: Duration::from_secs(config.sync.rate_limit_window_secs),
            },
        },
        tokens,
    )?);

    let messaging = Arc::new(MessagingClient::new(MessagingClientConfig {
        base_url: config.messaging.base_url.clone(),
        timeout: Duration::from_secs(config.messaging.timeout_secs),
    })?);

    let processors = ProcessorSet::standard(ProcessorContext {
        remote: remote.clone(),
        clients,
        orders,
        stock,
        messaging: messaging.clone() as Arc<dyn MessagingGateway>,
    });
    let router = Arc::new(EventRouter::new(
        queue.clone(),
        processors,
        messaging as Arc<dyn OperatorNotifier>,
        EventRouterConfig {
            batch_limit: config.sync.router_batch_limit,
            max_retries: config.sync.max_retries,
        },
    ));
    let poller = Arc::new(JournalPoller::new(
        remote,
        queue.clone(),
        state_store,
        config.sync.journal_fetch_limit,
    ));

    let tenant_ids: Vec<String> = config.tenants.iter().map(|t| t.id.clone()).collect();
    let mut scheduler = PollScheduler::new(
        poller,
        router,
        queue.clone(),
        tenant_ids,
        PollSchedulerConfig {
            interval: Duration::from_secs(config.sync.poll_interval_secs),
            stale_after_secs: config.sync.stale_processing_secs,
            ..PollSchedulerConfig::default()
        },
    );
    scheduler.start().await?;

    let app_state = AppState::new(queue, config.tenants.clone());
    let app = webhook::build_router(app_state);

    let listener = TcpListener::bind(config.server.listen).await?;
    tracing::info!("listening on {}", config.server.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    if let Err(err) = scheduler.stop().await {
        tracing::warn!(error = %err, "scheduler did not stop cleanly");
    }
    tracing::info!("shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
