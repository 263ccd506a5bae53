use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use vsp_gateway::api::{create_app, AppState};
use vsp_gateway::config::{Config, LogFormat};
use vsp_gateway::database::{InMemoryTransactionStore, TransactionStore};
use vsp_gateway::payments::{
    BaseUrlResolver, LoggingHooks, NotificationHandler, ReqwestTransport, TransactionInitiator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(config.log_format);

    tracing::info!("Starting VSP gateway service");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Gateway URL: {}", config.gateway.url);

    let (store, store_kind) = open_store(&config).await?;

    let transport = ReqwestTransport::new(Duration::from_secs(config.gateway.timeout_secs))?;
    let resolver = BaseUrlResolver::new(config.gateway.base_url.clone());
    let initiator = TransactionInitiator::new(
        config.gateway.clone(),
        Arc::new(transport),
        store.clone(),
        Arc::new(resolver),
    );
    let notifications = NotificationHandler::new(
        store.clone(),
        Arc::new(LoggingHooks),
        config.gateway.default_redirect_url(),
    );

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid server.host {}", config.server.host))?;
    let addr = SocketAddr::new(host, config.server.port);

    let app = create_app(AppState {
        config: Arc::new(config),
        initiator: Arc::new(initiator),
        notifications: Arc::new(notifications),
        transactions: store,
        store: store_kind,
    });

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Plain => builder.init(),
    }
}

#[cfg(feature = "database")]
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn TransactionStore>, &'static str)> {
    use vsp_gateway::database::{init_pool, run_migrations, PgTransactionStore, PoolConfig};

    let Some(url) = &config.database.url else {
        tracing::warn!("database.url not set, transactions are kept in memory only");
        return Ok((Arc::new(InMemoryTransactionStore::new()), "memory"));
    };

    let pool_config = PoolConfig {
        max_connections: config.database.max_connections,
        ..PoolConfig::default()
    };
    let pool = init_pool(url, Some(pool_config)).await?;
    run_migrations(&pool).await?;

    Ok((Arc::new(PgTransactionStore::new(pool)), "postgres"))
}

#[cfg(not(feature = "database"))]
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn TransactionStore>, &'static str)> {
    if config.database.url.is_some() {
        tracing::warn!("database.url ignored: built without the database feature");
    }
    Ok((Arc::new(InMemoryTransactionStore::new()), "memory"))
}
