use crate::api;
use crate::backends::BackendRegistry;
use crate::cli::actions::Action;
use crate::consul::ConsulClient;
use crate::token::scheduler::{self, ExpirationScheduler};
use crate::token::store::{ConsulTokenStore, TokenStore};
use crate::token::Manager;
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

const EXPIRED_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server { config } = action;

    let consul = ConsulClient::new(
        &config.consul.url,
        config.consul.token.clone(),
        config.consul.timeout,
    )
    .context("Failed to build the consul client")?;

    let store: Arc<dyn TokenStore> = Arc::new(ConsulTokenStore::new(consul.clone()));

    let pool = if config.enabled_backends.iter().any(|name| name == "xivo_user") {
        let dsn = config
            .db_dsn
            .as_deref()
            .context("backend xivo_user needs a database connection string")?;
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Some(pool)
    } else {
        None
    };

    let backends = BackendRegistry::from_config(&config, pool)?;

    let scheduler = ExpirationScheduler::new(store.clone());

    // Recovers the expiry guarantee for tokens whose deadline passed while
    // the daemon was down.
    scheduler::spawn_expired_sweep(store.clone(), EXPIRED_SWEEP_PERIOD);

    let manager = Arc::new(Manager::new(
        backends,
        store,
        scheduler,
        config.default_token_lifetime,
        config.xivo_uuid.clone(),
    ));

    api::serve(&config, manager, consul).await
}
