//! Process startup: logging, store connections and application state.

use std::{
    fs::OpenOptions,
    sync::{Arc, Mutex},
};

use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, LogConfig},
    error::{config::ConfigError, Error},
    id::{IdGenerator, RemoteIdSource},
    model::app::AppState,
    store::{redis::RedisStore, EphemeralStore},
};

/// Installs the global fmt subscriber at the configured level
///
/// `RUST_LOG` takes precedence over `log.level` when set. Logs are appended to `log.file`
/// when configured, otherwise written to stdout.
pub fn init_logging(config: &LogConfig) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ConfigError::InvalidEnvValue {
                    var: "LOG_FILE".to_string(),
                    reason: format!("cannot open {}: {e}", path.display()),
                })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };

    result.map_err(|e| Error::InternalError(format!("Failed to install logger: {e}")))
}

/// Connect to the database and run migrations
pub async fn connect_to_database(config: &Config) -> Result<DatabaseConnection, Error> {
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database};

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.sqlx_logging(false);

    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Connect to Valkey/Redis for pairing tickets, reservations and indices
pub async fn connect_to_cache(config: &Config) -> Result<fred::prelude::Pool, Error> {
    use fred::prelude::*;

    let redis_config = Config::from_url(&config.valkey_url)?;
    let pool = Pool::new(redis_config, None, None, None, 6)?;

    pool.connect();
    pool.wait_for_connect().await?;

    Ok(pool)
}

/// Selects the remote ID generator when an address is configured, the local snowflake source
/// otherwise
pub fn build_id_generator(config: &Config, http: reqwest::Client) -> IdGenerator {
    if config.id_gen.is_remote() {
        IdGenerator::new(Arc::new(RemoteIdSource::new(
            http,
            &config.id_gen.address,
            &config.id_gen.token,
        )))
    } else {
        IdGenerator::snowflake()
    }
}

/// Connects every store and assembles the shared application state
pub async fn build_state(config: Config) -> Result<AppState, Error> {
    let db = connect_to_database(&config).await?;
    let pool = connect_to_cache(&config).await?;
    let cache: Arc<dyn EphemeralStore> = Arc::new(RedisStore::new(pool));
    let ids = build_id_generator(&config, reqwest::Client::new());

    Ok(AppState::new(config, db, cache, ids))
}
