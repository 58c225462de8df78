//! Connection bootstrapping for the source and destination stores.

use crate::config::{DestinationConfig, SourceConfig};
use crate::error::{Store, TransferError, TransferResult};
use log::LevelFilter;
use sqlx::ConnectOptions;
use sqlx::postgres::PgConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};

/// Open the source database read-only with the bulk read pragmas.
pub async fn connect_source(config: &SourceConfig) -> TransferResult<SqliteConnection> {
    log::info!("connecting to source database: {}", config.path.display());

    SqliteConnectOptions::new()
        .filename(&config.path)
        .read_only(true)
        .create_if_missing(false)
        .pragma("temp_store", "MEMORY")
        .pragma("cache_size", config.cache_size.to_string())
        .log_statements(LevelFilter::Debug)
        .connect()
        .await
        .map_err(|err| TransferError::Connect {
            store: Store::Source,
            source: err,
        })
}

pub async fn connect_destination(config: &DestinationConfig) -> TransferResult<PgConnection> {
    log::info!(
        "connecting to destination database: {}",
        config.display_target()
    );

    config
        .connect_options()?
        .log_statements(LevelFilter::Debug)
        .connect()
        .await
        .map_err(|err| TransferError::Connect {
            store: Store::Destination,
            source: err,
        })
}
