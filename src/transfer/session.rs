//! Transfer session: owns both connections and the all-or-nothing run.

use crate::config::TransferConfig;
use crate::connect;
use crate::encoder::{QuoteStyle, RecordEncoder};
use crate::error::{Store, TransferError, TransferResult};
use crate::plan::{TableSpec, TransferPlan};
use crate::schema;
use crate::sink::{CopyInSink, DEFAULT_FLUSH_BYTES};
use crate::source::SqliteRowSource;
use crate::transfer::{TableStats, TransferReport, pump_rows};
use sqlx::postgres::PgConnection;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use std::time::{Duration, Instant};

/// Tuning for a transfer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub flush_bytes: usize,
    pub quote_style: QuoteStyle,
    /// Run the plan's preparation statements before the first table.
    pub prepare_schema: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            flush_bytes: DEFAULT_FLUSH_BYTES,
            quote_style: QuoteStyle::Necessary,
            prepare_schema: false,
        }
    }
}

/// Owns one source and one destination connection for a single run.
pub struct TransferSession {
    source: SqliteConnection,
    destination: PgConnection,
    options: TransferOptions,
}

impl TransferSession {
    pub fn new(
        source: SqliteConnection,
        destination: PgConnection,
        options: TransferOptions,
    ) -> Self {
        Self {
            source,
            destination,
            options,
        }
    }

    /// Open both connections described by `config`.
    pub async fn connect(config: &TransferConfig) -> TransferResult<Self> {
        let source = connect::connect_source(&config.source).await?;
        let destination = match connect::connect_destination(&config.destination).await {
            Ok(conn) => conn,
            Err(err) => {
                if let Err(close_err) = source.close().await {
                    log::warn!("failed to close source connection: {}", close_err);
                }
                return Err(err);
            }
        };

        Ok(Self::new(source, destination, config.options))
    }

    /// Transfer every table of `plan`, then commit the destination once.
    ///
    /// Any error returns before the commit; the open transactions are rolled
    /// back when dropped, so no table of the run becomes visible.
    pub async fn run(&mut self, plan: &TransferPlan) -> TransferResult<TransferReport> {
        self.run_with_timeout(plan, None).await
    }

    /// [`run`](Self::run) with the load phase bounded by an optional limit.
    ///
    /// The limit covers schema preparation and the table loads. When it
    /// expires the load is dropped mid-stream: the open bulk load channel is
    /// abandoned and the uncommitted transaction rolls back. The commit runs
    /// outside the limit, so a run that reaches it is never reported as timed
    /// out.
    pub async fn run_with_timeout(
        &mut self,
        plan: &TransferPlan,
        timeout: Option<Duration>,
    ) -> TransferResult<TransferReport> {
        plan.validate()?;

        let started = Instant::now();
        let options = self.options;

        let mut source_tx = self.source.begin().await.map_err(|err| TransferError::Begin {
            store: Store::Source,
            source: err,
        })?;
        let mut destination_tx =
            self.destination
                .begin()
                .await
                .map_err(|err| TransferError::Begin {
                    store: Store::Destination,
                    source: err,
                })?;

        let load = load_tables(&mut source_tx, &mut destination_tx, plan, &options);
        let mut report = match timeout {
            Some(limit) => tokio::time::timeout(limit, load)
                .await
                .map_err(|_| TransferError::Timeout(limit))??,
            None => load.await?,
        };

        destination_tx.commit().await.map_err(TransferError::Commit)?;
        log::info!("destination transaction committed");

        if let Err(err) = source_tx.rollback().await {
            log::warn!("failed to release source transaction: {}", err);
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// Close both connections, logging rather than returning close failures.
    pub async fn close(self) {
        if let Err(err) = self.source.close().await {
            log::warn!("failed to close source connection: {}", err);
        }
        if let Err(err) = self.destination.close().await {
            log::warn!("failed to close destination connection: {}", err);
        }
    }
}

async fn load_tables(
    source: &mut SqliteConnection,
    destination: &mut PgConnection,
    plan: &TransferPlan,
    options: &TransferOptions,
) -> TransferResult<TransferReport> {
    if options.prepare_schema {
        schema::prepare(destination, &plan.prepare).await?;
    }

    let mut report = TransferReport::default();
    for table in &plan.tables {
        log::info!(
            "transferring table '{}' ({} fields)",
            table.table_name,
            table.field_count()
        );
        let stats = transfer_table(source, destination, table, options).await?;
        log::info!(
            "table '{}': {} rows in {:.2}ms",
            stats.table,
            stats.rows,
            stats.elapsed.as_secs_f64() * 1000.0
        );
        report.push(stats);
    }

    Ok(report)
}

async fn transfer_table(
    source: &mut SqliteConnection,
    destination: &mut PgConnection,
    table: &TableSpec,
    options: &TransferOptions,
) -> TransferResult<TableStats> {
    let select = table.select_statement();
    let mut rows = SqliteRowSource::open(source, table, &select).await?;
    let sink = CopyInSink::open(destination, table, options.flush_bytes).await?;
    let encoder = RecordEncoder::new(table.field_count()).with_quote_style(options.quote_style);

    pump_rows(&table.table_name, &mut rows, &encoder, sink).await
}
