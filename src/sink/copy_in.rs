//! `COPY ... FROM STDIN` sink for PostgreSQL.
//!
//! Lines are batched in a [`CopyBuffer`] and sent as `CopyData` messages as
//! soon as the buffer reaches its threshold, so the server parses the stream
//! while the source is still being read.

use crate::error::{TransferError, TransferResult};
use crate::plan::TableSpec;
use crate::sink::{CopyBuffer, LineSink};
use sqlx::postgres::{PgConnection, PgCopyIn};

pub struct CopyInSink<'c> {
    table: String,
    copy: PgCopyIn<&'c mut PgConnection>,
    buffer: CopyBuffer,
    chunks: u64,
}

impl<'c> CopyInSink<'c> {
    /// Start a data-only CSV `COPY` into the table and columns of `spec`.
    ///
    /// The connection should be inside the session's open transaction; the
    /// sink never commits.
    pub async fn open(
        conn: &'c mut PgConnection,
        spec: &TableSpec,
        flush_bytes: usize,
    ) -> TransferResult<Self> {
        let statement = spec.copy_statement();
        log::debug!("opening bulk load channel: {}", statement);

        let copy = conn
            .copy_in_raw(&statement)
            .await
            .map_err(|err| TransferError::ingest(&spec.table_name, err))?;

        Ok(Self {
            table: spec.table_name.clone(),
            copy,
            buffer: CopyBuffer::new(flush_bytes),
            chunks: 0,
        })
    }

    async fn flush(&mut self) -> TransferResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        log::trace!(
            "'{}': sending chunk {} ({} bytes)",
            self.table,
            self.chunks + 1,
            self.buffer.len()
        );
        self.copy
            .send(self.buffer.pending())
            .await
            .map_err(|err| TransferError::ingest(&self.table, err))?;
        self.buffer.clear();
        self.chunks += 1;
        Ok(())
    }
}

impl LineSink for CopyInSink<'_> {
    async fn write_line(&mut self, line: &[u8]) -> TransferResult<()> {
        if self.buffer.push(line) {
            self.flush().await?;
        }
        Ok(())
    }

    async fn finish(mut self) -> TransferResult<u64> {
        self.flush().await?;
        let table = self.table;
        let rows = self
            .copy
            .finish()
            .await
            .map_err(|err| TransferError::ingest(&table, err))?;
        log::debug!("'{}': bulk load channel completed, {} rows", table, rows);
        Ok(rows)
    }

    async fn abort(self, reason: &str) {
        if let Err(err) = self.copy.abort(reason).await {
            log::debug!("'{}': abort of bulk load channel reported: {}", self.table, err);
        }
    }
}
