//! Transfer pipeline: row source → record encoder → bulk sink.
//!
//! [`pump_rows`] moves one table; [`TransferSession`] runs a whole plan
//! inside one destination transaction and commits it once at the end.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! let mut session = TransferSession::connect(&config).await?;
//! let outcome = session.run(&TransferPlan::audit_events()).await;
//! session.close().await;
//! println!("{}", outcome?);
//! ```

pub mod session;
pub mod stats;

pub use session::{TransferOptions, TransferSession};
pub use stats::{TableStats, TransferReport};

use crate::encoder::RecordEncoder;
use crate::error::{TransferError, TransferResult};
use crate::sink::LineSink;
use crate::source::RowSource;
use std::time::Instant;

/// Pump every row of `source` through `encoder` into `sink`, then complete
/// the sink.
///
/// Rows are handled one at a time with a single reusable line buffer; there
/// is no queue between the source and the sink. On any failure the sink is
/// aborted and the error returned.
pub async fn pump_rows<S, K>(
    table: &str,
    source: &mut S,
    encoder: &RecordEncoder,
    mut sink: K,
) -> TransferResult<TableStats>
where
    S: RowSource,
    K: LineSink,
{
    let started = Instant::now();
    let mut line = Vec::new();
    let mut rows: u64 = 0;
    let mut bytes: u64 = 0;

    let streamed: TransferResult<()> = async {
        while let Some(row) = source.next_row().await? {
            rows += 1;
            line.clear();
            encoder
                .encode_into(&row, &mut line)
                .map_err(|err| TransferError::Encode {
                    table: table.to_string(),
                    row: rows,
                    source: err,
                })?;
            sink.write_line(&line).await?;
            bytes += line.len() as u64;
        }
        Ok(())
    }
    .await;

    if let Err(err) = streamed {
        log::warn!("'{}': aborting bulk load after {} rows: {}", table, rows, err);
        sink.abort(&err.to_string()).await;
        return Err(err);
    }

    let loaded = sink.finish().await?;
    if loaded != rows {
        log::warn!(
            "'{}': destination reported {} rows, {} were sent",
            table,
            loaded,
            rows
        );
    }

    Ok(TableStats {
        table: table.to_string(),
        rows,
        bytes,
        elapsed: started.elapsed(),
    })
}
