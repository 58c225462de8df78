//! Row sources: forward-only, non-restartable row sequences.
//!
//! `Ok(None)` from [`RowSource::next_row`] is the normal end of the sequence.
//! Once a source returns `Ok(None)` or an error it keeps returning `Ok(None)`.

pub mod sqlite;
pub mod timestamp;

pub use sqlite::{SourceColumn, SqliteRowSource};

use crate::error::TransferResult;
use crate::value::Row;

#[allow(async_fn_in_trait)]
pub trait RowSource {
    /// Produce the next row, or `None` once the cursor is exhausted.
    async fn next_row(&mut self) -> TransferResult<Option<Row>>;
}
