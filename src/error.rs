use crate::encoder::EncodeError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type TransferResult<T> = Result<T, TransferError>;

/// Which side of the transfer an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Source,
    Destination,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Store::Source => f.write_str("source"),
            Store::Destination => f.write_str("destination"),
        }
    }
}

/// Pipeline phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Plan,
    Connect,
    Prepare,
    Read,
    Encode,
    Ingest,
    Commit,
    Timeout,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Plan => "plan",
            Phase::Connect => "connect",
            Phase::Prepare => "prepare",
            Phase::Read => "read",
            Phase::Encode => "encode",
            Phase::Ingest => "ingest",
            Phase::Commit => "commit",
            Phase::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Errors that abort a transfer run. None of them are retried.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot connect to {store}: {source}")]
    Connect { store: Store, source: sqlx::Error },
    #[error("cannot open {store} transaction: {source}")]
    Begin { store: Store, source: sqlx::Error },
    #[error("source schema error on table '{table}': {reason}")]
    Schema { table: String, reason: String },
    #[error("read error on table '{table}': {source}")]
    Read { table: String, source: sqlx::Error },
    #[error("cannot map value of '{table}.{column}' in row {row}: {reason}")]
    Decode {
        table: String,
        column: String,
        row: u64,
        reason: String,
    },
    #[error("cannot encode row {row} of table '{table}': {source}")]
    Encode {
        table: String,
        row: u64,
        source: EncodeError,
    },
    #[error("bulk load into '{table}' failed: {source}")]
    Ingest { table: String, source: sqlx::Error },
    #[error("schema preparation failed on `{statement}`: {source}")]
    Prepare {
        statement: String,
        source: sqlx::Error,
    },
    #[error("commit failed: {0}")]
    Commit(sqlx::Error),
    #[error("invalid transfer plan: {0}")]
    Plan(String),
    #[error("cannot load plan file {path}: {reason}")]
    PlanFile { path: String, reason: String },
    #[error("transfer did not finish within {0:?}")]
    Timeout(Duration),
}

impl TransferError {
    pub fn phase(&self) -> Phase {
        match self {
            TransferError::Plan(_) | TransferError::PlanFile { .. } => Phase::Plan,
            TransferError::Connect { .. } | TransferError::Begin { .. } => Phase::Connect,
            TransferError::Prepare { .. } => Phase::Prepare,
            TransferError::Schema { .. }
            | TransferError::Read { .. }
            | TransferError::Decode { .. } => Phase::Read,
            TransferError::Encode { .. } => Phase::Encode,
            TransferError::Ingest { .. } => Phase::Ingest,
            TransferError::Commit(_) => Phase::Commit,
            TransferError::Timeout(_) => Phase::Timeout,
        }
    }

    /// Table the error is tied to, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            TransferError::Schema { table, .. }
            | TransferError::Read { table, .. }
            | TransferError::Decode { table, .. }
            | TransferError::Encode { table, .. }
            | TransferError::Ingest { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn read(table: &str, source: sqlx::Error) -> Self {
        TransferError::Read {
            table: table.to_string(),
            source,
        }
    }

    pub fn ingest(table: &str, source: sqlx::Error) -> Self {
        TransferError::Ingest {
            table: table.to_string(),
            source,
        }
    }
}
