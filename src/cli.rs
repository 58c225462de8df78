use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pg-bulk-transfer",
    about = "Stream SQLite tables into PostgreSQL through COPY FROM STDIN",
    version
)]
pub struct Cli {
    /// Path to the source SQLite database file.
    #[arg(value_name = "SQLITE_PATH")]
    pub sqlite_path: PathBuf,

    /// Destination PostgreSQL database name, or a postgres:// URL.
    #[arg(value_name = "PG_DATABASE")]
    pub pg_database: String,

    /// JSON transfer plan; defaults to the built-in audit event tables.
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    /// Run the plan's schema preparation statements before transferring.
    #[arg(long)]
    pub prepare_schema: bool,

    /// Bytes buffered before a chunk is sent to the destination.
    #[arg(long, value_name = "BYTES")]
    pub flush_bytes: Option<usize>,

    /// Quote every non-null field instead of only those that need it.
    #[arg(long)]
    pub always_quote: bool,

    /// Abandon the run and roll back if it takes longer than this.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,
}
