use std::process::ExitCode;

use clap::Parser;

use pg_bulk_transfer::cli::Cli;
use pg_bulk_transfer::config::TransferConfig;
use pg_bulk_transfer::{TransferError, TransferSession, init_logger};

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with status 2 before any connection is attempted.
    let cli = Cli::parse();
    init_logger();

    let config = TransferConfig::from_cli(&cli);
    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.table() {
                Some(table) => log::error!("{} failed on '{}': {}", err.phase(), table, err),
                None => log::error!("{} failed: {}", err.phase(), err),
            }
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &TransferConfig) -> Result<(), TransferError> {
    let plan = config.load_plan()?;
    log::info!(
        "transfer plan: {} tables, {} preparation statements",
        plan.tables.len(),
        plan.prepare.len()
    );

    let mut session = TransferSession::connect(config).await?;
    let outcome = session.run_with_timeout(&plan, config.timeout).await;
    session.close().await;

    let report = outcome?;
    println!("{report}");
    println!("Done");
    Ok(())
}
