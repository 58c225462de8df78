//! Destination schema preparation.
//!
//! Statements run inside the transfer transaction, so a failed run also rolls
//! back the schema changes it made.

use crate::error::{TransferError, TransferResult};
use sqlx::Executor;
use sqlx::postgres::PgConnection;

/// Execute each preparation statement in order on the destination.
///
/// Statements use the simple query protocol, so one entry may hold several
/// `;` separated commands.
pub async fn prepare(conn: &mut PgConnection, statements: &[String]) -> TransferResult<()> {
    if statements.is_empty() {
        log::warn!("schema preparation requested but the plan has no statements");
        return Ok(());
    }

    log::info!("preparing destination schema ({} statements)", statements.len());
    for statement in statements {
        log::debug!("executing: {}", statement);
        (&mut *conn)
            .execute(statement.as_str())
            .await
            .map_err(|err| TransferError::Prepare {
                statement: statement.clone(),
                source: err,
            })?;
    }
    log::debug!("schema preparation finished");

    Ok(())
}

/// Drop and recreate the audit event tables.
pub fn audit_event_ddl() -> Vec<String> {
    vec![
        "DROP TABLE IF EXISTS audit_event_property".to_string(),
        "DROP TABLE IF EXISTS audit_event".to_string(),
        r#"CREATE TABLE audit_event (
    id serial primary key,
    type varchar(50) NOT NULL,
    transaction_id varchar(36) NOT NULL,
    date_time TIMESTAMP WITH TIME ZONE NOT NULL,
    by_user varchar(50) NULL,
    app varchar(50) NOT NULL,
    client_ip varchar(15) NOT NULL,
    is_business BOOLEAN NOT NULL,
    msg varchar(255)
)"#
        .to_string(),
        r#"CREATE TABLE audit_event_property (
    id SERIAL PRIMARY KEY,
    event_id INTEGER REFERENCES audit_event(id) NOT NULL,
    key VARCHAR(50) NOT NULL,
    value_int INTEGER,
    value_string TEXT,
    value_date_time TIMESTAMP WITH TIME ZONE,
    value_boolean BOOLEAN,
    "index" INTEGER
)"#
        .to_string(),
    ]
}
