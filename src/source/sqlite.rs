//! Forward-only row cursor over a SQLite table.

use crate::error::{TransferError, TransferResult};
use crate::plan::TableSpec;
use crate::source::{RowSource, timestamp};
use crate::value::{ColumnKind, FieldValue, Row};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::sqlite::{SqliteConnection, SqliteRow, SqliteValueRef};
use sqlx::{Decode, Row as _, Sqlite, TypeInfo, ValueRef};

/// Selected column with the kind its values are mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    pub kind: ColumnKind,
}

/// Runtime storage class of a SQLite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    fn from_type_name(name: &str) -> Self {
        match name {
            "INTEGER" | "BOOLEAN" => StorageClass::Integer,
            "REAL" | "NUMERIC" => StorageClass::Real,
            "BLOB" => StorageClass::Blob,
            _ => StorageClass::Text,
        }
    }
}

pub struct SqliteRowSource<'a> {
    table: String,
    columns: Vec<SourceColumn>,
    rows: BoxStream<'a, Result<SqliteRow, sqlx::Error>>,
    position: u64,
    exhausted: bool,
}

impl<'a> SqliteRowSource<'a> {
    /// Resolve column kinds for `spec` and start the cursor for `select`.
    ///
    /// `select` is the statement built by [`TableSpec::select_statement`]; it
    /// is borrowed for the cursor's lifetime.
    pub async fn open(
        conn: &'a mut SqliteConnection,
        spec: &TableSpec,
        select: &'a str,
    ) -> TransferResult<Self> {
        let columns = describe_columns(&mut *conn, spec).await?;

        log::debug!("opening source cursor: {}", select);
        let rows = sqlx::query(select).fetch(conn);

        Ok(Self {
            table: spec.table_name.clone(),
            columns,
            rows,
            position: 0,
            exhausted: false,
        })
    }

    pub fn columns(&self) -> &[SourceColumn] {
        &self.columns
    }

    /// Number of rows produced so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn decode_row(&self, row: &SqliteRow) -> TransferResult<Row> {
        let mut decoded = Row::with_capacity(self.columns.len());

        for (idx, column) in self.columns.iter().enumerate() {
            let raw = row
                .try_get_raw(idx)
                .map_err(|err| TransferError::read(&self.table, err))?;

            let value = decode_value(column.kind, raw).map_err(|reason| TransferError::Decode {
                table: self.table.clone(),
                column: column.name.clone(),
                row: self.position,
                reason,
            })?;
            decoded.push(value);
        }

        Ok(decoded)
    }
}

impl RowSource for SqliteRowSource<'_> {
    async fn next_row(&mut self) -> TransferResult<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }

        match self.rows.try_next().await {
            Ok(Some(row)) => {
                self.position += 1;
                match self.decode_row(&row) {
                    Ok(decoded) => Ok(Some(decoded)),
                    Err(err) => {
                        self.exhausted = true;
                        Err(err)
                    }
                }
            }
            Ok(None) => {
                self.exhausted = true;
                log::trace!("source cursor for '{}' exhausted after {} rows", self.table, self.position);
                Ok(None)
            }
            Err(err) => {
                self.exhausted = true;
                Err(TransferError::read(&self.table, err))
            }
        }
    }
}

/// Look up the declared type of every listed field.
async fn describe_columns(
    conn: &mut SqliteConnection,
    spec: &TableSpec,
) -> TransferResult<Vec<SourceColumn>> {
    let (schema, table) = match spec.table_name.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("main", spec.table_name.as_str()),
    };

    let declared: Vec<(String, String)> =
        sqlx::query_as("SELECT name, type FROM pragma_table_info(?1, ?2)")
            .bind(table)
            .bind(schema)
            .fetch_all(&mut *conn)
            .await
            .map_err(|err| TransferError::read(&spec.table_name, err))?;

    if declared.is_empty() {
        return Err(TransferError::Schema {
            table: spec.table_name.clone(),
            reason: "table does not exist in the source".to_string(),
        });
    }

    spec.field_list
        .iter()
        .map(|field| {
            declared
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(field))
                .map(|(_, declared_type)| SourceColumn {
                    name: field.clone(),
                    kind: ColumnKind::from_declared_type(declared_type),
                })
                .ok_or_else(|| TransferError::Schema {
                    table: spec.table_name.clone(),
                    reason: format!("column '{}' does not exist", field),
                })
        })
        .collect()
}

/// Map one SQLite value onto the field value union without losing precision.
fn decode_value(kind: ColumnKind, raw: SqliteValueRef<'_>) -> Result<FieldValue, String> {
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }

    let storage = StorageClass::from_type_name(raw.type_info().name());

    match (kind, storage) {
        (_, StorageClass::Blob) => Err(format!("binary value in {} column is not supported", kind)),

        (ColumnKind::Integer, StorageClass::Integer) => decode_i64(raw).map(FieldValue::Integer),
        (ColumnKind::Integer, StorageClass::Real) => {
            Err("fractional value in integer column".to_string())
        }
        (ColumnKind::Integer, StorageClass::Text) => {
            let text = decode_str(raw)?;
            Err(format!("text value {:?} in integer column", text))
        }

        (ColumnKind::Real, StorageClass::Real) => decode_f64(raw).map(FieldValue::Real),
        // Stays an integer; f64 holds only 53 bits of it.
        (ColumnKind::Real, StorageClass::Integer) => decode_i64(raw).map(FieldValue::Integer),
        (ColumnKind::Real, StorageClass::Text) => {
            let text = decode_str(raw)?;
            Err(format!("text value {:?} in real column", text))
        }

        (ColumnKind::Text, StorageClass::Text) => decode_str(raw).map(FieldValue::Text),
        (ColumnKind::Text, StorageClass::Integer) => {
            decode_i64(raw).map(|value| FieldValue::Text(value.to_string()))
        }
        (ColumnKind::Text, StorageClass::Real) => {
            decode_f64(raw).map(|value| FieldValue::Text(value.to_string()))
        }

        (ColumnKind::Boolean, StorageClass::Integer) => match decode_i64(raw)? {
            0 => Ok(FieldValue::Boolean(false)),
            1 => Ok(FieldValue::Boolean(true)),
            other => Err(format!("integer {} in boolean column", other)),
        },
        (ColumnKind::Boolean, StorageClass::Text) => {
            let text = decode_str(raw)?;
            parse_bool(&text)
                .map(FieldValue::Boolean)
                .ok_or_else(|| format!("text value {:?} in boolean column", text))
        }
        (ColumnKind::Boolean, StorageClass::Real) => {
            Err("real value in boolean column".to_string())
        }

        (ColumnKind::Timestamp, StorageClass::Text) => {
            let text = decode_str(raw)?;
            let parsed = timestamp::parse_text(&text)
                .ok_or_else(|| format!("unrecognized timestamp {:?}", text))?;
            timestamp::check_year_range(parsed).map(FieldValue::Timestamp)
        }
        (ColumnKind::Timestamp, StorageClass::Integer) => {
            let value = decode_i64(raw)?;
            let parsed = timestamp::from_epoch(value)
                .ok_or_else(|| format!("epoch value {} out of range", value))?;
            timestamp::check_year_range(parsed).map(FieldValue::Timestamp)
        }
        (ColumnKind::Timestamp, StorageClass::Real) => {
            Err("real value in timestamp column is ambiguous".to_string())
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn decode_i64(raw: SqliteValueRef<'_>) -> Result<i64, String> {
    <i64 as Decode<'_, Sqlite>>::decode(raw).map_err(|err| err.to_string())
}

fn decode_f64(raw: SqliteValueRef<'_>) -> Result<f64, String> {
    <f64 as Decode<'_, Sqlite>>::decode(raw).map_err(|err| err.to_string())
}

fn decode_str(raw: SqliteValueRef<'_>) -> Result<String, String> {
    <String as Decode<'_, Sqlite>>::decode(raw).map_err(|err| err.to_string())
}
