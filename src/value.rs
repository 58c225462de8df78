//! Row and field value model shared by the source, encoder and sink.
//!
//! A [`Row`] carries one [`FieldValue`] per selected column, in the order of
//! the table's field list. Every row of a stream has the same column kinds,
//! fixed by the source table's declared column types.

use chrono::{DateTime, FixedOffset};
use std::fmt;

/// A single typed field value read from the source store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    /// Timestamp with the UTC offset captured at read time.
    Timestamp(DateTime<FixedOffset>),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// One source row: ordered field values, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<FieldValue>,
}

impl Row {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn with_capacity(columns: usize) -> Self {
        Self {
            values: Vec::with_capacity(columns),
        }
    }

    pub fn push(&mut self, value: FieldValue) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

/// Expected kind of a source column, derived from its declared type.
///
/// The source store is dynamically typed, so the declared type is what keeps
/// booleans apart from 0/1 integers and timestamps apart from plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
}

impl ColumnKind {
    /// Map a declared column type to a column kind.
    ///
    /// Boolean and timestamp names are checked first; the rest follow the
    /// SQLite type affinity rules (INT, then CHAR/CLOB/TEXT, then
    /// REAL/FLOA/DOUB, NUMERIC/DECIMAL as real). An empty declared type maps
    /// to text.
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();

        if upper.starts_with("BOOL") {
            ColumnKind::Boolean
        } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") || upper == "DATE" {
            ColumnKind::Timestamp
        } else if upper.contains("INT") || upper == "SERIAL" || upper == "BIGSERIAL" {
            ColumnKind::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnKind::Text
        } else if upper.contains("REAL")
            || upper.contains("FLOA")
            || upper.contains("DOUB")
            || upper.contains("NUMERIC")
            || upper.contains("DECIMAL")
        {
            ColumnKind::Real
        } else {
            ColumnKind::Text
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Real => "real",
            ColumnKind::Text => "text",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_types_keep_booleans_and_timestamps_distinct() {
        assert_eq!(ColumnKind::from_declared_type("BOOLEAN"), ColumnKind::Boolean);
        assert_eq!(ColumnKind::from_declared_type("bool"), ColumnKind::Boolean);
        assert_eq!(
            ColumnKind::from_declared_type("TIMESTAMP WITH TIME ZONE"),
            ColumnKind::Timestamp
        );
        assert_eq!(ColumnKind::from_declared_type("timestamptz"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::from_declared_type("DATETIME"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::from_declared_type("INTEGER"), ColumnKind::Integer);
        assert_eq!(ColumnKind::from_declared_type("serial"), ColumnKind::Integer);
    }

    #[test]
    fn test_declared_types_follow_affinity_rules() {
        assert_eq!(ColumnKind::from_declared_type("varchar(50)"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type("CLOB"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_declared_type("DOUBLE PRECISION"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type("NUMERIC(10,2)"), ColumnKind::Real);
        assert_eq!(ColumnKind::from_declared_type(""), ColumnKind::Text);
    }

    #[test]
    fn test_optional_values_convert_to_null() {
        let missing: Option<i64> = None;
        assert_eq!(FieldValue::from(missing), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("a")), FieldValue::Text("a".to_string()));
    }
}
