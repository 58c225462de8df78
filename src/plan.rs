//! Table transfer specs and the transfer plan.
//!
//! A [`TableSpec`] pins the table name and the ordered field list used by both
//! the source `SELECT` and the destination `COPY`. The destination bulk format
//! is positional, so both statements are generated from the same list.

use crate::error::TransferError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Immutable per-table transfer description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSpec {
    pub table_name: String,
    pub field_list: Vec<String>,
}

impl TableSpec {
    pub fn new<T, I, F>(table_name: T, field_list: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            table_name: table_name.into(),
            field_list: field_list.into_iter().map(Into::into).collect(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.field_list.len()
    }

    /// Check the spec is usable: a table name, at least one field, no empty
    /// or duplicate field names.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.table_name.trim().is_empty() {
            return Err(TransferError::Plan("table name must not be empty".to_string()));
        }

        if self.field_list.is_empty() {
            return Err(TransferError::Plan(format!(
                "table '{}' has an empty field list",
                self.table_name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.field_list {
            if field.trim().is_empty() {
                return Err(TransferError::Plan(format!(
                    "table '{}' has an empty field name",
                    self.table_name
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(TransferError::Plan(format!(
                    "table '{}' lists field '{}' more than once",
                    self.table_name, field
                )));
            }
        }

        Ok(())
    }

    /// Quoted, comma separated column list in field order.
    pub fn column_list(&self) -> String {
        self.field_list
            .iter()
            .map(|field| quote_identifier(field))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn quoted_table(&self) -> String {
        quote_qualified(&self.table_name)
    }

    /// Forward-only source query selecting exactly the listed fields.
    pub fn select_statement(&self) -> String {
        format!("SELECT {} FROM {}", self.column_list(), self.quoted_table())
    }

    /// Destination bulk-ingest statement: data-only CSV, no header row.
    pub fn copy_statement(&self) -> String {
        format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER false)",
            self.quoted_table(),
            self.column_list()
        )
    }
}

/// Quote an SQL identifier with double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified name (`schema.table`) part by part.
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Ordered list of tables to transfer, plus optional destination schema
/// preparation statements run inside the transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferPlan {
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub prepare: Vec<String>,
}

impl TransferPlan {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self {
            tables,
            prepare: Vec::new(),
        }
    }

    pub fn with_prepare(mut self, statements: Vec<String>) -> Self {
        self.prepare = statements;
        self
    }

    /// Load a plan from a JSON file and validate it.
    pub fn from_path(path: &Path) -> Result<Self, TransferError> {
        let raw = std::fs::read_to_string(path).map_err(|err| TransferError::PlanFile {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_json(&raw).map_err(|err| match err {
            TransferError::Plan(reason) => TransferError::PlanFile {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, TransferError> {
        let plan: TransferPlan =
            serde_json::from_str(raw).map_err(|err| TransferError::Plan(err.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), TransferError> {
        if self.tables.is_empty() {
            return Err(TransferError::Plan("plan lists no tables".to_string()));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !seen.insert(table.table_name.as_str()) {
                return Err(TransferError::Plan(format!(
                    "table '{}' appears more than once",
                    table.table_name
                )));
            }
        }

        Ok(())
    }

    /// Built-in plan for the audit event tables, in foreign key order.
    pub fn audit_events() -> Self {
        Self::new(vec![
            TableSpec::new(
                "audit_event",
                [
                    "id",
                    "type",
                    "transaction_id",
                    "date_time",
                    "by_user",
                    "app",
                    "client_ip",
                    "is_business",
                    "msg",
                ],
            ),
            TableSpec::new(
                "audit_event_property",
                [
                    "id",
                    "event_id",
                    "key",
                    "value_int",
                    "value_string",
                    "value_date_time",
                    "value_boolean",
                    "index",
                ],
            ),
        ])
        .with_prepare(crate::schema::audit_event_ddl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_share_field_order() {
        let spec = TableSpec::new("audit_event_property", ["id", "key", "index"]);
        assert_eq!(
            spec.select_statement(),
            r#"SELECT "id", "key", "index" FROM "audit_event_property""#
        );
        assert_eq!(
            spec.copy_statement(),
            r#"COPY "audit_event_property" ("id", "key", "index") FROM STDIN WITH (FORMAT csv, HEADER false)"#
        );
    }

    #[test]
    fn test_quote_identifier_doubles_quotes() {
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_qualified("public.t"), r#""public"."t""#);
    }

    #[test]
    fn test_validate_rejects_duplicate_fields() {
        let spec = TableSpec::new("t", ["id", "id"]);
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_empty_field_list() {
        let spec = TableSpec::new("t", Vec::<String>::new());
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_plan_from_json() {
        let plan = TransferPlan::from_json(
            r#"{"tables": [{"table_name": "t", "field_list": ["id", "note"]}]}"#,
        )
        .expect("valid plan");
        assert_eq!(plan.tables.len(), 1);
        assert_eq!(plan.tables[0].field_count(), 2);
        assert!(plan.prepare.is_empty());
    }

    #[test]
    fn test_plan_rejects_repeated_table() {
        let raw = r#"{"tables": [
            {"table_name": "t", "field_list": ["id"]},
            {"table_name": "t", "field_list": ["id"]}
        ]}"#;
        assert!(TransferPlan::from_json(raw).is_err());
    }

    #[test]
    fn test_audit_event_plan_is_valid() {
        let plan = TransferPlan::audit_events();
        plan.validate().expect("built-in plan is valid");
        assert_eq!(plan.tables[0].table_name, "audit_event");
        assert_eq!(plan.tables[1].field_count(), 8);
        assert!(!plan.prepare.is_empty());
    }
}
