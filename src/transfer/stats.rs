//! Transfer statistics and the end-of-run report.

use std::fmt;
use std::time::Duration;

/// Outcome of one table transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub table: String,
    /// Rows read from the source and written to the bulk load channel.
    pub rows: u64,
    /// Encoded bytes written, line terminators included.
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Summary of a committed transfer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub tables: Vec<TableStats>,
    /// Wall-clock time from the start of the first table to the commit.
    pub elapsed: Duration,
}

impl TransferReport {
    pub fn push(&mut self, stats: TableStats) {
        self.tables.push(stats);
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.tables.iter().map(|t| t.bytes).sum()
    }

    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time: {} ms", self.elapsed_millis())?;
        for table in &self.tables {
            writeln!(
                f,
                "  {}: {} rows, {} bytes in {} ms",
                table.table,
                table.rows,
                table.bytes,
                table.elapsed.as_millis()
            )?;
        }
        write!(
            f,
            "Transferred {} rows from {} tables",
            self.total_rows(),
            self.tables.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let mut report = TransferReport::default();
        report.push(TableStats {
            table: "audit_event".to_string(),
            rows: 2,
            bytes: 80,
            elapsed: Duration::from_millis(3),
        });
        report.push(TableStats {
            table: "audit_event_property".to_string(),
            rows: 5,
            bytes: 120,
            elapsed: Duration::from_millis(4),
        });
        report.elapsed = Duration::from_millis(12);

        let display = format!("{}", report);
        assert!(display.starts_with("Time: 12 ms"));
        assert!(display.contains("audit_event: 2 rows, 80 bytes in 3 ms"));
        assert!(display.ends_with("Transferred 7 rows from 2 tables"));
        assert_eq!(report.total_bytes(), 200);
    }
}
