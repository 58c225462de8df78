//! Row to CSV line encoding for `COPY ... WITH (FORMAT csv)`.
//!
//! Rules of the PostgreSQL CSV dialect this encoder targets:
//! - fields are comma separated, one row per `\n` terminated line
//! - an unquoted empty field is NULL, a quoted empty field (`""`) is the
//!   empty string
//! - a line consisting of `\.` marks end-of-data unless quoted
//! - quoted fields double their embedded quote characters
//!
//! Text is quoted only when it needs to be, unless [`QuoteStyle::Always`] is
//! selected. Both styles load identically.

use crate::value::{FieldValue, Row};
use chrono::SecondsFormat;
use std::io::Write;
use thiserror::Error;

const SEPARATOR: u8 = b',';
const QUOTE: u8 = b'"';
const RECORD_END: u8 = b'\n';
const END_OF_DATA_MARKER: &str = "\\.";

/// Errors that make a row impossible to encode faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("row has {actual} fields, expected {expected}")]
    FieldCount { expected: usize, actual: usize },
    #[error("text in column {column} contains a NUL byte, which the destination cannot store")]
    NulByte { column: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// Quote text only when it contains a separator, quote or line break, is
    /// empty, or equals the end-of-data marker.
    #[default]
    Necessary,
    /// Quote every non-null field.
    Always,
}

/// Encodes rows of a fixed width into CSV lines.
#[derive(Debug, Clone, Copy)]
pub struct RecordEncoder {
    field_count: usize,
    quote_style: QuoteStyle,
}

impl RecordEncoder {
    pub fn new(field_count: usize) -> Self {
        Self {
            field_count,
            quote_style: QuoteStyle::default(),
        }
    }

    pub fn with_quote_style(mut self, quote_style: QuoteStyle) -> Self {
        self.quote_style = quote_style;
        self
    }

    /// Append one encoded line for `row` to `out`.
    ///
    /// On error `out` is left as it was before the call.
    pub fn encode_into(&self, row: &Row, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        if row.len() != self.field_count {
            return Err(EncodeError::FieldCount {
                expected: self.field_count,
                actual: row.len(),
            });
        }

        let start = out.len();
        for (column, value) in row.values().iter().enumerate() {
            if column > 0 {
                out.push(SEPARATOR);
            }
            if let Err(err) = self.encode_field(column, value, out) {
                out.truncate(start);
                return Err(err);
            }
        }
        out.push(RECORD_END);

        Ok(())
    }

    /// Encode `row` into a freshly allocated line.
    pub fn encode(&self, row: &Row) -> Result<Vec<u8>, EncodeError> {
        let mut line = Vec::new();
        self.encode_into(row, &mut line)?;
        Ok(line)
    }

    fn encode_field(
        &self,
        column: usize,
        value: &FieldValue,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        match value {
            FieldValue::Null => {}
            FieldValue::Text(text) => {
                if text.as_bytes().contains(&0) {
                    return Err(EncodeError::NulByte { column });
                }
                if self.quote_style == QuoteStyle::Always || text_needs_quotes(text) {
                    write_quoted(text.as_bytes(), out);
                } else {
                    out.extend_from_slice(text.as_bytes());
                }
            }
            other => {
                let always = self.quote_style == QuoteStyle::Always;
                if always {
                    out.push(QUOTE);
                }
                write_scalar(other, out);
                if always {
                    out.push(QUOTE);
                }
            }
        }
        Ok(())
    }
}

fn text_needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text == END_OF_DATA_MARKER
        || text
            .bytes()
            .any(|b| matches!(b, SEPARATOR | QUOTE | b'\n' | b'\r'))
}

fn write_quoted(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(QUOTE);
    for &byte in bytes {
        if byte == QUOTE {
            out.push(QUOTE);
        }
        out.push(byte);
    }
    out.push(QUOTE);
}

// Non-text scalars never contain separators or quotes.
fn write_scalar(value: &FieldValue, out: &mut Vec<u8>) {
    match value {
        FieldValue::Integer(v) => {
            let _ = write!(out, "{}", v);
        }
        FieldValue::Real(v) => {
            if v.is_nan() {
                out.extend_from_slice(b"NaN");
            } else if v.is_infinite() {
                if *v > 0.0 {
                    out.extend_from_slice(b"Infinity");
                } else {
                    out.extend_from_slice(b"-Infinity");
                }
            } else {
                let _ = write!(out, "{}", v);
            }
        }
        FieldValue::Boolean(v) => {
            let token: &[u8] = if *v { b"true" } else { b"false" };
            out.extend_from_slice(token);
        }
        FieldValue::Timestamp(ts) => {
            out.extend_from_slice(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false).as_bytes());
        }
        FieldValue::Null | FieldValue::Text(_) => {}
    }
}
