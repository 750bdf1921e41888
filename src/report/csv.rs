//! CSV encoding of rating tables.
//!
//! Layout: a header `reference,<label>...` followed by one line per
//! reference id in ascending order. Missing cells are left empty.

use crate::error::{Result, SurveyError};
use crate::models::{AggregateTable, RatingTable, ResponseRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Header of the index column.
pub const INDEX_COLUMN: &str = "reference";

/// Render a participant's record. Ratings are written as integers.
pub fn render_response_record(record: &ResponseRecord) -> String {
    render_table(&record.to_table(), None)
}

/// Render an aggregate table with `precision` decimals per cell.
pub fn render_aggregate(aggregate: &AggregateTable, precision: usize) -> String {
    render_table(&aggregate.means, Some(precision))
}

/// Render any rating table. Without `precision` values use their shortest form.
pub fn render_table(table: &RatingTable, precision: Option<usize>) -> String {
    let mut output = String::new();

    output.push_str(INDEX_COLUMN);
    for column in &table.columns {
        output.push(',');
        output.push_str(&quote_field(column));
    }
    output.push('\n');

    for (reference, row) in &table.rows {
        let _ = write!(output, "{}", reference);
        for column in &table.columns {
            output.push(',');
            if let Some(value) = row.get(column) {
                let _ = match precision {
                    Some(p) => write!(output, "{:.*}", p, value),
                    None => write!(output, "{}", value),
                };
            }
        }
        output.push('\n');
    }

    output
}

/// Parse a table written by [`render_table`].
///
/// `record` names the source in error messages.
pub fn parse_table(record: &str, content: &str) -> Result<RatingTable> {
    let malformed = |reason: String| SurveyError::MalformedRecord {
        record: record.to_string(),
        reason,
    };

    let mut records = split_records(content).map_err(&malformed)?.into_iter();

    let header = records
        .next()
        .ok_or_else(|| malformed("missing header".to_string()))?;
    match header.first() {
        Some(index) if index.trim() == INDEX_COLUMN => {}
        other => {
            return Err(malformed(format!(
                "first column is '{}', expected '{}'",
                other.map(String::as_str).unwrap_or_default(),
                INDEX_COLUMN
            )))
        }
    }

    let mut columns = Vec::with_capacity(header.len().saturating_sub(1));
    let mut seen = BTreeSet::new();
    for label in header.into_iter().skip(1) {
        if !seen.insert(label.clone()) {
            return Err(malformed(format!("duplicate column '{}'", label)));
        }
        columns.push(label);
    }

    let mut rows = BTreeMap::new();
    for (row_no, fields) in records.enumerate() {
        if fields.len() != columns.len() + 1 {
            return Err(malformed(format!(
                "row {} has {} fields, expected {}",
                row_no + 1,
                fields.len(),
                columns.len() + 1
            )));
        }

        let reference: u64 = fields[0].trim().parse().map_err(|_| {
            malformed(format!("invalid reference id '{}'", fields[0]))
        })?;

        let mut cells = BTreeMap::new();
        for (label, field) in columns.iter().zip(&fields[1..]) {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let value: f64 = field.parse().map_err(|_| {
                malformed(format!(
                    "invalid value '{}' at reference {}, column '{}'",
                    field, reference, label
                ))
            })?;
            cells.insert(label.clone(), value);
        }

        if rows.insert(reference, cells).is_some() {
            return Err(malformed(format!("duplicate reference id {}", reference)));
        }
    }

    Ok(RatingTable {
        columns: columns.into_iter().collect(),
        rows,
    })
}

/// Quote a field if it contains a delimiter, quote or line break.
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split content into records of fields.
///
/// Double-quoted fields may hold delimiters, quotes and line breaks.
/// Lines that are blank outside quotes are dropped.
fn split_records(content: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = content.chars().peekable();

    let mut end_record = |fields: &mut Vec<String>, current: &mut String, quoted: &mut bool| {
        fields.push(std::mem::take(current));
        if fields.len() == 1 && !*quoted && fields[0].trim().is_empty() {
            fields.clear();
        } else {
            records.push(std::mem::take(fields));
        }
        *quoted = false;
    };

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            (',', false) => fields.push(std::mem::take(&mut current)),
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) => end_record(&mut fields, &mut current, &mut quoted),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    end_record(&mut fields, &mut current, &mut quoted);
    Ok(records)
}
