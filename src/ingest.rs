//! CSV upload parsing into a [`LeadTable`].

use crate::errors::{AppError, ResultExt};
use crate::models::{LeadRow, LeadTable};
use csv::ReaderBuilder;
use regex::Regex;
use std::sync::OnceLock;

/// Matches index artifacts and blank header names left behind by spreadsheet exports.
fn unnamed_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^Unnamed").expect("static regex is valid"))
}

impl LeadTable {
    /// Parses an uploaded CSV file (header row required).
    ///
    /// Blank header names become `Unnamed: <index>` and every `Unnamed*`
    /// column is dropped. Repeated header names are suffixed `.1`, `.2`, ...
    /// so the column set is unique from the start.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, AppError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(AppError::BadRequest(
                "Upload a CSV file to start analysis".to_string(),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let raw_headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();
        let headers = mangle_headers(raw_headers);

        let mut table = LeadTable::new(headers.clone());

        for (idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV row {}", idx + 1))?;
            if record.len() > headers.len() {
                return Err(AppError::BadRequest(format!(
                    "CSV row {} has {} fields, header has {}",
                    idx + 1,
                    record.len(),
                    headers.len()
                )));
            }

            let mut row = LeadRow::new();
            for (column, value) in headers.iter().zip(record.iter()) {
                row.set(column.clone(), Some(value.to_string()));
            }
            table.push_row(row);
        }

        drop_unnamed_columns(&mut table);

        tracing::info!(
            "Loaded lead table: {} rows, {} columns",
            table.len(),
            table.columns().len()
        );
        Ok(table)
    }
}

/// Drops every column whose name starts with `Unnamed`.
pub fn drop_unnamed_columns(table: &mut LeadTable) {
    let pattern = unnamed_column_pattern();
    let unnamed: Vec<String> = table
        .columns()
        .iter()
        .filter(|column| pattern.is_match(column))
        .cloned()
        .collect();

    for column in unnamed {
        tracing::debug!("Dropping index artifact column '{}'", column);
        table.drop_column(&column);
    }
}

/// Names blank headers by position and suffixes repeated names.
fn mangle_headers(raw: Vec<String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());

    for (idx, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while headers.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        headers.push(candidate);
    }

    headers
}
