use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============ Column Names ============

pub const EMAIL: &str = "email";
pub const COMPANY: &str = "company";
pub const COMPANY_NAME: &str = "company_name";
pub const DOMAIN: &str = "domain";
pub const LINKEDIN: &str = "linkedin";
pub const EMAIL_STATUS: &str = "email_status";
pub const STATUS_ICON: &str = "status_icon";
pub const LINKEDIN_PRESENT: &str = "linkedin_present";
pub const PROFESSIONAL_EMAIL: &str = "professional_email";
pub const LEAD_SCORE: &str = "Lead Score (%)";
pub const ADJUSTED_SCORE: &str = "Adjusted Score (%)";

// ============ Lead Table ============

/// One prospective contact, keyed by column name.
///
/// The uploaded table is schema-less, so a row is a mapping rather than a
/// fixed record. An absent key and an empty cell both read as null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadRow {
    cells: HashMap<String, String>,
}

impl LeadRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cell value, or `None` if the column is absent or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Returns the trimmed cell value, treating whitespace-only cells as null.
    pub fn get_trimmed(&self, column: &str) -> Option<&str> {
        self.get(column)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Sets a cell. `None` stores a null cell.
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        self.cells.insert(column.into(), value.unwrap_or_default());
    }
}

/// An ordered sequence of lead rows sharing a common, unique column set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadTable {
    columns: Vec<String>,
    rows: Vec<LeadRow>,
}

impl LeadTable {
    /// Creates an empty table. Repeated names keep their first occurrence.
    pub fn new(columns: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            if !unique.contains(&column) {
                unique.push(column);
            }
        }
        Self {
            columns: unique,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[LeadRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Appends a row. Cells for columns unknown to the table are ignored on export.
    pub fn push_row(&mut self, row: LeadRow) {
        self.rows.push(row);
    }

    /// Cell values of one column in row order. Missing column yields all `None`.
    pub fn column_values(&self, column: &str) -> Vec<Option<&str>> {
        self.rows.iter().map(|row| row.get(column)).collect()
    }

    /// Writes a whole column. Overwrites in place if the column exists,
    /// appends it otherwise. Values beyond the row count are ignored and
    /// missing values become null.
    pub fn set_column(&mut self, column: &str, values: Vec<Option<String>>) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.set(column, values.next().flatten());
        }
    }

    /// Removes a column and its cells.
    pub fn drop_column(&mut self, column: &str) {
        self.columns.retain(|c| c != column);
        for row in &mut self.rows {
            row.cells.remove(column);
        }
    }

    /// Strips surrounding whitespace from column names. A name that collides
    /// with an earlier column after stripping is dropped, keeping the first
    /// occurrence.
    pub fn strip_column_names(&mut self) {
        let original = std::mem::take(&mut self.columns);
        let mut renames: Vec<(String, String)> = Vec::with_capacity(original.len());

        for column in original {
            let stripped = column.trim().to_string();
            if renames.iter().any(|(_, kept)| *kept == stripped) {
                tracing::debug!("Dropping duplicate column '{}'", column);
                continue;
            }
            renames.push((column, stripped));
        }

        for row in &mut self.rows {
            let mut cells = HashMap::with_capacity(renames.len());
            for (source, target) in &renames {
                if let Some(value) = row.cells.remove(source) {
                    cells.insert(target.clone(), value);
                }
            }
            row.cells = cells;
        }

        self.columns = renames.into_iter().map(|(_, target)| target).collect();
    }

    /// Returns the rows projected onto the table's column order.
    pub fn records(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(|column| row.cells.get(column).map(String::as_str).unwrap_or(""))
                .collect()
        })
    }
}

// ============ Validation ============

/// Per-row outcome of a remote email verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub format_valid: Option<bool>,
    #[serde(default)]
    pub smtp_check: Option<bool>,
    #[serde(default)]
    pub disposable: Option<bool>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Single-category reduction of a [`ValidationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Valid,
    Risky,
    Invalid,
    Unknown,
}

impl EmailStatus {
    pub const ALL: [EmailStatus; 4] = [
        EmailStatus::Valid,
        EmailStatus::Risky,
        EmailStatus::Invalid,
        EmailStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Valid => "valid",
            EmailStatus::Risky => "risky",
            EmailStatus::Invalid => "invalid",
            EmailStatus::Unknown => "unknown",
        }
    }

    /// Parses the exact lowercase label written by the validation step.
    pub fn parse(label: &str) -> Option<Self> {
        EmailStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == label)
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Enrichment ============

/// Columns contributed by enrichment, in output order.
pub const ENRICHMENT_COLUMNS: [&str; 8] = [
    "company",
    "domain",
    "linkedin",
    "employee_count",
    "total_funding",
    "category",
    "location",
    "industry",
];

/// Company fields gathered for one lead row from the name-based and
/// domain-based providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub company: Option<String>,
    pub domain: Option<String>,
    pub linkedin: Option<String>,
    pub employee_count: Option<i64>,
    pub total_funding: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
}

impl EnrichmentRecord {
    /// Cell values aligned with [`ENRICHMENT_COLUMNS`].
    pub fn into_cells(self) -> [Option<String>; 8] {
        [
            self.company,
            self.domain,
            self.linkedin,
            self.employee_count.map(|count| count.to_string()),
            self.total_funding,
            self.category,
            self.location,
            self.industry,
        ]
    }
}

// ============ Features & Scores ============

/// Numeric projection of a lead table, aligned to a model's input columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one feature column, if present.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Renders the matrix back into a lead table.
    pub fn to_table(&self) -> LeadTable {
        let mut table = LeadTable::new(self.columns.clone());
        for values in &self.rows {
            let mut row = LeadRow::new();
            for (column, value) in self.columns.iter().zip(values) {
                row.set(column.clone(), Some(format_number(*value)));
            }
            table.push_row(row);
        }
        table
    }
}

/// Formats a float the way the exported CSV carries it: shortest round-trip
/// representation, with a trailing `.0` on whole numbers.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Rounds half-to-even at two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

// ============ API Responses ============

/// Email status of one uploaded row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailStatusRow {
    pub row: usize,
    pub email: Option<String>,
    pub email_status: EmailStatus,
}

/// Response of `POST /api/v1/leads/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub run_id: uuid::Uuid,
    pub timestamp: String,
    pub rows: Vec<EmailStatusRow>,
    pub counts: std::collections::BTreeMap<String, usize>,
}

/// Scores of one uploaded row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRow {
    pub row: usize,
    pub email: Option<String>,
    pub email_status: EmailStatus,
    pub lead_score: f64,
    pub adjusted_score: f64,
}

/// Response of `POST /api/v1/leads/score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub run_id: uuid::Uuid,
    pub timestamp: String,
    pub rows: Vec<ScoreRow>,
    pub counts: std::collections::BTreeMap<String, usize>,
}
