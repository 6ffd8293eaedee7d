//! Adapts an arbitrary lead table to the numeric input schema of the scoring model.

use crate::models::{
    FeatureMatrix, LeadTable, COMPANY, DOMAIN, EMAIL, EMAIL_STATUS, LINKEDIN, LINKEDIN_PRESENT,
    PROFESSIONAL_EMAIL, STATUS_ICON,
};

/// Free-mail suffixes that mark a lead as non-professional.
pub const FREE_MAIL_SUFFIXES: [&str; 3] = ["gmail.com", "yahoo.com", "hotmail.com"];

/// Identity and display columns never fed to the model.
pub const NON_FEATURE_COLUMNS: [&str; 5] = [COMPANY, EMAIL, LINKEDIN, EMAIL_STATUS, STATUS_ICON];

/// 1 when the linkedin cell holds a non-blank value.
pub fn derive_linkedin_present(linkedin: Option<&str>) -> f64 {
    match linkedin {
        Some(url) if !url.trim().is_empty() => 1.0,
        _ => 0.0,
    }
}

/// 0 when the domain ends with a free-mail suffix, 1 otherwise (including no domain).
/// The cell is compared as-is, without trimming.
pub fn derive_professional_email(domain: Option<&str>) -> f64 {
    let domain = domain.unwrap_or("").to_lowercase();
    if FREE_MAIL_SUFFIXES
        .iter()
        .any(|suffix| domain.ends_with(suffix))
    {
        0.0
    } else {
        1.0
    }
}

/// Coerces a cell to a finite number. Booleans map to 1/0; anything else
/// unparsable, null or non-finite becomes 0.
pub fn coerce_numeric(cell: Option<&str>) -> f64 {
    let Some(raw) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };

    if raw.eq_ignore_ascii_case("true") {
        return 1.0;
    }
    if raw.eq_ignore_ascii_case("false") {
        return 0.0;
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Builds the model input matrix for `table`.
///
/// With `expected` columns the output has exactly those columns in that
/// order, zero-filled where the table lacks them. Without, every remaining
/// table column is kept in table order. Never fails.
pub fn build_feature_matrix(table: &LeadTable, expected: Option<&[String]>) -> FeatureMatrix {
    let mut table = table.clone();

    // Derived columns already in the table are kept, so feeding a matrix back in is stable.
    if !table.has_column(LINKEDIN_PRESENT) {
        let values = table
            .rows()
            .iter()
            .map(|row| Some(derive_linkedin_present(row.get(LINKEDIN)).to_string()))
            .collect();
        table.set_column(LINKEDIN_PRESENT, values);
    }
    if !table.has_column(PROFESSIONAL_EMAIL) {
        let values = table
            .rows()
            .iter()
            .map(|row| Some(derive_professional_email(row.get(DOMAIN)).to_string()))
            .collect();
        table.set_column(PROFESSIONAL_EMAIL, values);
    }

    for column in NON_FEATURE_COLUMNS {
        table.drop_column(column);
    }

    let columns: Vec<String> = match expected {
        Some(names) => names.to_vec(),
        None => table.columns().to_vec(),
    };

    let missing: Vec<&String> = columns.iter().filter(|c| !table.has_column(c)).collect();
    if !missing.is_empty() {
        tracing::debug!("Zero-filling {} absent model feature(s): {:?}", missing.len(), missing);
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| coerce_numeric(row.get(column)))
                .collect()
        })
        .collect();

    FeatureMatrix { columns, rows }
}
