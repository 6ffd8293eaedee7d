use crate::errors::AppError;
use crate::models::LeadTable;
use sha2::{Digest, Sha256};

/// Default download name for the exported table.
pub const EXPORT_FILENAME: &str = "scored_leads.csv";

/// Serialized lead table, ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedTable {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`, hex encoded.
    pub checksum: String,
}

impl ExportedTable {
    fn new(bytes: Vec<u8>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Self {
            filename: EXPORT_FILENAME.to_string(),
            checksum: hex::encode(hasher.finalize()),
            bytes,
        }
    }
}

/// Writes the table as CSV with a header row, in table column and row order.
/// Null cells are written empty. Identical tables give identical bytes.
pub fn export_csv(table: &LeadTable) -> Result<ExportedTable, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(table.columns())
        .map_err(|e| AppError::InternalError(format!("Failed to write CSV header: {}", e)))?;
    for (idx, record) in table.records().enumerate() {
        writer.write_record(&record).map_err(|e| {
            AppError::InternalError(format!("Failed to write CSV row {}: {}", idx + 1, e))
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("Failed to flush CSV: {}", e)))?;

    let exported = ExportedTable::new(bytes);
    tracing::info!(
        "Exported {} rows x {} columns ({} bytes, sha256 {})",
        table.len(),
        table.columns().len(),
        exported.bytes.len(),
        exported.checksum
    );
    Ok(exported)
}
