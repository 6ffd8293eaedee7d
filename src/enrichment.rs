/// Company enrichment for lead rows.
///
/// Each row is enriched in two steps:
/// 1. Name-based company profile (autocomplete, then organization details)
/// 2. Domain-based B2B profile, whose non-empty fields take precedence
///
/// The resulting records are merged back onto the table positionally.
use crate::models::{
    EnrichmentRecord, LeadTable, COMPANY, COMPANY_NAME, DOMAIN, ENRICHMENT_COLUMNS,
};
use crate::progress::{ProgressEvent, ProgressSink, Stage};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Fields taken from the name-based company provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyProfile {
    pub linkedin: Option<String>,
    pub employee_count: Option<i64>,
    pub total_funding: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

impl CompanyProfile {
    /// Reads organization properties (`linkedin_url`, `num_employees_enum`,
    /// `total_funding_usd`, `categories`, `city_name`).
    pub fn from_properties(properties: &Map<String, Value>) -> Self {
        Self {
            linkedin: properties.get("linkedin_url").and_then(value_to_text),
            employee_count: properties
                .get("num_employees_enum")
                .and_then(parse_employee_count),
            total_funding: properties.get("total_funding_usd").and_then(value_to_text),
            category: properties.get("categories").and_then(value_to_text),
            location: properties.get("city_name").and_then(value_to_text),
        }
    }
}

/// Fields taken from the domain-based enrichment provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainProfile {
    pub industry: Option<String>,
    pub employee_count: Option<i64>,
    pub location: Option<String>,
}

impl DomainProfile {
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            industry: fields.get("industry").and_then(value_to_text),
            employee_count: fields.get("employee_count").and_then(parse_employee_count),
            location: fields.get("location").and_then(value_to_text),
        }
    }
}

/// Name-based company lookup. `None` means nothing usable was found.
#[async_trait]
pub trait CompanyProfileSource: Send + Sync {
    async fn company_profile(&self, company: &str) -> Option<CompanyProfile>;
}

/// Domain-based company lookup. `None` means nothing usable was found.
#[async_trait]
pub trait DomainProfileSource: Send + Sync {
    async fn domain_profile(&self, domain: &str) -> Option<DomainProfile>;
}

/// Parses an employee count only when the raw value is purely digits.
///
/// `"50"` and `50` parse; `"51-100"`, `"c_00051_00100"`, `50.0` do not.
pub fn parse_employee_count(value: &Value) -> Option<i64> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Renders a provider value as a table cell. Null and empty values yield `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("name"))
            .and_then(value_to_text)
            .or_else(|| {
                if map.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }),
    }
}

/// Builds the enrichment record for one lead. Never fails: a missing or
/// failed lookup leaves its fields empty.
pub async fn enrich_lead(
    company: Option<&str>,
    domain: Option<&str>,
    names: &dyn CompanyProfileSource,
    domains: &dyn DomainProfileSource,
) -> EnrichmentRecord {
    let mut record = EnrichmentRecord {
        company: company.map(str::to_string),
        domain: domain.map(str::to_string),
        ..EnrichmentRecord::default()
    };

    if let Some(company) = company {
        if let Some(profile) = names.company_profile(company).await {
            record.linkedin = profile.linkedin;
            record.employee_count = profile.employee_count;
            record.total_funding = profile.total_funding;
            record.category = profile.category;
            record.location = profile.location;
        }
    }

    if let Some(domain) = domain {
        if let Some(b2b) = domains.domain_profile(domain).await {
            record.industry = b2b.industry.or_else(|| record.category.clone());
            if b2b.employee_count.is_some() {
                record.employee_count = b2b.employee_count;
            }
            if b2b.location.is_some() {
                record.location = b2b.location;
            }
        }
    }

    record
}

/// Enriches every row in order, one row at a time.
///
/// The company name comes from `company`, falling back to `company_name`.
pub async fn enrich_table(
    table: &LeadTable,
    names: Arc<dyn CompanyProfileSource>,
    domains: Arc<dyn DomainProfileSource>,
    progress: Arc<dyn ProgressSink>,
) -> Vec<EnrichmentRecord> {
    let total = table.len();
    let mut records = Vec::with_capacity(total);

    tracing::info!("Enriching {} lead(s)", total);

    for (idx, row) in table.rows().iter().enumerate() {
        let company = row
            .get_trimmed(COMPANY)
            .or_else(|| row.get_trimmed(COMPANY_NAME));
        let domain = row.get_trimmed(DOMAIN);

        records.push(enrich_lead(company, domain, names.as_ref(), domains.as_ref()).await);

        progress.report(ProgressEvent {
            stage: Stage::Enrichment,
            completed: idx + 1,
            total,
        });
    }

    records
}

/// Attaches enrichment records to the table by row position.
///
/// Enrichment columns already present in the table are skipped (the table
/// wins), column names are stripped, and duplicates collapse to their first
/// occurrence.
pub fn merge_enrichment(table: &mut LeadTable, records: Vec<EnrichmentRecord>) {
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(records.len()); ENRICHMENT_COLUMNS.len()];
    for record in records {
        for (column, cell) in columns.iter_mut().zip(record.into_cells()) {
            column.push(cell);
        }
    }

    let overlap: Vec<&str> = ENRICHMENT_COLUMNS
        .iter()
        .copied()
        .filter(|name| table.has_column(name))
        .collect();
    if !overlap.is_empty() {
        tracing::debug!("Keeping existing columns over enrichment: {:?}", overlap);
    }

    for (name, values) in ENRICHMENT_COLUMNS.iter().zip(columns) {
        if !overlap.contains(name) {
            table.set_column(name, values);
        }
    }

    table.strip_column_names();
}

/// Enriches the table and merges the result in place.
pub async fn enrich_and_merge(
    table: &mut LeadTable,
    names: Arc<dyn CompanyProfileSource>,
    domains: Arc<dyn DomainProfileSource>,
    progress: Arc<dyn ProgressSink>,
) {
    let records = enrich_table(table, names, domains, progress).await;
    merge_enrichment(table, records);
    tracing::info!("Enrichment complete, duplicates removed");
}
