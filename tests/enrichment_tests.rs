/// Unit tests for enrichment and table shaping
/// Tests provider value parsing, merge semantics, and upload normalization
use lead_scoring_api::enrichment::{merge_enrichment, parse_employee_count, value_to_text};
use lead_scoring_api::models::{EnrichmentRecord, LeadTable};
use serde_json::json;

#[cfg(test)]
mod provider_value_tests {
    use super::*;

    #[test]
    fn test_employee_count_accepts_plain_digits() {
        assert_eq!(parse_employee_count(&json!("50")), Some(50));
        assert_eq!(parse_employee_count(&json!(120)), Some(120));
        assert_eq!(parse_employee_count(&json!("0")), Some(0));
    }

    #[test]
    fn test_employee_count_rejects_ranges_and_enums() {
        assert_eq!(parse_employee_count(&json!("51-100")), None);
        assert_eq!(parse_employee_count(&json!("c_00051_00100")), None);
        assert_eq!(parse_employee_count(&json!("")), None);
        assert_eq!(parse_employee_count(&json!(50.5)), None);
        assert_eq!(parse_employee_count(&json!(-3)), None);
        assert_eq!(parse_employee_count(&json!(null)), None);
    }

    #[test]
    fn test_value_to_text_shapes() {
        assert_eq!(value_to_text(&json!("  Austin ")), Some("Austin".to_string()));
        assert_eq!(value_to_text(&json!("")), None);
        assert_eq!(value_to_text(&json!(null)), None);
        assert_eq!(value_to_text(&json!(1500000)), Some("1500000".to_string()));
        assert_eq!(
            value_to_text(&json!([{"value": "Software"}, {"name": "SaaS"}, null])),
            Some("Software, SaaS".to_string())
        );
        assert_eq!(
            value_to_text(&json!({"value": "https://linkedin.com/company/acme"})),
            Some("https://linkedin.com/company/acme".to_string())
        );
        assert_eq!(value_to_text(&json!({})), None);
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;

    fn upload(csv: &str) -> LeadTable {
        LeadTable::from_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_merge_is_positional_and_table_wins() {
        let mut table = upload("email,company,industry\na@acme.io,Acme,Retail\nb@beta.io,Beta,\n");

        merge_enrichment(
            &mut table,
            vec![
                EnrichmentRecord {
                    company: Some("Acme".to_string()),
                    industry: Some("Software".to_string()),
                    employee_count: Some(120),
                    ..EnrichmentRecord::default()
                },
                EnrichmentRecord::default(),
            ],
        );

        assert_eq!(
            table.columns(),
            &[
                "email",
                "company",
                "industry",
                "domain",
                "linkedin",
                "employee_count",
                "total_funding",
                "category",
                "location"
            ]
        );
        assert_eq!(table.rows()[0].get("industry"), Some("Retail"));
        assert_eq!(table.rows()[0].get("employee_count"), Some("120"));
        assert_eq!(table.rows()[1].get("employee_count"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_merge_strips_and_dedupes_column_names() {
        let mut table = upload("email, linkedin ,Unnamed: 3\na@acme.io,https://linkedin.com/in/a,\n");

        merge_enrichment(
            &mut table,
            vec![EnrichmentRecord {
                linkedin: Some("https://linkedin.com/company/acme".to_string()),
                ..EnrichmentRecord::default()
            }],
        );

        let linkedin_columns = table.columns().iter().filter(|c| *c == "linkedin").count();
        assert_eq!(linkedin_columns, 1);
        assert_eq!(table.rows()[0].get("linkedin"), Some("https://linkedin.com/in/a"));
        assert!(!table.columns().iter().any(|c| c.starts_with("Unnamed")));
    }
}
