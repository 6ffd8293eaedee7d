use crate::errors::{AppError, ResultExt};
use crate::model::LeadModel;
use crate::models::{
    format_number, round2, EmailStatus, LeadTable, ADJUSTED_SCORE, EMAIL_STATUS, LEAD_SCORE,
};
use crate::normalizer::build_feature_matrix;
use serde::Serialize;

/// Score multiplier for an email status label. Labels other than the four
/// statuses, and rows without a status, keep the full score.
pub fn penalty_for(status: Option<&str>) -> f64 {
    match status.and_then(EmailStatus::parse) {
        Some(EmailStatus::Valid) => 1.0,
        Some(EmailStatus::Risky) => 0.8,
        Some(EmailStatus::Invalid) => 0.3,
        Some(EmailStatus::Unknown) => 0.6,
        None => 1.0,
    }
}

/// Scores for one lead row, both on a 0-100 scale with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeadScore {
    pub lead_score: f64,
    pub adjusted_score: f64,
}

/// Scores every row of `table` and writes the `Lead Score (%)` and
/// `Adjusted Score (%)` columns.
///
/// Uses the positive-class probability when the model offers one, the raw
/// prediction otherwise.
pub fn score_table(table: &mut LeadTable, model: &dyn LeadModel) -> Result<Vec<LeadScore>, AppError> {
    let features = build_feature_matrix(table, model.feature_names());

    let raw = if model.has_predict_proba() {
        model.predict_proba(&features)
    } else {
        model.predict(&features)
    }
    .context("Failed to score leads")?;

    if raw.len() != table.len() {
        return Err(AppError::ModelError(format!(
            "Model returned {} scores for {} rows",
            raw.len(),
            table.len()
        )));
    }

    let scores: Vec<LeadScore> = raw
        .into_iter()
        .zip(table.column_values(EMAIL_STATUS))
        .map(|(value, status)| {
            let lead_score = round2(value * 100.0);
            LeadScore {
                lead_score,
                adjusted_score: round2(lead_score * penalty_for(status)),
            }
        })
        .collect();

    table.set_column(
        LEAD_SCORE,
        scores.iter().map(|s| Some(format_number(s.lead_score))).collect(),
    );
    table.set_column(
        ADJUSTED_SCORE,
        scores
            .iter()
            .map(|s| Some(format_number(s.adjusted_score)))
            .collect(),
    );

    tracing::info!("Scored {} lead(s)", scores.len());
    Ok(scores)
}
