//! Lead workflow: validate, enrich, score, export.
//!
//! Steps run strictly one after another on a single table; only the
//! validation step fans out internally.

use crate::config::Config;
use crate::enrichment::{enrich_and_merge, CompanyProfileSource, DomainProfileSource};
use crate::errors::AppError;
use crate::export::{export_csv, ExportedTable};
use crate::model::LeadModel;
use crate::models::{EmailStatus, LeadTable};
use crate::progress::ProgressSink;
use crate::scoring::{score_table, LeadScore};
use crate::services::{B2bEnrichmentService, CrunchbaseService, MailboxLayerService, ProviderCaches};
use crate::validation::{annotate_email_status, EmailVerifier};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Last workflow step to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Validate,
    Enrich,
    Score,
}

/// Everything a run produced, besides the mutated table.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub statuses: Vec<EmailStatus>,
    pub scores: Vec<LeadScore>,
}

impl RunOutcome {
    /// Row count per email status, every status present.
    pub fn status_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<&'static str, usize> =
            EmailStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for status in &self.statuses {
            *counts.entry(status.as_str()).or_default() += 1;
        }
        counts
    }
}

/// Collaborators for one workflow run.
#[derive(Clone)]
pub struct LeadPipeline {
    pub verifier: Arc<dyn EmailVerifier>,
    pub names: Arc<dyn CompanyProfileSource>,
    pub domains: Arc<dyn DomainProfileSource>,
    pub model: Arc<dyn LeadModel>,
    pub validation_concurrency: usize,
    pub progress: Arc<dyn ProgressSink>,
}

impl LeadPipeline {
    /// Wires the HTTP-backed providers for one run. Circuit breakers are
    /// fresh per run; response caches are shared.
    pub fn from_config(
        config: &Config,
        caches: &ProviderCaches,
        model: Arc<dyn LeadModel>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            verifier: Arc::new(MailboxLayerService::new(config, caches)?),
            names: Arc::new(CrunchbaseService::new(config, caches)?),
            domains: Arc::new(B2bEnrichmentService::new(config, caches)?),
            model,
            validation_concurrency: config.validation_concurrency,
            progress,
        })
    }

    /// Runs the workflow on `table` up to and including `last`.
    pub async fn run_until(&self, table: &mut LeadTable, last: Step) -> Result<RunOutcome, AppError> {
        let mut outcome = RunOutcome {
            run_id: Uuid::new_v4(),
            ..RunOutcome::default()
        };

        tracing::info!(
            "Starting lead run {} ({} rows, through {:?})",
            outcome.run_id,
            table.len(),
            last
        );

        // Step 1: Validate emails
        tracing::info!("Step 1: Validating emails");
        outcome.statuses = annotate_email_status(
            table,
            self.verifier.clone(),
            self.validation_concurrency,
            self.progress.clone(),
        )
        .await;
        if last == Step::Validate {
            return Ok(outcome);
        }

        // Step 2: Enrich companies
        tracing::info!("Step 2: Enriching companies");
        enrich_and_merge(
            table,
            self.names.clone(),
            self.domains.clone(),
            self.progress.clone(),
        )
        .await;
        if last == Step::Enrich {
            return Ok(outcome);
        }

        // Step 3: Score leads
        tracing::info!("Step 3: Scoring leads");
        outcome.scores = score_table(table, self.model.as_ref())?;

        tracing::info!(
            "Lead run {} complete: {:?}",
            outcome.run_id,
            outcome.status_counts()
        );
        Ok(outcome)
    }

    /// Runs every step and serializes the final table.
    pub async fn run_and_export(&self, table: &mut LeadTable) -> Result<(RunOutcome, ExportedTable), AppError> {
        let outcome = self.run_until(table, Step::Score).await?;
        let exported = export_csv(table)?;
        Ok((outcome, exported))
    }
}
