//! Runs the full lead workflow on a CSV file and writes the scored table.
//!
//! Usage: `score_leads <input.csv> [output.csv]`

use lead_scoring_api::config::Config;
use lead_scoring_api::export::EXPORT_FILENAME;
use lead_scoring_api::model::LinearModel;
use lead_scoring_api::models::LeadTable;
use lead_scoring_api::pipeline::LeadPipeline;
use lead_scoring_api::progress::LogProgress;
use lead_scoring_api::services::ProviderCaches;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the offline scoring utility.
///
/// Reads the input CSV, validates, enriches and scores every row, then writes
/// the result next to the working directory unless an output path is given.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_scoring_api=info,score_leads=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = env::args().skip(1);
    let input = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: score_leads <input.csv> [output.csv]"))?;
    let output = args.next().unwrap_or_else(|| EXPORT_FILENAME.to_string());

    let config = Config::from_env()?;
    let model = LinearModel::from_path(&config.model_path)?;
    let caches = ProviderCaches::new(&config);
    let pipeline = LeadPipeline::from_config(&config, &caches, Arc::new(model), Arc::new(LogProgress))?;

    let bytes = tokio::fs::read(&input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", input, e))?;
    let mut table = LeadTable::from_csv(&bytes)?;

    let (outcome, exported) = pipeline.run_and_export(&mut table).await?;
    tokio::fs::write(&output, &exported.bytes)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", output, e))?;

    println!("Run {}: scored {} leads", outcome.run_id, outcome.scores.len());
    for (status, count) in outcome.status_counts() {
        println!("  - {}: {}", status, count);
    }
    println!("Wrote {} (sha256 {})", output, exported.checksum);

    Ok(())
}
