//! Status and recompute commands against a running analyzer

use analyzer_lib::RecomputeSummary;
use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, StatusResponse};
use crate::output::{
    color_stale, format_timestamp, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Generation")]
    generation: u64,
    #[tabled(rename = "Owners")]
    owners: usize,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "Pods")]
    unique_pods: usize,
    #[tabled(rename = "Edges")]
    edges: usize,
    #[tabled(rename = "Chains")]
    chains: usize,
    #[tabled(rename = "Unmatched")]
    unmatched_deletions: usize,
    #[tabled(rename = "Computed")]
    computed_at: String,
    #[tabled(rename = "Took")]
    duration: String,
}

impl From<&RecomputeSummary> for SummaryRow {
    fn from(summary: &RecomputeSummary) -> Self {
        Self {
            generation: summary.generation,
            owners: summary.owners,
            records: summary.records,
            unique_pods: summary.unique_pods,
            edges: summary.edges,
            chains: summary.chains,
            unmatched_deletions: summary.unmatched_deletions,
            computed_at: summary
                .computed_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
            duration: format!("{}ms", summary.duration.as_millis()),
        }
    }
}

fn print_summary(summary: &RecomputeSummary) {
    print_table(&[SummaryRow::from(summary)], "No recompute has run yet");
    if summary.conflicts > 0 {
        print_warning(&format!(
            "{} conflicting observations; first-seen values were kept",
            summary.conflicts
        ));
    }
}

/// Show record store size and freshness of the last recompute
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: StatusResponse = client.get("api/v1/status").await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!(
                "{} records across {} owners (generation {}, {})",
                status.records,
                status.owners,
                status.generation,
                color_stale(status.stale)
            );
            match &status.last_recompute {
                Some(summary) => print_summary(summary),
                None => print_warning("No recompute has run yet"),
            }
        }
    }
    Ok(())
}

/// Trigger a recompute and print its summary
pub async fn recompute(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary: RecomputeSummary = client.post("api/v1/recompute").await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Recomputed {} chains from generation {}",
                summary.chains, summary.generation
            ));
            print_summary(&summary);
        }
    }
    Ok(())
}
