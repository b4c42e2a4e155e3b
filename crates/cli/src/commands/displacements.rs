//! Displacement report rendering and the `get displacements` command

use analyzer_lib::{ChainReport, DisplacementReport};
use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_length, format_gap, format_timestamp, print_info, print_json, print_table, OutputFormat,
};
use crate::FilterArgs;

/// Row for the chains table
#[derive(Tabled)]
struct ChainRow {
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Length")]
    length: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Slowest Gap")]
    slowest_gap: String,
    #[tabled(rename = "Nodes")]
    nodes: String,
    #[tabled(rename = "Pods")]
    pods: String,
}

/// Longest wait between a hop's deletion and its replacement's creation
fn slowest_gap(chain: &ChainReport) -> String {
    chain
        .hops
        .windows(2)
        .filter_map(|pair| {
            pair[0]
                .deletion_timestamp
                .map(|deleted| (deleted, pair[1].creation_timestamp))
        })
        .max_by_key(|(deleted, created)| *created - *deleted)
        .map(|(deleted, created)| format_gap(&deleted, &created))
        .unwrap_or_else(|| "-".to_string())
}

fn chain_row(owner: String, chain: &ChainReport) -> ChainRow {
    ChainRow {
        owner,
        length: color_length(chain.length),
        started: chain
            .hops
            .first()
            .map(|hop| format_timestamp(&hop.creation_timestamp))
            .unwrap_or_default(),
        slowest_gap: slowest_gap(chain),
        nodes: chain.node_path().join(" -> "),
        pods: chain
            .hops
            .iter()
            .map(|hop| hop.pod_name.as_str())
            .collect::<Vec<_>>()
            .join(" -> "),
    }
}

/// Print a displacement report in the requested format
pub fn render_report(report: &DisplacementReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            let rows: Vec<ChainRow> = report
                .owners
                .iter()
                .flat_map(|owner| {
                    owner
                        .chains
                        .iter()
                        .map(move |chain| chain_row(owner.owner.to_string(), chain))
                })
                .collect();

            print_table(&rows, "No displacement chains found");

            if !report.is_empty() {
                println!();
                print_info(&format!(
                    "{} chains, {} displacements across {} owners",
                    report.total_chains,
                    report.total_displacements,
                    report.owners.len()
                ));
            }
            if report.total_unmatched_deletions > 0 {
                print_info(&format!(
                    "{} deletions had no replacement",
                    report.total_unmatched_deletions
                ));
            }
        }
    }
    Ok(())
}

/// Get displacement chains from the analyzer
pub async fn get_displacements(
    client: &ApiClient,
    filter: &FilterArgs,
    default_min_length: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut query = vec![(
        "min_length",
        filter.min_length.unwrap_or(default_min_length).to_string(),
    )];
    if let Some(namespace) = &filter.namespace {
        query.push(("namespace", namespace.clone()));
    }
    if let Some(owner) = &filter.owner {
        query.push(("owner", owner.clone()));
    }

    let report: DisplacementReport = client
        .get_with_query("api/v1/displacements", &query)
        .await?;

    render_report(&report, format)
}
