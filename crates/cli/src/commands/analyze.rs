//! Offline analysis of a snapshot file

use analyzer_lib::{
    observability::StructuredLogger, DisplacementReport, OwnerKey, PlacementAnalyzer, ReportFilter,
};
use anyhow::{Context, Result};
use std::path::Path;

use crate::commands::displacements::render_report;
use crate::output::{print_warning, OutputFormat};
use crate::FilterArgs;

/// Build a report filter from command-line arguments
pub fn report_filter(filter: &FilterArgs, default_min_length: usize) -> Result<ReportFilter> {
    let mut report_filter = ReportFilter::default()
        .with_min_chain_length(filter.min_length.unwrap_or(default_min_length));
    if let Some(namespace) = &filter.namespace {
        report_filter = report_filter.with_namespace(namespace.clone());
    }
    if let Some(owner) = &filter.owner {
        let owner: OwnerKey = owner.parse().context("Invalid --owner")?;
        report_filter = report_filter.with_owner(owner);
    }
    Ok(report_filter)
}

/// Load a snapshot, compute chains and build the report without a server
pub fn analyze_file(path: &Path, filter: &ReportFilter) -> Result<(DisplacementReport, usize)> {
    let analyzer = PlacementAnalyzer::new(StructuredLogger::new("offline"));
    analyzer
        .import_snapshot_file(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;

    let summary = analyzer.recompute();
    let report = DisplacementReport::build(&analyzer.result(), filter);
    Ok((report, summary.conflicts))
}

pub fn analyze_snapshot(
    path: &str,
    filter: &FilterArgs,
    default_min_length: usize,
    format: OutputFormat,
) -> Result<()> {
    let filter = report_filter(filter, default_min_length)?;
    let (report, conflicts) = analyze_file(Path::new(path), &filter)?;

    render_report(&report, format)?;
    if conflicts > 0 && matches!(format, OutputFormat::Table) {
        print_warning(&format!(
            "{} conflicting observations were found; first-seen values were kept",
            conflicts
        ));
    }
    Ok(())
}
