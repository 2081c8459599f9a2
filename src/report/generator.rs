//! JSON result document generation.
//!
//! The run report is handed to external renderers as-is, so this module
//! only serializes it and computes usage figures for logging.

use crate::models::{RunMetadata, RunReport};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &RunReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}

/// Approximate spend for a run, given prices per 1000 tokens.
pub fn approximate_cost(
    metadata: &RunMetadata,
    analysis_per_1k: f64,
    synthesis_per_1k: f64,
) -> f64 {
    metadata.analysis_tokens as f64 / 1000.0 * analysis_per_1k
        + metadata.synthesis_tokens as f64 / 1000.0 * synthesis_per_1k
}
