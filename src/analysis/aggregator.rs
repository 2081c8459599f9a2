//! Result aggregation and statistics.
//!
//! Merges per-message analysis records into per-author means and a pool
//! of notable quotes for the synthesis stage.

use crate::models::{AggregateMetrics, AnalysisRecord, AuthorMetrics, QuoteEntry};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Quotes this short (after trimming) are dropped from the pool.
const MIN_QUOTE_CHARS: usize = 5;

/// Compute per-author metrics and collect the quote pool.
///
/// Means cover `Success` records only; `Error` records are counted.
pub fn aggregate(records: &[AnalysisRecord]) -> (AggregateMetrics, Vec<QuoteEntry>) {
    let mut sums: BTreeMap<String, (AuthorMetrics, BTreeMap<&'static str, f64>)> = BTreeMap::new();
    let mut quotes = Vec::new();

    for record in records {
        let (metrics, totals) = sums.entry(record.author().to_string()).or_default();

        match record {
            AnalysisRecord::Success {
                author,
                analysis,
                quotes: record_quotes,
                ..
            } => {
                metrics.analyzed += 1;
                for (name, value) in analysis.numeric_fields() {
                    *totals.entry(name).or_default() += value;
                }

                quotes.extend(
                    record_quotes
                        .iter()
                        .filter(|q| q.trim().chars().count() > MIN_QUOTE_CHARS)
                        .map(|q| QuoteEntry {
                            quote: q.trim().to_string(),
                            author: author.clone(),
                            sentiment: analysis.sentiment,
                            emotion: analysis.emotion.clone(),
                        }),
                );
            }
            AnalysisRecord::Error { .. } => metrics.failed += 1,
        }
    }

    let authors = sums
        .into_iter()
        .map(|(author, (mut metrics, totals))| {
            if metrics.analyzed > 0 {
                let n = metrics.analyzed as f64;
                metrics.means = totals
                    .into_iter()
                    .map(|(name, total)| (name.to_string(), total / n))
                    .collect();
            }
            (author, metrics)
        })
        .collect();

    debug!("Aggregated {} records, {} quotes kept", records.len(), quotes.len());
    (AggregateMetrics { authors }, quotes)
}

/// Group records by author, preserving record order within each group.
pub fn group_by_author(records: &[AnalysisRecord]) -> HashMap<String, Vec<&AnalysisRecord>> {
    let mut grouped: HashMap<String, Vec<&AnalysisRecord>> = HashMap::new();

    for record in records {
        grouped
            .entry(record.author().to_string())
            .or_default()
            .push(record);
    }

    grouped
}

/// Fraction of records that were analyzed successfully (0 for no records).
pub fn success_rate(records: &[AnalysisRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let ok = records.iter().filter(|r| r.is_success()).count();
    ok as f64 / records.len() as f64
}
