//! Shrinking the analyzed dataset to fit a token budget.
//!
//! Samples keep chronological coverage: a head third, a third taken from
//! the actual middle of the conversation, and a tail third.

use crate::models::{AnalysisRecord, MessageAnalysis};
use serde::Serialize;
use tracing::info;

/// A success record without its quotes, tagged with its original position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrippedRecord<'a> {
    pub index: usize,
    pub author: &'a str,
    pub timestamp: &'a str,
    pub analysis: &'a MessageAnalysis,
}

/// Keep `Success` records only, dropping their quote arrays.
pub fn strip_records(records: &[AnalysisRecord]) -> Vec<StrippedRecord<'_>> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match record {
            AnalysisRecord::Success {
                author,
                timestamp,
                analysis,
                ..
            } => Some(StrippedRecord {
                index,
                author,
                timestamp,
                analysis,
            }),
            AnalysisRecord::Error { .. } => None,
        })
        .collect()
}

/// Approximate token count of a serialized payload (4 characters per token).
pub fn estimate_tokens(serialized: &str) -> usize {
    serialized.chars().count().div_ceil(4)
}

/// Pick `target` items covering the head, middle and tail of `items`.
///
/// Head and tail get `target / 3` each; the middle segment absorbs the
/// remainder, so exactly `target` items are returned in original order.
pub fn balanced_sample<T: Clone>(items: &[T], target: usize) -> Vec<T> {
    let len = items.len();
    if target >= len {
        return items.to_vec();
    }

    let section = target / 3;
    let middle = target - 2 * section;
    let middle_start = (len / 2)
        .saturating_sub(middle / 2)
        .max(section)
        .min(len - section - middle);

    let mut sample = Vec::with_capacity(target);
    sample.extend_from_slice(&items[..section]);
    sample.extend_from_slice(&items[middle_start..middle_start + middle]);
    sample.extend_from_slice(&items[len - section..]);
    sample
}

/// The sizes tried while shrinking, ending with the one that fits.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlan {
    pub sizes: Vec<usize>,
    /// Estimated tokens at the final size.
    pub estimated_tokens: usize,
}

impl SamplePlan {
    pub fn final_size(&self) -> usize {
        self.sizes.last().copied().unwrap_or(0)
    }
}

/// Shrink until the estimate fits `token_budget` or `floor_size` is reached.
///
/// Each step sets `size = max(floor, floor(size * shrink_factor))`, so the
/// sequence is strictly decreasing and never drops below the floor.
pub fn plan_sample(
    records: &[StrippedRecord<'_>],
    token_budget: usize,
    floor_size: usize,
    shrink_factor: f64,
) -> Result<SamplePlan, serde_json::Error> {
    let mut size = records.len();
    let mut estimated_tokens = estimate_tokens(&serde_json::to_string(records)?);
    let mut sizes = vec![size];

    while estimated_tokens > token_budget && size > floor_size {
        let shrunk = (size as f64 * shrink_factor).floor() as usize;
        let next = shrunk.max(floor_size).min(size - 1);
        let sample = balanced_sample(records, next);
        let next_estimate = estimate_tokens(&serde_json::to_string(&sample)?);

        info!(
            "Dataset too large ({} tokens > {}), shrinking sample {} -> {} records ({} tokens)",
            estimated_tokens, token_budget, size, next, next_estimate
        );

        size = next;
        estimated_tokens = next_estimate;
        sizes.push(size);
    }

    Ok(SamplePlan {
        sizes,
        estimated_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalyzedMessage, MessageRecord};

    fn records(n: usize) -> Vec<AnalysisRecord> {
        (0..n)
            .map(|i| {
                let message = MessageRecord {
                    author: format!("User{}", i % 2 + 1),
                    timestamp: format!("2023-05-01 10:{:02}", i % 60),
                    content: "text".to_string(),
                    raw_line: "text".to_string(),
                };
                if i % 10 == 9 {
                    AnalysisRecord::error(&message, "failed")
                } else {
                    AnalysisRecord::success(
                        &message,
                        AnalyzedMessage {
                            key_quotes: vec!["a quote that should be stripped".to_string()],
                            ..Default::default()
                        },
                    )
                }
            })
            .collect()
    }

    #[test]
    fn test_strip_records_keeps_positions() {
        let all = records(20);
        let stripped = strip_records(&all);

        assert_eq!(stripped.len(), 18);
        assert_eq!(stripped[9].index, 10);
        let json = serde_json::to_string(&stripped).unwrap();
        assert!(!json.contains("stripped"));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_balanced_sample_coverage() {
        let items: Vec<usize> = (0..1000).collect();
        let sample = balanced_sample(&items, 300);

        assert_eq!(sample.len(), 300);
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sample[0], 0);
        assert_eq!(*sample.last().unwrap(), 999);
        assert!(sample.iter().any(|&i| (333..666).contains(&i)));
        assert!(sample.contains(&500));
    }

    #[test]
    fn test_balanced_sample_exact_size_for_all_targets() {
        for len in 1..60usize {
            let items: Vec<usize> = (0..len).collect();
            for target in 0..=len + 2 {
                let sample = balanced_sample(&items, target);
                assert_eq!(sample.len(), target.min(len), "len {} target {}", len, target);
                assert!(sample.windows(2).all(|w| w[0] < w[1]), "len {} target {}", len, target);
            }
        }
    }

    #[test]
    fn test_plan_without_shrinking() {
        let all = records(50);
        let stripped = strip_records(&all);
        let plan = plan_sample(&stripped, usize::MAX, 10, 0.8).unwrap();

        assert_eq!(plan.sizes, vec![45]);
        assert_eq!(plan.final_size(), 45);
    }

    #[test]
    fn test_plan_shrinks_monotonically_to_floor() {
        let all = records(500);
        let stripped = strip_records(&all);
        let plan = plan_sample(&stripped, 0, 20, 0.8).unwrap();

        assert_eq!(plan.sizes[0], 450);
        assert!(plan.sizes.windows(2).all(|w| w[1] < w[0]));
        assert!(plan.sizes.iter().all(|&s| s >= 20));
        assert_eq!(plan.final_size(), 20);
    }

    #[test]
    fn test_plan_stops_once_budget_fits() {
        let all = records(400);
        let stripped = strip_records(&all);
        let budget = estimate_tokens(&serde_json::to_string(&balanced_sample(&stripped, 150)).unwrap());

        let plan = plan_sample(&stripped, budget, 10, 0.8).unwrap();

        assert!(plan.final_size() <= 150);
        assert!(plan.estimated_tokens <= budget);
        // The size before the last one did not fit.
        assert!(plan.sizes[plan.sizes.len() - 2] > 150);
    }

    #[test]
    fn test_plan_with_slow_shrink_factor_still_decreases() {
        let all = records(30);
        let stripped = strip_records(&all);
        let plan = plan_sample(&stripped, 0, 3, 0.99).unwrap();

        assert!(plan.sizes.windows(2).all(|w| w[1] < w[0]));
        assert_eq!(plan.final_size(), 3);
    }
}
