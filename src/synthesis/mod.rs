//! Whole-conversation synthesis.
//!
//! Shrinks the analyzed dataset until it fits the token budget, then makes
//! a single synthesis call with its own retry and escalation rules:
//!
//! - rate limits and transient failures back off exponentially; the final
//!   retry is sent with the minimum sample;
//! - a context-length rejection drops straight to the minimum sample and
//!   is retried once;
//! - anything else ends the stage.

pub mod sampling;

use crate::analysis::dispatcher::backoff_delay;
use crate::backend::SynthesisBackend;
use crate::error::BackendError;
use crate::models::{
    AggregateMetrics, AnalysisRecord, QuoteEntry, SynthesisFailureKind, SynthesisOutcome,
};
use sampling::{balanced_sample, plan_sample, strip_records, StrippedRecord};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Synthesis limits.
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Estimated token budget for the record sample.
    pub token_budget: usize,
    /// Smallest sample the shrink loop may produce.
    pub floor_size: usize,
    pub max_retries: u32,
    pub backoff_base: Duration,
    /// Multiplier applied to the sample size on every shrink step.
    pub shrink_factor: f64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            token_budget: 90_000,
            floor_size: 90,
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            shrink_factor: 0.8,
        }
    }
}

impl From<&crate::config::SynthesisConfig> for SynthesisConfig {
    fn from(config: &crate::config::SynthesisConfig) -> Self {
        Self {
            token_budget: config.token_budget,
            floor_size: config.floor_size,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            shrink_factor: config.shrink_factor,
        }
    }
}

/// Serialized request body for the synthesis backend.
#[derive(Serialize)]
struct SynthesisPayload<'a> {
    metrics: &'a AggregateMetrics,
    records: &'a [StrippedRecord<'a>],
    key_quotes: &'a [QuoteEntry],
    sampled: bool,
    original_count: usize,
}

/// Drives the synthesis call.
pub struct MetaSynthesizer {
    backend: Arc<dyn SynthesisBackend>,
    config: SynthesisConfig,
}

impl MetaSynthesizer {
    pub fn new(backend: Arc<dyn SynthesisBackend>, config: SynthesisConfig) -> Self {
        Self { backend, config }
    }

    /// Synthesize over `records`, passing `metrics` and the full quote pool.
    pub async fn synthesize(
        &self,
        records: &[AnalysisRecord],
        metrics: &AggregateMetrics,
        quotes: &[QuoteEntry],
    ) -> SynthesisOutcome {
        let stripped = strip_records(records);
        let original_size = stripped.len();
        if original_size == 0 {
            warn!("No successfully analyzed messages, skipping synthesis");
            return failure(SynthesisFailureKind::NoData, "no analyzed messages");
        }

        let plan = match plan_sample(
            &stripped,
            self.config.token_budget,
            self.config.floor_size,
            self.config.shrink_factor,
        ) {
            Ok(plan) => plan,
            Err(e) => return failure(SynthesisFailureKind::Backend, format!("payload: {}", e)),
        };

        let floor = self.config.floor_size.min(original_size);
        let mut size = plan.final_size();
        let mut attempt = 0;
        let mut context_retry_used = false;

        info!(
            "Synthesizing from {} of {} records (~{} tokens)",
            size, original_size, plan.estimated_tokens
        );

        loop {
            let sample = balanced_sample(&stripped, size);
            let payload = SynthesisPayload {
                metrics,
                records: &sample,
                key_quotes: quotes,
                sampled: size < original_size,
                original_count: original_size,
            };
            let body = match serde_json::to_string(&payload) {
                Ok(body) => body,
                Err(e) => {
                    return failure(SynthesisFailureKind::Backend, format!("payload: {}", e))
                }
            };

            match self.backend.synthesize(&body, SYNTHESIS_INSTRUCTIONS).await {
                Ok(reply) => {
                    info!(
                        "Synthesis complete: {} records, {} tokens",
                        size, reply.tokens_used
                    );
                    return SynthesisOutcome::Success {
                        artifact: reply.artifact,
                        tokens_used: reply.tokens_used,
                        retained_fraction: size as f64 / original_size as f64,
                        shrunk: size < original_size,
                        sample_size: size,
                        original_size,
                    };
                }
                Err(BackendError::ContextLengthExceeded(message)) => {
                    if context_retry_used {
                        error!("Context length exceeded at minimum sample size");
                        return failure(SynthesisFailureKind::ContextLengthExceeded, message);
                    }
                    warn!(
                        "Context length exceeded with {} records, retrying with {}",
                        size, floor
                    );
                    context_retry_used = true;
                    size = floor;
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.backoff_base, attempt);
                    attempt += 1;
                    if attempt == self.config.max_retries && size > floor {
                        info!("Final synthesis retry, reducing sample to {} records", floor);
                        size = floor;
                    }
                    warn!(
                        "Synthesis failed ({}), retrying in {:?} ({}/{})",
                        e, delay, attempt, self.config.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    error!("Synthesis retries exhausted: {}", e);
                    return failure(SynthesisFailureKind::RateLimited, e.to_string());
                }
                Err(e) => {
                    error!("Synthesis failed: {}", e);
                    return failure(SynthesisFailureKind::Backend, e.to_string());
                }
            }
        }
    }
}

fn failure(kind: SynthesisFailureKind, message: impl Into<String>) -> SynthesisOutcome {
    SynthesisOutcome::Failure {
        kind,
        message: message.into(),
    }
}

/// Instructions for the synthesis call.
const SYNTHESIS_INSTRUCTIONS: &str = r#"You are a relationship communication analyst.
You receive per-author metrics, a chronological sample of per-message analyses
(head, middle and tail of the conversation) and a pool of key quotes.
Describe the overall dynamics, recurring conflict patterns, how each participant
communicates, and how the conversation evolves from beginning to end.
Compare the positive interaction means (appreciation, interest, affection,
repair_attempts) with the four horsemen means against Gottman's 5:1 ratio.
Ground every claim in the metrics or the quotes."#;
