//! Concurrent chunk analysis.
//!
//! Every chunk runs as its own task. A semaphore bounds how many chunks
//! talk to the backend at once; a chunk keeps its permit through retries
//! and backoff so the bound holds under any failure mix.

use crate::backend::{AnalysisBackend, AnalysisReply};
use crate::error::{BackendError, CallbackError};
use crate::models::{AnalysisRecord, Chunk};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Dispatch limits.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum chunks in flight against the backend.
    pub concurrency_limit: usize,
    /// Retries for rate-limited or transient failures.
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry.
    pub backoff_base: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl From<&crate::config::DispatchConfig> for DispatchConfig {
    fn from(config: &crate::config::DispatchConfig) -> Self {
        Self {
            concurrency_limit: config.concurrency_limit,
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }
}

/// Receives `(done, total)` after every chunk resolves.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, done: usize, total: usize) -> Result<(), CallbackError>;
}

/// Reporter that ignores progress.
#[allow(dead_code)] // For callers without a display
pub struct NoProgress;

#[async_trait]
impl ProgressReporter for NoProgress {
    async fn report(&self, _done: usize, _total: usize) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Everything the analysis stage produced.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// One record per input message, in transcript order.
    pub records: Vec<AnalysisRecord>,
    /// Tokens reported by successful backend calls.
    pub tokens_used: u64,
    /// Chunks whose backend call ultimately failed.
    pub failed_chunks: usize,
}

struct ChunkOutcome {
    records: Vec<AnalysisRecord>,
    tokens_used: u64,
    failed: bool,
}

/// Fans chunks out to an analysis backend.
pub struct AnalysisDispatcher {
    backend: Arc<dyn AnalysisBackend>,
    config: DispatchConfig,
}

impl AnalysisDispatcher {
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: DispatchConfig) -> Self {
        Self { backend, config }
    }

    /// Analyze all chunks.
    ///
    /// The outcome holds exactly one record per message across `chunks`,
    /// whatever the backend does.
    pub async fn analyze(
        &self,
        chunks: Vec<Chunk>,
        progress: Arc<dyn ProgressReporter>,
    ) -> DispatchOutcome {
        let total = chunks.len();
        info!(
            "Analyzing {} chunks with concurrency {}",
            total, self.config.concurrency_limit
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency_limit.max(1)));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut chunk_refs = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);

        for chunk in chunks {
            let chunk = Arc::new(chunk);
            let task_chunk = Arc::clone(&chunk);
            let backend = Arc::clone(&self.backend);
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&completed);
            let progress = Arc::clone(&progress);
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => analyze_chunk(backend.as_ref(), &task_chunk, &config).await,
                    Err(e) => failed_chunk(&task_chunk, &e.to_string()),
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                report_progress(progress.as_ref(), done, total).await;
                outcome
            });

            chunk_refs.push(chunk);
            handles.push(handle);
        }

        let joined = join_all(handles).await;

        let mut result = DispatchOutcome::default();
        for (chunk, joined) in chunk_refs.into_iter().zip(joined) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Chunk {} task aborted: {}", chunk.index, e);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    report_progress(progress.as_ref(), done, total).await;
                    failed_chunk(&chunk, &format!("analysis task aborted: {}", e))
                }
            };

            result.tokens_used += outcome.tokens_used;
            if outcome.failed {
                result.failed_chunks += 1;
            }
            result.records.extend(outcome.records);
        }

        let succeeded = result.records.iter().filter(|r| r.is_success()).count();
        info!(
            "Analysis finished: {}/{} messages analyzed, {} failed chunks, {} tokens",
            succeeded,
            result.records.len(),
            result.failed_chunks,
            result.tokens_used
        );

        result
    }
}

/// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

async fn report_progress(progress: &dyn ProgressReporter, done: usize, total: usize) {
    if let Err(e) = progress.report(done, total).await {
        warn!("Progress update {}/{} failed: {}", done, total, e);
    }
}

async fn analyze_chunk(
    backend: &dyn AnalysisBackend,
    chunk: &Chunk,
    config: &DispatchConfig,
) -> ChunkOutcome {
    let transcript = chunk.transcript();
    let mut attempt = 0;

    loop {
        debug!(
            "Chunk {} attempt {} ({} messages)",
            chunk.index,
            attempt + 1,
            chunk.len()
        );

        match backend.analyze(&transcript, ANALYSIS_INSTRUCTIONS).await {
            Ok(reply) => return align_reply(chunk, reply),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = backoff_delay(config.backoff_base, attempt);
                warn!(
                    "Chunk {} failed ({}), retrying in {:?} ({}/{})",
                    chunk.index,
                    e,
                    delay,
                    attempt + 1,
                    config.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                let reason = match &e {
                    BackendError::RateLimited(_) | BackendError::Transient(_) => {
                        format!("{} (after {} retries)", e, attempt)
                    }
                    _ => e.to_string(),
                };
                error!("Chunk {} failed: {}", chunk.index, reason);
                return failed_chunk(chunk, &reason);
            }
        }
    }
}

/// Pair reply entries with messages by position.
fn align_reply(chunk: &Chunk, reply: AnalysisReply) -> ChunkOutcome {
    let mut entries = reply.messages.into_iter();

    let records = chunk
        .messages
        .iter()
        .map(|message| match entries.next() {
            Some(Ok(result)) => AnalysisRecord::success(message, result),
            Some(Err(reason)) => AnalysisRecord::error(message, reason),
            None => AnalysisRecord::error(message, "missing result"),
        })
        .collect();

    let surplus = entries.count();
    if surplus > 0 {
        debug!(
            "Chunk {}: discarding {} surplus results",
            chunk.index, surplus
        );
    }

    ChunkOutcome {
        records,
        tokens_used: reply.tokens_used,
        failed: false,
    }
}

fn failed_chunk(chunk: &Chunk, reason: &str) -> ChunkOutcome {
    ChunkOutcome {
        records: chunk
            .messages
            .iter()
            .map(|m| AnalysisRecord::error(m, reason))
            .collect(),
        tokens_used: 0,
        failed: true,
    }
}

/// Instructions sent with every chunk.
const ANALYSIS_INSTRUCTIONS: &str = r#"You analyze chat messages for communication dynamics.
For EVERY message in the segment, in order, output one JSON object with:
sentiment (positive|negative|neutral), sentiment_score (-1..1), emotion,
emotion_intensity, toxicity, manipulation, empathy, assertiveness,
vulnerability, attachment_intensity, transactional_intensity,
needs_intensity, relationship_threat_level (all 0..1),
boundary_setting (-1 violation .. 1 healthy boundary),
power_dynamics (-1 submission .. 1 dominance),
attachment_style (secure|anxious|avoidant|disorganized),
transactional_state (parent|adult|child),
relational_bid (bid_for_attention|turning_toward|turning_away|turning_against),
communication_pattern (assertive|passive|aggressive|passive_aggressive),
gottman_horsemen {criticism, contempt, defensiveness, stonewalling} (0..1),
gottman_positive_interactions {appreciation, interest, affection, repair_attempts} (0..1),
key_quotes (short verbatim fragments worth keeping).
sentiment_score, toxicity, manipulation and empathy are required.
Respond with {"messages": [...]} only, no explanations or markdown."#;
