//! Splitting messages into analysis chunks.
//!
//! Chunks are bounded by a message count and by a cheap size estimate
//! (roughly 1.3 tokens per word). A message is never split: one that
//! exceeds the budget on its own gets a chunk to itself.

use crate::models::{Chunk, MessageRecord};
use tracing::{info, warn};

/// Limits used when splitting a transcript.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum messages per chunk.
    pub max_messages_per_chunk: usize,
    /// Maximum estimated size per chunk.
    pub max_size_estimate: usize,
    /// Above this many messages, switch to `aggressive_chunk_size`.
    pub aggressive_threshold: usize,
    /// Message limit used for very large transcripts.
    pub aggressive_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_messages_per_chunk: 25,
            max_size_estimate: 3000,
            aggressive_threshold: 1000,
            aggressive_chunk_size: 15,
        }
    }
}

impl From<&crate::config::ChunkingConfig> for ChunkConfig {
    fn from(config: &crate::config::ChunkingConfig) -> Self {
        Self {
            max_messages_per_chunk: config.max_messages_per_chunk,
            max_size_estimate: config.max_size_estimate_per_chunk,
            aggressive_threshold: config.aggressive_chunking_threshold,
            aggressive_chunk_size: config.aggressive_chunk_size,
        }
    }
}

/// Estimated size of `text`: word count × 1.3, rounded up.
pub fn estimate_size(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words * 13).div_ceil(10)
}

/// Greedily split `messages` into chunks honouring `config`.
pub fn split(messages: &[MessageRecord], config: &ChunkConfig) -> Vec<Chunk> {
    let limit = if messages.len() > config.aggressive_threshold {
        let reduced = config
            .max_messages_per_chunk
            .min(config.aggressive_chunk_size);
        warn!(
            "Very large chat detected ({} messages). Using aggressive chunking ({} per chunk).",
            messages.len(),
            reduced
        );
        reduced
    } else {
        config.max_messages_per_chunk
    };
    let max_count = limit.max(1);

    let mut chunks = Vec::new();
    let mut current: Vec<MessageRecord> = Vec::new();
    let mut current_size = 0usize;

    for message in messages {
        let size = estimate_size(&message.raw_line);
        let over_count = current.len() >= max_count;
        let over_size = current_size + size > config.max_size_estimate;

        if !current.is_empty() && (over_count || over_size) {
            chunks.push(Chunk {
                index: chunks.len(),
                messages: std::mem::take(&mut current),
            });
            current_size = 0;
        }

        current.push(message.clone());
        current_size += size;
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            messages: current,
        });
    }

    info!("Split {} messages into {} chunks", messages.len(), chunks.len());
    chunks
}
