//! Transcript parsing.
//!
//! Turns an exported chat transcript (plain text or HTML) into an ordered
//! list of [`MessageRecord`]s. Plain text goes through an ordered list of
//! line detectors; the first one that recognises a majority of non-empty
//! lines is used for the whole file.

pub mod detectors;
pub mod markup;

pub use detectors::{default_detectors, FormatDetector, ParsedLine};
pub use markup::{default_markup_detectors, MarkupDetector};

use crate::error::ExtractError;
use crate::models::MessageRecord;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parses transcripts into message records.
pub struct MessageExtractor {
    detectors: Vec<Box<dyn FormatDetector>>,
    markup_detectors: Vec<Box<dyn MarkupDetector>>,
    max_messages: Option<usize>,
}

impl Default for MessageExtractor {
    fn default() -> Self {
        Self {
            detectors: default_detectors(),
            markup_detectors: default_markup_detectors(),
            max_messages: None,
        }
    }
}

impl MessageExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the line detectors. Order matters: earlier detectors win.
    #[allow(dead_code)] // Extension point for custom export formats
    pub fn with_detectors(mut self, detectors: Vec<Box<dyn FormatDetector>>) -> Self {
        self.detectors = detectors;
        self
    }

    /// Keep at most `max` messages (the earliest ones).
    pub fn with_max_messages(mut self, max: Option<usize>) -> Self {
        self.max_messages = max;
        self
    }

    /// Parse a plain-text transcript.
    pub fn extract(&self, raw: &str) -> Result<Vec<MessageRecord>, ExtractError> {
        let messages = self.extract_lines(raw);
        self.finish(messages)
    }

    /// Parse an HTML-like transcript.
    pub fn extract_markup(&self, raw: &str) -> Result<Vec<MessageRecord>, ExtractError> {
        for detector in &self.markup_detectors {
            if let Some(messages) = detector.extract(raw) {
                info!(
                    "Markup format '{}' matched {} messages",
                    detector.name(),
                    messages.len()
                );
                return self.finish(messages);
            }
        }

        debug!("No known markup structure found, scanning stripped text");
        let text = markup::strip_markup(raw);
        self.extract(&text)
    }

    /// Parse a transcript, choosing the markup path for HTML-like input.
    pub fn extract_auto(&self, raw: &str) -> Result<Vec<MessageRecord>, ExtractError> {
        if markup::looks_like_markup(raw) {
            self.extract_markup(raw)
        } else {
            self.extract(raw)
        }
    }

    /// Read and parse a transcript file no larger than `max_file_size` bytes.
    pub fn extract_file(
        &self,
        path: &Path,
        max_file_size: u64,
    ) -> Result<Vec<MessageRecord>, ExtractError> {
        let io_err = |source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > max_file_size {
            return Err(ExtractError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_file_size,
            });
        }

        let content = std::fs::read_to_string(path).map_err(io_err)?;
        self.extract_auto(&content)
    }

    fn extract_lines(&self, raw: &str) -> Vec<MessageRecord> {
        let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return Vec::new();
        }

        for detector in &self.detectors {
            let matched = lines
                .iter()
                .filter(|l| detector.parse_line(l).is_some())
                .count();
            debug!(
                "Detector '{}' matched {}/{} lines",
                detector.name(),
                matched,
                lines.len()
            );

            if matched * 2 > lines.len() {
                info!("Using '{}' transcript format", detector.name());
                return collect_with_continuations(&lines, detector.as_ref());
            }
        }

        warn!("No predefined format matched. Trying simple colon split.");
        lines
            .iter()
            .filter_map(|line| {
                detectors::naive_split(line).map(|p| to_record(p, line.trim_end().to_string()))
            })
            .collect()
    }

    fn finish(&self, mut messages: Vec<MessageRecord>) -> Result<Vec<MessageRecord>, ExtractError> {
        if messages.is_empty() {
            warn!("Failed to extract any messages from the transcript");
            return Err(ExtractError::NoMessages);
        }

        if let Some(max) = self.max_messages {
            if messages.len() > max {
                warn!(
                    "Transcript has {} messages, keeping the first {}",
                    messages.len(),
                    max
                );
                messages.truncate(max);
            }
        }

        info!("Extracted {} messages from the transcript", messages.len());
        Ok(messages)
    }
}

/// Build records from header lines, folding unmatched lines into the
/// preceding message. Lines before the first header are dropped.
fn collect_with_continuations(lines: &[&str], detector: &dyn FormatDetector) -> Vec<MessageRecord> {
    let mut messages: Vec<MessageRecord> = Vec::new();

    for line in lines {
        if let Some(parsed) = detector.parse_line(line) {
            messages.push(to_record(parsed, line.trim_end().to_string()));
        } else if let Some(last) = messages.last_mut() {
            let extra = line.trim();
            if last.content.is_empty() {
                last.content = extra.to_string();
            } else {
                last.content.push('\n');
                last.content.push_str(extra);
            }
            last.raw_line.push('\n');
            last.raw_line.push_str(line.trim_end());
        }
    }

    messages
}

fn to_record(parsed: ParsedLine, raw_line: String) -> MessageRecord {
    MessageRecord {
        author: parsed.author,
        timestamp: parsed.timestamp,
        content: parsed.content,
        raw_line,
    }
}
