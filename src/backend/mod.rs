//! Backend capabilities used by the pipeline.
//!
//! The dispatcher and synthesizer receive these as trait objects, so any
//! service (or a fake in tests) can stand behind them.

pub mod ollama;

pub use ollama::{OllamaBackend, OllamaConfig};

use crate::error::BackendError;
use crate::models::AnalyzedMessage;
use async_trait::async_trait;
use serde_json::Value;

/// Reply to one chunk analysis request.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReply {
    /// One entry per message, in the order the backend returned them.
    /// `Err` holds the reason an entry could not be understood.
    pub messages: Vec<Result<AnalyzedMessage, String>>,
    /// Tokens reported by the backend for this call.
    pub tokens_used: u64,
}

/// Reply to a synthesis request.
#[derive(Debug, Clone, Default)]
pub struct SynthesisReply {
    /// The synthesized document, opaque to this crate.
    pub artifact: String,
    pub tokens_used: u64,
}

/// Per-chunk message analysis.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyze `transcript` (a chunk of messages) following `instructions`.
    async fn analyze(
        &self,
        transcript: &str,
        instructions: &str,
    ) -> Result<AnalysisReply, BackendError>;
}

/// Whole-conversation synthesis over the aggregated dataset.
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Produce an artifact from a serialized `payload` following `instructions`.
    async fn synthesize(
        &self,
        payload: &str,
        instructions: &str,
    ) -> Result<SynthesisReply, BackendError>;
}

/// Parse a model reply into per-message results.
///
/// Accepts a JSON array, an object with a `messages` array, or a single
/// object. Code fences are ignored. If the reply is not valid JSON, every
/// top-level `{...}` object embedded in the text is tried instead.
pub fn parse_analysis_content(content: &str) -> Vec<Result<AnalyzedMessage, String>> {
    let body = strip_code_fence(content);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items.into_iter().map(value_to_message).collect(),
        Ok(Value::Object(mut map)) => match map.remove("messages") {
            Some(Value::Array(items)) => items.into_iter().map(value_to_message).collect(),
            Some(other) => vec![value_to_message(other)],
            None => vec![value_to_message(Value::Object(map))],
        },
        Ok(other) => vec![Err(format!("unexpected JSON value: {}", other))],
        Err(_) => embedded_objects(body)
            .into_iter()
            .map(value_to_message)
            .collect(),
    }
}

fn value_to_message(value: Value) -> Result<AnalyzedMessage, String> {
    if !value.is_object() {
        return Err(format!("expected an object, got {}", value));
    }
    if let Some(err) = value.get("error") {
        return Err(format!("backend reported error: {}", err));
    }
    serde_json::from_value(value).map_err(|e| format!("malformed analysis: {}", e))
}

/// Objects embedded in prose, scanned left to right. Nested objects stay
/// inside their parent.
fn embedded_objects(text: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => {
                objects.push(value);
                pos = start + stream.byte_offset();
            }
            _ => pos = start + 1,
        }
    }

    objects
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Emotion, Sentiment};

    const CORE: &str = r#""sentiment_score": 0.0, "manipulation": 0.0, "empathy": 0.0"#;

    fn entry(fields: &str) -> String {
        format!(r#"{{{}, {}}}"#, CORE, fields)
    }

    #[test]
    fn test_parse_messages_object() {
        let content = format!(
            r#"{{"messages": [
            {{"sentiment": "positive", "sentiment_score": 0.5, "emotion": "joy", "toxicity": 0.0,
              "manipulation": 0.0, "empathy": 0.6, "key_quotes": ["great news"]}},
            {}
        ]}}"#,
            entry(r#""sentiment": "negative", "toxicity": 0.9"#)
        );

        let parsed = parse_analysis_content(&content);
        assert_eq!(parsed.len(), 2);
        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.analysis.sentiment, Sentiment::Positive);
        assert_eq!(first.analysis.emotion, Emotion::Joy);
        assert_eq!(first.key_quotes, vec!["great news"]);
        assert_eq!(parsed[1].as_ref().unwrap().analysis.toxicity, 0.9);
    }

    #[test]
    fn test_parse_array_and_single_object() {
        let array = format!("[{}, {}, {}]", entry(r#""toxicity": 0.1"#), entry(r#""toxicity": 0.2"#), entry(r#""toxicity": 0.3"#));
        let parsed = parse_analysis_content(&array);
        assert_eq!(parsed.len(), 3);
        assert!(parsed.iter().all(Result::is_ok));

        let single = parse_analysis_content(&entry(r#""sentiment": "neutral", "toxicity": 0.0"#));
        assert_eq!(single.len(), 1);
        assert_eq!(
            single[0].as_ref().unwrap().analysis.sentiment,
            Sentiment::Neutral
        );
    }

    #[test]
    fn test_parse_empty_and_unrelated_objects_are_errors() {
        let parsed = parse_analysis_content(r#"[{}, {"unrelated": 1}]"#);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().all(Result::is_err));
    }

    #[test]
    fn test_parse_code_fence() {
        let content = format!("```json\n[{}]\n```", entry(r#""toxicity": 0.2"#));
        let parsed = parse_analysis_content(&content);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].as_ref().unwrap().analysis.toxicity, 0.2);
    }

    #[test]
    fn test_parse_embedded_objects_fallback() {
        let content = format!(
            "Sure! Here you go:\n{}\nand\n{}",
            entry(r#""toxicity": 0.1"#),
            entry(r#""toxicity": 0.3"#)
        );
        let parsed = parse_analysis_content(&content);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].as_ref().unwrap().analysis.toxicity, 0.3);
    }

    #[test]
    fn test_parse_nested_objects_in_prose_stay_whole() {
        let content = format!(
            "Here is the result:\n{}\n{}\nHope this helps",
            entry(r#""sentiment": "negative", "toxicity": 0.9, "gottman_horsemen": {"criticism": 0.8}"#),
            entry(r#""sentiment": "negative", "toxicity": 0.7, "gottman_horsemen": {"contempt": 0.5}"#)
        );

        let parsed = parse_analysis_content(&content);
        assert_eq!(parsed.len(), 2);
        let first = parsed[0].as_ref().unwrap();
        assert_eq!(first.analysis.sentiment, Sentiment::Negative);
        assert_eq!(first.analysis.toxicity, 0.9);
        assert_eq!(first.analysis.gottman_horsemen.criticism, 0.8);
        let second = parsed[1].as_ref().unwrap();
        assert_eq!(second.analysis.toxicity, 0.7);
        assert_eq!(second.analysis.gottman_horsemen.contempt, 0.5);
    }

    #[test]
    fn test_parse_prose_objects_without_scores_are_errors() {
        let content = "Result: {\"gottman_horsemen\": {\"criticism\": 0.8}} done";
        let parsed = parse_analysis_content(content);
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].is_err());
    }

    #[test]
    fn test_parse_bad_entries_keep_position() {
        let content = format!(
            r#"[{}, "oops", {}, {{"error": "refused"}}]"#,
            entry(r#""toxicity": 0.1"#),
            entry(r#""toxicity": "high""#)
        );
        let parsed = parse_analysis_content(&content);
        assert_eq!(parsed.len(), 4);
        assert!(parsed[0].is_ok());
        assert!(parsed[1].is_err());
        assert!(parsed[2].is_err());
        assert!(parsed[3].as_ref().unwrap_err().contains("refused"));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_analysis_content("no json at all").is_empty());
        assert!(parse_analysis_content("a { stray brace").is_empty());
    }
}
