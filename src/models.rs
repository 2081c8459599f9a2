//! Data models for the transcript analyzer.
//!
//! This module contains the core data structures that flow through the
//! pipeline: parsed messages, chunks, per-message analysis results,
//! aggregate metrics and the final run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single message parsed from a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Display name of the sender.
    pub author: String,
    /// Timestamp as it appeared in the export (may be empty).
    pub timestamp: String,
    /// Message body.
    pub content: String,
    /// The raw source text for this message.
    pub raw_line: String,
}

/// An ordered, contiguous group of messages sent as one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the chunk sequence.
    pub index: usize,
    /// Member messages, in transcript order.
    pub messages: Vec<MessageRecord>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render the chunk as plain text for a backend request.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.raw_line.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Overall sentiment of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    #[default]
    Unknown,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Unknown => write!(f, "unknown"),
        }
    }
}

impl From<&str> for Sentiment {
    // Backends often append an explanation ("positive - friendly greeting"),
    // so only the leading word is significant.
    fn from(s: &str) -> Self {
        let lowered = s.trim().to_lowercase();
        let head = lowered
            .split(|c: char| !c.is_alphanumeric())
            .find(|w| !w.is_empty())
            .unwrap_or("");
        match head {
            "positive" | "позитивный" => Sentiment::Positive,
            "negative" | "негативный" => Sentiment::Negative,
            "neutral" | "нейтральный" => Sentiment::Neutral,
            _ => Sentiment::Unknown,
        }
    }
}

impl From<String> for Sentiment {
    fn from(s: String) -> Self {
        Sentiment::from(s.as_str())
    }
}

/// Dominant emotion expressed in a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Shame,
    Guilt,
    #[default]
    Unknown,
    Other(String),
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Emotion::Joy => write!(f, "joy"),
            Emotion::Sadness => write!(f, "sadness"),
            Emotion::Anger => write!(f, "anger"),
            Emotion::Fear => write!(f, "fear"),
            Emotion::Surprise => write!(f, "surprise"),
            Emotion::Disgust => write!(f, "disgust"),
            Emotion::Shame => write!(f, "shame"),
            Emotion::Guilt => write!(f, "guilt"),
            Emotion::Unknown => write!(f, "unknown"),
            Emotion::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Emotion {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "joy" | "happiness" | "радость" => Emotion::Joy,
            "sadness" | "грусть" => Emotion::Sadness,
            "anger" | "гнев" => Emotion::Anger,
            "fear" | "страх" => Emotion::Fear,
            "surprise" | "удивление" => Emotion::Surprise,
            "disgust" | "отвращение" => Emotion::Disgust,
            "shame" | "стыд" => Emotion::Shame,
            "guilt" | "вина" => Emotion::Guilt,
            "" | "unknown" => Emotion::Unknown,
            other => Emotion::Other(other.to_string()),
        }
    }
}

impl From<String> for Emotion {
    fn from(s: String) -> Self {
        Emotion::from(s.as_str())
    }
}

impl From<Emotion> for String {
    fn from(e: Emotion) -> Self {
        e.to_string()
    }
}

/// Communication style of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum CommunicationPattern {
    Assertive,
    Passive,
    Aggressive,
    PassiveAggressive,
    #[default]
    Unknown,
}

impl From<&str> for CommunicationPattern {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "assertive" | "ассертивный" => CommunicationPattern::Assertive,
            "passive" | "пассивный" => CommunicationPattern::Passive,
            "aggressive" | "агрессивный" => CommunicationPattern::Aggressive,
            "passive_aggressive" | "пассивно_агрессивный" => {
                CommunicationPattern::PassiveAggressive
            }
            _ => CommunicationPattern::Unknown,
        }
    }
}

impl From<String> for CommunicationPattern {
    fn from(s: String) -> Self {
        CommunicationPattern::from(s.as_str())
    }
}

/// Attachment style expressed in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AttachmentStyle {
    Secure,
    Anxious,
    Avoidant,
    Disorganized,
    #[default]
    Unknown,
}

impl From<&str> for AttachmentStyle {
    fn from(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        let word = s.split([',', ' ', '(']).next().unwrap_or("");
        match word {
            "secure" | "надежный" | "надёжный" => AttachmentStyle::Secure,
            "anxious" | "тревожный" => AttachmentStyle::Anxious,
            "avoidant" | "избегающий" => AttachmentStyle::Avoidant,
            "disorganized" | "дезорганизованный" => AttachmentStyle::Disorganized,
            _ => AttachmentStyle::Unknown,
        }
    }
}

impl From<String> for AttachmentStyle {
    fn from(s: String) -> Self {
        AttachmentStyle::from(s.as_str())
    }
}

/// Transactional analysis ego state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum TransactionalState {
    Parent,
    Adult,
    Child,
    #[default]
    Unknown,
}

impl From<&str> for TransactionalState {
    fn from(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        let word = s.split([',', ' ', '(']).next().unwrap_or("");
        match word {
            "parent" | "родитель" => TransactionalState::Parent,
            "adult" | "взрослый" => TransactionalState::Adult,
            "child" | "ребенок" | "ребёнок" => TransactionalState::Child,
            _ => TransactionalState::Unknown,
        }
    }
}

impl From<String> for TransactionalState {
    fn from(s: String) -> Self {
        TransactionalState::from(s.as_str())
    }
}

/// How a message bids for, or responds to, the partner's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum RelationalBid {
    BidForAttention,
    TurningToward,
    TurningAway,
    TurningAgainst,
    #[default]
    Unknown,
}

impl From<&str> for RelationalBid {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "bid_for_attention" | "запрос_на_внимание" => RelationalBid::BidForAttention,
            "turning_toward" | "поворот_к_партнеру" => RelationalBid::TurningToward,
            "turning_away" | "поворот_от_партнера" => RelationalBid::TurningAway,
            "turning_against" | "против_партнера" => RelationalBid::TurningAgainst,
            _ => RelationalBid::Unknown,
        }
    }
}

impl From<String> for RelationalBid {
    fn from(s: String) -> Self {
        RelationalBid::from(s.as_str())
    }
}

/// Gottman's "four horsemen" scores, each in `0.0..=1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Horsemen {
    pub criticism: f64,
    pub contempt: f64,
    pub defensiveness: f64,
    pub stonewalling: f64,
}

/// Positive interaction scores, each in `0.0..=1.0`. Weighed against
/// [`Horsemen`] for the positive-to-negative ratio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositiveInteractions {
    pub appreciation: f64,
    pub interest: f64,
    pub affection: f64,
    pub repair_attempts: f64,
}

/// Structured analysis of one message, as returned by the analysis backend.
///
/// `sentiment_score`, `toxicity`, `manipulation` and `empathy` are required;
/// an entry without them is not an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageAnalysis {
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Sentiment polarity in `-1.0..=1.0`.
    pub sentiment_score: f64,
    #[serde(default)]
    pub emotion: Emotion,
    #[serde(default)]
    pub emotion_intensity: f64,
    pub toxicity: f64,
    pub manipulation: f64,
    pub empathy: f64,
    #[serde(default)]
    pub assertiveness: f64,
    #[serde(default)]
    pub vulnerability: f64,
    #[serde(default)]
    pub attachment_style: AttachmentStyle,
    #[serde(default)]
    pub attachment_intensity: f64,
    #[serde(default)]
    pub communication_pattern: CommunicationPattern,
    #[serde(default)]
    pub gottman_horsemen: Horsemen,
    #[serde(default)]
    pub gottman_positive_interactions: PositiveInteractions,
    #[serde(default)]
    pub transactional_state: TransactionalState,
    #[serde(default)]
    pub transactional_intensity: f64,
    #[serde(default)]
    pub needs_intensity: f64,
    /// Boundary violation (negative) to healthy boundary setting (positive), `-1.0..=1.0`.
    #[serde(default)]
    pub boundary_setting: f64,
    /// Submission (negative) to dominance (positive), `-1.0..=1.0`.
    #[serde(default)]
    pub power_dynamics: f64,
    #[serde(default)]
    pub relational_bid: RelationalBid,
    #[serde(default)]
    pub relationship_threat_level: f64,
}

impl MessageAnalysis {
    /// Clamp every numeric score into its documented range.
    ///
    /// Non-finite values collapse to zero.
    pub fn clamped(mut self) -> Self {
        fn unit(v: f64) -> f64 {
            if v.is_finite() {
                v.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }

        fn signed(v: f64) -> f64 {
            if v.is_finite() {
                v.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        }

        self.sentiment_score = signed(self.sentiment_score);
        self.boundary_setting = signed(self.boundary_setting);
        self.power_dynamics = signed(self.power_dynamics);
        self.emotion_intensity = unit(self.emotion_intensity);
        self.toxicity = unit(self.toxicity);
        self.manipulation = unit(self.manipulation);
        self.empathy = unit(self.empathy);
        self.assertiveness = unit(self.assertiveness);
        self.vulnerability = unit(self.vulnerability);
        self.attachment_intensity = unit(self.attachment_intensity);
        self.transactional_intensity = unit(self.transactional_intensity);
        self.needs_intensity = unit(self.needs_intensity);
        self.relationship_threat_level = unit(self.relationship_threat_level);
        let h = &mut self.gottman_horsemen;
        h.criticism = unit(h.criticism);
        h.contempt = unit(h.contempt);
        h.defensiveness = unit(h.defensiveness);
        h.stonewalling = unit(h.stonewalling);
        let p = &mut self.gottman_positive_interactions;
        p.appreciation = unit(p.appreciation);
        p.interest = unit(p.interest);
        p.affection = unit(p.affection);
        p.repair_attempts = unit(p.repair_attempts);
        self
    }

    /// Named numeric fields, in a stable order, for aggregation.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 21] {
        let h = &self.gottman_horsemen;
        let p = &self.gottman_positive_interactions;
        [
            ("sentiment_score", self.sentiment_score),
            ("emotion_intensity", self.emotion_intensity),
            ("toxicity", self.toxicity),
            ("manipulation", self.manipulation),
            ("empathy", self.empathy),
            ("assertiveness", self.assertiveness),
            ("vulnerability", self.vulnerability),
            ("attachment_intensity", self.attachment_intensity),
            ("transactional_intensity", self.transactional_intensity),
            ("needs_intensity", self.needs_intensity),
            ("boundary_setting", self.boundary_setting),
            ("power_dynamics", self.power_dynamics),
            ("relationship_threat_level", self.relationship_threat_level),
            ("criticism", h.criticism),
            ("contempt", h.contempt),
            ("defensiveness", h.defensiveness),
            ("stonewalling", h.stonewalling),
            ("appreciation", p.appreciation),
            ("interest", p.interest),
            ("affection", p.affection),
            ("repair_attempts", p.repair_attempts),
        ]
    }
}

/// One backend result: the analysis plus the quotes it picked out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedMessage {
    #[serde(flatten)]
    pub analysis: MessageAnalysis,
    #[serde(default)]
    pub key_quotes: Vec<String>,
}

/// Per-message analysis outcome. Exactly one exists for every parsed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisRecord {
    Success {
        author: String,
        timestamp: String,
        analysis: MessageAnalysis,
        quotes: Vec<String>,
    },
    Error {
        author: String,
        reason: String,
        original_text: String,
    },
}

impl AnalysisRecord {
    /// Build a success record for `message` from a backend result.
    pub fn success(message: &MessageRecord, result: AnalyzedMessage) -> Self {
        AnalysisRecord::Success {
            author: message.author.clone(),
            timestamp: message.timestamp.clone(),
            analysis: result.analysis.clamped(),
            quotes: result.key_quotes,
        }
    }

    /// Build an error record for `message`.
    pub fn error(message: &MessageRecord, reason: impl Into<String>) -> Self {
        AnalysisRecord::Error {
            author: message.author.clone(),
            reason: reason.into(),
            original_text: message.raw_line.clone(),
        }
    }

    pub fn author(&self) -> &str {
        match self {
            AnalysisRecord::Success { author, .. } | AnalysisRecord::Error { author, .. } => author,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisRecord::Success { .. })
    }
}

/// A quote preserved for the synthesis stage, tagged with its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteEntry {
    pub quote: String,
    pub author: String,
    pub sentiment: Sentiment,
    pub emotion: Emotion,
}

/// Mean metrics for a single author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorMetrics {
    /// Number of successfully analyzed messages.
    pub analyzed: usize,
    /// Number of messages whose analysis failed.
    pub failed: usize,
    /// Metric name to mean value, over successful records only.
    pub means: BTreeMap<String, f64>,
}

/// Per-author aggregate metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub authors: BTreeMap<String, AuthorMetrics>,
}

impl AggregateMetrics {
    /// Mean value of `metric` for `author`, if any success was recorded.
    #[allow(dead_code)] // Lookup helper for report consumers
    pub fn mean(&self, author: &str, metric: &str) -> Option<f64> {
        self.authors.get(author)?.means.get(metric).copied()
    }
}

/// Why the synthesis stage gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisFailureKind {
    /// No successful records to synthesize from.
    NoData,
    /// Rate limited (or transiently failing) through every retry.
    RateLimited,
    /// Context window exceeded even at the minimum sample size.
    ContextLengthExceeded,
    /// Any other backend failure.
    Backend,
}

/// Result of the synthesis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    Success {
        artifact: String,
        tokens_used: u64,
        /// `sample_size / original_size`.
        retained_fraction: f64,
        /// Whether the dataset had to be sampled down.
        shrunk: bool,
        sample_size: usize,
        original_size: usize,
    },
    Failure {
        kind: SynthesisFailureKind,
        message: String,
    },
}

impl SynthesisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisOutcome::Success { .. })
    }
}

/// Metadata about a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Path of the analyzed transcript.
    pub source: String,
    /// Date and time of the run.
    pub analysis_date: DateTime<Utc>,
    /// Model used for per-chunk analysis.
    pub analysis_model: String,
    /// Model used for the synthesis call.
    pub synthesis_model: String,
    pub messages: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    /// Tokens used by the analysis stage.
    pub analysis_tokens: u64,
    /// Tokens used by the synthesis stage.
    pub synthesis_tokens: u64,
    pub duration_seconds: f64,
}

/// Everything a run produces, handed to external rendering collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub metrics: AggregateMetrics,
    pub quotes: Vec<QuoteEntry>,
    pub records: Vec<AnalysisRecord>,
    /// `None` when the synthesis stage was disabled.
    pub synthesis: Option<SynthesisOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(author: &str, text: &str) -> MessageRecord {
        MessageRecord {
            author: author.to_string(),
            timestamp: "01.05.2023, 14:30".to_string(),
            content: text.to_string(),
            raw_line: format!("{}: {}", author, text),
        }
    }

    #[test]
    fn test_sentiment_from_str() {
        assert_eq!(Sentiment::from("positive"), Sentiment::Positive);
        assert_eq!(
            Sentiment::from("Negative - sharp criticism"),
            Sentiment::Negative
        );
        assert_eq!(Sentiment::from("нейтральный"), Sentiment::Neutral);
        assert_eq!(Sentiment::from("mixed"), Sentiment::Unknown);
    }

    #[test]
    fn test_emotion_from_str() {
        assert_eq!(Emotion::from("Joy"), Emotion::Joy);
        assert_eq!(Emotion::from("гнев"), Emotion::Anger);
        assert_eq!(Emotion::from(""), Emotion::Unknown);
        assert_eq!(Emotion::from("nostalgia"), Emotion::Other("nostalgia".to_string()));
    }

    #[test]
    fn test_communication_pattern_from_str() {
        assert_eq!(
            CommunicationPattern::from("passive-aggressive"),
            CommunicationPattern::PassiveAggressive
        );
        assert_eq!(
            CommunicationPattern::from("Assertive"),
            CommunicationPattern::Assertive
        );
    }

    #[test]
    fn test_analysis_clamped() {
        let analysis = MessageAnalysis {
            sentiment_score: -3.0,
            toxicity: 1.7,
            empathy: f64::NAN,
            power_dynamics: 2.5,
            boundary_setting: -0.4,
            gottman_positive_interactions: PositiveInteractions {
                repair_attempts: 1.2,
                ..Default::default()
            },
            ..Default::default()
        }
        .clamped();

        assert_eq!(analysis.sentiment_score, -1.0);
        assert_eq!(analysis.toxicity, 1.0);
        assert_eq!(analysis.empathy, 0.0);
        assert_eq!(analysis.power_dynamics, 1.0);
        assert_eq!(analysis.boundary_setting, -0.4);
        assert_eq!(analysis.gottman_positive_interactions.repair_attempts, 1.0);
    }

    #[test]
    fn test_analyzed_message_deserialize() {
        let json = r#"{
            "sentiment": "positive, warm greeting",
            "sentiment_score": 0.8,
            "emotion": "joy",
            "toxicity": 0.0,
            "manipulation": 0.0,
            "empathy": 0.7,
            "communication_pattern": "assertive",
            "attachment_style": "secure (comfortable with closeness)",
            "transactional_state": "adult",
            "relational_bid": "turning toward",
            "boundary_setting": 0.3,
            "gottman_horsemen": {"criticism": 0.1},
            "gottman_positive_interactions": {"affection": 0.9},
            "key_quotes": ["so happy to see you"]
        }"#;

        let parsed: AnalyzedMessage = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.analysis.sentiment, Sentiment::Positive);
        assert_eq!(parsed.analysis.emotion, Emotion::Joy);
        assert_eq!(parsed.analysis.attachment_style, AttachmentStyle::Secure);
        assert_eq!(parsed.analysis.transactional_state, TransactionalState::Adult);
        assert_eq!(parsed.analysis.relational_bid, RelationalBid::TurningToward);
        assert_eq!(parsed.analysis.boundary_setting, 0.3);
        assert_eq!(parsed.analysis.gottman_horsemen.criticism, 0.1);
        assert_eq!(parsed.analysis.gottman_positive_interactions.affection, 0.9);
        assert_eq!(parsed.key_quotes, vec!["so happy to see you"]);
    }

    #[test]
    fn test_analysis_requires_core_scores() {
        assert!(serde_json::from_str::<AnalyzedMessage>("{}").is_err());
        assert!(serde_json::from_str::<AnalyzedMessage>(r#"{"criticism": 0.8}"#).is_err());
        assert!(serde_json::from_str::<AnalyzedMessage>(
            r#"{"sentiment": "negative", "toxicity": 0.9}"#
        )
        .is_err());
    }

    #[test]
    fn test_russian_labels() {
        assert_eq!(AttachmentStyle::from("тревожный"), AttachmentStyle::Anxious);
        assert_eq!(TransactionalState::from("Ребенок"), TransactionalState::Child);
        assert_eq!(
            RelationalBid::from("поворот от партнера"),
            RelationalBid::TurningAway
        );
        assert_eq!(AttachmentStyle::from("unclear"), AttachmentStyle::Unknown);
    }

    #[test]
    fn test_record_constructors_keep_message_author() {
        let msg = message("Alice", "hello there");

        let ok = AnalysisRecord::success(&msg, AnalyzedMessage::default());
        assert!(ok.is_success());
        assert_eq!(ok.author(), "Alice");

        let err = AnalysisRecord::error(&msg, "rate limited");
        assert!(!err.is_success());
        match err {
            AnalysisRecord::Error { original_text, .. } => {
                assert_eq!(original_text, "Alice: hello there")
            }
            _ => panic!("expected error record"),
        }
    }

    #[test]
    fn test_record_serializes_tagged() {
        let msg = message("Bob", "hi");
        let json = serde_json::to_string(&AnalysisRecord::error(&msg, "boom")).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("\"reason\":\"boom\""));
    }

    #[test]
    fn test_chunk_transcript() {
        let chunk = Chunk {
            index: 0,
            messages: vec![message("A", "one"), message("B", "two")],
        };
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.transcript(), "A: one\n\nB: two");
    }
}
