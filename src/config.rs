//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.chatxray.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".chatxray.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Chunking settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Analysis dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Synthesis settings.
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Largest transcript file accepted, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Keep only the first N messages of a transcript.
    #[serde(default)]
    pub max_messages: Option<usize>,

    /// Log token usage and approximate cost at the end of a run.
    #[serde(default = "default_true")]
    pub track_cost: bool,

    /// Price per 1000 analysis tokens.
    #[serde(default = "default_analysis_cost")]
    pub analysis_cost_per_1k_tokens: f64,

    /// Price per 1000 synthesis tokens.
    #[serde(default = "default_synthesis_cost")]
    pub synthesis_cost_per_1k_tokens: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            max_file_size: default_max_file_size(),
            max_messages: None,
            track_cost: true,
            analysis_cost_per_1k_tokens: default_analysis_cost(),
            synthesis_cost_per_1k_tokens: default_synthesis_cost(),
        }
    }
}

fn default_output() -> String {
    "chatxray_report.json".to_string()
}

fn default_max_file_size() -> u64 {
    2 * 1024 * 1024 // 2MB
}

fn default_true() -> bool {
    true
}

fn default_analysis_cost() -> f64 {
    0.0015
}

fn default_synthesis_cost() -> f64 {
    0.01
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Model used for per-chunk analysis.
    #[serde(default = "default_model")]
    pub analysis_model: String,

    /// Model used for the synthesis call.
    #[serde(default = "default_model")]
    pub synthesis_model: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            analysis_model: default_model(),
            synthesis_model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout() -> u64 {
    300
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_messages_per_chunk")]
    pub max_messages_per_chunk: usize,

    /// Size budget per chunk, in estimated tokens.
    #[serde(default = "default_max_size_estimate")]
    pub max_size_estimate_per_chunk: usize,

    /// Transcripts longer than this use `aggressive_chunk_size`.
    #[serde(default = "default_aggressive_threshold")]
    pub aggressive_chunking_threshold: usize,

    #[serde(default = "default_aggressive_chunk_size")]
    pub aggressive_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_messages_per_chunk: default_max_messages_per_chunk(),
            max_size_estimate_per_chunk: default_max_size_estimate(),
            aggressive_chunking_threshold: default_aggressive_threshold(),
            aggressive_chunk_size: default_aggressive_chunk_size(),
        }
    }
}

fn default_max_messages_per_chunk() -> usize {
    25
}

fn default_max_size_estimate() -> usize {
    3000
}

fn default_aggressive_threshold() -> usize {
    1000
}

fn default_aggressive_chunk_size() -> usize {
    15
}

/// Concurrent analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Chunks analyzed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,

    /// Retries after a rate limit or transient failure.
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// First retry delay in milliseconds; doubles each retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_base_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency(),
            max_retries: default_retries(),
            backoff_base_ms: default_backoff_ms(),
        }
    }
}

fn default_concurrency() -> usize {
    3
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

/// Whole-conversation synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Run the synthesis stage at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Estimated token budget for the analyzed records.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Smallest number of records the sample may shrink to.
    #[serde(default = "default_floor_size")]
    pub floor_size: usize,

    /// Multiplier applied on every shrink step, in (0, 1).
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,

    #[serde(default = "default_retries")]
    pub max_retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_base_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_budget: default_token_budget(),
            floor_size: default_floor_size(),
            shrink_factor: default_shrink_factor(),
            max_retries: default_retries(),
            backoff_base_ms: default_backoff_ms(),
        }
    }
}

fn default_token_budget() -> usize {
    90_000
}

fn default_floor_size() -> usize {
    90
}

fn default_shrink_factor() -> f64 {
    0.8
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(ref model) = args.model {
            self.model.analysis_model = model.clone();
        }
        if let Some(ref model) = args.synthesis_model {
            self.model.synthesis_model = model.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if args.max_messages.is_some() {
            self.general.max_messages = args.max_messages;
        }

        if let Some(max) = args.max_chunk_messages {
            self.chunking.max_messages_per_chunk = max;
        }

        if let Some(concurrency) = args.concurrency {
            self.dispatch.concurrency_limit = concurrency;
        }
        if let Some(retries) = args.max_retries {
            self.dispatch.max_retries = retries;
            self.synthesis.max_retries = retries;
        }

        if let Some(budget) = args.token_budget {
            self.synthesis.token_budget = budget;
        }
        if args.skip_synthesis {
            self.synthesis.enabled = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check that the settings describe a runnable pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.concurrency_limit == 0 {
            bail!("dispatch.concurrency_limit must be at least 1");
        }
        if self.chunking.max_messages_per_chunk == 0 || self.chunking.aggressive_chunk_size == 0 {
            bail!("chunk sizes must be at least 1");
        }
        if self.synthesis.floor_size < 3 {
            bail!(
                "synthesis.floor_size must be at least 3 (got {})",
                self.synthesis.floor_size
            );
        }
        if !(self.synthesis.shrink_factor > 0.0 && self.synthesis.shrink_factor < 1.0) {
            bail!(
                "synthesis.shrink_factor must be between 0 and 1 exclusive (got {})",
                self.synthesis.shrink_factor
            );
        }
        if !self.model.ollama_url.starts_with("http://")
            && !self.model.ollama_url.starts_with("https://")
        {
            bail!("Ollama URL must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
