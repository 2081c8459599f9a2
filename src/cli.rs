//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// chatxray - LLM-powered chat transcript analyzer
///
/// Splits an exported chat into chunks, analyzes every message with a
/// local model, aggregates per-author metrics and synthesizes a
/// whole-conversation overview. Writes a JSON result document.
///
/// Examples:
///   chatxray --input chat.txt
///   chatxray --input export.html --model qwen2.5:14b --concurrency 5
///   chatxray --input chat.txt --skip-synthesis -o metrics.json
///   chatxray --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Chat transcript to analyze (plain text or HTML export)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Ollama model used for per-message analysis
    ///
    /// Can also be set via CHATXRAY_MODEL env var or .chatxray.toml config.
    #[arg(short, long, env = "CHATXRAY_MODEL")]
    pub model: Option<String>,

    /// Ollama model used for the synthesis call
    #[arg(long, env = "CHATXRAY_SYNTHESIS_MODEL", value_name = "MODEL")]
    pub synthesis_model: Option<String>,

    /// Output file path for the JSON result
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .chatxray.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Number of chunks analyzed concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Retries after rate limits or transient backend failures
    #[arg(long, value_name = "NUM")]
    pub max_retries: Option<u32>,

    /// Maximum messages per analysis chunk
    #[arg(long, value_name = "COUNT")]
    pub max_chunk_messages: Option<usize>,

    /// Analyze only the first COUNT messages
    #[arg(long, value_name = "COUNT")]
    pub max_messages: Option<usize>,

    /// Token budget for the synthesis payload
    #[arg(long, value_name = "TOKENS")]
    pub token_budget: Option<usize>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Stop after aggregation, without the synthesis call
    #[arg(long)]
    pub skip_synthesis: bool,

    /// Generate a default .chatxray.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.max_chunk_messages == Some(0) {
            return Err("Max chunk messages must be at least 1".to_string());
        }

        if self.max_messages == Some(0) {
            return Err("Max messages must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match self.input {
            Some(ref path) if !path.is_file() => {
                Err(format!("Transcript file does not exist: {}", path.display()))
            }
            Some(_) => Ok(()),
            None => Err("An input transcript is required".to_string()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn make_args(input: &NamedTempFile) -> Args {
        Args {
            input: Some(input.path().to_path_buf()),
            model: None,
            synthesis_model: None,
            output: None,
            ollama_url: None,
            config: None,
            verbose: false,
            quiet: false,
            concurrency: None,
            max_retries: None,
            max_chunk_messages: None,
            max_messages: None,
            token_budget: None,
            temperature: None,
            timeout: None,
            skip_synthesis: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        let file = NamedTempFile::new().unwrap();
        assert!(make_args(&file).validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(&file);
        args.input = Some(PathBuf::from("/no/such/chat.txt"));
        assert!(args.validate().is_err());

        args.input = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_values() {
        let file = NamedTempFile::new().unwrap();

        let mut args = make_args(&file);
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());

        let mut args = make_args(&file);
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args(&file);
        args.temperature = Some(1.5);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(&file);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(&file);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_merge_into_config() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(&file);
        args.model = Some("mistral:7b".to_string());
        args.concurrency = Some(6);
        args.max_retries = Some(5);
        args.skip_synthesis = true;

        let mut config = crate::config::Config::default();
        config.merge_with_args(&args);

        assert_eq!(config.model.analysis_model, "mistral:7b");
        assert_eq!(config.model.synthesis_model, "llama3.2:latest");
        assert_eq!(config.dispatch.concurrency_limit, 6);
        assert_eq!(config.dispatch.max_retries, 5);
        assert_eq!(config.synthesis.max_retries, 5);
        assert!(!config.synthesis.enabled);
        assert_eq!(config.chunking.max_messages_per_chunk, 25);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from(["chatxray", "--input", "chat.txt", "--concurrency", "4"])
            .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("chat.txt")));
        assert_eq!(args.concurrency, Some(4));

        assert!(Args::try_parse_from(["chatxray", "--init-config"]).is_ok());
        assert!(Args::try_parse_from(["chatxray"]).is_err());
    }
}
