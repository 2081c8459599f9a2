//! chatxray - LLM-powered chat transcript analyzer
//!
//! A CLI tool that parses an exported chat, analyzes every message with
//! an Ollama model under bounded concurrency, aggregates per-author
//! metrics and synthesizes a whole-conversation overview.
//!
//! Exit codes:
//!   0 - Success (including a failed synthesis stage)
//!   1 - Runtime error (unreadable transcript, no messages, bad config, etc.)

mod analysis;
mod backend;
mod cli;
mod config;
mod error;
mod extractor;
mod models;
mod report;
mod synthesis;

use analysis::{AnalysisDispatcher, ChunkConfig, DispatchConfig};
use anyhow::{Context, Result};
use backend::{OllamaBackend, OllamaConfig};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use extractor::MessageExtractor;
use models::{RunMetadata, RunReport, SynthesisOutcome};
use report::BarProgress;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use synthesis::{MetaSynthesizer, SynthesisConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("chatxray v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_analysis(args).await {
        error!("Analysis failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .chatxray.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize models, chunking, concurrency and synthesis limits.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete pipeline and write the result document.
async fn run_analysis(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let input = args
        .input
        .clone()
        .context("An input transcript is required")?;

    // Step 1: Extract messages
    println!("📥 Reading transcript: {}", input.display());
    let extractor = MessageExtractor::new().with_max_messages(config.general.max_messages);
    let messages = extractor
        .extract_file(&input, config.general.max_file_size)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    println!("   {} messages", messages.len());

    // Step 2: Chunk
    let chunks = analysis::split(&messages, &ChunkConfig::from(&config.chunking));
    let chunk_count = chunks.len();

    // Step 3: Analyze
    println!("\n🤖 Analyzing with {}", config.model.analysis_model);
    println!("   Ollama: {}", config.model.ollama_url);
    println!(
        "   Chunks: {} | Concurrency: {}",
        chunk_count, config.dispatch.concurrency_limit
    );

    let analysis_backend = Arc::new(
        OllamaBackend::new(ollama_config(&config, &config.model.analysis_model, true))
            .context("Failed to create HTTP client")?,
    );
    let dispatcher =
        AnalysisDispatcher::new(analysis_backend, DispatchConfig::from(&config.dispatch));

    let progress = Arc::new(BarProgress::new(chunk_count, !args.quiet));
    let outcome = dispatcher.analyze(chunks, progress.clone()).await;
    progress.finish();

    // Step 4: Aggregate
    let (metrics, quotes) = analysis::aggregate(&outcome.records);
    for (author, records) in analysis::group_by_author(&outcome.records) {
        debug!("{}: {} messages", author, records.len());
    }
    println!(
        "   Analyzed {:.0}% of messages ({} failed chunks)",
        analysis::success_rate(&outcome.records) * 100.0,
        outcome.failed_chunks
    );

    // Step 5: Synthesize
    let synthesis = if config.synthesis.enabled {
        println!("\n🔬 Synthesizing with {}", config.model.synthesis_model);
        let synthesis_backend = Arc::new(
            OllamaBackend::new(ollama_config(&config, &config.model.synthesis_model, false))
                .context("Failed to create HTTP client")?,
        );
        let synthesizer =
            MetaSynthesizer::new(synthesis_backend, SynthesisConfig::from(&config.synthesis));
        Some(
            synthesizer
                .synthesize(&outcome.records, &metrics, &quotes)
                .await,
        )
    } else {
        info!("Synthesis disabled");
        None
    };

    match &synthesis {
        Some(SynthesisOutcome::Success {
            sample_size,
            original_size,
            shrunk,
            ..
        }) => {
            if *shrunk {
                println!(
                    "   Sampled {} of {} analyzed messages to fit the budget",
                    sample_size, original_size
                );
            }
        }
        Some(SynthesisOutcome::Failure { kind, message }) => {
            warn!("Synthesis did not complete ({:?}): {}", kind, message);
        }
        None => {}
    }

    // Step 6: Build and save the report
    let synthesis_tokens = match &synthesis {
        Some(SynthesisOutcome::Success { tokens_used, .. }) => *tokens_used,
        _ => 0,
    };
    let duration = start_time.elapsed().as_secs_f64();

    let report = RunReport {
        metadata: RunMetadata {
            source: input.display().to_string(),
            analysis_date: Utc::now(),
            analysis_model: config.model.analysis_model.clone(),
            synthesis_model: config.model.synthesis_model.clone(),
            messages: messages.len(),
            chunks: chunk_count,
            failed_chunks: outcome.failed_chunks,
            analysis_tokens: outcome.tokens_used,
            synthesis_tokens,
            duration_seconds: duration,
        },
        metrics,
        quotes,
        records: outcome.records,
        synthesis,
    };

    if config.general.track_cost {
        let cost = report::approximate_cost(
            &report.metadata,
            config.general.analysis_cost_per_1k_tokens,
            config.general.synthesis_cost_per_1k_tokens,
        );
        info!(
            source = %report.metadata.source,
            chunks = report.metadata.chunks,
            analysis_tokens = report.metadata.analysis_tokens,
            synthesis_tokens = report.metadata.synthesis_tokens,
            approximate_cost = cost,
            "Run usage"
        );
    }

    let output = Path::new(&config.general.output);
    report::write_json_report(&report, output)?;

    // Print summary
    println!("\n📊 Analysis Summary:");
    println!("   Messages: {}", report.metadata.messages);
    println!("   Participants: {}", report.metrics.authors.len());
    println!("   Quotes kept: {}", report.quotes.len());
    println!(
        "   Synthesis: {}",
        match &report.synthesis {
            Some(outcome) if outcome.is_success() => "complete",
            Some(_) => "failed",
            None => "skipped",
        }
    );
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Analysis complete! Results saved to: {}", output.display());

    Ok(())
}

/// Backend settings for `model`.
fn ollama_config(config: &Config, model: &str, json_output: bool) -> OllamaConfig {
    OllamaConfig {
        ollama_url: config.model.ollama_url.clone(),
        model_name: model.to_string(),
        temperature: config.model.temperature,
        timeout_seconds: config.model.timeout_seconds,
        json_output,
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
