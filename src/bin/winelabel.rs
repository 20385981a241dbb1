//! CLI binary for winelabel.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, then either analyses one photo or runs the HTTP server.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use winelabel::render::{render_card, render_failure, status_message};
use winelabel::{
    analyze_file, server, AnalysisConfig, AnalysisProgressCallback, PipelineMode, ProgressCallback,
    Stage,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that shows the running stage's status line and a short
/// log line when each stage ends.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(status_message(stage));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar
            .println(format!("{} {stage} {}", green("✔"), dim(&format!("{elapsed_ms}ms"))));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("{} {stage} {}", red("✘"), dim(first_line)));
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Read wine labels with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "winelabel",
    version,
    about = "Read wine labels with Vision LLMs",
    long_about = "Photograph a wine label and get a structured card: what the label actually \
says (producer, vintage, region, ABV...) and, in a second pass, clearly-marked inferred context \
(style, tasting notes, pairings, serving).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "WINELABEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "WINELABEL_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one label photo and print the card.
    Analyze(AnalyzeArgs),
    /// Serve POST /api/analyze over HTTP.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Path to the label photo (JPEG, PNG).
    image: PathBuf,

    /// Print the analysis as JSON instead of a Markdown card.
    #[arg(long, env = "WINELABEL_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "WINELABEL_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "WINELABEL_ADDR", default_value = "127.0.0.1:8787")]
    addr: SocketAddr,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "WINELABEL_MAX_REQUEST_BYTES", default_value_t = 20 * 1024 * 1024)]
    max_request_bytes: usize,

    #[command(flatten)]
    model: ModelArgs,
}

/// Options shared by both subcommands.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Anthropic API key.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Anthropic API origin.
    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = winelabel::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Model ID used for both passes.
    #[arg(long, env = "WINELABEL_MODEL", default_value = winelabel::config::DEFAULT_MODEL)]
    model: String,

    /// Use an edgequake-llm provider (openai, gemini, ollama, ...) instead of
    /// the built-in Anthropic client.
    #[arg(long, env = "WINELABEL_PROVIDER")]
    provider: Option<String>,

    /// Skip the enrichment pass.
    #[arg(long, env = "WINELABEL_EXTRACT_ONLY")]
    extract_only: bool,

    /// Longest image edge in pixels sent to the model.
    #[arg(long, env = "WINELABEL_MAX_DIMENSION", default_value_t = 1280)]
    max_dimension: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "WINELABEL_QUALITY", default_value_t = 82,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Output token budget for the extraction pass.
    #[arg(long, env = "WINELABEL_EXTRACTION_MAX_TOKENS", default_value_t = 1024)]
    extraction_max_tokens: u32,

    /// Output token budget for the enrichment pass.
    #[arg(long, env = "WINELABEL_ENRICHMENT_MAX_TOKENS", default_value_t = 2048)]
    enrichment_max_tokens: u32,

    /// Sampling temperature (0.0–1.0).
    #[arg(long, env = "WINELABEL_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,
}

fn build_config(args: &ModelArgs) -> winelabel::AnalysisConfigBuilder {
    let mut builder = AnalysisConfig::builder()
        .base_url(&args.base_url)
        .model(&args.model)
        .max_dimension(args.max_dimension)
        .jpeg_quality(args.quality)
        .extraction_max_tokens(args.extraction_max_tokens)
        .enrichment_max_tokens(args.enrichment_max_tokens)
        .temperature(args.temperature)
        .mode(if args.extract_only {
            PipelineMode::ExtractOnly
        } else {
            PipelineMode::TwoPass
        });
    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    builder
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Keep INFO logs out of the way of the spinner; it shows what matters.
    let spinner_active = matches!(
        &cli.command,
        Command::Analyze(a) if !a.no_progress && !a.json
    );
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Analyze(args) => run_analyze(args, cli.quiet, spinner_active).await,
        Command::Serve(args) => {
            let config = build_config(&args.model)
                .max_request_bytes(args.max_request_bytes)
                .build()
                .context("Invalid configuration")?;
            server::serve(args.addr, config)
                .await
                .context("Server failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_analyze(args: AnalyzeArgs, quiet: bool, show_progress: bool) -> Result<ExitCode> {
    let progress = (show_progress && !quiet).then(CliProgressCallback::new);

    let mut builder = build_config(&args.model);
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;

    let result = analyze_file(&args.image, &config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }

    match result {
        Ok(output) => {
            if args.json {
                let json =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{json}");
            } else {
                print!("{}", render_card(&output));
            }
            if output.is_partial() && !quiet {
                eprintln!("{}", red("Enrichment failed; showing the label reading only."));
            } else if !quiet && !args.json {
                eprintln!("{}", dim(&format!("{}ms total", output.stats.total_ms)));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprint!("{}", render_failure(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}
