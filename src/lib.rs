//! # winelabel
//!
//! Photograph a wine label, let a Vision Language Model read it, and get a
//! structured card back.
//!
//! ## Two passes, two kinds of data
//!
//! A label carries a handful of hard facts (producer, vintage, appellation,
//! ABV) and a model knows a lot of soft context (typical style, pairings,
//! drinking window). Mixing them in one answer makes guesses look like
//! label facts. So the analysis runs in two passes:
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Prepare  decode, downscale to ≤1280 px, JPEG q82, base64
//!  ├─ 2. Pass A   image + strict prompt → label-grounded JSON (null if not printed)
//!  ├─ 3. Pass B   Pass A JSON as text → inferred context, flagged as typical
//!  └─ 4. Render   Markdown card, "—" for anything unknown
//! ```
//!
//! Every reply goes through [`pipeline::sanitize`] to drop stray code fences
//! before parsing. If Pass A's reply is not JSON the analysis fails with the
//! raw text attached; if only Pass B's is not, the Pass A record is still
//! returned alongside an enrichment error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use winelabel::{analyze_file, render::render_card, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .api_key(std::env::var("ANTHROPIC_API_KEY")?)
//!         .build()?;
//!     let output = analyze_file("label.jpg", &config).await?;
//!     println!("{}", render_card(&output));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `winelabel` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | [`server`] module: `POST /api/analyze` on axum |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod render;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_bytes, analyze_file, analyze_with, resolve_client};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, PipelineMode};
pub use error::{Stage, StageError, WineLabelError};
pub use pipeline::client::{AnthropicClient, AnthropicSettings, ModelClient, ModelRequest, ProviderClient};
pub use pipeline::prepare::PreparedImage;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{AnalysisOutput, AnalysisStats, EnrichedRecord, ExtractedRecord, ServingGuidance, TastingNotes};
