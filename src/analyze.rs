//! Analysis entry points: compose the passes and decide how failures surface.
//!
//! Extraction and enrichment are plain functions over explicit inputs
//! ([`crate::pipeline::extract::extract`] and
//! [`crate::pipeline::enrich::enrich`]). This module is the only place that
//! sequences them and applies the reporting policy:
//!
//! * extraction failure is fatal (`Err`), carrying the raw material;
//! * enrichment failure is partial success: the extracted record is kept and
//!   the failure is stored in [`AnalysisOutput::enrichment_error`].
//!
//! The two calls are strictly sequential since Pass B consumes Pass A.

use crate::config::AnalysisConfig;
use crate::error::{Stage, StageError, WineLabelError};
use crate::pipeline::client::{AnthropicClient, AnthropicSettings, ModelClient, ProviderClient};
use crate::pipeline::prepare::{self, PreparedImage};
use crate::pipeline::{enrich, extract};
use crate::record::{AnalysisOutput, AnalysisStats};
use edgequake_llm::ProviderFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Analyse an already-prepared image.
///
/// # Errors
/// Returns `Err` when no client can be resolved (e.g. missing API key) or
/// when the extraction pass fails. Enrichment failures are reported inside
/// the `Ok` value.
pub async fn analyze(
    image: &PreparedImage,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, WineLabelError> {
    let client = resolve_client(config)?;
    analyze_with(client.as_ref(), image, config).await
}

/// Read, prepare and analyse an image file.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, WineLabelError> {
    // Resolve first so a missing credential fails before any image work.
    let client = resolve_client(config)?;

    notify_start(config, Stage::Prepare);
    let start = Instant::now();
    let image = match prepare::prepare_file(path, config).await {
        Ok(image) => image,
        Err(e) => {
            notify_error(config, Stage::Prepare, &e);
            return Err(e);
        }
    };
    notify_complete(config, Stage::Prepare, start);

    analyze_with(client.as_ref(), &image, config).await
}

/// Prepare and analyse in-memory image bytes.
pub async fn analyze_bytes(
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, WineLabelError> {
    let client = resolve_client(config)?;
    let image = prepare::prepare_image(bytes, config)?;
    analyze_with(client.as_ref(), &image, config).await
}

/// Run the configured passes against an explicit client.
pub async fn analyze_with(
    client: &dyn ModelClient,
    image: &PreparedImage,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, WineLabelError> {
    let total_start = Instant::now();
    info!(
        "Starting analysis via {} ({}, {:?})",
        client.name(),
        config.model,
        config.mode
    );

    // ── Pass A ───────────────────────────────────────────────────────────
    notify_start(config, Stage::Extraction);
    let extraction_start = Instant::now();
    let extracted = match extract::extract(client, image, config).await {
        Ok(record) => record,
        Err(e) => {
            notify_error(config, Stage::Extraction, &e);
            return Err(e);
        }
    };
    let extraction_ms = elapsed_ms(extraction_start);
    notify_complete(config, Stage::Extraction, extraction_start);

    let mut output = AnalysisOutput {
        extracted,
        enriched: None,
        enrichment_error: None,
        raw: None,
        stats: AnalysisStats {
            extraction_ms,
            enrichment_ms: None,
            total_ms: 0,
        },
    };

    // ── Pass B ───────────────────────────────────────────────────────────
    if config.mode.enriches() {
        notify_start(config, Stage::Enrichment);
        let enrichment_start = Instant::now();
        match enrich::enrich(client, &output.extracted, config).await {
            Ok(enriched) => {
                output.enriched = Some(enriched);
                notify_complete(config, Stage::Enrichment, enrichment_start);
            }
            Err(e) => {
                warn!("Enrichment failed, keeping extraction: {}", e);
                notify_error(config, Stage::Enrichment, &e);
                output.enrichment_error = Some(StageError::from_fatal(Stage::Enrichment, &e));
                output.raw = Some(
                    e.raw_material()
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string()),
                );
            }
        }
        output.stats.enrichment_ms = Some(elapsed_ms(enrichment_start));
    }

    output.stats.total_ms = elapsed_ms(total_start);
    info!(
        "Analysis complete in {}ms{}",
        output.stats.total_ms,
        if output.is_partial() { " (enrichment failed)" } else { "" }
    );
    Ok(output)
}

/// Resolve the model client, from most-specific to least-specific.
///
/// 1. **Injected client** (`config.client`): used as-is; this is how tests
///    and embedding applications supply their own transport.
/// 2. **Injected edgequake-llm provider** (`config.provider`).
/// 3. **Named edgequake-llm provider** (`config.provider_name`) built with
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    key from the environment.
/// 4. **Built-in Anthropic client** from `config.api_key`; fails with
///    [`WineLabelError::MissingApiKey`] when none is set.
pub fn resolve_client(config: &AnalysisConfig) -> Result<Arc<dyn ModelClient>, WineLabelError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderClient::new(Arc::clone(provider))));
    }

    if let Some(ref name) = config.provider_name {
        let provider = ProviderFactory::create_llm_provider(name, &config.model).map_err(|e| {
            WineLabelError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderClient::new(provider)));
    }

    let client = AnthropicClient::new(AnthropicSettings::from_config(config))?;
    Ok(Arc::new(client))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn notify_start(config: &AnalysisConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn notify_complete(config: &AnalysisConfig, stage: Stage, start: Instant) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms(start));
    }
}

fn notify_error(config: &AnalysisConfig, stage: Stage, error: &WineLabelError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_error(stage, &error.to_string());
    }
}
