//! Pass B: explain the wine.
//!
//! Text-only. The prompt carries the extracted record verbatim as JSON and
//! asks for inferred context, flagged as such. The result never touches the
//! extracted record; it only adds an [`EnrichedRecord`] next to it.

use crate::config::AnalysisConfig;
use crate::error::{Stage, WineLabelError};
use crate::pipeline::client::{ModelClient, ModelRequest};
use crate::pipeline::sanitize::parse_model_object;
use crate::prompts::enrichment_prompt;
use crate::record::{EnrichedRecord, ExtractedRecord};
use tracing::debug;

/// Run the enrichment pass over an extraction result.
pub async fn enrich(
    client: &dyn ModelClient,
    extracted: &ExtractedRecord,
    config: &AnalysisConfig,
) -> Result<EnrichedRecord, WineLabelError> {
    let extracted_json = serde_json::to_string_pretty(extracted)
        .map_err(|e| WineLabelError::Internal(format!("serialising extraction: {e}")))?;

    let request = ModelRequest {
        model: config.model.clone(),
        max_tokens: config.enrichment_max_tokens,
        temperature: config.temperature,
        prompt: enrichment_prompt(&extracted_json),
        image: None,
    };

    let raw = client.complete(&request).await?;
    debug!("Enrichment reply: {} chars from {}", raw.len(), client.name());

    parse_model_object::<EnrichedRecord>(&raw).map_err(|e| WineLabelError::UnparsableOutput {
        stage: Stage::Enrichment,
        detail: e.to_string(),
        raw,
    })
}
