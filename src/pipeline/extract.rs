//! Pass A: read the label.
//!
//! Sends the photo with [`EXTRACTION_PROMPT`] and decodes the reply into an
//! [`ExtractedRecord`]. When the reply is not JSON the raw text is kept in
//! [`WineLabelError::UnparsableOutput`] exactly as the model sent it.

use crate::config::AnalysisConfig;
use crate::error::{Stage, WineLabelError};
use crate::pipeline::client::{ModelClient, ModelRequest};
use crate::pipeline::prepare::PreparedImage;
use crate::pipeline::sanitize::parse_model_object;
use crate::prompts::EXTRACTION_PROMPT;
use crate::record::ExtractedRecord;
use tracing::debug;

/// Run the extraction pass over one prepared image.
pub async fn extract(
    client: &dyn ModelClient,
    image: &PreparedImage,
    config: &AnalysisConfig,
) -> Result<ExtractedRecord, WineLabelError> {
    let request = ModelRequest {
        model: config.model.clone(),
        max_tokens: config.extraction_max_tokens,
        temperature: config.temperature,
        prompt: EXTRACTION_PROMPT.to_string(),
        image: Some(image.clone()),
    };

    let raw = client.complete(&request).await?;
    debug!("Extraction reply: {} chars from {}", raw.len(), client.name());

    parse_model_object::<ExtractedRecord>(&raw).map_err(|e| WineLabelError::UnparsableOutput {
        stage: Stage::Extraction,
        detail: e.to_string(),
        raw,
    })
}
