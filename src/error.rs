//! Error types for the winelabel library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`WineLabelError`] is **fatal**. The analysis cannot produce a label
//!   reading at all (image does not decode, no credential configured, the
//!   provider rejected the extraction call, the extraction output is not
//!   JSON). Returned as `Err(WineLabelError)` from the `analyze*` functions.
//!
//! * [`StageError`] is **non-fatal**. The enrichment pass failed but the
//!   extraction already succeeded. Stored inside
//!   [`crate::record::AnalysisOutput`] so callers keep the label reading
//!   instead of losing it to the second call.
//!
//! Every variant that originates upstream keeps the raw material (response
//! body or model text) so a failure can be diagnosed by hand.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The model-backed stages of an analysis, plus image preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Decode, downscale and re-encode the photo.
    Prepare,
    /// Pass A: read only what is printed on the label.
    Extraction,
    /// Pass B: contextual, explicitly inferred explanation.
    Enrichment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::Extraction => "extraction",
            Stage::Enrichment => "enrichment",
        };
        f.write_str(name)
    }
}

/// All fatal errors returned by the winelabel library.
///
/// Enrichment failures use [`StageError`] and are stored in
/// [`crate::record::AnalysisOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum WineLabelError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required request field is missing, blank, or the body is malformed.
    #[error("Invalid request: {detail}")]
    InvalidRequest { detail: String },

    /// Image file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Image file exists but could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a decodable image.
    #[error("Could not decode image: {detail}")]
    ImageDecode { detail: String },

    /// Re-encoding the downscaled image as JPEG failed.
    #[error("Could not encode image as JPEG: {detail}")]
    ImageEncode { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key was configured for the default model client.
    #[error("Missing API key for the model provider.\n{hint}")]
    MissingApiKey { hint: String },

    /// A named edgequake-llm provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The request never got a response (DNS, TLS, connection reset, ...).
    #[error("Model request failed: {detail}")]
    Transport { detail: String },

    /// The provider answered with a non-success HTTP status.
    #[error("Model provider returned HTTP {status}")]
    Upstream { status: u16, body: String },

    /// The provider answered 2xx but without any text content block.
    #[error("Model response contained no text content")]
    EmptyResponse { body: String },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// The model's text is not valid JSON after sanitisation.
    ///
    /// `raw` is the model text exactly as received.
    #[error("Model {stage} output was not valid JSON: {detail}")]
    UnparsableOutput {
        stage: Stage,
        detail: String,
        raw: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WineLabelError {
    /// HTTP status this error maps to at the inbound endpoint.
    pub fn http_status(&self) -> u16 {
        match self {
            WineLabelError::InvalidRequest { .. }
            | WineLabelError::FileNotFound { .. }
            | WineLabelError::ImageDecode { .. } => 400,
            WineLabelError::Transport { .. }
            | WineLabelError::Upstream { .. }
            | WineLabelError::EmptyResponse { .. }
            | WineLabelError::UnparsableOutput { .. } => 502,
            WineLabelError::ReadFailed { .. }
            | WineLabelError::ImageEncode { .. }
            | WineLabelError::MissingApiKey { .. }
            | WineLabelError::ProviderNotConfigured { .. }
            | WineLabelError::InvalidConfig(_)
            | WineLabelError::Internal(_) => 500,
        }
    }

    /// Raw upstream material kept for manual diagnosis, if any.
    pub fn raw_material(&self) -> Option<&str> {
        match self {
            WineLabelError::Upstream { body, .. } | WineLabelError::EmptyResponse { body } => {
                Some(body)
            }
            WineLabelError::UnparsableOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// A non-fatal failure of the enrichment pass.
///
/// Stored alongside the extracted record in
/// [`crate::record::AnalysisOutput`]; the label reading is still returned.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    /// The model answered but its text is not the expected JSON.
    #[error("{stage} output was not valid JSON: {detail}")]
    Unparsable { stage: Stage, detail: String },

    /// The model call itself failed (status, transport, empty body).
    #[error("{stage} call failed: {detail}")]
    CallFailed { stage: Stage, detail: String },
}

impl StageError {
    /// Downgrade a fatal error raised by `stage` into a stored stage error.
    pub fn from_fatal(stage: Stage, err: &WineLabelError) -> Self {
        match err {
            WineLabelError::UnparsableOutput { detail, .. } => StageError::Unparsable {
                stage,
                detail: detail.clone(),
            },
            other => StageError::CallFailed {
                stage,
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        let bad_input = WineLabelError::InvalidRequest {
            detail: "imageBase64 is required".into(),
        };
        assert_eq!(bad_input.http_status(), 400);

        let no_key = WineLabelError::MissingApiKey { hint: "set it".into() };
        assert_eq!(no_key.http_status(), 500);

        let upstream = WineLabelError::Upstream {
            status: 529,
            body: "{\"type\":\"error\"}".into(),
        };
        assert_eq!(upstream.http_status(), 502);

        let parse = WineLabelError::UnparsableOutput {
            stage: Stage::Extraction,
            detail: "expected value".into(),
            raw: "Sorry, I can't read this label.".into(),
        };
        assert_eq!(parse.http_status(), 502);
        assert_eq!(parse.raw_material(), Some("Sorry, I can't read this label."));
    }

    #[test]
    fn upstream_display_keeps_status() {
        let e = WineLabelError::Upstream {
            status: 401,
            body: "invalid x-api-key".into(),
        };
        assert!(e.to_string().contains("401"), "got: {e}");
        assert_eq!(e.raw_material(), Some("invalid x-api-key"));
    }

    #[test]
    fn stage_error_from_parse_failure() {
        let fatal = WineLabelError::UnparsableOutput {
            stage: Stage::Enrichment,
            detail: "trailing characters".into(),
            raw: "not json".into(),
        };
        let stored = StageError::from_fatal(Stage::Enrichment, &fatal);
        assert_eq!(
            stored,
            StageError::Unparsable {
                stage: Stage::Enrichment,
                detail: "trailing characters".into()
            }
        );
        assert!(stored.to_string().starts_with("enrichment output"));
    }

    #[test]
    fn stage_error_from_call_failure() {
        let fatal = WineLabelError::Transport {
            detail: "connection reset".into(),
        };
        let stored = StageError::from_fatal(Stage::Enrichment, &fatal);
        assert!(matches!(stored, StageError::CallFailed { .. }));
        assert!(stored.to_string().contains("connection reset"));
    }
}
