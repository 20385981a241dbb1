//! HTTP endpoint for the analysis pipeline.
//!
//! `POST /api/analyze` takes `{ "imageBase64": ..., "mediaType": ... }` and
//! answers with the label reading. Each request runs its own independent
//! flow; nothing is shared between requests except the read-only config.
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | both passes ok | 200 | `{extracted, enriched}` |
//! | enrichment failed | 200 | `{extracted, enrichment_error, raw}` |
//! | extraction not JSON | 502 | `{error, raw}` |
//! | provider error | 502 | `{error, details}` |
//! | bad request | 400 | `{error, details}` |
//! | body too large / not JSON content type | 413 / 415 | `{error, details}` |
//! | missing credential / internal | 500 | `{error, details}` |

use crate::analyze::{analyze_with, resolve_client};
use crate::config::AnalysisConfig;
use crate::error::WineLabelError;
use crate::pipeline::prepare::PreparedImage;
use crate::record::{EnrichedRecord, ExtractedRecord};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AnalysisConfig>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Inbound body. Fields are optional here so that a missing one is
/// reported as 400 by us rather than 422 by the extractor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_base64: Option<String>,
    pub media_type: Option<String>,
}

/// Successful (possibly partial) response body.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub extracted: ExtractedRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched: Option<EnrichedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Everything the handler can fail with, rendered as an HTTP response.
pub enum ApiError {
    /// An analysis or validation error; status from [`WineLabelError::http_status`].
    Analysis(WineLabelError),
    /// A body the JSON extractor refused for reasons other than its content
    /// (too large, wrong content type). Keeps the extractor's status.
    Rejected(JsonRejection),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Analysis(err) => err,
            ApiError::Rejected(rejection) => {
                let status = rejection.status();
                warn!("Request body rejected with {}: {}", status, rejection.body_text());
                let body = ErrorBody {
                    error: "Request body rejected".into(),
                    details: Some(rejection.body_text()),
                    raw: None,
                };
                return (status, Json(body)).into_response();
            }
        };
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &err {
            WineLabelError::UnparsableOutput { raw, .. } => ErrorBody {
                error: err.to_string(),
                details: None,
                raw: Some(raw.clone()),
            },
            WineLabelError::InvalidRequest { detail } => ErrorBody {
                error: "Invalid request".into(),
                details: Some(detail.clone()),
                raw: None,
            },
            WineLabelError::MissingApiKey { hint } => ErrorBody {
                error: "Missing API key for the model provider".into(),
                details: Some(hint.clone()),
                raw: None,
            },
            WineLabelError::Transport { detail } => ErrorBody {
                error: err.to_string(),
                details: Some(detail.clone()),
                raw: None,
            },
            other => ErrorBody {
                error: other.to_string(),
                details: Some(
                    other
                        .raw_material()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{other:?}")),
                ),
                raw: None,
            },
        };

        if status.is_server_error() {
            error!("Request failed with {}: {}", status, body.error);
        } else {
            warn!("Request rejected with {}: {}", status, body.error);
        }
        (status, Json(body)).into_response()
    }
}

impl From<WineLabelError> for ApiError {
    fn from(e: WineLabelError) -> Self {
        ApiError::Analysis(e)
    }
}

/// Build the router. Exposed separately from [`serve`] so tests can drive it
/// in-process.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_request_bytes;
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
#[instrument(skip(config))]
pub async fn serve(addr: SocketAddr, config: AnalysisConfig) -> Result<(), WineLabelError> {
    let app = router(AppState::new(config));
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| WineLabelError::Internal(format!("binding {addr}: {e}")))?;
    info!("winelabel HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| WineLabelError::Internal(format!("server error: {e}")))
}

/// Handler for `POST /api/analyze`.
async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| match rejection {
        bad @ (JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_)) => {
            ApiError::from(WineLabelError::InvalidRequest {
                detail: bad.body_text(),
            })
        }
        other => ApiError::Rejected(other),
    })?;
    let image = validate(payload)?;

    // Credential problems surface here, before any outbound call.
    let client = resolve_client(&state.config)?;
    let output = analyze_with(client.as_ref(), &image, &state.config).await?;

    Ok(Json(AnalyzeResponse {
        extracted: output.extracted,
        enriched: output.enriched,
        enrichment_error: output.enrichment_error.map(|e| e.to_string()),
        raw: output.raw,
    }))
}

fn validate(req: AnalyzeRequest) -> Result<PreparedImage, WineLabelError> {
    let image = non_blank(req.image_base64).ok_or_else(|| WineLabelError::InvalidRequest {
        detail: "imageBase64 is required".into(),
    })?;
    let media_type = non_blank(req.media_type).ok_or_else(|| WineLabelError::InvalidRequest {
        detail: "mediaType is required".into(),
    })?;
    Ok(PreparedImage::from_base64(image, media_type))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_both_fields() {
        let missing_image = AnalyzeRequest {
            image_base64: None,
            media_type: Some("image/jpeg".into()),
        };
        assert!(validate(missing_image).is_err());

        let blank_type = AnalyzeRequest {
            image_base64: Some("QUJD".into()),
            media_type: Some(" ".into()),
        };
        let err = validate(blank_type).unwrap_err();
        assert!(err.to_string().contains("mediaType"));

        let ok = AnalyzeRequest {
            image_base64: Some("QUJD".into()),
            media_type: Some("image/png".into()),
        };
        assert_eq!(
            validate(ok).unwrap(),
            PreparedImage::from_base64("QUJD", "image/png")
        );
    }

    #[test]
    fn request_uses_camel_case() {
        let req: AnalyzeRequest =
            serde_json::from_str(r#"{"imageBase64":"QUJD","mediaType":"image/jpeg"}"#).unwrap();
        assert_eq!(req.image_base64.as_deref(), Some("QUJD"));
        assert_eq!(req.media_type.as_deref(), Some("image/jpeg"));
    }
}
