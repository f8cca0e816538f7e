use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use phono_core::format::ParameterSpec;
use phono_core::SanitizedConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::metrics::encode_metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct FormatResponse {
    pub name: &'static str,
    pub extensions: Vec<&'static str>,
    pub content_type: &'static str,
    pub encodable: bool,
    /// Upload ceiling in bytes; absent when unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_input_bytes: Option<u64>,
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Serialize)]
pub struct FormatListResponse {
    pub formats: Vec<FormatResponse>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/formats
///
/// Registered formats with their extensions and encoder parameter domains.
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatListResponse> {
    let formats = state
        .registry()
        .formats()
        .iter()
        .map(|format| FormatResponse {
            name: format.name(),
            extensions: format.extensions().to_vec(),
            content_type: format.content_type(),
            encodable: format.is_encodable(),
            max_input_bytes: state.limits().limit_for(format.name()),
            parameters: format
                .domain()
                .map(|domain| domain.parameters())
                .unwrap_or_default(),
        })
        .collect();

    Json(FormatListResponse { formats })
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to encode metrics".to_string(),
                }),
            )
                .into_response()
        }
    }
}
