//! Public completion API

use crate::bootstrap::{AppState, SERVICE_NAME};
use aegis_pipeline::{GatewayRequest, ProcessingResult};
use aegis_routing::RoutingStrategy;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Request body for `POST /api/v1/completions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequestDto {
    pub query: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub model: Option<String>,
    pub routing_strategy: Option<RoutingStrategy>,

    #[serde(default = "default_true")]
    pub enable_optimization: bool,

    #[serde(default = "default_true")]
    pub enable_cache: bool,
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

impl CompletionRequestDto {
    fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.max_tokens == 0 || self.max_tokens > 4096 {
            return Err(format!(
                "maxTokens must be between 1 and 4096, got {}",
                self.max_tokens
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("temperature must be between 0.0 and 2.0, got {t}"));
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("topP must be between 0.0 and 1.0, got {p}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponseDto {
    pub request_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    pub latency_ms: u64,
    pub from_cache: bool,
    pub optimization_applied: bool,
    pub tokens_saved: usize,
    pub reduction_percentage: f32,
    pub pii_detected: bool,
    pub pii_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

impl CompletionResponseDto {
    fn error_response(request_id: Option<Uuid>, error: &str, error_type: &str) -> Self {
        Self {
            request_id,
            text: None,
            success: false,
            error: Some(error.to_string()),
            error_type: Some(error_type.to_string()),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    fn from_result(result: ProcessingResult) -> Self {
        let metadata = ResponseMetadata {
            model_used: result.routing.as_ref().map(|r| r.model_id.clone()),
            complexity_level: result.complexity.as_ref().map(|c| c.level.to_string()),
            input_tokens: result.provider_response.as_ref().map(|p| p.input_tokens),
            output_tokens: result.provider_response.as_ref().map(|p| p.output_tokens),
            total_tokens: result.provider_response.as_ref().map(|p| p.total_tokens()),
            latency_ms: result.total_latency_ms,
            from_cache: result.from_cache,
            optimization_applied: result
                .optimization
                .as_ref()
                .map(|o| o.applied)
                .unwrap_or(false),
            tokens_saved: result
                .optimization
                .as_ref()
                .map(|o| o.tokens_saved())
                .unwrap_or(0),
            reduction_percentage: result
                .optimization
                .as_ref()
                .map(|o| o.reduction_percentage())
                .unwrap_or(0.0),
            pii_detected: result.sv_detected,
            pii_count: result.sv_count,
            estimated_cost: result.estimated_cost,
        };

        Self {
            request_id: Some(result.request_id),
            text: result.response_text,
            success: result.success,
            error: result.error,
            error_type: result.error_type,
            timestamp: Utc::now(),
            metadata: Some(metadata),
        }
    }
}

/// `POST /api/v1/completions`
pub async fn completions(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequestDto>, JsonRejection>,
) -> Response {
    let Json(dto) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed completion request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(CompletionResponseDto::error_response(
                    None,
                    &format!("Invalid request: {rejection}"),
                    "VALIDATION_ERROR",
                )),
            )
                .into_response();
        }
    };

    if let Err(message) = dto.validate() {
        warn!(%message, "Completion request failed validation");
        return (
            StatusCode::BAD_REQUEST,
            Json(CompletionResponseDto::error_response(
                None,
                &message,
                "VALIDATION_ERROR",
            )),
        )
            .into_response();
    }

    let request = GatewayRequest {
        query: dto.query,
        max_tokens: dto.max_tokens,
        temperature: dto.temperature,
        top_p: dto.top_p,
        model: dto.model,
        routing_strategy: dto.routing_strategy,
        enable_optimization: dto.enable_optimization,
        enable_cache: dto.enable_cache,
    };

    let result = state.pipeline.process(request).await;
    let status = if result.success {
        StatusCode::OK
    } else if result.error_type.as_deref() == Some("VALIDATION_ERROR") {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    info!(
        request_id = %result.request_id,
        status = status.as_u16(),
        "Completion request finished"
    );
    (status, Json(CompletionResponseDto::from_result(result))).into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// `GET /api/v1/health`
pub async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        status: "UP",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
