//! Claim endpoints.
//!
//! A code that was never issued and a code that was already redeemed both
//! answer `200 {"result": false}`. Callers cannot tell the two apart; the
//! difference is only visible in the service logs.

use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use redemption_engine::{CodeKind, EngineError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

pub const INVALID_CODE_MESSAGE: &str = "Invalid or missing code.";
pub const STORE_ERROR_MESSAGE: &str = "Database error.";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimResponse {
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClaimResponse {
    fn outcome(result: bool) -> Self {
        Self {
            result,
            message: None,
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            result: false,
            message: Some(message.to_string()),
        }
    }
}

/// Pull a non-empty string `code` out of an arbitrary JSON body.
fn extract_code(body: Result<Json<Value>, JsonRejection>) -> Option<String> {
    let Json(value) = body.ok()?;
    match value.get("code") {
        Some(Value::String(code)) if !code.is_empty() => Some(code.clone()),
        _ => None,
    }
}

async fn claim(
    state: AppState,
    kind: CodeKind,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<ClaimResponse>) {
    let Some(code) = extract_code(body) else {
        debug!(kind = %kind, "Rejected claim with invalid body");
        return (
            StatusCode::BAD_REQUEST,
            Json(ClaimResponse::failure(INVALID_CODE_MESSAGE)),
        );
    };

    match state.guard.claim(&code, kind).await {
        Ok(outcome) => (StatusCode::OK, Json(ClaimResponse::outcome(outcome.success()))),
        Err(EngineError::InvalidInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ClaimResponse::failure(INVALID_CODE_MESSAGE)),
        ),
        Err(e) => {
            error!(kind = %kind, error = %e, "Claim failed on store");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ClaimResponse::failure(STORE_ERROR_MESSAGE)),
            )
        }
    }
}

pub(crate) async fn claim_beta(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<ClaimResponse>) {
    claim(state, CodeKind::Beta, body).await
}

pub(crate) async fn claim_verify(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<ClaimResponse>) {
    claim(state, CodeKind::Verify, body).await
}
