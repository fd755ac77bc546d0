//! Trigger endpoint used by the chat-platform bot.
//!
//! The response never carries the code; it only reaches the identity
//! through private delivery.

use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use redemption_engine::{CodeKind, EngineError};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueRequest {
    pub identity: String,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueResponse {
    pub issued: bool,
    /// True when this request created the record.
    #[serde(default)]
    pub created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IssueResponse {
    fn failure(message: &str) -> Self {
        Self {
            issued: false,
            created: false,
            delivery: None,
            message: Some(message.to_string()),
        }
    }
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|presented| bool::from(presented.as_bytes().ct_eq(token.as_bytes())))
}

pub(crate) async fn issue(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> (StatusCode, Json<IssueResponse>) {
    let permitted = state
        .trigger_token
        .as_deref()
        .is_some_and(|token| authorized(&headers, token));
    if !permitted {
        warn!("Rejected issue request with bad credentials");
        return (
            StatusCode::UNAUTHORIZED,
            Json(IssueResponse::failure("Unauthorized.")),
        );
    }

    let Ok(Json(request)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(IssueResponse::failure("Invalid request body.")),
        );
    };
    let Some(kind) = CodeKind::parse(&request.kind) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(IssueResponse::failure("Unknown code kind.")),
        );
    };

    match state.issuer.issue(&request.identity, kind).await {
        Ok(issuance) => (
            StatusCode::OK,
            Json(IssueResponse {
                issued: true,
                created: issuance.status.is_created(),
                delivery: Some(issuance.delivery.as_str().to_string()),
                message: None,
            }),
        ),
        Err(EngineError::InvalidInput(reason)) => {
            (StatusCode::BAD_REQUEST, Json(IssueResponse::failure(&reason)))
        }
        Err(e) => {
            error!(kind = %kind, error = %e, "Issue failed on store");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IssueResponse::failure(crate::STORE_ERROR_MESSAGE)),
            )
        }
    }
}
