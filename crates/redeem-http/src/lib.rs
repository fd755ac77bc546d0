//! HTTP surface of the redemption service.
//!
//! | route                                | purpose                              |
//! |--------------------------------------|--------------------------------------|
//! | `POST /claim-beta`, `/api/claim`     | claim a beta code                    |
//! | `POST /claim-verify`, `/api/verify`  | claim a verification code            |
//! | `POST /issue`                        | trigger issuance (only with a token) |
//! | `GET /healthz`                       | store reachability                   |

mod claim;
mod health;
mod issue;

use axum::routing::{get, post};
use axum::Router;
use redemption_engine::{CodeStore, Issuer, RedemptionGuard};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use claim::{ClaimResponse, INVALID_CODE_MESSAGE, STORE_ERROR_MESSAGE};
pub use issue::{IssueRequest, IssueResponse};

/// Shared handler state. Every field is a cheap handle onto the one store.
#[derive(Clone)]
pub struct AppState {
    pub store: CodeStore,
    pub guard: RedemptionGuard,
    pub issuer: Issuer,
    /// Bearer token for `POST /issue`; the route is absent without it.
    pub trigger_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: CodeStore, issuer: Issuer, trigger_token: Option<String>) -> Self {
        Self {
            guard: RedemptionGuard::new(store.clone()),
            store,
            issuer,
            trigger_token: trigger_token.map(Arc::from),
        }
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/claim-beta", post(claim::claim_beta))
        .route("/api/claim", post(claim::claim_beta))
        .route("/claim-verify", post(claim::claim_verify))
        .route("/api/verify", post(claim::claim_verify))
        .route("/healthz", get(health::healthz));

    if state.trigger_token.is_some() {
        app = app.route("/issue", post(issue::issue));
    }

    app.with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let trigger_enabled = state.trigger_token.is_some();
    info!(addr = %addr, trigger_enabled, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
