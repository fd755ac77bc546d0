//! Trigger-side issuance: derive, persist, deliver.

use crate::guard::redact;
use crate::{
    render_message, CodeKind, CodeStore, DeliveryChannel, DeliveryOutcome, DerivationScheme,
    EngineError, EngineResult, IssuanceStatus,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuance {
    pub kind: CodeKind,
    pub code: String,
    pub status: IssuanceStatus,
    pub delivery: DeliveryOutcome,
}

/// Handles issue requests for identities.
#[derive(Clone)]
pub struct Issuer {
    scheme: DerivationScheme,
    store: CodeStore,
    delivery: Arc<dyn DeliveryChannel>,
}

impl Issuer {
    pub fn new(scheme: DerivationScheme, store: CodeStore, delivery: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            scheme,
            store,
            delivery,
        }
    }

    /// Issue the code for `identity` in `kind` and try to deliver it.
    ///
    /// The record is persisted before delivery is attempted. A delivery
    /// failure is reported in [`Issuance::delivery`] and never turns into an
    /// error; issuing again for the same identity re-derives the same code
    /// and leaves the store unchanged.
    pub async fn issue(&self, identity: &str, kind: CodeKind) -> EngineResult<Issuance> {
        if identity.is_empty() {
            return Err(EngineError::InvalidInput("identity must be a non-empty string".to_string()));
        }

        let code = self.scheme.derive(identity, kind);
        let status = self.store.ensure_issued(&code, kind).await?;

        let message = render_message(kind, &code);
        let delivery = DeliveryOutcome::from_result(self.delivery.send(identity, kind, &message).await);

        match &delivery {
            DeliveryOutcome::Delivered => info!(
                kind = %kind,
                code = %redact(&code),
                status = ?status,
                "Code issued and delivered"
            ),
            DeliveryOutcome::Skipped => warn!(
                kind = %kind,
                code = %redact(&code),
                status = ?status,
                "Code issued, delivery not configured"
            ),
            DeliveryOutcome::Failed { reason } => warn!(
                kind = %kind,
                code = %redact(&code),
                status = ?status,
                reason = %reason,
                "Code issued, delivery failed"
            ),
        }

        Ok(Issuance {
            kind,
            code,
            status,
            delivery,
        })
    }
}
