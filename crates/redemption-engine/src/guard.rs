//! Exactly-once redemption.

use crate::{ClaimOutcome, CodeKind, CodeStore, EngineError, EngineResult};
use tracing::info;

/// Claims codes. Holds no state of its own; exclusivity is the store's
/// conditional update.
#[derive(Clone)]
pub struct RedemptionGuard {
    store: CodeStore,
}

impl RedemptionGuard {
    pub fn new(store: CodeStore) -> Self {
        Self { store }
    }

    /// Claim `code` in the `kind` namespace.
    ///
    /// An empty code is rejected before the store is touched. A code that was
    /// never issued and a code that was already used are both non-error
    /// outcomes; callers that must not leak which one happened should only
    /// look at [`ClaimOutcome::success`].
    pub async fn claim(&self, code: &str, kind: CodeKind) -> EngineResult<ClaimOutcome> {
        if code.is_empty() {
            return Err(EngineError::InvalidInput("code must be a non-empty string".to_string()));
        }

        let outcome = self.store.claim(code, kind).await?;
        info!(
            kind = %kind,
            code = %redact(code),
            outcome = outcome.as_str(),
            "Claim processed"
        );
        Ok(outcome)
    }
}

/// Keep enough of a code in logs to correlate, not enough to redeem.
pub(crate) fn redact(code: &str) -> String {
    let visible: String = code.chars().take(4).collect();
    format!("{visible}...")
}
