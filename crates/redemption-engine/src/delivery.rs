//! Private delivery of issued codes.

use crate::{CodeKind, DeliveryError};
use async_trait::async_trait;

/// Out-of-band private message channel to an identity.
///
/// Implementations make a single attempt; the issuer never retries. A
/// repeated trigger for the same identity re-derives the same code and is
/// the retry path.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, identity: &str, kind: CodeKind, message: &str) -> Result<(), DeliveryError>;
}

/// Channel used when no relay is configured.
pub struct DisabledDelivery;

#[async_trait]
impl DeliveryChannel for DisabledDelivery {
    async fn send(&self, _identity: &str, _kind: CodeKind, _message: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::NotConfigured)
    }
}

/// What happened to the private message. Independent of issuance success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { reason: String },
    /// No channel configured; nothing was attempted.
    Skipped,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn from_result(result: Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(DeliveryError::NotConfigured) => Self::Skipped,
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Private message text for a freshly derived code.
pub fn render_message(kind: CodeKind, code: &str) -> String {
    match kind {
        CodeKind::Beta => format!(
            "Here's your beta pre-release code: **{code}**\n\n\
             *This code is redeemable once per account. Do not share it with anyone.*"
        ),
        CodeKind::Verify => format!(
            "Here's your verification code: **{code}**\n\n\
             *This code is one time use and expires once redeemed. Do not share it with anyone.*"
        ),
    }
}
