//! Engine error types.

use redeem_database::DatabaseError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by issuance and redemption.
///
/// A claim that finds no unused code is not an error; it is reported as a
/// [`crate::ClaimOutcome`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// Caller supplied an unusable value; the store was not consulted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The store reported a driver or connection failure.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),

    /// The store did not answer within the configured bound.
    #[error("Store operation timed out after {0:?}")]
    StoreTimeout(Duration),
}

impl EngineError {
    /// True for every failure that originates in the store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout(_))
    }
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Private delivery failures. Never propagated past the issuer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// No delivery channel is configured.
    #[error("Delivery is not configured")]
    NotConfigured,

    /// The relay could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The relay answered but refused the message.
    #[error("Delivery rejected with status {status}")]
    Rejected { status: u16 },
}
