//! Issuance and redemption of single-use codes.
//!
//! - [`DerivationScheme`] turns an identity and a [`CodeKind`] into a code
//! - [`CodeStore`] persists codes with insert-if-absent semantics
//! - [`RedemptionGuard`] claims a code exactly once
//! - [`Issuer`] ties derivation, storage and best-effort private delivery
//!   together for a trigger event
//!
//! Every store call is bounded by the store timeout. Mutual exclusion for
//! claims lives in the store's conditional update, never in process memory.

mod delivery;
mod derivation;
mod error;
mod guard;
mod issuer;
mod store;

pub use delivery::{render_message, DeliveryChannel, DeliveryOutcome, DisabledDelivery};
pub use derivation::{derive_code, DerivationScheme, CODE_LEN};
pub use error::{DeliveryError, EngineError, EngineResult};
pub use guard::RedemptionGuard;
pub use issuer::{Issuance, Issuer};
pub use redeem_database::{ClaimOutcome, CodeKind, CodeRecord, IssuanceStatus};
pub use store::CodeStore;
