//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace a code belongs to. Kinds never share codes even when the
/// strings coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Beta,
    Verify,
}

impl CodeKind {
    pub const ALL: [CodeKind; 2] = [CodeKind::Beta, CodeKind::Verify];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beta => "beta",
            Self::Verify => "verify",
        }
    }

    /// Strict parse; unknown kinds are rejected rather than defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beta" => Some(Self::Beta),
            "verify" => Some(Self::Verify),
            _ => None,
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Code record - one issued code in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub kind: CodeKind,
    pub code: String,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Result of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceStatus {
    /// This call created the record.
    Created,
    /// A record for (kind, code) already existed; nothing was written.
    AlreadyIssued,
}

impl IssuanceStatus {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Result of a conditional claim.
///
/// Only `Claimed` is a success. The two misses are told apart for logging;
/// the decision itself is made by the conditional update alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOutcome {
    Claimed,
    AlreadyUsed,
    NotIssued,
}

impl ClaimOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Claimed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::AlreadyUsed => "already_used",
            Self::NotIssued => "not_issued",
        }
    }
}
