//! Deterministic code derivation.
//!
//! The same (identity, kind) always yields the same code, which is what makes
//! re-issuance after a failed delivery a no-op instead of a second record.

use crate::CodeKind;
use hkdf::Hkdf;
use sha2::{Digest, Sha256};

/// Length of every code, in lowercase hex characters.
pub const CODE_LEN: usize = 12;

/// How codes are derived from identities.
#[derive(Clone)]
pub enum DerivationScheme {
    /// Truncated SHA-256 of the identity.
    ///
    /// Verify codes are the character reversal of the beta code for the same
    /// identity, so the two namespaces are trivially correlated. Kept because
    /// codes already handed out were derived this way.
    Legacy,
    /// HKDF-SHA256 with the secret as salt and a per-kind info label. The two
    /// namespaces are independent and codes cannot be recomputed without the
    /// secret.
    Keyed { secret: Vec<u8> },
}

impl std::fmt::Debug for DerivationScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => f.write_str("Legacy"),
            Self::Keyed { .. } => f.write_str("Keyed { secret: <redacted> }"),
        }
    }
}

impl DerivationScheme {
    pub fn keyed(secret: impl Into<Vec<u8>>) -> Self {
        Self::Keyed {
            secret: secret.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Keyed { .. } => "keyed",
        }
    }

    /// Derive the code for an identity. Total: any identity, including the
    /// empty string, yields a 12-character lowercase hex code.
    pub fn derive(&self, identity: &str, kind: CodeKind) -> String {
        match self {
            Self::Legacy => derive_code(identity, kind),
            Self::Keyed { secret } => derive_keyed(secret, identity, kind),
        }
    }
}

/// Legacy derivation.
pub fn derive_code(identity: &str, kind: CodeKind) -> String {
    let beta = truncated_sha256_hex(identity);
    match kind {
        CodeKind::Beta => beta,
        CodeKind::Verify => beta.chars().rev().collect(),
    }
}

fn truncated_sha256_hex(identity: &str) -> String {
    let mut hex = hex::encode(Sha256::digest(identity.as_bytes()));
    // A 256-bit digest is 64 hex chars; the pad only matters if that changes.
    while hex.len() < CODE_LEN {
        hex.push('0');
    }
    hex.truncate(CODE_LEN);
    hex
}

fn info_label(kind: CodeKind) -> &'static [u8] {
    match kind {
        CodeKind::Beta => b"redeem-code-beta-v1",
        CodeKind::Verify => b"redeem-code-verify-v1",
    }
}

fn derive_keyed(secret: &[u8], identity: &str, kind: CodeKind) -> String {
    let hkdf = Hkdf::<Sha256>::new(Some(secret), identity.as_bytes());
    let mut okm = [0u8; CODE_LEN / 2];
    match hkdf.expand(info_label(kind), &mut okm) {
        Ok(()) => hex::encode(okm),
        // HKDF-SHA256 only refuses outputs longer than 255 * 32 bytes.
        Err(_) => unreachable!("HKDF-SHA256 cannot reject a {}-byte output", okm.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_code(s: &str) -> bool {
        s.len() == CODE_LEN && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    #[test]
    fn legacy_matches_known_vectors() {
        assert_eq!(derive_code("U1", CodeKind::Beta), "316ca0efda62");
        assert_eq!(derive_code("U1", CodeKind::Verify), "26adfe0ac613");
        assert_eq!(
            derive_code("123456789012345678", CodeKind::Beta),
            "37f96542b663"
        );
    }

    #[test]
    fn empty_identity_has_defined_code() {
        assert_eq!(derive_code("", CodeKind::Beta), "e3b0c44298fc");
        assert_eq!(derive_code("", CodeKind::Verify), "cf89244c0b3e");
        assert!(is_code(&DerivationScheme::keyed("k").derive("", CodeKind::Beta)));
    }

    #[test]
    fn derivation_is_deterministic() {
        let schemes = [DerivationScheme::Legacy, DerivationScheme::keyed("pepper")];
        for scheme in &schemes {
            for identity in ["U1", "someone@example", "", "ünïcødé"] {
                for kind in CodeKind::ALL {
                    let first = scheme.derive(identity, kind);
                    assert_eq!(first, scheme.derive(identity, kind));
                    assert!(is_code(&first), "{} produced {first}", scheme.name());
                }
            }
        }
    }

    #[test]
    fn legacy_verify_is_reversed_beta() {
        for identity in ["U1", "42", "", "a much longer identity string"] {
            let beta = derive_code(identity, CodeKind::Beta);
            let reversed: String = beta.chars().rev().collect();
            assert_eq!(derive_code(identity, CodeKind::Verify), reversed);
        }
    }

    #[test]
    fn keyed_matches_known_vectors() {
        let scheme = DerivationScheme::keyed("pepper");
        assert_eq!(scheme.derive("U1", CodeKind::Beta), "989f1d47a1d3");
        assert_eq!(scheme.derive("U1", CodeKind::Verify), "e751d58e24f3");
    }

    #[test]
    fn keyed_kinds_are_not_reversals() {
        let scheme = DerivationScheme::keyed("pepper");
        let beta = scheme.derive("U1", CodeKind::Beta);
        let verify = scheme.derive("U1", CodeKind::Verify);
        let reversed: String = beta.chars().rev().collect();
        assert_ne!(beta, verify);
        assert_ne!(verify, reversed);
    }

    #[test]
    fn keyed_depends_on_secret() {
        let a = DerivationScheme::keyed("one").derive("U1", CodeKind::Beta);
        let b = DerivationScheme::keyed("two").derive("U1", CodeKind::Beta);
        assert_ne!(a, b);
        assert_ne!(a, derive_code("U1", CodeKind::Beta));
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", DerivationScheme::keyed("topsecret"));
        assert!(!rendered.contains("topsecret"));
    }
}
