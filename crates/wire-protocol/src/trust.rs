//! Pluggable trust validation for presented peer identities.
//!
//! The handshake coordinator hands the presented [`PeerIdentity`] and the
//! expected server name to a [`TrustValidator`]; everything about *how* trust
//! is decided lives behind that trait, so tests can swap in permissive or
//! restrictive variants without touching the handshake itself.
//!
//! Two validators ship with the crate:
//!
//! - [`AnchoredValidator`] walks the credential chain to a configured
//!   [`TrustAnchors`] set and requires the declared name to match. This is
//!   the default posture.
//! - [`AcceptAnyIdentity`] accepts anything; development and test use only.

use ed25519_dalek::VerifyingKey;
use std::fmt;

use crate::identity::PeerIdentity;

/// Why a presented identity was refused.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("peer presented an empty credential chain")]
    EmptyChain,

    #[error("credential chain does not lead to a configured trust anchor")]
    UntrustedChain,

    #[error("credential for {subject:?} is not signed by its issuer")]
    BrokenChain { subject: String },

    #[error("server name mismatch: expected {expected:?}, identity is for {presented:?}")]
    NameMismatch { expected: String, presented: String },

    #[error("server failed to prove possession of its identity key")]
    ProofRejected,
}

/// Capability that decides whether a presented identity is acceptable for the
/// name the caller intended to reach.
pub trait TrustValidator: Send + Sync + fmt::Debug {
    fn validate(&self, server_name: &str, presented: &PeerIdentity) -> Result<(), TrustError>;
}

/// Set of issuer keys a client is willing to chain identities back to.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors(Vec<VerifyingKey>);

impl TrustAnchors {
    pub fn new(anchors: Vec<VerifyingKey>) -> Self {
        Self(anchors)
    }

    pub fn add(&mut self, anchor: VerifyingKey) {
        self.0.push(anchor);
    }

    pub fn contains(&self, key: &VerifyingKey) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<VerifyingKey> for TrustAnchors {
    fn from(anchor: VerifyingKey) -> Self {
        Self(vec![anchor])
    }
}

/// Validator that requires the chain to terminate at a trust anchor and the
/// declared leaf name to match the expected server name.
#[derive(Debug, Clone)]
pub struct AnchoredValidator {
    anchors: TrustAnchors,
}

impl AnchoredValidator {
    pub fn new(anchors: TrustAnchors) -> Self {
        Self { anchors }
    }
}

impl TrustValidator for AnchoredValidator {
    fn validate(&self, server_name: &str, presented: &PeerIdentity) -> Result<(), TrustError> {
        let leaf = presented.leaf().ok_or(TrustError::EmptyChain)?;

        // Walk leaf-first: each credential must be signed by the next one's
        // key, and the last must verify under a configured anchor.
        for pair in presented.chain.windows(2) {
            pair[0]
                .verify_issued_by(&pair[1].verifying_key)
                .map_err(|_| TrustError::BrokenChain {
                    subject: pair[0].subject.clone(),
                })?;
        }
        let root = presented.chain.last().ok_or(TrustError::EmptyChain)?;
        let anchored = self
            .anchors
            .0
            .iter()
            .any(|anchor| root.verify_issued_by(anchor).is_ok());
        if !anchored {
            tracing::warn!(subject = %leaf.subject, "❌ credential chain is not anchored");
            return Err(TrustError::UntrustedChain);
        }

        if leaf.subject != server_name {
            tracing::warn!(
                expected = %server_name,
                presented = %leaf.subject,
                "❌ server name mismatch",
            );
            return Err(TrustError::NameMismatch {
                expected: server_name.to_owned(),
                presented: leaf.subject.clone(),
            });
        }

        tracing::debug!(subject = %leaf.subject, "✅ peer identity validated");
        Ok(())
    }
}

/// Validator that accepts every identity, including name mismatches.
///
/// Only reachable through an explicit `insecure_skip_verify` opt-in.
#[derive(Debug, Clone, Copy)]
pub struct AcceptAnyIdentity;

impl TrustValidator for AcceptAnyIdentity {
    fn validate(&self, _server_name: &str, _presented: &PeerIdentity) -> Result<(), TrustError> {
        tracing::debug!("⚠️ identity validation skipped (insecure_skip_verify)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityAuthority;
    use rand::rngs::OsRng;

    fn anchored_identity(subject: &str) -> (AnchoredValidator, PeerIdentity) {
        let authority = IdentityAuthority::generate(&mut OsRng);
        let identity = authority.issue_server_identity(subject, &mut OsRng).unwrap();
        let validator = AnchoredValidator::new(authority.verifying_key().into());
        (validator, PeerIdentity::new(identity.chain().to_vec()))
    }

    #[test]
    fn accepts_matching_anchored_identity() {
        let (validator, identity) = anchored_identity("localhost");
        validator.validate("localhost", &identity).unwrap();
    }

    #[test]
    fn rejects_name_mismatch() {
        let (validator, identity) = anchored_identity("localhost");
        let err = validator.validate("127.0.0.1", &identity).unwrap_err();
        assert!(matches!(err, TrustError::NameMismatch { .. }));
    }

    #[test]
    fn rejects_unanchored_chain() {
        let (_, identity) = anchored_identity("localhost");
        let stranger = IdentityAuthority::generate(&mut OsRng);
        let validator = AnchoredValidator::new(stranger.verifying_key().into());
        let err = validator.validate("localhost", &identity).unwrap_err();
        assert!(matches!(err, TrustError::UntrustedChain));
    }

    #[test]
    fn rejects_empty_chain() {
        let (validator, _) = anchored_identity("localhost");
        let err = validator
            .validate("localhost", &PeerIdentity::new(vec![]))
            .unwrap_err();
        assert!(matches!(err, TrustError::EmptyChain));
    }

    #[test]
    fn walks_intermediate_chain() {
        let authority = IdentityAuthority::generate(&mut OsRng);
        let intermediate = authority.issue_intermediate("issuer-a", &mut OsRng).unwrap();
        let identity = intermediate
            .issue_server_identity("localhost", &mut OsRng)
            .unwrap();

        let validator = AnchoredValidator::new(authority.verifying_key().into());
        validator
            .validate("localhost", &PeerIdentity::new(identity.chain().to_vec()))
            .unwrap();
    }

    #[test]
    fn detects_spliced_chain() {
        // Leaf from one authority glued onto an intermediate of another.
        let authority = IdentityAuthority::generate(&mut OsRng);
        let other = IdentityAuthority::generate(&mut OsRng);
        let intermediate = authority.issue_intermediate("issuer-a", &mut OsRng).unwrap();
        let foreign_leaf = other
            .issue_server_identity("localhost", &mut OsRng)
            .unwrap();

        let spliced = PeerIdentity::new(vec![
            foreign_leaf.chain()[0].clone(),
            intermediate
                .issue_server_identity("unused", &mut OsRng)
                .unwrap()
                .chain()[1]
                .clone(),
        ]);
        let validator = AnchoredValidator::new(authority.verifying_key().into());
        let err = validator.validate("localhost", &spliced).unwrap_err();
        assert!(matches!(err, TrustError::BrokenChain { .. }));
    }

    #[test]
    fn accept_any_ignores_everything() {
        let (_, identity) = anchored_identity("localhost");
        AcceptAnyIdentity.validate("not-even-close", &identity).unwrap();
        AcceptAnyIdentity
            .validate("whatever", &PeerIdentity::new(vec![]))
            .unwrap();
    }
}
