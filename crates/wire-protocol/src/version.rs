//! # Protocol Version Negotiation
//!
//! This module provides the pure version-agreement logic used during
//! connection bootstrap. Both endpoints are configured with an ordered
//! [`VersionSet`]; the client opens with its most-preferred version and the
//! server either agrees or rejects with its own full set, after which the
//! client is allowed exactly one corrected retry.
//!
//! ## Negotiation Flow
//!
//! ```text
//! Client                                Server
//!   │  ClientHello(versions[0])          │
//!   ├───────────────────────────────────▶│ respond_to_attempt()
//!   │       VersionRejected(server set)  │
//!   │◀───────────────────────────────────┤
//!   │  select_retry_version()            │
//!   │  ClientHello(corrected version)    │
//!   ├───────────────────────────────────▶│ respond_to_attempt()
//!   │       ServerAccept(version, …)     │
//!   │◀───────────────────────────────────┤
//! ```
//!
//! ## Key Rules
//!
//! - A rejection always carries the server's **full** configured set. A
//!   single-version hint would make agreement impossible whenever the
//!   server's own first preference is a version the client does not speak.
//! - The client scans **its own** set in preference order against the
//!   server's advertised set and retries with the first match.
//! - One retry only. A second rejection is a fatal incompatibility, which
//!   keeps a lying peer from driving an endless downgrade loop.
//!
//! The functions here never touch the network; the coordinator in
//! `quill-connection` drives them and owns the retry bound.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque protocol version identifier.
///
/// Versions are compared for identity only; there is no ordering or
/// arithmetic across versions. Preference is expressed solely by position in
/// a [`VersionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionNumber(pub u32);

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for VersionNumber {
    fn from(value: u32) -> Self {
        VersionNumber(value)
    }
}

/// Versions this build of quill speaks, most-preferred first.
///
/// This is a read-only snapshot source: configuration copies it into a
/// per-handshake [`VersionSet`] at construction time. In-flight handshakes
/// are never affected by what later configurations choose to support.
pub const SUPPORTED_VERSIONS: &[VersionNumber] =
    &[VersionNumber(4), VersionNumber(3), VersionNumber(2)];

/// Errors raised when constructing a [`VersionSet`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VersionSetError {
    #[error("a version set must contain at least one version")]
    Empty,

    #[error("duplicate version {0} in version set")]
    Duplicate(VersionNumber),
}

/// Ordered, non-empty set of protocol versions an endpoint supports.
///
/// The first element is the most preferred. Construction validates the
/// non-empty and no-duplicates invariants; afterwards the set is immutable,
/// so every handshake works against a stable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSet(Vec<VersionNumber>);

impl VersionSet {
    /// Create a validated version set, most-preferred first.
    pub fn new(versions: Vec<VersionNumber>) -> Result<Self, VersionSetError> {
        if versions.is_empty() {
            return Err(VersionSetError::Empty);
        }
        for (idx, version) in versions.iter().enumerate() {
            if versions[..idx].contains(version) {
                return Err(VersionSetError::Duplicate(*version));
            }
        }
        Ok(Self(versions))
    }

    /// Snapshot of [`SUPPORTED_VERSIONS`].
    pub fn supported() -> Self {
        Self(SUPPORTED_VERSIONS.to_vec())
    }

    /// The most preferred version (the first one a client will attempt).
    pub fn preferred(&self) -> VersionNumber {
        self.0[0]
    }

    pub fn contains(&self, version: VersionNumber) -> bool {
        self.0.contains(&version)
    }

    pub fn iter(&self) -> impl Iterator<Item = VersionNumber> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw ordered versions, for embedding into a wire frame.
    pub fn as_slice(&self) -> &[VersionNumber] {
        &self.0
    }
}

impl Default for VersionSet {
    fn default() -> Self {
        Self::supported()
    }
}

impl fmt::Display for VersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, version) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{version}")?;
        }
        write!(f, "]")
    }
}

/// Result of one server-side negotiation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The attempted version is acceptable; the handshake proceeds with it.
    Agreed(VersionNumber),
    /// The attempted version is unsupported; the server must answer with its
    /// own full set so the client can compute a corrected retry.
    Rejected {
        attempted: VersionNumber,
        remote_supported: VersionSet,
    },
}

/// Server side: decide whether a client's attempted version can proceed.
///
/// An unsupported attempt is never silently mapped to something else; the
/// server explicitly rejects and advertises everything it speaks.
pub fn respond_to_attempt(local: &VersionSet, attempted: VersionNumber) -> NegotiationOutcome {
    if local.contains(attempted) {
        NegotiationOutcome::Agreed(attempted)
    } else {
        tracing::debug!(%attempted, supported = %local, "rejecting unsupported version attempt");
        NegotiationOutcome::Rejected {
            attempted,
            remote_supported: local.clone(),
        }
    }
}

/// Client side: pick the version for the single permitted retry.
///
/// Scans the local set in preference order and returns the first version the
/// remote peer advertised. `None` means there is no overlap at all and the
/// handshake must fail with `NoCompatibleVersion` without retrying.
pub fn select_retry_version(
    local: &VersionSet,
    remote_supported: &VersionSet,
) -> Option<VersionNumber> {
    local.iter().find(|v| remote_supported.contains(*v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(versions: &[u32]) -> VersionSet {
        VersionSet::new(versions.iter().map(|v| VersionNumber(*v)).collect()).unwrap()
    }

    #[test]
    fn version_set_rejects_empty() {
        assert_eq!(VersionSet::new(vec![]), Err(VersionSetError::Empty));
    }

    #[test]
    fn version_set_rejects_duplicates() {
        let err = VersionSet::new(vec![VersionNumber(1), VersionNumber(2), VersionNumber(1)]);
        assert_eq!(err, Err(VersionSetError::Duplicate(VersionNumber(1))));
    }

    #[test]
    fn preferred_is_first() {
        assert_eq!(set(&[9, 4, 7]).preferred(), VersionNumber(9));
    }

    #[test]
    fn supported_attempt_is_agreed() {
        let outcome = respond_to_attempt(&set(&[7, 8, 4, 9]), VersionNumber(4));
        assert_eq!(outcome, NegotiationOutcome::Agreed(VersionNumber(4)));
    }

    #[test]
    fn unsupported_attempt_is_rejected_with_full_set() {
        let local = set(&[7, 8, 9]);
        let outcome = respond_to_attempt(&local, VersionNumber(4));
        assert_eq!(
            outcome,
            NegotiationOutcome::Rejected {
                attempted: VersionNumber(4),
                remote_supported: local,
            }
        );
    }

    #[test]
    fn retry_follows_client_preference_order() {
        // Client prefers 4, server speaks 2 and 3: the retry must be 3, the
        // first of the client's remaining preferences the server advertised.
        let picked = select_retry_version(&set(&[4, 3, 2]), &set(&[2, 3]));
        assert_eq!(picked, Some(VersionNumber(3)));
    }

    #[test]
    fn retry_converges_on_server_set_even_against_server_first_preference() {
        // The server's own first preference (7) is one the client does not
        // speak; agreement still lands inside the server's configured set.
        let server = set(&[7, 8, 4, 9]);
        let picked = select_retry_version(&set(&[4, 3, 2]), &server);
        assert_eq!(picked, Some(VersionNumber(4)));
        assert!(server.contains(picked.unwrap()));
    }

    #[test]
    fn no_overlap_yields_none() {
        assert_eq!(select_retry_version(&set(&[4, 3]), &set(&[7, 8])), None);
    }
}
