//! # Quill Wire Protocol
//!
//! Leaf types and pure logic for the quill connection bootstrap: protocol
//! version negotiation, identity credentials, trust validation, and the
//! handshake frames that carry them. Nothing in this crate performs I/O; the
//! `quill-connection` crate drives these pieces over a real transport.
//!
//! ## Key Pieces
//!
//! - [`VersionSet`] / [`VersionNumber`]: ordered version preferences and the
//!   negotiation rules ([`respond_to_attempt`], [`select_retry_version`])
//! - [`Credential`] / [`IdentityAuthority`]: ed25519 name-to-key bindings
//!   standing in for a TLS certificate chain
//! - [`TrustValidator`]: pluggable acceptance capability, with anchored and
//!   permissive implementations
//! - [`Frame`]: postcard-encoded handshake messages
//!
//! ## Negotiation at a Glance
//!
//! ```rust
//! use quill_wire_protocol::{
//!     respond_to_attempt, select_retry_version, NegotiationOutcome, VersionNumber, VersionSet,
//! };
//!
//! # fn main() -> Result<(), quill_wire_protocol::VersionSetError> {
//! let server = VersionSet::new(vec![VersionNumber(7), VersionNumber(4)])?;
//! let client = VersionSet::new(vec![VersionNumber(3), VersionNumber(4)])?;
//!
//! // The client opens with its first preference (v3); the server rejects it
//! // and advertises its own set, from which the client picks the retry.
//! let NegotiationOutcome::Rejected { remote_supported, .. } =
//!     respond_to_attempt(&server, client.preferred())
//! else {
//!     unreachable!("server does not speak v3");
//! };
//! assert_eq!(
//!     select_retry_version(&client, &remote_supported),
//!     Some(VersionNumber(4)),
//! );
//! # Ok(())
//! # }
//! ```

pub mod identity;
pub mod trust;
pub mod version;
pub mod wire;

pub use identity::{
    verify_proof, Credential, IdentityAuthority, IdentityError, IntermediateIssuer, PeerIdentity,
    ServerIdentity,
};
pub use trust::{AcceptAnyIdentity, AnchoredValidator, TrustAnchors, TrustError, TrustValidator};
pub use version::{
    respond_to_attempt, select_retry_version, NegotiationOutcome, VersionNumber, VersionSet,
    VersionSetError, SUPPORTED_VERSIONS,
};
pub use wire::{ClientHello, Finished, Frame, ServerAccept, VersionRejected, WireError};

// Key material is plain ed25519; re-export the dalek types so downstream
// crates do not need a direct dependency for signatures and anchors.
pub use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
