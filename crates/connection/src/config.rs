//! Per-connection configuration for both handshake directions.
//!
//! Configuration is a value, not shared state: every handshake works against
//! the copies captured here, so extending or shrinking the supported set for
//! one connection never races another that is already in flight.

use quill_wire_protocol::{
    AcceptAnyIdentity, AnchoredValidator, ServerIdentity, TrustAnchors, TrustValidator, VersionSet,
};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How the client decides whether to trust the identity a server presents.
#[derive(Debug, Clone, Default)]
pub struct TrustConfig {
    /// Issuer keys presented chains must lead back to.
    pub anchors: Option<TrustAnchors>,
    /// Overrides the name checked against the presented identity. Without
    /// it, the host portion of the connect address is used, so a caller
    /// dialing a numeric address can still assert the logical name.
    pub expected_name: Option<String>,
    /// Accept any identity at all. Test and development use only.
    pub insecure_skip_verify: bool,
}

impl TrustConfig {
    pub fn anchored(anchors: impl Into<TrustAnchors>) -> Self {
        Self {
            anchors: Some(anchors.into()),
            ..Self::default()
        }
    }

    pub fn insecure() -> Self {
        Self {
            insecure_skip_verify: true,
            ..Self::default()
        }
    }

    pub fn with_expected_name(mut self, name: impl Into<String>) -> Self {
        self.expected_name = Some(name.into());
        self
    }

    /// The validator this configuration selects.
    ///
    /// With neither anchors nor the insecure opt-in, an empty anchor set is
    /// used: nothing can chain to it, so every identity is refused. The
    /// permissive path is only ever reachable through the explicit flag.
    pub(crate) fn validator(&self) -> Arc<dyn TrustValidator> {
        if self.insecure_skip_verify {
            Arc::new(AcceptAnyIdentity)
        } else {
            Arc::new(AnchoredValidator::new(
                self.anchors.clone().unwrap_or_default(),
            ))
        }
    }
}

/// Outbound handshake configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Versions this client speaks, most-preferred first. Snapshot taken at
    /// construction; in-flight handshakes never observe later changes.
    pub versions: VersionSet,
    pub trust: TrustConfig,
    /// Applied per handshake step and converted to a transport error.
    pub handshake_timeout: Duration,
}

impl ClientConfig {
    pub fn new(trust: TrustConfig) -> Self {
        Self {
            versions: VersionSet::supported(),
            trust,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Shorthand for a permissive-trust configuration.
    pub fn insecure() -> Self {
        Self::new(TrustConfig::insecure())
    }

    pub fn with_versions(mut self, versions: VersionSet) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

/// Inbound handshake configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Credential chain and leaf signing key presented to clients.
    pub identity: ServerIdentity,
    /// Versions this listener accepts, most-preferred first.
    pub versions: VersionSet,
    pub handshake_timeout: Duration,
}

impl ServerConfig {
    pub fn new(identity: ServerIdentity) -> Self {
        Self {
            identity,
            versions: VersionSet::supported(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_versions(mut self, versions: VersionSet) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}
