use quill_wire_protocol::{TrustError, VersionSet};

/// Why an outbound or inbound handshake failed.
///
/// The variants deliberately separate "the network broke" from "no shared
/// version" from "untrusted peer": callers retry, reconfigure, or refuse
/// depending on which one they get.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Connectivity failure or per-step timeout. Possibly transient, but
    /// never retried internally beyond the single negotiation retry.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// No overlapping version after the single permitted retry round.
    #[error("no compatible protocol version (we support {local}, peer supports {remote})")]
    NoCompatibleVersion { local: VersionSet, remote: VersionSet },

    /// The peer's identity did not validate. Never retried.
    #[error("identity validation failed: {0}")]
    Trust(#[from] TrustError),

    /// The peer sent something the handshake protocol does not allow.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

/// Terminal error for [`Listener::accept`](crate::Listener::accept).
///
/// Per-connection handshake failures never surface here; they are logged and
/// counted by the accept loop, which keeps running until the listener closes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AcceptError {
    #[error("listener closed")]
    Closed,
}
