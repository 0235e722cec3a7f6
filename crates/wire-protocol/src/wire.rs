//! Handshake frames and their binary encoding.
//!
//! Every frame is a postcard-serialized [`Frame`] variant; the connection
//! layer carries the encoded bytes inside a length-delimited transport frame.
//! Postcard keeps the encoding compact and deterministic, and a payload that
//! fails to decode is a protocol violation rather than something to limp
//! past.

use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::identity::Credential;
use crate::version::VersionNumber;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode handshake frame: {0}")]
    Encode(postcard::Error),

    #[error("malformed handshake frame: {0}")]
    Decode(postcard::Error),
}

/// Opening frame: the client's attempted version plus a fresh nonce the
/// server must sign into its possession proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
    pub version: VersionNumber,
    pub nonce: [u8; 32],
}

/// Negotiation rejection carrying the server's full supported set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRejected {
    pub supported: Vec<VersionNumber>,
}

/// Acceptance: the agreed version, the server's identity chain, and the
/// proof signature over `(nonce, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAccept {
    pub version: VersionNumber,
    pub chain: Vec<Credential>,
    pub proof: Signature,
}

/// Client acknowledgment that identity validation succeeded; the server
/// only surfaces the session once this arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finished {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    ClientHello(ClientHello),
    VersionRejected(VersionRejected),
    ServerAccept(ServerAccept),
    Finished(Finished),
}

impl Frame {
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        postcard::to_stdvec(self).map_err(WireError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        postcard::from_bytes(bytes).map_err(WireError::Decode)
    }

    /// Short frame name for logs and protocol-violation messages.
    pub fn name(&self) -> &'static str {
        match self {
            Frame::ClientHello(_) => "ClientHello",
            Frame::VersionRejected(_) => "VersionRejected",
            Frame::ServerAccept(_) => "ServerAccept",
            Frame::Finished(_) => "Finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn client_hello_round_trips() {
        let frame = Frame::ClientHello(ClientHello {
            version: VersionNumber(4),
            nonce: [0xab; 32],
        });
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejection_preserves_advertised_order() {
        let frame = Frame::VersionRejected(VersionRejected {
            supported: vec![VersionNumber(7), VersionNumber(8), VersionNumber(4)],
        });
        let Frame::VersionRejected(decoded) = Frame::decode(&frame.encode().unwrap()).unwrap()
        else {
            panic!("decoded to a different frame kind");
        };
        assert_eq!(
            decoded.supported,
            vec![VersionNumber(7), VersionNumber(8), VersionNumber(4)]
        );
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = Frame::decode(&[0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, WireError::Decode(_)));
    }
}
