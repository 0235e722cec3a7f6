use quill_wire_protocol::VersionNumber;
use std::fmt;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::framing::FramedStream;

/// An authenticated, versioned connection handle.
///
/// Produced only by a completed handshake; there is no way to obtain one for
/// a connection whose negotiation or identity validation failed. The agreed
/// version is fixed for the session's lifetime.
pub struct Session {
    version: VersionNumber,
    peer_name: Option<String>,
    remote_addr: SocketAddr,
    transport: FramedStream,
}

impl Session {
    pub(crate) fn new(
        version: VersionNumber,
        peer_name: Option<String>,
        remote_addr: SocketAddr,
        transport: FramedStream,
    ) -> Self {
        Self {
            version,
            peer_name,
            remote_addr,
            transport,
        }
    }

    /// The protocol version agreed during the handshake.
    pub fn version(&self) -> VersionNumber {
        self.version
    }

    /// The validated name of the peer, when it presented an identity.
    pub fn peer_name(&self) -> Option<&str> {
        self.peer_name.as_deref()
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Close the session, shutting down the underlying transport.
    pub async fn close(mut self) -> std::io::Result<()> {
        self.transport.get_mut().shutdown().await
    }

    /// Hand the framed transport to a higher layer (stream multiplexing,
    /// record protection) built on top of an established session.
    pub fn into_transport(self) -> Framed<TcpStream, LengthDelimitedCodec> {
        self.transport
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.version)
            .field("peer_name", &self.peer_name)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}
