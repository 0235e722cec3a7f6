//! Length-delimited frame transport shared by both handshake directions.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use quill_wire_protocol::Frame;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::ConnectError;

pub(crate) type FramedStream = Framed<TcpStream, LengthDelimitedCodec>;

pub(crate) fn framed(stream: TcpStream) -> FramedStream {
    Framed::new(stream, LengthDelimitedCodec::new())
}

pub(crate) async fn send_frame(framed: &mut FramedStream, frame: &Frame) -> Result<(), ConnectError> {
    let bytes = frame
        .encode()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    framed.send(Bytes::from(bytes)).await?;
    Ok(())
}

/// Read the next handshake frame, bounding the wait.
///
/// Timeout and EOF both collapse to transport errors; a payload that does not
/// decode is a protocol violation.
pub(crate) async fn recv_frame(
    framed: &mut FramedStream,
    timeout: Duration,
) -> Result<Frame, ConnectError> {
    let next = tokio::time::timeout(timeout, framed.next())
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "handshake step timed out"))?;
    let bytes = next.ok_or_else(|| {
        io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed during handshake")
    })??;
    Frame::decode(&bytes).map_err(|e| ConnectError::ProtocolViolation(e.to_string()))
}

/// Host portion of a `host:port` address, with IPv6 brackets stripped.
pub(crate) fn host_of(address: &str) -> Result<&str, ConnectError> {
    let (host, _port) = address.rsplit_once(':').ok_or_else(|| {
        ConnectError::Transport(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("address {address:?} is missing a port"),
        ))
    })?;
    Ok(host.trim_start_matches('[').trim_end_matches(']'))
}

#[cfg(test)]
mod tests {
    use super::host_of;

    #[test]
    fn host_of_splits_names_and_addresses() {
        assert_eq!(host_of("localhost:4433").unwrap(), "localhost");
        assert_eq!(host_of("127.0.0.1:4433").unwrap(), "127.0.0.1");
        assert_eq!(host_of("[::1]:4433").unwrap(), "::1");
    }

    #[test]
    fn host_of_requires_a_port() {
        assert!(host_of("localhost").is_err());
    }
}
