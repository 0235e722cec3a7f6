//! Inbound side of the bootstrap handshake.
//!
//! A [`Listener`] owns a background accept loop: every inbound TCP connection
//! gets its own handshake task, and only connections that complete version
//! agreement, identity presentation, and the client's `Finished` ack are
//! surfaced through [`Listener::accept`]. A connection that fails anywhere is
//! logged, counted, and dropped without disturbing the loop; only
//! [`Listener::close`] terminates it.

use quill_wire_protocol::{
    respond_to_attempt, Frame, NegotiationOutcome, ServerAccept, VersionRejected,
};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{AcceptError, ConnectError};
use crate::framing::{framed, recv_frame, send_frame};
use crate::session::Session;

/// Passive endpoint accepting inbound handshake attempts.
pub struct Listener {
    local_addr: SocketAddr,
    incoming: Mutex<mpsc::Receiver<Session>>,
    shutdown: CancellationToken,
    loop_done: CancellationToken,
    failed: Arc<AtomicU64>,
}

impl Listener {
    /// Bind and start accepting in the background.
    pub async fn bind(address: impl ToSocketAddrs, config: ServerConfig) -> io::Result<Self> {
        let tcp = TcpListener::bind(address).await?;
        let local_addr = tcp.local_addr()?;
        info!(%local_addr, versions = %config.versions, "🛰️ listener ready");

        let (tx, rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let loop_done = CancellationToken::new();
        let failed = Arc::new(AtomicU64::new(0));
        tokio::spawn(accept_loop(
            tcp,
            Arc::new(config),
            tx,
            shutdown.clone(),
            loop_done.clone(),
            Arc::clone(&failed),
        ));

        Ok(Self {
            local_addr,
            incoming: Mutex::new(rx),
            shutdown,
            loop_done,
            failed,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the next fully authenticated session.
    ///
    /// Returns [`AcceptError::Closed`] promptly once the listener closes,
    /// including for calls already blocked when close happens.
    pub async fn accept(&self) -> Result<Session, AcceptError> {
        let mut incoming = self.incoming.lock().await;
        tokio::select! {
            // Shutdown wins over a queued session so close is observed
            // promptly even under a steady stream of inbound handshakes.
            biased;
            _ = self.shutdown.cancelled() => Err(AcceptError::Closed),
            session = incoming.recv() => session.ok_or(AcceptError::Closed),
        }
    }

    /// Close the listener and wait for the accept loop to stop.
    ///
    /// Idempotent: cancellation is an atomic check-and-set, so concurrent or
    /// repeated closes all observe the same shutdown.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.loop_done.cancelled().await;
    }

    /// Inbound connections dropped for failing negotiation or validation.
    pub fn failed_handshakes(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    tcp: TcpListener,
    config: Arc<ServerConfig>,
    tx: mpsc::Sender<Session>,
    shutdown: CancellationToken,
    loop_done: CancellationToken,
    failed: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = tcp.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "🔗 inbound connection");
                    let config = Arc::clone(&config);
                    let tx = tx.clone();
                    let failed = Arc::clone(&failed);
                    let conn_shutdown = shutdown.child_token();
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = conn_shutdown.cancelled() => {}
                            result = serve_handshake(stream, peer, &config) => match result {
                                Ok(Some(session)) => {
                                    // Receiver gone means the listener closed
                                    // between handshake completion and here.
                                    let _ = tx.send(session).await;
                                }
                                Ok(None) => {
                                    failed.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(error) => {
                                    failed.fetch_add(1, Ordering::Relaxed);
                                    warn!(%peer, %error, "❌ inbound handshake failed");
                                }
                            }
                        }
                    });
                }
                Err(error) => {
                    warn!(%error, "accept failed");
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
            },
        }
    }
    // Release the port before signalling completion, so a close() caller
    // observing loop_done never races a still-bound socket.
    drop(tcp);
    debug!("accept loop stopped");
    loop_done.cancel();
}

/// Bring one inbound connection through the handshake.
///
/// `Ok(None)` is the explicit-rejection path: the attempted version is
/// unsupported, the server answered with its full set, and the connection is
/// done. Everything else that goes wrong is an error, handled by the caller
/// without touching the loop.
async fn serve_handshake(
    stream: TcpStream,
    peer: SocketAddr,
    config: &ServerConfig,
) -> Result<Option<Session>, ConnectError> {
    let mut framed = framed(stream);

    let hello = match recv_frame(&mut framed, config.handshake_timeout).await? {
        Frame::ClientHello(hello) => hello,
        other => {
            return Err(ConnectError::ProtocolViolation(format!(
                "expected ClientHello, got {}",
                other.name()
            )));
        }
    };

    match respond_to_attempt(&config.versions, hello.version) {
        NegotiationOutcome::Rejected {
            attempted,
            remote_supported,
        } => {
            send_frame(
                &mut framed,
                &Frame::VersionRejected(VersionRejected {
                    supported: remote_supported.as_slice().to_vec(),
                }),
            )
            .await?;
            info!(%peer, %attempted, "🔁 rejected version attempt, advertised own set");
            Ok(None)
        }
        NegotiationOutcome::Agreed(version) => {
            let proof = config
                .identity
                .sign_proof(&hello.nonce, version)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            send_frame(
                &mut framed,
                &Frame::ServerAccept(ServerAccept {
                    version,
                    chain: config.identity.chain().to_vec(),
                    proof,
                }),
            )
            .await?;

            match recv_frame(&mut framed, config.handshake_timeout).await? {
                Frame::Finished(_) => {}
                other => {
                    return Err(ConnectError::ProtocolViolation(format!(
                        "expected Finished, got {}",
                        other.name()
                    )));
                }
            }

            info!(%peer, %version, "✅ inbound session authenticated");
            Ok(Some(Session::new(version, None, peer, framed)))
        }
    }
}
