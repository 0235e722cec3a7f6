//! Outbound handshake coordinator.
//!
//! Drives the bounded state machine
//! `Idle -> TransportConnecting -> NegotiatingVersion -> ValidatingIdentity
//! -> Authenticated | Failed` as a loop over at most two full handshake
//! attempts. A version rejection restarts from the transport connect with the
//! corrected version exactly once; identity validation failures are never
//! retried.

use quill_wire_protocol::{
    select_retry_version, verify_proof, ClientHello, Frame, PeerIdentity, TrustError,
    TrustValidator, VersionNumber, VersionSet,
};
use std::io;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ConnectError;
use crate::framing::{framed, host_of, recv_frame, send_frame};
use crate::session::Session;

enum AttemptOutcome {
    Established(Session),
    Rejected(VersionSet),
}

/// Establish an authenticated, versioned session with `address`.
///
/// `address` is a `host:port` pair; the host portion doubles as the expected
/// identity name unless [`TrustConfig::expected_name`] overrides it.
///
/// [`TrustConfig::expected_name`]: crate::TrustConfig::expected_name
pub async fn connect(address: &str, config: ClientConfig) -> Result<Session, ConnectError> {
    let expected_name = match &config.trust.expected_name {
        Some(name) => name.clone(),
        None => host_of(address)?.to_owned(),
    };
    let validator = config.trust.validator();

    let mut attempt = config.versions.preferred();
    let mut retried = false;
    loop {
        debug!(%address, version = %attempt, "🚀 starting handshake attempt");
        match handshake_attempt(address, &config, attempt, &expected_name, validator.as_ref())
            .await?
        {
            AttemptOutcome::Established(session) => {
                info!(%address, version = %session.version(), "✅ session established");
                return Ok(session);
            }
            AttemptOutcome::Rejected(remote) => {
                if retried {
                    // One retry round only; a peer that rejects its own
                    // corrected offer gets no further downgrade attempts.
                    warn!(%address, "❌ version rejected again after retry");
                    return Err(ConnectError::NoCompatibleVersion {
                        local: config.versions.clone(),
                        remote,
                    });
                }
                match select_retry_version(&config.versions, &remote) {
                    None => {
                        return Err(ConnectError::NoCompatibleVersion {
                            local: config.versions.clone(),
                            remote,
                        });
                    }
                    Some(version) if version == attempt => {
                        return Err(ConnectError::ProtocolViolation(format!(
                            "peer rejected {attempt} while advertising support for it"
                        )));
                    }
                    Some(version) => {
                        info!(rejected = %attempt, retry = %version, "🔁 retrying with corrected version");
                        attempt = version;
                        retried = true;
                    }
                }
            }
        }
    }
}

/// One full attempt: connect, negotiate, validate, promote.
async fn handshake_attempt(
    address: &str,
    config: &ClientConfig,
    attempt: VersionNumber,
    expected_name: &str,
    validator: &dyn TrustValidator,
) -> Result<AttemptOutcome, ConnectError> {
    let stream = tokio::time::timeout(config.handshake_timeout, TcpStream::connect(address))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "transport connect timed out"))??;
    let remote_addr = stream.peer_addr()?;
    let mut framed = framed(stream);

    let nonce: [u8; 32] = rand::random();
    send_frame(
        &mut framed,
        &Frame::ClientHello(ClientHello {
            version: attempt,
            nonce,
        }),
    )
    .await?;

    match recv_frame(&mut framed, config.handshake_timeout).await? {
        Frame::VersionRejected(rejection) => {
            let remote = VersionSet::new(rejection.supported).map_err(|e| {
                ConnectError::ProtocolViolation(format!("invalid advertised version set: {e}"))
            })?;
            debug!(attempted = %attempt, remote = %remote, "version attempt rejected");
            Ok(AttemptOutcome::Rejected(remote))
        }
        Frame::ServerAccept(accept) => {
            if accept.version != attempt {
                return Err(ConnectError::ProtocolViolation(format!(
                    "server accepted {} but we attempted {attempt}",
                    accept.version
                )));
            }

            let identity = PeerIdentity::new(accept.chain);
            validator.validate(expected_name, &identity)?;
            if !config.trust.insecure_skip_verify {
                let leaf = identity.leaf().ok_or(TrustError::EmptyChain)?;
                verify_proof(&leaf.verifying_key, &nonce, accept.version, &accept.proof)
                    .map_err(|_| TrustError::ProofRejected)?;
            }

            send_frame(&mut framed, &Frame::Finished(quill_wire_protocol::Finished {})).await?;

            let peer_name = identity.declared_name().map(str::to_owned);
            Ok(AttemptOutcome::Established(Session::new(
                accept.version,
                peer_name,
                remote_addr,
                framed,
            )))
        }
        other => Err(ConnectError::ProtocolViolation(format!(
            "unexpected {} frame during negotiation",
            other.name()
        ))),
    }
}
