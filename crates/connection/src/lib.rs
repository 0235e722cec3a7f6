//! # Quill Connection
//!
//! Connection bootstrap for quill: a client and server agree on a mutually
//! supported protocol version, the server proves a validated identity, and
//! only then does an authenticated [`Session`] reach the caller.
//!
//! ## Handshake Flow
//!
//! ```text
//! connect() ── TCP ──▶ Listener
//!    │  ClientHello(preferred version, nonce)
//!    │◀─ VersionRejected(server's full set)      (unsupported attempt)
//!    │   reconnect once with corrected version
//!    │◀─ ServerAccept(version, chain, proof)
//!    │   validate identity + possession proof
//!    │── Finished ──▶ session surfaced via Listener::accept()
//! ```
//!
//! ## Guarantees
//!
//! - **Bounded negotiation**: exactly one corrected retry; a second rejection
//!   is a fatal [`ConnectError::NoCompatibleVersion`].
//! - **No unauthenticated sessions**: every failure path aborts before a
//!   [`Session`] exists, on either side.
//! - **Independent handshakes**: each connection attempt owns its version
//!   and trust configuration snapshots; nothing is shared between in-flight
//!   handshakes.
//! - **Prompt close**: [`Listener::close`] unblocks pending
//!   [`Listener::accept`] calls and waits for the background accept loop to
//!   stop.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quill_connection::{connect, ClientConfig, Listener, ServerConfig, TrustConfig};
//! use quill_wire_protocol::IdentityAuthority;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let authority = IdentityAuthority::generate(&mut rand::rngs::OsRng);
//! let identity = authority.issue_server_identity("localhost", &mut rand::rngs::OsRng)?;
//!
//! let listener = Listener::bind("127.0.0.1:0", ServerConfig::new(identity)).await?;
//! let address = format!("localhost:{}", listener.local_addr().port());
//!
//! let config = ClientConfig::new(TrustConfig::anchored(authority.verifying_key()));
//! let session = connect(&address, config).await?;
//! println!("agreed on {}", session.version());
//! # Ok(())
//! # }
//! ```

mod config;
mod connect;
mod error;
mod framing;
mod listener;
mod session;

pub use config::{ClientConfig, ServerConfig, TrustConfig};
pub use connect::connect;
pub use error::{AcceptError, ConnectError};
pub use listener::Listener;
pub use session::Session;
