//! Ed25519 identity credentials for the bootstrap handshake.
//!
//! A [`Credential`] binds a subject name to an ed25519 verifying key under an
//! issuer's signature, playing the role a TLS certificate plays in a full
//! stack. Servers present a leaf-first chain of credentials; clients walk it
//! back to a configured trust anchor (see [`crate::trust`]).
//!
//! Identity material only lives for the duration of a handshake: a
//! [`PeerIdentity`] is built from the wire frame, validated, and dropped.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::VersionNumber;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("failed to encode credential payload: {0}")]
    Encoding(postcard::Error),

    #[error("credential signature rejected for subject {0:?}")]
    BadSignature(String),
}

/// Signed payload of a credential: everything except the signature itself.
#[derive(Serialize)]
struct CredentialTbs<'a> {
    subject: &'a str,
    verifying_key: &'a VerifyingKey,
}

/// A name-to-key binding signed by an issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The name this credential vouches for, e.g. `localhost`.
    pub subject: String,
    /// The key the subject proves possession of.
    pub verifying_key: VerifyingKey,
    /// Issuer signature over `(subject, verifying_key)`.
    pub signature: Signature,
}

impl Credential {
    /// Issue a credential for `subject`'s key, signed by `issuer`.
    pub fn issue(
        subject: &str,
        verifying_key: VerifyingKey,
        issuer: &SigningKey,
    ) -> Result<Self, IdentityError> {
        let payload = encode_tbs(subject, &verifying_key)?;
        Ok(Self {
            subject: subject.to_owned(),
            verifying_key,
            signature: issuer.sign(&payload),
        })
    }

    /// Check that `issuer_key` signed this credential.
    pub fn verify_issued_by(&self, issuer_key: &VerifyingKey) -> Result<(), IdentityError> {
        let payload = encode_tbs(&self.subject, &self.verifying_key)?;
        issuer_key
            .verify(&payload, &self.signature)
            .map_err(|_| IdentityError::BadSignature(self.subject.clone()))
    }
}

fn encode_tbs(subject: &str, verifying_key: &VerifyingKey) -> Result<Vec<u8>, IdentityError> {
    postcard::to_stdvec(&CredentialTbs {
        subject,
        verifying_key,
    })
    .map_err(IdentityError::Encoding)
}

/// Identity material a peer presented during the handshake.
///
/// The chain is leaf-first: `chain[i]` is signed by `chain[i + 1]`'s key, and
/// the final credential must verify under a configured trust anchor.
#[derive(Debug, Clone)]
pub struct PeerIdentity {
    pub chain: Vec<Credential>,
}

impl PeerIdentity {
    pub fn new(chain: Vec<Credential>) -> Self {
        Self { chain }
    }

    pub fn leaf(&self) -> Option<&Credential> {
        self.chain.first()
    }

    /// The name the peer claims, taken from the leaf credential.
    pub fn declared_name(&self) -> Option<&str> {
        self.leaf().map(|c| c.subject.as_str())
    }
}

/// Root of trust that issues credentials, mirroring a test CA.
pub struct IdentityAuthority {
    signing_key: SigningKey,
}

impl fmt::Debug for IdentityAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAuthority")
            .field(
                "verifying_key",
                &hex::encode(self.signing_key.verifying_key().as_bytes()),
            )
            .finish_non_exhaustive()
    }
}

impl IdentityAuthority {
    pub fn generate<R: RngCore + CryptoRng>(csprng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(csprng),
        }
    }

    /// The anchor key clients configure to trust identities from this authority.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Issue a ready-to-serve identity for `subject` with a fresh leaf key.
    pub fn issue_server_identity<R: RngCore + CryptoRng>(
        &self,
        subject: &str,
        csprng: &mut R,
    ) -> Result<ServerIdentity, IdentityError> {
        let leaf_key = SigningKey::generate(csprng);
        let credential = Credential::issue(subject, leaf_key.verifying_key(), &self.signing_key)?;
        Ok(ServerIdentity {
            chain: vec![credential],
            signing_key: leaf_key,
        })
    }

    /// Issue an intermediate signer whose credentials chain back to this
    /// authority through `subject`.
    pub fn issue_intermediate<R: RngCore + CryptoRng>(
        &self,
        subject: &str,
        csprng: &mut R,
    ) -> Result<IntermediateIssuer, IdentityError> {
        let key = SigningKey::generate(csprng);
        let credential = Credential::issue(subject, key.verifying_key(), &self.signing_key)?;
        Ok(IntermediateIssuer {
            credential,
            signing_key: key,
        })
    }
}

/// A non-root issuer sitting between an authority and leaf identities.
pub struct IntermediateIssuer {
    credential: Credential,
    signing_key: SigningKey,
}

impl fmt::Debug for IntermediateIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntermediateIssuer")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl IntermediateIssuer {
    pub fn issue_server_identity<R: RngCore + CryptoRng>(
        &self,
        subject: &str,
        csprng: &mut R,
    ) -> Result<ServerIdentity, IdentityError> {
        let leaf_key = SigningKey::generate(csprng);
        let leaf = Credential::issue(subject, leaf_key.verifying_key(), &self.signing_key)?;
        Ok(ServerIdentity {
            chain: vec![leaf, self.credential.clone()],
            signing_key: leaf_key,
        })
    }
}

/// The listening side's identity: its credential chain plus the leaf signing
/// key used for the possession proof.
pub struct ServerIdentity {
    chain: Vec<Credential>,
    signing_key: SigningKey,
}

impl fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl ServerIdentity {
    pub fn chain(&self) -> &[Credential] {
        &self.chain
    }

    pub fn subject(&self) -> &str {
        &self.chain[0].subject
    }

    /// Sign the client's nonce together with the agreed version.
    ///
    /// Binding the version into the proof means a middlebox cannot rewrite
    /// the agreed version after negotiation without the client noticing.
    pub fn sign_proof(
        &self,
        nonce: &[u8; 32],
        version: VersionNumber,
    ) -> Result<Signature, IdentityError> {
        let payload = proof_payload(nonce, version)?;
        Ok(self.signing_key.sign(&payload))
    }
}

/// Verify a server's possession proof under the presented leaf key.
pub fn verify_proof(
    leaf_key: &VerifyingKey,
    nonce: &[u8; 32],
    version: VersionNumber,
    proof: &Signature,
) -> Result<(), IdentityError> {
    let payload = proof_payload(nonce, version)?;
    leaf_key
        .verify(&payload, proof)
        .map_err(|_| IdentityError::BadSignature("possession proof".to_owned()))
}

fn proof_payload(nonce: &[u8; 32], version: VersionNumber) -> Result<Vec<u8>, IdentityError> {
    postcard::to_stdvec(&(nonce, version)).map_err(IdentityError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn issued_credential_verifies_under_issuer_key() {
        let authority = IdentityAuthority::generate(&mut OsRng);
        let identity = authority
            .issue_server_identity("localhost", &mut OsRng)
            .unwrap();

        let leaf = &identity.chain()[0];
        assert_eq!(leaf.subject, "localhost");
        leaf.verify_issued_by(&authority.verifying_key()).unwrap();
    }

    #[test]
    fn credential_does_not_verify_under_other_key() {
        let authority = IdentityAuthority::generate(&mut OsRng);
        let other = IdentityAuthority::generate(&mut OsRng);
        let identity = authority
            .issue_server_identity("localhost", &mut OsRng)
            .unwrap();

        let result = identity.chain()[0].verify_issued_by(&other.verifying_key());
        assert!(matches!(result, Err(IdentityError::BadSignature(_))));
    }

    #[test]
    fn possession_proof_round_trip() {
        let authority = IdentityAuthority::generate(&mut OsRng);
        let identity = authority
            .issue_server_identity("localhost", &mut OsRng)
            .unwrap();

        let nonce = [7u8; 32];
        let version = VersionNumber(4);
        let proof = identity.sign_proof(&nonce, version).unwrap();
        verify_proof(&identity.chain()[0].verifying_key, &nonce, version, &proof).unwrap();

        // A different agreed version must not verify against the same proof.
        let tampered = verify_proof(
            &identity.chain()[0].verifying_key,
            &nonce,
            VersionNumber(3),
            &proof,
        );
        assert!(tampered.is_err());
    }

    #[test]
    fn intermediate_chain_is_leaf_first() {
        let authority = IdentityAuthority::generate(&mut OsRng);
        let intermediate = authority.issue_intermediate("issuer-a", &mut OsRng).unwrap();
        let identity = intermediate
            .issue_server_identity("localhost", &mut OsRng)
            .unwrap();

        let chain = identity.chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].subject, "localhost");
        assert_eq!(chain[1].subject, "issuer-a");
        chain[0].verify_issued_by(&chain[1].verifying_key).unwrap();
        chain[1]
            .verify_issued_by(&authority.verifying_key())
            .unwrap();
    }
}
