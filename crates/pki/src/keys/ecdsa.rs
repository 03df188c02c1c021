//! Abstraction layer around the [`p256`]/[`ecdsa`] crates, backing the
//! `ECDSA_SECP256R1_SHA256` signature scheme used by default for TLS
//! certificates and certificate signing requests.
use p256::{NistP256, pkcs8::DecodePrivateKey};
use rand_core::OsRng;
use signature::Keypair;
use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::keys::{CertificateKeypair, SignatureScheme};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display("failed to deserialize the signing (private) key from PEM-encoded PKCS8"))]
    DeserializeSigningKey { source: p256::pkcs8::Error },
}

#[derive(Debug)]
pub struct SigningKey(ecdsa::SigningKey<NistP256>);

impl CertificateKeypair for SigningKey {
    type Error = Error;
    type Signature = ecdsa::der::Signature<NistP256>;
    type SigningKey = ecdsa::SigningKey<NistP256>;
    type VerifyingKey = ecdsa::VerifyingKey<NistP256>;

    fn scheme() -> SignatureScheme {
        super::ECDSA_SECP256R1_SHA256
    }

    /// Generates a new P-256 ECDSA key with the OS random-number generator.
    #[instrument(name = "create_ecdsa_signing_key")]
    fn new() -> Result<Self> {
        let mut csprng = OsRng;
        Ok(Self(ecdsa::SigningKey::<NistP256>::random(&mut csprng)))
    }

    fn signing_key(&self) -> &Self::SigningKey {
        &self.0
    }

    fn verifying_key(&self) -> Self::VerifyingKey {
        *self.0.verifying_key()
    }

    #[instrument(name = "create_ecdsa_signing_key_from_pkcs8_pem")]
    fn from_pkcs8_pem(input: &str) -> Result<Self, Self::Error> {
        let signing_key =
            ecdsa::SigningKey::<NistP256>::from_pkcs8_pem(input).context(DeserializeSigningKeySnafu)?;

        Ok(Self(signing_key))
    }
}
