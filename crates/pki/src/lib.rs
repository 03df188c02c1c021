//! This crate provides types, traits and functions to work with the X.509
//! certificate hierarchy that anchors a permissioned zone's trust model:
//! root CA → intermediate CA → node CA → {TLS, legal identity, network-map,
//! service identity}.
//!
//! Every issued certificate beyond the root carries a non-critical, private
//! role extension (see [`role`]) that callers use to bind a signed artifact
//! to the role that is allowed to produce it (e.g. only a `NETWORK_MAP` role
//! certificate may sign a network map).
//!
//! ## References
//!
//! - <https://datatracker.ietf.org/doc/html/rfc5280>
//! - <https://datatracker.ietf.org/doc/html/rfc2986> (PKCS#10)
use std::path::Path;

use p256::pkcs8::EncodePrivateKey;
use snafu::{ResultExt, Snafu};
use x509_cert::{
    Certificate,
    der::{DecodePem, EncodePem},
    spki::EncodePublicKey,
};

use crate::keys::CertificateKeypair;

pub mod csr;
pub mod factory;
pub mod issuer;
pub mod keys;
pub mod role;
pub mod validate;
pub(crate) mod verify;

/// Error variants which can be encountered when creating a new
/// [`CertificatePair`].
#[derive(Debug, Snafu)]
pub enum CertificatePairError<E>
where
    E: std::error::Error + 'static,
{
    #[snafu(display("failed to serialize certificate as {key_encoding}"))]
    SerializeCertificate {
        source: x509_cert::der::Error,
        key_encoding: KeyEncoding,
    },

    #[snafu(display("failed to deserialize certificate from {key_encoding}"))]
    DeserializeCertificate {
        source: x509_cert::der::Error,
        key_encoding: KeyEncoding,
    },

    #[snafu(display("failed to serialize private key as PKCS8 {key_encoding}"))]
    SerializePrivateKey {
        source: p256::pkcs8::Error,
        key_encoding: KeyEncoding,
    },

    #[snafu(display("failed to deserialize private key from PKCS8 {key_encoding}"))]
    DeserializePrivateKey {
        source: E,
        key_encoding: KeyEncoding,
    },

    #[snafu(display("failed to write file"))]
    WriteFile { source: std::io::Error },

    #[snafu(display("failed to read file"))]
    ReadFile { source: std::io::Error },
}

/// Custom implementation of [`std::cmp::PartialEq`] because [`std::io::Error`] doesn't implement it, but [`std::io::ErrorKind`] does.
impl<E: snafu::Error + std::cmp::PartialEq> PartialEq for CertificatePairError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::WriteFile { source: lhs_source }, Self::WriteFile { source: rhs_source }) => {
                lhs_source.kind() == rhs_source.kind()
            }
            (Self::ReadFile { source: lhs_source }, Self::ReadFile { source: rhs_source }) => {
                lhs_source.kind() == rhs_source.kind()
            }
            (lhs, rhs) => lhs == rhs,
        }
    }
}

/// Contains the certificate and the signing / embedded key pair.
///
/// A [`CertificateAuthority`](crate::issuer::CertificateAuthority) uses this
/// struct internally to store the signing key pair which is used to sign the
/// CA itself (self-signed) and all child certificates. Leaf certificates use
/// this to store the bound keypair.
#[derive(Debug)]
pub struct CertificatePair<S>
where
    S: CertificateKeypair,
    <S::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    certificate: Certificate,
    key_pair: S,
}

impl<S> CertificatePair<S>
where
    S: CertificateKeypair,
    <S::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    pub fn new(certificate: Certificate, key_pair: S) -> Self {
        Self {
            certificate,
            key_pair,
        }
    }

    /// Returns a reference to the [`Certificate`].
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Returns a reference to the (signing) key pair.
    pub fn key_pair(&self) -> &S {
        &self.key_pair
    }

    /// Writes the certificate and private key to `cert_path` and
    /// `key_path` respectively, both PEM-encoded.
    pub fn to_files(
        &self,
        cert_path: &Path,
        key_path: &Path,
    ) -> std::result::Result<(), CertificatePairError<S::Error>> {
        let cert_pem = self
            .certificate
            .to_pem(PEM_LINE_ENDING)
            .context(SerializeCertificateSnafu { key_encoding: KeyEncoding::Pem })?;
        std::fs::write(cert_path, cert_pem).context(WriteFileSnafu)?;

        let key_pem = self
            .key_pair
            .signing_key()
            .to_pkcs8_pem(PEM_LINE_ENDING)
            .context(SerializePrivateKeySnafu { key_encoding: KeyEncoding::Pem })?;
        std::fs::write(key_path, key_pem.as_str()).context(WriteFileSnafu)
    }

    /// Reads a PEM-encoded certificate and private key back from
    /// `cert_path` and `key_path`, the inverse of [`Self::to_files`].
    pub fn from_files(
        cert_path: &Path,
        key_path: &Path,
    ) -> std::result::Result<Self, CertificatePairError<S::Error>> {
        let cert_pem = std::fs::read_to_string(cert_path).context(ReadFileSnafu)?;
        let certificate = Certificate::from_pem(&cert_pem)
            .context(DeserializeCertificateSnafu { key_encoding: KeyEncoding::Pem })?;

        let key_pem = std::fs::read_to_string(key_path).context(ReadFileSnafu)?;
        let key_pair = S::from_pkcs8_pem(&key_pem)
            .context(DeserializePrivateKeySnafu { key_encoding: KeyEncoding::Pem })?;

        Ok(Self { certificate, key_pair })
    }
}

/// Private and public key encoding, either DER or PEM.
#[derive(Debug, PartialEq)]
pub enum KeyEncoding {
    Pem,
    Der,
}

impl std::fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyEncoding::Pem => write!(f, "PEM"),
            KeyEncoding::Der => write!(f, "DER"),
        }
    }
}

/// PEM line ending used whenever this crate serializes PEM documents.
pub const PEM_LINE_ENDING: pkcs8::LineEnding = pkcs8::LineEnding::LF;

pub(crate) use p256::pkcs8;
