//! Contains primitives to create private keys, which are used to sign CAs
//! and bind to leaf certificates.
//!
//! This module currently provides the following algorithms:
//!
//! ## ECDSA
//!
//! In order to work with ECDSA keys, this crate requires two dependencies:
//! [`ecdsa`], which provides primitives and traits, and [`p256`] which
//! implements the NIST P-256 elliptic curve and supports ECDSA. This is the
//! scheme named `ECDSA_SECP256R1_SHA256` in the signature scheme catalog and
//! is the default for TLS certificates and certificate signing requests.
//!
//! ```ignore
//! use zone_pki::keys::ecdsa::SigningKey;
//! let key = SigningKey::new().unwrap();
//! ```
//!
//! ## RSA
//!
//! In order to work with RSA keys, this crate requires the [`rsa`] dependency.
//!
//! ```ignore
//! use zone_pki::keys::rsa::SigningKey;
//! let key = SigningKey::new().unwrap();
//! ```
//!
//! It should be noted, that the crate is currently vulnerable to the recently
//! discovered Marvin attack. The `openssl` crate is also impacted by this. See:
//!
//! - <https://people.redhat.com/~hkario/marvin/>
//! - <https://rustsec.org/advisories/RUSTSEC-2023-0071.html>
//! - <https://github.com/RustCrypto/RSA/issues/19>
use std::fmt::Debug;

use p256::pkcs8::EncodePrivateKey;
use signature::{Keypair, Signer};
use x509_cert::spki::{EncodePublicKey, SignatureAlgorithmIdentifier, SignatureBitStringEncoding};

pub mod ecdsa;
pub mod rsa;

/// A named signature scheme, mirroring the `Crypto.findSignatureScheme`
/// collaborator: a stable name plus the key algorithm it is backed by.
///
/// Two schemes are guaranteed to exist in [`SCHEMES`]: `EDDSA_ED25519_SHA512`
/// and `ECDSA_SECP256R1_SHA256` (the default for TLS and CSRs). Only the
/// latter currently backs a [`CertificateKeypair`] implementation; Ed25519
/// remains in the catalog and in [`crate::verify`]'s verification dispatch
/// (certificates issued elsewhere may carry an Ed25519 key) but has no
/// generator here, matching the teacher crate's own RSA/ECDSA-only keypair
/// coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureScheme {
    pub name: &'static str,
}

pub const EDDSA_ED25519_SHA512: SignatureScheme = SignatureScheme {
    name: "EDDSA_ED25519_SHA512",
};

pub const ECDSA_SECP256R1_SHA256: SignatureScheme = SignatureScheme {
    name: "ECDSA_SECP256R1_SHA256",
};

/// All signature schemes known to this crate.
pub const SCHEMES: &[SignatureScheme] = &[EDDSA_ED25519_SHA512, ECDSA_SECP256R1_SHA256];

// NOTE: This can _maybe_ be slightly simplified by adjusting the trait and
// using a blanket impl on types which implement Deref<Target = _>.
pub trait CertificateKeypair
where
    <Self::SigningKey as Keypair>::VerifyingKey: EncodePublicKey,
    Self: Debug + Sized,
{
    type SigningKey: SignatureAlgorithmIdentifier
        + Keypair
        + Signer<Self::Signature>
        + EncodePrivateKey;
    type Signature: SignatureBitStringEncoding;
    type VerifyingKey: EncodePublicKey;

    type Error: std::error::Error + 'static;

    /// The signature scheme this keypair type implements.
    fn scheme() -> SignatureScheme;

    /// Creates a new random keypair using the OS random-number generator.
    fn new() -> Result<Self, Self::Error>;

    /// Returns the signing (private) key half of the keypair.
    fn signing_key(&self) -> &Self::SigningKey;

    /// Returns the verifying (public) half of the keypair.
    fn verifying_key(&self) -> Self::VerifyingKey;

    /// Creates a signing key pair from the PEM-encoded private key.
    fn from_pkcs8_pem(input: &str) -> Result<Self, Self::Error>;
}
