//! Shared signature-verification dispatch, used by the post-build invariant
//! check in [`crate::issuer`] and by the chain validator in
//! [`crate::validate`].
//!
//! The certificate factory and issuer are documented as consuming "the
//! platform's PKIX implementation"; concretely, that means dispatching on
//! the certificate's `signatureAlgorithm` OID to the matching RustCrypto
//! verifier rather than delegating to an external toolkit.
use const_oid::db::{rfc5912, rfc8410};
use ed25519_dalek::Verifier as Ed25519Verifier;
use p256::NistP256;
use rsa::pkcs1v15::VerifyingKey as RsaVerifyingKey;
use signature::Verifier;
use snafu::{ResultExt, Snafu};
use x509_cert::{
    Certificate,
    der::{Decode, Encode},
    spki::SubjectPublicKeyInfoOwned,
};

#[derive(Debug, Snafu)]
pub enum VerifyError {
    #[snafu(display("failed to re-encode TBS certificate for signature verification"))]
    EncodeTbs { source: x509_cert::der::Error },

    #[snafu(display("unsupported signature algorithm: {oid}"))]
    UnsupportedAlgorithm { oid: String },

    #[snafu(display("failed to interpret issuer public key"))]
    InvalidIssuerKey,

    #[snafu(display("failed to interpret certificate signature"))]
    InvalidSignature,

    #[snafu(display("signature does not verify under the issuer's public key"))]
    SignatureMismatch,
}

type Result<T, E = VerifyError> = std::result::Result<T, E>;

/// Verifies that `cert`'s signature validates under `issuer_spki`.
pub fn verify_certificate_signature(
    cert: &Certificate,
    issuer_spki: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    let tbs_der = cert.tbs_certificate.to_der().context(EncodeTbsSnafu)?;
    let sig_bytes = cert
        .signature
        .as_bytes()
        .ok_or(VerifyError::InvalidSignature)?;
    let oid = cert.signature_algorithm.oid;

    if oid == rfc5912::SHA_256_WITH_RSA_ENCRYPTION {
        let key =
            RsaVerifyingKey::<sha2::Sha256>::try_from(issuer_spki.clone()).map_err(|_| VerifyError::InvalidIssuerKey)?;
        let signature = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|_| VerifyError::InvalidSignature)?;
        key.verify(&tbs_der, &signature)
            .map_err(|_| VerifyError::SignatureMismatch)
    } else if oid == rfc5912::ECDSA_WITH_SHA_256 {
        let key = ecdsa::VerifyingKey::<NistP256>::try_from(issuer_spki.clone())
            .map_err(|_| VerifyError::InvalidIssuerKey)?;
        let signature = ecdsa::Signature::<NistP256>::from_der(sig_bytes)
            .map_err(|_| VerifyError::InvalidSignature)?;
        key.verify(&tbs_der, &signature)
            .map_err(|_| VerifyError::SignatureMismatch)
    } else if oid == rfc8410::ID_ED_25519 {
        let raw = issuer_spki
            .subject_public_key
            .as_bytes()
            .ok_or(VerifyError::InvalidIssuerKey)?;
        let raw: [u8; 32] = raw.try_into().map_err(|_| VerifyError::InvalidIssuerKey)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&raw)
            .map_err(|_| VerifyError::InvalidIssuerKey)?;
        let sig_bytes: [u8; 64] = sig_bytes.try_into().map_err(|_| VerifyError::InvalidSignature)?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        key.verify(&tbs_der, &signature)
            .map_err(|_| VerifyError::SignatureMismatch)
    } else {
        UnsupportedAlgorithmSnafu {
            oid: oid.to_string(),
        }
        .fail()
    }
}

/// Verifies that `message` was signed by the private key matching `spki`,
/// dispatching on the key's own algorithm identifier rather than a
/// certificate's `signatureAlgorithm` field. Used to verify a network map
/// or node info payload signed directly by a leaf certificate's key,
/// independent of how that leaf certificate itself was signed by its
/// issuer.
pub fn verify_raw_signature(
    cert: &Certificate,
    message: &[u8],
    sig_bytes: &[u8],
) -> Result<()> {
    let spki = &cert.tbs_certificate.subject_public_key_info;
    let oid = spki.algorithm.oid;

    if oid == rfc5912::RSA_ENCRYPTION {
        let key = RsaVerifyingKey::<sha2::Sha256>::try_from(spki.clone())
            .map_err(|_| VerifyError::InvalidIssuerKey)?;
        let signature =
            rsa::pkcs1v15::Signature::try_from(sig_bytes).map_err(|_| VerifyError::InvalidSignature)?;
        key.verify(message, &signature)
            .map_err(|_| VerifyError::SignatureMismatch)
    } else if oid == rfc5912::ID_EC_PUBLIC_KEY {
        let key = ecdsa::VerifyingKey::<NistP256>::try_from(spki.clone())
            .map_err(|_| VerifyError::InvalidIssuerKey)?;
        let signature = ecdsa::Signature::<NistP256>::from_der(sig_bytes)
            .map_err(|_| VerifyError::InvalidSignature)?;
        key.verify(message, &signature)
            .map_err(|_| VerifyError::SignatureMismatch)
    } else if oid == rfc8410::ID_ED_25519 {
        let raw = spki
            .subject_public_key
            .as_bytes()
            .ok_or(VerifyError::InvalidIssuerKey)?;
        let raw: [u8; 32] = raw.try_into().map_err(|_| VerifyError::InvalidIssuerKey)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&raw)
            .map_err(|_| VerifyError::InvalidIssuerKey)?;
        let sig_bytes: [u8; 64] = sig_bytes.try_into().map_err(|_| VerifyError::InvalidSignature)?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        key.verify(message, &signature)
            .map_err(|_| VerifyError::SignatureMismatch)
    } else {
        UnsupportedAlgorithmSnafu {
            oid: oid.to_string(),
        }
        .fail()
    }
}
