//! Certificate path validation (component D): walks a leaf-to-root
//! [`CertPath`] and confirms that every link is properly signed, every
//! certificate is currently time-valid, every non-leaf certificate is
//! marked as a CA, and the path terminates at a supplied trust anchor.
//!
//! Revocation checking (CRL/OCSP) is out of scope by design: this validator
//! only asserts the structural and cryptographic properties of the path.
use serde::{Serialize, de::DeserializeOwned};
use signature::{Keypair, Signer};
use snafu::{OptionExt, ResultExt, Snafu};
use time::OffsetDateTime;
use x509_cert::{
    Certificate,
    der::Decode,
    spki::{EncodePublicKey, SignatureBitStringEncoding, SubjectPublicKeyInfoOwned},
};

use crate::{
    factory::CertPath,
    keys::CertificateKeypair,
    role::Role,
    verify::{self, VerifyError},
};

#[derive(Debug, Snafu)]
pub enum ValidateError {
    #[snafu(display("certificate path must contain at least one certificate"))]
    EmptyPath,

    #[snafu(display("certificate at index {index} is not valid at the current time"))]
    NotTimeValid { index: usize },

    #[snafu(display("certificate at index {index} is not marked as a CA but signs another certificate"))]
    NotACertificateAuthority { index: usize },

    #[snafu(display("issuer of certificate at index {index} does not match the subject of the next certificate in the path"))]
    IssuerSubjectMismatch { index: usize },

    #[snafu(display("signature of certificate at index {index} does not verify under its issuer's key"))]
    SignatureVerification { index: usize, source: VerifyError },

    #[snafu(display("the path does not terminate at the supplied trust anchor"))]
    UntrustedRoot,

    #[snafu(display("signed envelope does not carry the expected role {expected:?}"))]
    WrongRole { expected: Role },

    #[snafu(display("signed envelope carries no role extension, but one was required"))]
    MissingRole,

    #[snafu(display("failed to parse envelope's role extension"))]
    ParseRole { source: x509_cert::der::Error },

    #[snafu(display("failed to serialize envelope payload"))]
    SerializePayload { source: serde_json::Error },

    #[snafu(display("failed to verify the envelope's signature"))]
    VerifyEnvelope { source: VerifyError },

    #[snafu(display("failed to encode signature"))]
    EncodeSignature { source: x509_cert::der::Error },
}

pub type Result<T, E = ValidateError> = std::result::Result<T, E>;

/// A validated leaf-to-root certificate path.
pub struct ChainValidator;

impl ChainValidator {
    /// Validates `path` against `trust_anchor`. The path must be ordered
    /// leaf-first; `trust_anchor` is compared against the last certificate
    /// in the path by subject public key, not by reference equality, so a
    /// self-signed root supplied as its own trust anchor validates too.
    pub fn validate(trust_anchor: &Certificate, path: &CertPath) -> Result<()> {
        let certs = path.certificates();
        snafu::ensure!(!certs.is_empty(), EmptyPathSnafu);

        let now: OffsetDateTime = std::time::SystemTime::now().into();
        for (index, cert) in certs.iter().enumerate() {
            let not_before: OffsetDateTime =
                cert.tbs_certificate.validity.not_before.to_system_time().into();
            let not_after: OffsetDateTime =
                cert.tbs_certificate.validity.not_after.to_system_time().into();
            snafu::ensure!(now >= not_before && now <= not_after, NotTimeValidSnafu { index });
        }

        for index in 0..certs.len() {
            let subject_cert = &certs[index];
            let issuer_cert = certs.get(index + 1).unwrap_or(trust_anchor);

            snafu::ensure!(
                subject_cert.tbs_certificate.issuer == issuer_cert.tbs_certificate.subject,
                IssuerSubjectMismatchSnafu { index }
            );

            if index > 0 {
                snafu::ensure!(is_ca(issuer_cert), NotACertificateAuthoritySnafu { index });
            }

            let issuer_spki = &issuer_cert.tbs_certificate.subject_public_key_info;
            verify::verify_certificate_signature(subject_cert, issuer_spki)
                .context(SignatureVerificationSnafu { index })?;
        }

        let root = certs.last().expect("checked non-empty above");
        let anchor_spki: &SubjectPublicKeyInfoOwned = &trust_anchor.tbs_certificate.subject_public_key_info;
        let root_spki: &SubjectPublicKeyInfoOwned = &root.tbs_certificate.subject_public_key_info;
        snafu::ensure!(
            root == trust_anchor || root_spki == anchor_spki,
            UntrustedRootSnafu
        );

        Ok(())
    }
}

fn is_ca(cert: &Certificate) -> bool {
    cert.tbs_certificate
        .extensions
        .as_ref()
        .into_iter()
        .flatten()
        .filter(|ext| ext.extn_id == const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS)
        .any(|ext| {
            x509_cert::ext::pkix::BasicConstraints::from_der(ext.extn_value.as_bytes())
                .map(|bc| bc.ca)
                .unwrap_or(false)
        })
}

/// A payload signed by a certificate whose role is meaningful to the
/// caller: the network-map distribution mechanism uses this to bind a
/// network map or node info to the `NETWORK_MAP` or node-CA role
/// respectively.
#[derive(Debug, Clone)]
pub struct SignedEnvelope<T> {
    pub payload: T,
    pub signature: Vec<u8>,
    pub path: CertPath,
}

/// Verifies that `envelope` is signed by a certificate bound to
/// `expected_role`, that the certificate's path validates against
/// `trust_anchor`, and that the signature over the serialized payload
/// verifies. Returns the payload on success (`verifyRoleBound`).
///
/// The role is checked before the chain is validated: a caller asking
/// "is this the network map speaking" should hear "no, wrong role" rather
/// than "no, untrusted chain" when both are true, since the wrong-role
/// envelope was never a candidate to trust in the first place.
pub fn verify_role_bound<T>(
    envelope: &SignedEnvelope<T>,
    expected_role: Role,
    trust_anchor: &Certificate,
) -> Result<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let leaf = envelope.path.leaf();
    let extensions = leaf.tbs_certificate.extensions.as_deref().unwrap_or(&[]);
    let role = Role::extract(extensions).context(ParseRoleSnafu)?.context(MissingRoleSnafu)?;
    snafu::ensure!(role == expected_role, WrongRoleSnafu { expected: expected_role });

    ChainValidator::validate(trust_anchor, &envelope.path)?;

    let serialized = serde_json::to_vec(&envelope.payload).context(SerializePayloadSnafu)?;
    verify::verify_raw_signature(leaf, &serialized, &envelope.signature)
        .context(VerifyEnvelopeSnafu)?;

    Ok(envelope.payload.clone())
}

/// Signs `payload` with `signer`'s private key, producing a [`SignedEnvelope`]
/// carrying `path` as its chain of custody. The signature is computed over
/// the same canonical JSON encoding [`verify_role_bound`] verifies against,
/// in the exact byte layout the certificate's own key algorithm expects
/// (DER for ECDSA, raw PKCS#1v1.5 bytes for RSA).
pub fn sign_envelope<T, SK>(payload: T, signer: &SK, path: CertPath) -> Result<SignedEnvelope<T>>
where
    T: Serialize,
    SK: CertificateKeypair,
    <SK::SigningKey as Keypair>::VerifyingKey: EncodePublicKey,
{
    let serialized = serde_json::to_vec(&payload).context(SerializePayloadSnafu)?;
    let signature: SK::Signature = signer.signing_key().sign(&serialized);
    let signature = signature
        .to_bitstring()
        .context(EncodeSignatureSnafu)?
        .raw_bytes()
        .to_vec();

    Ok(SignedEnvelope { payload, signature, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{factory, issuer::CertificateAuthority, keys::ecdsa};

    #[test]
    fn a_self_signed_root_validates_against_itself() {
        let root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root",
            None,
            None,
        )
        .expect("failed to build root CA");

        let path = factory::build_cert_path(vec![root.certificate().clone()])
            .expect("failed to build cert path");

        ChainValidator::validate(root.certificate(), &path).expect("root should self-validate");
    }

    #[test]
    fn issued_certificate_chains_to_its_root() {
        let root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root",
            None,
            None,
        )
        .expect("failed to build root CA");

        let node_key = ecdsa::SigningKey::new().expect("failed to generate node key");
        let spki = crate::issuer::subject_public_key_info::<_, ecdsa::Error>(&node_key.verifying_key())
            .expect("failed to encode spki");

        let node_cert = crate::issuer::issue_certificate(
            crate::role::CertificateType::NodeCa,
            &root,
            "CN=Node CA",
            spki,
            None,
            None,
        )
        .expect("failed to issue node CA cert");

        let path = factory::build_cert_path(vec![node_cert, root.certificate().clone()])
            .expect("failed to build cert path");

        ChainValidator::validate(root.certificate(), &path).expect("chain should validate");
    }

    #[test]
    fn wrong_role_takes_precedence_over_an_invalid_chain() {
        let root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root",
            None,
            None,
        )
        .expect("failed to build root CA");
        let other_root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Unrelated Root",
            None,
            None,
        )
        .expect("failed to build unrelated root CA");

        let node_key = ecdsa::SigningKey::new().expect("failed to generate node key");
        let spki = crate::issuer::subject_public_key_info::<_, ecdsa::Error>(&node_key.verifying_key())
            .expect("failed to encode spki");
        let node_cert = crate::issuer::issue_certificate(
            crate::role::CertificateType::NodeCa,
            &root,
            "CN=Node CA",
            spki,
            None,
            None,
        )
        .expect("failed to issue node CA cert");

        let path = factory::build_cert_path(vec![node_cert, root.certificate().clone()])
            .expect("failed to build cert path");
        let envelope = sign_envelope("payload".to_owned(), &node_key, path)
            .expect("failed to sign envelope");

        // Neither the role (NodeCa, not NetworkMap) nor the chain (anchored
        // to an unrelated root) would verify; the role mismatch must be
        // what's reported.
        let result = verify_role_bound(&envelope, Role::NetworkMap, other_root.certificate());
        assert!(matches!(
            result,
            Err(ValidateError::WrongRole { expected: Role::NetworkMap })
        ));
    }

    #[test]
    fn sign_envelope_round_trips_through_verify_role_bound() {
        let root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root",
            None,
            None,
        )
        .expect("failed to build root CA");

        let node_key = ecdsa::SigningKey::new().expect("failed to generate node key");
        let spki = crate::issuer::subject_public_key_info::<_, ecdsa::Error>(&node_key.verifying_key())
            .expect("failed to encode spki");
        let node_cert = crate::issuer::issue_certificate(
            crate::role::CertificateType::NetworkMap,
            &root,
            "CN=Network Map",
            spki,
            None,
            None,
        )
        .expect("failed to issue network map cert");

        let path = factory::build_cert_path(vec![node_cert, root.certificate().clone()])
            .expect("failed to build cert path");
        let envelope = sign_envelope("a network map payload".to_owned(), &node_key, path)
            .expect("failed to sign envelope");

        let payload = verify_role_bound(&envelope, Role::NetworkMap, root.certificate())
            .expect("signed envelope should verify");
        assert_eq!(payload, "a network map payload");
    }
}
