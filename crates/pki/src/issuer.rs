//! The certificate issuer (component C): builds, signs, and verifies
//! certificates and certificate signing requests.
//!
//! This module owns the `buildPartial` algorithm from the design: compute a
//! validity window clamped to the issuing parent, draw a 63-bit random
//! serial, attach the standard extension set plus the role extension for
//! non-root types, sign, and assert the post-build invariants (the built
//! certificate is time-valid and its signature verifies under the issuer's
//! public key) before handing it back to the caller.
use std::path::Path;

use rand::RngCore;
use rsa::pkcs8::EncodePublicKey;
use snafu::{OptionExt, ResultExt, Snafu};
use time::{Duration as TimeDuration, OffsetDateTime};
use x509_cert::{
    Certificate,
    builder::{Builder, CertificateBuilder, Profile},
    der::{DecodePem, referenced::OwnedToRef},
    ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, NameConstraints, SubjectKeyIdentifier},
    name::Name,
    serial_number::SerialNumber,
    spki::SubjectPublicKeyInfoOwned,
    time::Validity,
};

use crate::{
    CertificatePair, PEM_LINE_ENDING,
    keys::CertificateKeypair,
    role::{CertificateType, Role, RoleExtension},
    verify::{self, VerifyError},
};

/// The default certificate validity window: `(0, 3650 days)`.
pub const DEFAULT_VALIDITY: TimeDuration = TimeDuration::days(3650);

/// The default root CA validity window.
pub const DEFAULT_CA_VALIDITY: TimeDuration = TimeDuration::days(3650);

#[derive(Debug, Snafu)]
pub enum IssuerError<E>
where
    E: std::error::Error + 'static,
{
    #[snafu(display("failed to parse \"{subject}\" as subject"))]
    ParseSubject {
        source: x509_cert::der::Error,
        subject: String,
    },

    #[snafu(display("failed to create key pair"))]
    CreateKeyPair { source: E },

    #[snafu(display("failed to serialize public key as PEM"))]
    SerializePublicKey { source: x509_cert::spki::Error },

    #[snafu(display("failed to decode SPKI from PEM"))]
    DecodeSpkiFromPem { source: x509_cert::der::Error },

    #[snafu(display("the computed validity window is empty (not_before > not_after)"))]
    EmptyValidityWindow,

    #[snafu(display("failed to parse validity window"))]
    ParseValidity { source: x509_cert::der::Error },

    #[snafu(display("failed to create certificate builder"))]
    CreateCertificateBuilder { source: x509_cert::builder::Error },

    #[snafu(display("failed to add certificate extension"))]
    AddCertificateExtension { source: x509_cert::builder::Error },

    #[snafu(display("failed to build certificate"))]
    BuildCertificate { source: x509_cert::builder::Error },

    #[snafu(display("issued certificate failed its post-build invariant check"))]
    PostBuildInvariant { source: VerifyError },

    #[snafu(display("issued certificate is not valid at the moment it was built"))]
    NotTimeValidAfterBuild,
}

pub type Result<T, E> = std::result::Result<T, IssuerError<E>>;

/// A certificate authority: a certificate plus the key pair that signs
/// itself (when a root) or that a caller presents as the parent when
/// issuing further certificates with [`issue_certificate`].
#[derive(Debug)]
pub struct CertificateAuthority<SK>
where
    SK: CertificateKeypair,
    <SK::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    pair: CertificatePair<SK>,
}

impl<SK> CertificateAuthority<SK>
where
    SK: CertificateKeypair,
    <SK::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    pub fn certificate(&self) -> &Certificate {
        self.pair.certificate()
    }

    pub fn signing_key(&self) -> &SK::SigningKey {
        self.pair.key_pair().signing_key()
    }

    pub fn key_pair(&self) -> &SK {
        self.pair.key_pair()
    }

    pub fn issuer_name(&self) -> &Name {
        &self.certificate().tbs_certificate.subject
    }

    /// Writes this authority's certificate and private key to disk,
    /// PEM-encoded. See [`CertificatePair::to_files`].
    pub fn to_files(
        &self,
        cert_path: &Path,
        key_path: &Path,
    ) -> std::result::Result<(), crate::CertificatePairError<SK::Error>> {
        self.pair.to_files(cert_path, key_path)
    }

    fn window(&self) -> (OffsetDateTime, OffsetDateTime) {
        let validity = &self.certificate().tbs_certificate.validity;
        (
            validity.not_before.to_system_time().into(),
            validity.not_after.to_system_time().into(),
        )
    }

    /// Creates a self-signed `ROOT_CA` certificate (`createSelfSignedRoot`).
    /// Issuer and subject are identical, and the certificate is signed by
    /// its own private key.
    pub fn create_self_signed_root(
        subject: &str,
        key_pair: Option<SK>,
        validity: Option<TimeDuration>,
    ) -> Result<Self, SK::Error> {
        let validity = validity.unwrap_or(DEFAULT_CA_VALIDITY);
        let window = compute_validity_window(validity, validity, None)?;

        let subject_name: Name = subject.parse().context(ParseSubjectSnafu { subject })?;
        let key_pair = match key_pair {
            Some(key_pair) => key_pair,
            None => SK::new().context(CreateKeyPairSnafu)?,
        };

        let spki = subject_public_key_info(&key_pair.verifying_key())?;
        let serial = random_serial();
        let x509_validity = to_x509_validity(window)?;

        let signing_key = key_pair.signing_key();
        let mut builder = CertificateBuilder::new(
            Profile::Root,
            serial,
            x509_validity,
            subject_name,
            spki.clone(),
            signing_key,
        )
        .context(CreateCertificateBuilderSnafu)?;

        let ski = SubjectKeyIdentifier::try_from(spki.owned_to_ref())
            .context(ParseValiditySnafu)?;
        builder
            .add_extension(&ski)
            .context(AddCertificateExtensionSnafu)?;

        let policy = CertificateType::RootCa.policy();
        builder
            .add_extension(&BasicConstraints {
                ca: policy.is_ca,
                path_len_constraint: None,
            })
            .context(AddCertificateExtensionSnafu)?;
        builder
            .add_extension(&policy.key_usage)
            .context(AddCertificateExtensionSnafu)?;
        builder
            .add_extension(&ExtendedKeyUsage(policy.extended_key_usage))
            .context(AddCertificateExtensionSnafu)?;

        let certificate = builder.build().context(BuildCertificateSnafu)?;
        assert_post_build_invariants(&certificate, &spki)?;

        Ok(Self {
            pair: CertificatePair::new(certificate, key_pair),
        })
    }
}

/// Converts a verifying key into a [`SubjectPublicKeyInfoOwned`] by routing
/// it through PEM, the way the teacher crate's cert and CA builders do.
pub fn subject_public_key_info<K, E>(key: &K) -> Result<SubjectPublicKeyInfoOwned, E>
where
    K: EncodePublicKey,
    E: std::error::Error + 'static,
{
    let pem = key
        .to_public_key_pem(PEM_LINE_ENDING)
        .context(SerializePublicKeySnafu)?;
    SubjectPublicKeyInfoOwned::from_pem(pem.as_bytes()).context(DecodeSpkiFromPemSnafu)
}

/// Draws a random 63-bit positive serial number from the OS CSPRNG.
/// Explicitly 63, not 64, bits: clearing the top bit avoids a sign-extended
/// (and therefore negative) DER INTEGER on implementations that treat the
/// serial as a signed value.
pub(crate) fn random_serial() -> SerialNumber {
    let mut bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes[0] &= 0x7F;

    SerialNumber::from(u64::from_be_bytes(bytes))
}

/// Truncates an instant to midnight UTC, the anchor used for validity
/// window computation.
fn midnight_utc(now: OffsetDateTime) -> OffsetDateTime {
    now.replace_time(time::Time::MIDNIGHT)
}

/// Computes `(notBefore, notAfter)` per the `buildPartial` algorithm:
/// anchored at midnight UTC, widened by `before`/`after`, then clamped to
/// `parent`'s own window if one is supplied. Fails if the resulting
/// interval is empty.
pub fn compute_validity_window<E>(
    before: TimeDuration,
    after: TimeDuration,
    parent: Option<(OffsetDateTime, OffsetDateTime)>,
) -> Result<(OffsetDateTime, OffsetDateTime), E>
where
    E: std::error::Error + 'static,
{
    let anchor = midnight_utc(OffsetDateTime::now_utc());
    let mut not_before = anchor - before;
    let mut not_after = anchor + after;

    if let Some((parent_not_before, parent_not_after)) = parent {
        not_before = not_before.max(parent_not_before);
        not_after = not_after.min(parent_not_after);
    }

    snafu::ensure!(not_before <= not_after, EmptyValidityWindowSnafu);
    Ok((not_before, not_after))
}

fn to_x509_validity<E>(window: (OffsetDateTime, OffsetDateTime)) -> Result<Validity, E>
where
    E: std::error::Error + 'static,
{
    let not_before = x509_cert::time::Time::try_from(std::time::SystemTime::from(window.0))
        .context(ParseValiditySnafu)?;
    let not_after = x509_cert::time::Time::try_from(std::time::SystemTime::from(window.1))
        .context(ParseValiditySnafu)?;

    let mut v = Validity::from_now(std::time::Duration::from_secs(0)).context(ParseValiditySnafu)?;
    v.not_before = not_before;
    v.not_after = not_after;
    Ok(v)
}

fn assert_post_build_invariants<E>(
    certificate: &Certificate,
    issuer_spki: &SubjectPublicKeyInfoOwned,
) -> Result<(), E>
where
    E: std::error::Error + 'static,
{
    let now: OffsetDateTime = std::time::SystemTime::now().into();
    let not_before: OffsetDateTime = certificate
        .tbs_certificate
        .validity
        .not_before
        .to_system_time()
        .into();
    let not_after: OffsetDateTime = certificate
        .tbs_certificate
        .validity
        .not_after
        .to_system_time()
        .into();

    snafu::ensure!(now >= not_before && now <= not_after, NotTimeValidAfterBuildSnafu);

    verify::verify_certificate_signature(certificate, issuer_spki).context(PostBuildInvariantSnafu)
}

/// Issues a certificate of `cert_type`, signed by `issuer`. Derives the
/// issuer DN from the CA's own certificate and clamps the requested
/// validity to the CA's own window (`createCertificate` convenience
/// overload).
pub fn issue_certificate<SK>(
    cert_type: CertificateType,
    issuer: &CertificateAuthority<SK>,
    subject: &str,
    subject_spki: SubjectPublicKeyInfoOwned,
    validity: Option<TimeDuration>,
    name_constraints: Option<NameConstraints>,
) -> Result<Certificate, SK::Error>
where
    SK: CertificateKeypair,
    <SK::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    let validity = validity.unwrap_or(DEFAULT_VALIDITY);
    let window = compute_validity_window(validity, validity, Some(issuer.window()))?;

    let certificate = issue_certificate_with_signer(
        cert_type,
        issuer.issuer_name().clone(),
        issuer.signing_key(),
        subject,
        subject_spki.clone(),
        window,
        name_constraints,
    )?;

    let issuer_spki = subject_public_key_info::<_, SK::Error>(&issuer.key_pair().verifying_key())?;
    assert_post_build_invariants(&certificate, &issuer_spki)?;

    Ok(certificate)
}

/// Lowest-level issuance primitive (`createCertificate` with an explicit
/// issuer DN and opaque content signer). Used directly when the caller
/// holds a raw signing key rather than a [`CertificateAuthority`] wrapper.
pub fn issue_certificate_with_signer<S, Sig, E>(
    cert_type: CertificateType,
    issuer_dn: Name,
    signer: &S,
    subject: &str,
    subject_spki: SubjectPublicKeyInfoOwned,
    window: (OffsetDateTime, OffsetDateTime),
    name_constraints: Option<NameConstraints>,
) -> Result<Certificate, E>
where
    S: x509_cert::spki::SignatureAlgorithmIdentifier
        + signature::Signer<Sig>
        + signature::KeypairRef,
    S::VerifyingKey: EncodePublicKey,
    Sig: x509_cert::spki::SignatureBitStringEncoding,
    E: std::error::Error + 'static,
{
    let policy = cert_type.policy();
    let subject_name: Name = subject.parse().context(ParseSubjectSnafu { subject })?;
    let serial = random_serial();
    let x509_validity = to_x509_validity(window)?;

    let profile = if policy.is_ca {
        Profile::SubCA {
            issuer: issuer_dn,
            path_len_constraint: None,
        }
    } else {
        Profile::Leaf {
            issuer: issuer_dn,
            enable_key_agreement: matches!(cert_type, CertificateType::Tls),
            enable_key_encipherment: matches!(cert_type, CertificateType::Tls),
        }
    };

    let mut builder = CertificateBuilder::new(
        profile,
        serial,
        x509_validity,
        subject_name,
        subject_spki.clone(),
        signer,
    )
    .context(CreateCertificateBuilderSnafu)?;

    let ski = SubjectKeyIdentifier::try_from(subject_spki.owned_to_ref())
        .context(ParseValiditySnafu)?;
    builder
        .add_extension(&ski)
        .context(AddCertificateExtensionSnafu)?;
    builder
        .add_extension(&BasicConstraints {
            ca: policy.is_ca,
            path_len_constraint: None,
        })
        .context(AddCertificateExtensionSnafu)?;
    builder
        .add_extension(&policy.key_usage)
        .context(AddCertificateExtensionSnafu)?;
    builder
        .add_extension(&ExtendedKeyUsage(policy.extended_key_usage))
        .context(AddCertificateExtensionSnafu)?;

    if let Some(role) = policy.role {
        builder
            .add_extension(&RoleExtension(role))
            .context(AddCertificateExtensionSnafu)?;
    }

    if let Some(name_constraints) = name_constraints {
        builder
            .add_extension(&name_constraints)
            .context(AddCertificateExtensionSnafu)?;
    }

    builder.build().context(BuildCertificateSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{ecdsa, rsa};

    #[test]
    fn self_signed_root_has_no_role_and_is_a_ca() {
        let ca = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root CA",
            None,
            None,
        )
        .expect("failed to build root CA");

        let extensions = ca
            .certificate()
            .tbs_certificate
            .extensions
            .as_ref()
            .expect("root CA had no extensions");
        assert!(Role::extract(extensions).expect("role parse failed").is_none());
    }

    #[test]
    fn issued_node_ca_carries_the_node_ca_role_and_chains_to_the_parent_window() {
        let root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root CA",
            None,
            None,
        )
        .expect("failed to build root CA");

        let node_key = rsa::SigningKey::new().expect("failed to generate node key");
        let spki =
            subject_public_key_info::<_, rsa::Error>(&node_key.verifying_key()).expect("spki");

        let cert = issue_certificate(
            CertificateType::NodeCa,
            &root,
            "CN=Node CA",
            spki,
            None,
            None,
        )
        .expect("failed to issue node CA certificate");

        let extensions = cert
            .tbs_certificate
            .extensions
            .as_ref()
            .expect("node CA cert had no extensions");
        let role = Role::extract(extensions)
            .expect("role parse failed")
            .expect("node CA must carry a role");
        assert_eq!(role, Role::NodeCa);

        let (root_not_before, root_not_after) = root.window();
        let cert_not_before: OffsetDateTime =
            cert.tbs_certificate.validity.not_before.to_system_time().into();
        let cert_not_after: OffsetDateTime =
            cert.tbs_certificate.validity.not_after.to_system_time().into();
        assert!(cert_not_before >= root_not_before);
        assert!(cert_not_after <= root_not_after);
    }

    #[test]
    fn empty_validity_window_is_rejected() {
        let result = compute_validity_window::<rsa::Error>(
            TimeDuration::seconds(-10),
            TimeDuration::ZERO,
            None,
        );
        assert!(matches!(result, Err(IssuerError::EmptyValidityWindow)));
    }
}
