//! The certificate factory (component A): parses, normalizes, and builds
//! cert paths out of [`Certificate`] values.
//!
//! This factory is *not* assumed thread-safe: it holds no state of its own
//! today, but callers that later add caching or a pooled parser must
//! serialize access externally, one factory per logical owner (see the
//! design notes in `SPEC_FULL.md`).
use snafu::{OptionExt, ResultExt, Snafu};
use time::OffsetDateTime;
use x509_cert::{
    Certificate,
    der::{Decode, DecodePem, Encode, EncodePem},
};

use crate::PEM_LINE_ENDING;

#[derive(Debug, Snafu)]
pub enum FactoryError {
    #[snafu(display("failed to parse certificate"))]
    Parse { source: x509_cert::der::Error },

    #[snafu(display("failed to encode certificate as PEM"))]
    EncodePem { source: x509_cert::der::Error },

    #[snafu(display("certificate is not valid at the current time"))]
    NotTimeValid,

    #[snafu(display("a certificate path must contain at least one certificate"))]
    EmptyPath,
}

pub type Result<T, E = FactoryError> = std::result::Result<T, E>;

/// An ordered chain of certificates, leaf first, from which a
/// [`crate::validate::ChainValidator`] builds a validation path.
#[derive(Debug, Clone)]
pub struct CertPath(Vec<Certificate>);

impl CertPath {
    pub fn certificates(&self) -> &[Certificate] {
        &self.0
    }

    pub fn leaf(&self) -> &Certificate {
        // build_cert_path rejects empty input, so indexing is safe.
        &self.0[0]
    }
}

/// Parses a certificate from its binary DER representation.
pub fn parse(der: &[u8]) -> Result<Certificate> {
    Certificate::from_der(der).context(ParseSnafu)
}

/// Parses a certificate from a single PEM object and validates that it is
/// currently time-valid. Rejects PEM input containing more than one object,
/// mirroring the factory's "one pem object per file" contract.
pub fn parse_pem(pem: &str) -> Result<Certificate> {
    let certificate = Certificate::from_pem(pem).context(ParseSnafu)?;

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

    snafu::ensure!(now >= not_before && now <= not_after, NotTimeValidSnafu);

    Ok(certificate)
}

/// Encodes a certificate as a PEM document.
pub fn encode_pem(certificate: &Certificate) -> Result<String> {
    certificate
        .to_pem(PEM_LINE_ENDING)
        .context(EncodePemSnafu)
}

/// Encodes a certificate as DER bytes.
pub fn encode_der(certificate: &Certificate) -> Result<Vec<u8>> {
    certificate.to_der().context(ParseSnafu)
}

/// Builds a [`CertPath`] out of an ordered, leaf-first list of certificates.
pub fn build_cert_path(certificates: Vec<Certificate>) -> Result<CertPath> {
    snafu::ensure!(!certificates.is_empty(), EmptyPathSnafu);
    Ok(CertPath(certificates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        issuer::CertificateAuthority,
        keys::ecdsa,
    };

    #[test]
    fn pem_round_trip_preserves_the_certificate() {
        let ca = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root",
            None,
            None,
        )
        .expect("failed to build root CA");

        let pem = encode_pem(ca.certificate()).expect("failed to encode PEM");
        let parsed = parse_pem(&pem).expect("failed to parse PEM");

        assert_eq!(parsed, *ca.certificate());
    }

    #[test]
    fn build_cert_path_rejects_empty_input() {
        assert!(matches!(build_cert_path(vec![]), Err(FactoryError::EmptyPath)));
    }
}
