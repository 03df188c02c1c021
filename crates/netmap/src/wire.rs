//! Wire encoding for [`SignedEnvelope`] values: the network map service
//! transmits a payload, a detached signature, and a leaf-to-root
//! certificate chain as one JSON object, with the signature and each
//! certificate in the chain base64-encoded DER.
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use zone_pki::factory;
use zone_pki::validate::SignedEnvelope;

#[derive(Debug, Snafu)]
pub enum WireError {
    #[snafu(display("failed to decode base64 signature"))]
    DecodeSignature { source: base64::DecodeError },

    #[snafu(display("failed to decode base64 certificate"))]
    DecodeCertificate { source: base64::DecodeError },

    #[snafu(display("failed to parse certificate from DER"))]
    ParseCertificate { source: zone_pki::factory::FactoryError },

    #[snafu(display("failed to encode certificate as DER"))]
    EncodeCertificate { source: zone_pki::factory::FactoryError },

    #[snafu(display("the certificate chain must contain at least one certificate"))]
    EmptyChain { source: zone_pki::factory::FactoryError },
}

pub type Result<T, E = WireError> = std::result::Result<T, E>;

/// The JSON-serializable shape of a [`SignedEnvelope`]. `x509_cert::Certificate`
/// isn't itself `Serialize`, so the chain travels as base64 DER strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEnvelope<T> {
    pub payload: T,
    pub signature: String,
    pub chain: Vec<String>,
}

/// Converts a [`SignedEnvelope`] into its wire form.
pub fn to_wire<T: Clone>(envelope: &SignedEnvelope<T>) -> Result<WireEnvelope<T>> {
    let chain = envelope
        .path
        .certificates()
        .iter()
        .map(|cert| factory::encode_der(cert).map(|der| BASE64.encode(der)))
        .collect::<std::result::Result<Vec<_>, _>>()
        .context(EncodeCertificateSnafu)?;

    Ok(WireEnvelope {
        payload: envelope.payload.clone(),
        signature: BASE64.encode(&envelope.signature),
        chain,
    })
}

/// Converts a wire envelope back into a [`SignedEnvelope`], parsing each
/// chain entry back into a certificate.
pub fn from_wire<T>(wire: WireEnvelope<T>) -> Result<SignedEnvelope<T>> {
    let signature = BASE64.decode(&wire.signature).context(DecodeSignatureSnafu)?;

    let certificates = wire
        .chain
        .iter()
        .map(|encoded| {
            let der = BASE64.decode(encoded).context(DecodeCertificateSnafu)?;
            factory::parse(&der).context(ParseCertificateSnafu)
        })
        .collect::<Result<Vec<_>>>()?;
    let path = factory::build_cert_path(certificates).context(EmptyChainSnafu)?;

    Ok(SignedEnvelope { payload: wire.payload, signature, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zone_pki::issuer::CertificateAuthority;
    use zone_pki::keys::{CertificateKeypair, ecdsa};
    use zone_pki::role::CertificateType;
    use zone_pki::validate::sign_envelope;

    #[test]
    fn an_envelope_round_trips_through_its_wire_form() {
        let root = CertificateAuthority::<ecdsa::SigningKey>::create_self_signed_root(
            "CN=Test Root",
            None,
            None,
        )
        .expect("failed to build root CA");

        let node_key = ecdsa::SigningKey::new().expect("failed to generate node key");
        let spki = zone_pki::issuer::subject_public_key_info::<_, ecdsa::Error>(&node_key.verifying_key())
            .expect("failed to encode spki");
        let node_cert = zone_pki::issuer::issue_certificate(
            CertificateType::NetworkMap,
            &root,
            "CN=Network Map",
            spki,
            None,
            None,
        )
        .expect("failed to issue network map cert");

        let path = factory::build_cert_path(vec![node_cert, root.certificate().clone()])
            .expect("failed to build cert path");
        let envelope =
            sign_envelope("a payload".to_owned(), &node_key, path).expect("failed to sign envelope");

        let wire = to_wire(&envelope).expect("failed to encode envelope");
        let serialized = serde_json::to_vec(&wire).expect("wire envelope should serialize");
        let decoded: WireEnvelope<String> =
            serde_json::from_slice(&serialized).expect("wire envelope should deserialize");

        let round_tripped = from_wire(decoded).expect("failed to decode envelope");
        assert_eq!(round_tripped.payload, envelope.payload);
        assert_eq!(round_tripped.signature, envelope.signature);
        assert_eq!(
            round_tripped.path.certificates().len(),
            envelope.path.certificates().len()
        );
    }
}
