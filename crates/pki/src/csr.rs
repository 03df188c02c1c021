//! Certificate signing request creation (the `createCertificateSigningRequest`
//! operation of component C). A CSR pairs a subject DN and public key with a
//! PKCS#9 `emailAddress` attribute and is signed by the requester's own key,
//! exactly mirroring the shape of [`crate::issuer`]'s certificate builder but
//! targeting [`x509_cert::request::CertReq`] instead of [`x509_cert::Certificate`].
use const_oid::{AssociatedOid, ObjectIdentifier};
use rsa::pkcs8::EncodePublicKey;
use snafu::{ResultExt, Snafu};
use x509_cert::{
    builder::{Builder, RequestBuilder},
    der::{EncodeValue, Length, Tag, Tagged, Writer, asn1::Utf8StringRef},
    name::Name,
    request::{CertReq, attributes::AsAttribute},
};

use crate::keys::CertificateKeypair;

/// PKCS#9 `emailAddress` attribute OID.
const EMAIL_ADDRESS_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");

/// A PKCS#9 `emailAddress` attribute value, encoded as a UTF8String.
struct EmailAddress<'a>(Utf8StringRef<'a>);

impl AssociatedOid for EmailAddress<'_> {
    const OID: ObjectIdentifier = EMAIL_ADDRESS_OID;
}

impl Tagged for EmailAddress<'_> {
    fn tag(&self) -> Tag {
        self.0.tag()
    }
}

impl EncodeValue for EmailAddress<'_> {
    fn value_len(&self) -> x509_cert::der::Result<Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> x509_cert::der::Result<()> {
        self.0.encode_value(writer)
    }
}

impl AsAttribute for EmailAddress<'_> {}

#[derive(Debug, Snafu)]
pub enum CsrError {
    #[snafu(display("failed to parse \"{subject}\" as subject"))]
    ParseSubject {
        source: x509_cert::der::Error,
        subject: String,
    },

    #[snafu(display("\"{email}\" is not a valid UTF8String attribute value"))]
    InvalidEmail {
        source: x509_cert::der::Error,
        email: String,
    },

    #[snafu(display("failed to build certificate signing request"))]
    Build { source: x509_cert::builder::Error },
}

pub type Result<T, E = CsrError> = std::result::Result<T, E>;

/// Builds a PKCS#10 certificate signing request for `subject`, carrying
/// `email` as an `emailAddress` attribute, signed with `key_pair`'s own
/// signing key.
pub fn create_certificate_signing_request<SK>(
    subject: &str,
    email: &str,
    key_pair: &SK,
) -> Result<CertReq>
where
    SK: CertificateKeypair,
    <SK::SigningKey as signature::Keypair>::VerifyingKey: EncodePublicKey,
{
    let subject_name: Name = subject.parse().context(ParseSubjectSnafu { subject })?;

    let mut builder =
        RequestBuilder::new(subject_name, key_pair.signing_key()).context(BuildSnafu)?;

    let email_value = Utf8StringRef::new(email).context(InvalidEmailSnafu { email })?;
    builder
        .add_attribute(&EmailAddress(email_value))
        .context(BuildSnafu)?;

    builder.build().context(BuildSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ecdsa;

    #[test]
    fn csr_carries_the_requested_subject_and_email() {
        let key_pair = ecdsa::SigningKey::new().expect("failed to generate key pair");

        let csr = create_certificate_signing_request(
            "CN=Alice Node,O=Example Zone",
            "alice@example.invalid",
            &key_pair,
        )
        .expect("failed to build CSR");

        assert_eq!(
            csr.info.subject.to_string(),
            "CN=Alice Node,O=Example Zone"
        );
        assert!(
            csr.info
                .attributes
                .iter()
                .any(|attr| attr.oid == EMAIL_ADDRESS_OID)
        );
    }

    #[test]
    fn rejects_a_malformed_subject() {
        let key_pair = ecdsa::SigningKey::new().expect("failed to generate key pair");
        let result =
            create_certificate_signing_request("not a distinguished name", "a@b.invalid", &key_pair);
        assert!(result.is_err());
    }
}
