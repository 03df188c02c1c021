//! The certificate role catalog (component B): a pure data table mapping
//! each [`CertificateType`] to the key usage bits, extended key usages, CA
//! flag, and optional [`Role`] tag it is issued with.
//!
//! Every non-root certificate carries its [`Role`] inside a non-critical,
//! platform-private extension so that validators can bind a signed artifact
//! to the role that is allowed to produce it (see [`crate::validate`]).
use const_oid::{AssociatedOid, ObjectIdentifier, db::rfc5280};
use x509_cert::{
    der::{
        self, Decode, Encode,
        asn1::{Int, OctetString},
    },
    ext::{
        AsExtension, Extension,
        pkix::{KeyUsage, KeyUsages},
    },
    name::Name,
};

/// OID reserved by this platform for the role extension. Unassigned private
/// enterprise arc, chosen so the extension never collides with a standard
/// RFC 5280 extension.
pub const ROLE_EXTENSION_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.50530.1.1");

/// The role tag carried inside the role extension of every non-root
/// certificate.
///
/// The numeric values are part of the wire format: they are the ASN.1
/// INTEGER written into the extension, and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    IntermediateCa = 1,
    NetworkMap = 2,
    ServiceIdentity = 3,
    NodeCa = 4,
    Tls = 5,
    LegalIdentity = 6,
    ConfidentialLegalIdentity = 7,
}

impl Role {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::IntermediateCa),
            2 => Some(Self::NetworkMap),
            3 => Some(Self::ServiceIdentity),
            4 => Some(Self::NodeCa),
            5 => Some(Self::Tls),
            6 => Some(Self::LegalIdentity),
            7 => Some(Self::ConfidentialLegalIdentity),
            _ => None,
        }
    }

    /// Extracts the role extension from a certificate's extension set, if
    /// present. Returns `Ok(None)` for a root certificate, which carries no
    /// role extension. Returns an error if the extension is present but
    /// malformed.
    pub fn extract(extensions: &[Extension]) -> Result<Option<Self>, der::Error> {
        let Some(ext) = extensions.iter().find(|e| e.extn_id == ROLE_EXTENSION_OID) else {
            return Ok(None);
        };

        let value = Int::from_der(ext.extn_value.as_bytes())?;
        let tag = value.as_bytes().last().copied().unwrap_or(0);

        Ok(Self::from_tag(tag))
    }
}

/// An [`x509_cert::ext::AsExtension`] implementation that embeds a [`Role`]
/// as a single ASN.1 INTEGER, non-critical, under [`ROLE_EXTENSION_OID`].
#[derive(Debug, Clone, Copy)]
pub struct RoleExtension(pub Role);

impl AssociatedOid for RoleExtension {
    const OID: ObjectIdentifier = ROLE_EXTENSION_OID;
}

impl Encode for RoleExtension {
    fn encoded_len(&self) -> Result<der::Length, der::Error> {
        Int::new(&[self.0 as u8])?.encoded_len()
    }

    fn encode(&self, writer: &mut impl der::Writer) -> Result<(), der::Error> {
        Int::new(&[self.0 as u8])?.encode(writer)
    }
}

impl AsExtension for RoleExtension {
    fn critical(&self, _subject: &Name, _extensions: &[Extension]) -> bool {
        false
    }

    fn to_extension(
        &self,
        _subject: &Name,
        _extensions: &[Extension],
    ) -> Result<Extension, der::Error> {
        let value = Int::new(&[self.0 as u8])?;
        let extn_value = OctetString::new(value.to_der()?)?;

        Ok(Extension {
            extn_id: ROLE_EXTENSION_OID,
            critical: false,
            extn_value,
        })
    }
}

/// The kind of certificate being issued. Determines the key usage,
/// extended key usage, CA flag, and role extension applied by the
/// [`crate::issuer`] (component C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateType {
    RootCa,
    IntermediateCa,
    NodeCa,
    LegalIdentity,
    Tls,
    NetworkMap,
    ServiceIdentity,
    ConfidentialLegalIdentity,
}

/// The catalog entry for a [`CertificateType`]: its key usage bit set,
/// extended key usages, CA flag, and optional role.
#[derive(Debug, Clone)]
pub struct CertificatePolicy {
    pub key_usage: KeyUsage,
    pub extended_key_usage: Vec<ObjectIdentifier>,
    pub is_ca: bool,
    pub role: Option<Role>,
}

/// Every certificate type carries these three extended key usages, matching
/// the base requirement for TLS client and server authentication.
fn standard_ekus() -> Vec<ObjectIdentifier> {
    vec![
        rfc5280::ID_KP_SERVER_AUTH,
        rfc5280::ID_KP_CLIENT_AUTH,
        rfc5280::ANY_EXTENDED_KEY_USAGE,
    ]
}

impl CertificateType {
    /// Looks up the [`CertificatePolicy`] for this certificate type. This is
    /// the whole of the certificate role catalog (component B): a pure
    /// function from type to policy, with no state of its own.
    pub fn policy(&self) -> CertificatePolicy {
        let ca_key_usage = KeyUsage(
            KeyUsages::DigitalSignature | KeyUsages::KeyCertSign | KeyUsages::CRLSign,
        );

        match self {
            CertificateType::RootCa => CertificatePolicy {
                key_usage: ca_key_usage,
                extended_key_usage: standard_ekus(),
                is_ca: true,
                role: None,
            },
            CertificateType::IntermediateCa => CertificatePolicy {
                key_usage: ca_key_usage,
                extended_key_usage: standard_ekus(),
                is_ca: true,
                role: Some(Role::IntermediateCa),
            },
            CertificateType::NodeCa => CertificatePolicy {
                key_usage: ca_key_usage,
                extended_key_usage: standard_ekus(),
                is_ca: true,
                role: Some(Role::NodeCa),
            },
            CertificateType::LegalIdentity => CertificatePolicy {
                key_usage: KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyCertSign),
                extended_key_usage: standard_ekus(),
                is_ca: true,
                role: Some(Role::LegalIdentity),
            },
            CertificateType::Tls => CertificatePolicy {
                key_usage: KeyUsage(
                    KeyUsages::DigitalSignature
                        | KeyUsages::KeyEncipherment
                        | KeyUsages::KeyAgreement,
                ),
                extended_key_usage: standard_ekus(),
                is_ca: false,
                role: Some(Role::Tls),
            },
            CertificateType::NetworkMap => CertificatePolicy {
                key_usage: KeyUsage(KeyUsages::DigitalSignature.into()),
                extended_key_usage: standard_ekus(),
                is_ca: false,
                role: Some(Role::NetworkMap),
            },
            CertificateType::ServiceIdentity => CertificatePolicy {
                key_usage: KeyUsage(KeyUsages::DigitalSignature.into()),
                extended_key_usage: standard_ekus(),
                is_ca: false,
                role: Some(Role::ServiceIdentity),
            },
            CertificateType::ConfidentialLegalIdentity => CertificatePolicy {
                key_usage: KeyUsage(KeyUsages::DigitalSignature.into()),
                extended_key_usage: standard_ekus(),
                is_ca: false,
                role: Some(Role::ConfidentialLegalIdentity),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tag_round_trips_through_the_extension() {
        for role in [
            Role::IntermediateCa,
            Role::NetworkMap,
            Role::ServiceIdentity,
            Role::NodeCa,
            Role::Tls,
            Role::LegalIdentity,
            Role::ConfidentialLegalIdentity,
        ] {
            let ext = RoleExtension(role)
                .to_extension(&Name::default(), &[])
                .expect("failed to build role extension");

            let extracted = Role::extract(std::slice::from_ref(&ext))
                .expect("failed to parse role extension")
                .expect("role extension was unexpectedly absent");

            assert_eq!(extracted, role);
        }
    }

    #[test]
    fn root_ca_has_no_role() {
        assert!(CertificateType::RootCa.policy().role.is_none());
    }

    #[test]
    fn every_type_carries_the_standard_ekus() {
        for ty in [
            CertificateType::RootCa,
            CertificateType::IntermediateCa,
            CertificateType::NodeCa,
            CertificateType::LegalIdentity,
            CertificateType::Tls,
            CertificateType::NetworkMap,
            CertificateType::ServiceIdentity,
            CertificateType::ConfidentialLegalIdentity,
        ] {
            assert_eq!(ty.policy().extended_key_usage.len(), 3);
        }
    }
}
