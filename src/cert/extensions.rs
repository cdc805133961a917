use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};

use crate::error::CertgenError;

/// `id-ad-ocsp` access method (RFC 5280 § 4.2.2.1).
pub const ID_AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
/// `id-ad-caIssuers` access method (RFC 5280 § 4.2.2.1).
pub const ID_AD_CA_ISSUERS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2");

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use certgen::cert::extensions::SubjectAltName;
/// use certgen::cert::extensions::ToAndFromX509Extension;
/// let san = SubjectAltName { names: vec!["example.com".to_string()] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError>
    where
        Self: Sized;
}

fn ia5(value: &str) -> Result<Ia5String, CertgenError> {
    Ia5String::new(value)
        .map_err(|e| CertgenError::InvalidInput(format!("'{value}' is not IA5: {e}")))
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// # Fields
/// * `names` - A list of DNS names, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAltName {
    pub names: Vec<String>,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(|name| ia5(name).map(GeneralName::DnsName))
                .collect::<Result<Vec<_>, _>>()?,
        );

        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let names = san
            .0
            .iter()
            .filter_map(|name| match name {
                GeneralName::DnsName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect();
        Ok(Self { names })
    }
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
///   `Some(0)` is an explicit zero constraint; `None` means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self, CertgenError> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let ku = X509KeyUsage::from(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku
            .0
            .iter()
            .map(|v| match *v {
                const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => {
                    Ok(ExtendedKeyUsageOption::OcspSigning)
                }
                const_oid::db::rfc5912::ID_KP_SERVER_AUTH => Ok(ExtendedKeyUsageOption::ServerAuth),
                const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => Ok(ExtendedKeyUsageOption::ClientAuth),
                const_oid::db::rfc5912::ID_KP_CODE_SIGNING => {
                    Ok(ExtendedKeyUsageOption::CodeSigning)
                }
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                    Ok(ExtendedKeyUsageOption::EmailProtection)
                }
                const_oid::db::rfc5912::ID_KP_TIME_STAMPING => {
                    Ok(ExtendedKeyUsageOption::TimeStamping)
                }
                other => Err(CertgenError::InvalidInput(format!(
                    "Unsupported extended key usage option {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtendedKeyUsageOption {
    /// Human readable label, as printed by `certgen classes`.
    pub fn label(self) -> &'static str {
        match self {
            ExtendedKeyUsageOption::ServerAuth => "Server Auth",
            ExtendedKeyUsageOption::ClientAuth => "Client Auth",
            ExtendedKeyUsageOption::CodeSigning => "Code Signing",
            ExtendedKeyUsageOption::EmailProtection => "Email Protection",
            ExtendedKeyUsageOption::TimeStamping => "Time Stamping",
            ExtendedKeyUsageOption::OcspSigning => "OCSP Signing",
        }
    }
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
        }
    }
}

/// Represents the Subject Key Identifier (SKI) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the `keyIdentifier` form is produced; it carries the issuer's
/// subject key identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;

        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// Represents the Certificate Policies extension, identifiers only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePolicies {
    pub policies: Vec<ObjectIdentifier>,
}

impl ToAndFromX509Extension for CertificatePolicies {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::CertificatePolicies::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let policies = x509_cert::ext::pkix::CertificatePolicies(
            self.policies
                .iter()
                .map(|oid| x509_cert::ext::pkix::certpolicy::PolicyInformation {
                    policy_identifier: *oid,
                    policy_qualifiers: None,
                })
                .collect(),
        );
        Ok(policies.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let policies = x509_cert::ext::pkix::CertificatePolicies::from_der(extension)?;
        Ok(Self {
            policies: policies.0.iter().map(|p| p.policy_identifier).collect(),
        })
    }
}

/// Represents the CRL Distribution Points extension: one full-name
/// distribution point per URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlDistributionPoints {
    pub urls: Vec<String>,
}

impl ToAndFromX509Extension for CrlDistributionPoints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::CrlDistributionPoints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let points = self
            .urls
            .iter()
            .map(|url| {
                Ok(DistributionPoint {
                    distribution_point: Some(DistributionPointName::FullName(vec![
                        GeneralName::UniformResourceIdentifier(ia5(url)?),
                    ])),
                    reasons: None,
                    crl_issuer: None,
                })
            })
            .collect::<Result<Vec<_>, CertgenError>>()?;
        Ok(x509_cert::ext::pkix::CrlDistributionPoints(points).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let points = x509_cert::ext::pkix::CrlDistributionPoints::from_der(extension)?;
        let urls = points
            .0
            .iter()
            .filter_map(|point| match &point.distribution_point {
                Some(DistributionPointName::FullName(names)) => Some(names),
                _ => None,
            })
            .flatten()
            .filter_map(|name| match name {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .collect();
        Ok(Self { urls })
    }
}

/// Represents the Authority Information Access extension: OCSP responders
/// and CA issuer certificate locations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorityInfoAccess {
    pub ocsp_servers: Vec<String>,
    pub issuing_certificate_urls: Vec<String>,
}

impl ToAndFromX509Extension for AuthorityInfoAccess {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityInfoAccessSyntax::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, CertgenError> {
        let ocsp = self.ocsp_servers.iter().map(|url| (ID_AD_OCSP, url));
        let issuers = self
            .issuing_certificate_urls
            .iter()
            .map(|url| (ID_AD_CA_ISSUERS, url));
        let descriptions = ocsp
            .chain(issuers)
            .map(|(method, url)| {
                Ok(x509_cert::ext::pkix::AccessDescription {
                    access_method: method,
                    access_location: GeneralName::UniformResourceIdentifier(ia5(url)?),
                })
            })
            .collect::<Result<Vec<_>, CertgenError>>()?;
        Ok(x509_cert::ext::pkix::AuthorityInfoAccessSyntax(descriptions).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, CertgenError> {
        let aia = x509_cert::ext::pkix::AuthorityInfoAccessSyntax::from_der(extension)?;
        let mut access = Self::default();
        for description in aia.0.iter() {
            let GeneralName::UniformResourceIdentifier(uri) = &description.access_location else {
                continue;
            };
            match description.access_method {
                ID_AD_OCSP => access.ocsp_servers.push(uri.to_string()),
                ID_AD_CA_ISSUERS => access.issuing_certificate_urls.push(uri.to_string()),
                _ => {}
            }
        }
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_constraints_keeps_explicit_zero() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(0),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(decoded, original);

        let unconstrained = BasicConstraints {
            is_ca: true,
            max_path_length: None,
        };
        let encoded_none = unconstrained.to_x509_extension_value().unwrap();
        assert_ne!(encoded, encoded_none);
        assert_eq!(
            BasicConstraints::from_x509_extension_value(&encoded_none).unwrap(),
            unconstrained
        );
    }

    #[test]
    fn test_authority_key_identifier_encoding_decoding() {
        let original = AuthorityKeyIdentifier {
            key_identifier: vec![1, 2, 3, 4, 5],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = AuthorityKeyIdentifier::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment);
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_subject_alt_name_rejects_non_ascii() {
        let san = SubjectAltName {
            names: vec!["bücher.example".to_string()],
        };
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(CertgenError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_authority_info_access_separates_methods() {
        let original = AuthorityInfoAccess {
            ocsp_servers: vec!["http://ocsp.example.com".to_string()],
            issuing_certificate_urls: vec![
                "http://pki.example.com/ca.crt".to_string(),
                "http://pki2.example.com/ca.crt".to_string(),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = AuthorityInfoAccess::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_crl_distribution_points_and_policies() {
        let crl = CrlDistributionPoints {
            urls: vec!["http://crl.example.com/root.crl".to_string()],
        };
        let decoded =
            CrlDistributionPoints::from_x509_extension_value(&crl.to_x509_extension_value().unwrap())
                .unwrap();
        assert_eq!(decoded, crl);

        let policies = CertificatePolicies {
            policies: vec![crate::policy::ANY_POLICY],
        };
        let decoded = CertificatePolicies::from_x509_extension_value(
            &policies.to_x509_extension_value().unwrap(),
        )
        .unwrap();
        assert_eq!(decoded, policies);
    }
}
