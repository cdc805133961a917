pub mod extensions;
pub mod params;
pub mod template;

use const_oid::ObjectIdentifier;
use der::asn1::Any;
use der::{Decode, Encode, EncodePem};
use extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{DistinguishedName, ExtensionParam};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{CertgenError, Result};
use crate::key::{PublicKey, serial_from_bytes};
use crate::pem_utils::{CERTIFICATE_LABEL, pem_to_der};

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS#1 v1.5).
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// Ed25519 (PureEdDSA).
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        }
    }

    /// The algorithm a signature made by `key` must carry.
    pub fn for_public_key(key: &PublicKey) -> Self {
        match key {
            PublicKey::Rsa(_) => SignatureAlgorithm::Sha256WithRSA,
            PublicKey::EcdsaP256(_) => SignatureAlgorithm::Sha256WithECDSA,
            PublicKey::EcdsaP384(_) => SignatureAlgorithm::Sha384WithECDSA,
            PublicKey::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA carries explicit NULL parameters (RFC 4055 § 5); ECDSA and
    /// Ed25519 carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value {
            SignatureAlgorithm::Sha256WithRSA => Some(Any::null()),
            _ => None,
        };
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    /// Parses the first `CERTIFICATE` block of a PEM document.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&pem_to_der(pem, CERTIFICATE_LABEL)?)
    }

    /// Encodes the certificate into DER format.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded certificate.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertgenError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    ///
    /// # Returns
    /// A string containing the PEM-encoded certificate.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertgenError::EncodingError(e.to_string()))
    }

    pub fn serial_number(&self) -> Result<u128> {
        serial_from_bytes(self.inner.tbs_certificate.serial_number.as_bytes())
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// All extensions, in certificate order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(ExtensionParam::from_x509_extension)
            .collect()
    }

    /// Decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    pub fn subject_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0))
    }

    /// Checks that `issuer` issued this certificate: the issuer name chains
    /// to the issuer's subject and the signature verifies with its key.
    pub fn verify_issued_by(&self, issuer: &Certificate) -> Result<()> {
        if self.inner.tbs_certificate.issuer != issuer.inner.tbs_certificate.subject {
            return Err(CertgenError::CryptoError(format!(
                "issuer name '{}' does not match '{}'",
                self.inner.tbs_certificate.issuer, issuer.inner.tbs_certificate.subject
            )));
        }

        let issuer_key = issuer.public_key()?;
        let expected = SignatureAlgorithm::for_public_key(&issuer_key).oid();
        if self.inner.signature_algorithm.oid != expected {
            return Err(CertgenError::CryptoError(format!(
                "signature algorithm {} does not match the issuer key",
                self.inner.signature_algorithm.oid
            )));
        }

        let tbs = self.inner.tbs_certificate.to_der()?;
        issuer_key.verify(&tbs, self.inner.signature.raw_bytes())
    }

    /// Decodes the fields issuance cares about.
    pub fn info(&self) -> Result<CertificateInfo> {
        let tbs = &self.inner.tbs_certificate;
        let san = self.extension::<SubjectAltName>()?;
        let eku = self.extension::<ExtendedKeyUsage>()?;
        let policies = self.extension::<CertificatePolicies>()?;
        let crl = self.extension::<CrlDistributionPoints>()?;

        Ok(CertificateInfo {
            serial_number: self.serial_number()?,
            subject: DistinguishedName::from_x509_name(&tbs.subject)?,
            issuer: DistinguishedName::from_x509_name(&tbs.issuer)?,
            not_before: OffsetDateTime::from(tbs.validity.not_before.to_system_time()),
            not_after: OffsetDateTime::from(tbs.validity.not_after.to_system_time()),
            basic_constraints: self.extension::<BasicConstraints>()?,
            key_usage: self.extension::<KeyUsage>()?,
            extended_key_usage: eku.map(|eku| eku.usage).unwrap_or_default(),
            subject_key_id: self.subject_key_id()?,
            authority_key_id: self
                .extension::<AuthorityKeyIdentifier>()?
                .map(|aki| aki.key_identifier),
            dns_names: san.map(|san| san.names).unwrap_or_default(),
            policies: policies.map(|p| p.policies).unwrap_or_default(),
            crl_distribution_points: crl.map(|crl| crl.urls).unwrap_or_default(),
            authority_info_access: self.extension::<AuthorityInfoAccess>()?.unwrap_or_default(),
        })
    }
}

/// The decoded fields of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub serial_number: u128,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub basic_constraints: Option<BasicConstraints>,
    pub key_usage: Option<KeyUsage>,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    pub subject_key_id: Option<Vec<u8>>,
    pub authority_key_id: Option<Vec<u8>>,
    pub dns_names: Vec<String>,
    pub policies: Vec<ObjectIdentifier>,
    pub crl_distribution_points: Vec<String>,
    pub authority_info_access: AuthorityInfoAccess,
}

impl CertificateInfo {
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.is_some_and(|bc| bc.is_ca)
    }
}

/// A signed certificate together with its exact DER encoding.
///
/// Produced only by the signer, after the encoding has been parsed back.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    serial_number: u128,
    der: Vec<u8>,
    certificate: Certificate,
}

impl IssuedCertificate {
    pub(crate) fn new(serial_number: u128, der: Vec<u8>, certificate: Certificate) -> Self {
        Self {
            serial_number,
            der,
            certificate,
        }
    }

    pub fn serial_number(&self) -> u128 {
        self.serial_number
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn info(&self) -> Result<CertificateInfo> {
        self.certificate.info()
    }

    /// PEM `CERTIFICATE` block of the exact DER bytes.
    pub fn to_pem(&self) -> String {
        crate::pem_utils::der_to_pem(&self.der, CERTIFICATE_LABEL)
    }

    pub fn into_certificate(self) -> Certificate {
        self.certificate
    }
}
