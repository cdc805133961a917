use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use der::Encode;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::name::Name;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use crate::cert::params::{DistinguishedName, ExtensionParam};
use crate::cert::template::CertificateTemplate;
use crate::cert::{Certificate, IssuedCertificate};
use crate::error::{CertgenError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the encoded name written into the `issuer` field.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Key identifier to put in the issued certificate's authority key
    /// identifier, or `None` to keep whatever the template carries.
    fn authority_key_id(&self) -> Result<Option<Vec<u8>>>;

    /// Issues a certificate from `template` for `subject_public_key`.
    fn issue(
        &self,
        template: &CertificateTemplate,
        subject_public_key: &PublicKey,
    ) -> Result<IssuedCertificate> {
        sign(template, self, subject_public_key)
    }
}

/// Issuer of a self-signed certificate: the subject signs with its own key.
pub struct SelfIssuer<'a> {
    pub name: DistinguishedName,
    pub key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        self.name.as_x509_name()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// A CA certificate together with its private key.
///
/// Construction checks that the key belongs to the certificate and that the
/// certificate is a CA.
pub struct CaBundle {
    certificate: Certificate,
    key: KeyPair,
}

impl fmt::Debug for CaBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaBundle")
            .field(
                "subject",
                &self.certificate.inner.tbs_certificate.subject.to_string(),
            )
            .field("key", &self.key)
            .finish()
    }
}

impl CaBundle {
    pub fn new(certificate: Certificate, key: KeyPair) -> Result<Self> {
        check_pair(&certificate, &key).map_err(CertgenError::InvalidInput)?;
        Ok(Self { certificate, key })
    }

    /// Loads a PEM certificate and a PEM PKCS#8 private key.
    ///
    /// Failures name the file they concern.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_pem = std::fs::read_to_string(cert_path)
            .map_err(|e| CertgenError::chain(cert_path, format!("cannot read CA certificate: {e}")))?;
        let certificate = Certificate::from_pem(&cert_pem)
            .map_err(|e| CertgenError::chain(cert_path, format!("cannot parse CA certificate: {e}")))?;

        let key_pem = std::fs::read_to_string(key_path)
            .map_err(|e| CertgenError::chain(key_path, format!("cannot read CA private key: {e}")))?;
        let key = KeyPair::import_from_pkcs8_pem(&key_pem)
            .map_err(|e| CertgenError::chain(key_path, format!("cannot parse CA private key: {e}")))?;

        check_pair(&certificate, &key).map_err(|reason| CertgenError::chain(key_path, reason))?;
        tracing::debug!(
            cert = %cert_path.display(),
            algorithm = key.algorithm_name(),
            "loaded CA"
        );
        Ok(Self { certificate, key })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }
}

fn check_pair(certificate: &Certificate, key: &KeyPair) -> std::result::Result<(), String> {
    let certified = certificate.public_key().map_err(|e| e.to_string())?;
    if certified != key.public_key() {
        return Err("private key does not match the CA certificate".to_string());
    }
    let is_ca = certificate
        .extension::<BasicConstraints>()
        .map_err(|e| e.to_string())?
        .is_some_and(|bc| bc.is_ca);
    if !is_ca {
        return Err("certificate is not a CA (basicConstraints CA:TRUE missing)".to_string());
    }
    Ok(())
}

impl Issuer for CaBundle {
    fn issuer_name(&self) -> Result<Name> {
        // The name of the issuer is the subject of the certificate
        Ok(self.certificate.inner.tbs_certificate.subject.clone())
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    /// The CA's subject key identifier, or the SHA-1 of its public key when
    /// the CA certificate carries none.
    fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        match self.certificate.subject_key_id()? {
            Some(ski) => Ok(Some(ski)),
            None => Ok(Some(self.certificate.public_key()?.key_identifier()?)),
        }
    }
}

/// Where a parent CA comes from.
#[derive(Debug, Clone)]
pub enum IssuerSource {
    Files { cert_path: PathBuf, key_path: PathBuf },
    InMemory(Arc<CaBundle>),
}

impl IssuerSource {
    pub fn load(&self) -> Result<Arc<CaBundle>> {
        match self {
            IssuerSource::Files {
                cert_path,
                key_path,
            } => Ok(Arc::new(CaBundle::load(cert_path, key_path)?)),
            IssuerSource::InMemory(bundle) => Ok(Arc::clone(bundle)),
        }
    }
}

/// Signs `template` as `issuer` for `subject_public_key`.
///
/// When the issuer provides an authority key identifier it replaces the one
/// in the template.
pub fn sign<I: Issuer + ?Sized>(
    template: &CertificateTemplate,
    issuer: &I,
    subject_public_key: &PublicKey,
) -> Result<IssuedCertificate> {
    let mut extensions = template.extensions()?;
    if let Some(key_identifier) = issuer.authority_key_id()? {
        extensions.retain(|ext| ext.oid != AuthorityKeyIdentifier::OID);
        extensions.push(ExtensionParam::from_extension(
            AuthorityKeyIdentifier { key_identifier },
            false,
        )?);
    }

    let tbs = TbsCertificate {
        serial_number: template.serial_number,
        signature_algorithm: issuer.signing_key().signature_algorithm(),
        issuer: issuer.issuer_name()?,
        validity: template.validity.clone(),
        subject: template.subject.as_x509_name()?,
        subject_public_key: subject_public_key.clone(),
        extensions,
    };

    finish(tbs.to_tbs_certificate_inner()?, issuer, template.serial_number)
}

/// Re-signs an existing certificate as `issuer`.
///
/// Serial, validity, subject and extensions are kept. The issuer name,
/// signature algorithm, subject public key and authority key identifier are
/// replaced.
pub fn sign_existing<I: Issuer + ?Sized>(
    certificate: &Certificate,
    issuer: &I,
    subject_public_key: &PublicKey,
) -> Result<IssuedCertificate> {
    let serial_number = certificate.serial_number()?;
    let mut tbs = certificate.inner.tbs_certificate.clone();
    tbs.issuer = issuer.issuer_name()?;
    tbs.signature = issuer.signing_key().signature_algorithm().into();
    tbs.subject_public_key_info = subject_public_key.to_spki()?;

    if let Some(key_identifier) = issuer.authority_key_id()? {
        let aki = ExtensionParam::from_extension(AuthorityKeyIdentifier { key_identifier }, false)?
            .to_x509_extension()?;
        let mut extensions = tbs.extensions.take().unwrap_or_default();
        match extensions
            .iter_mut()
            .find(|ext| ext.extn_id == AuthorityKeyIdentifier::OID)
        {
            Some(existing) => *existing = aki,
            None => extensions.push(aki),
        }
        tbs.extensions = Some(extensions);
    }

    finish(tbs, issuer, serial_number)
}

fn finish<I: Issuer + ?Sized>(
    tbs_certificate: TbsCertificateInner,
    issuer: &I,
    serial_number: u128,
) -> Result<IssuedCertificate> {
    let tbs_der = tbs_certificate
        .to_der()
        .map_err(|e| CertgenError::EncodingError(e.to_string()))?;
    let signature = issuer.signing_key().sign_data(&tbs_der)?;

    let inner = CertificateInner {
        signature_algorithm: tbs_certificate.signature.clone(),
        tbs_certificate,
        signature: der::asn1::BitString::from_bytes(&signature)?,
    };
    let der = inner
        .to_der()
        .map_err(|e| CertgenError::EncodingError(e.to_string()))?;

    let certificate = Certificate::from_der(&der).map_err(|e| {
        CertgenError::CryptoError(format!("issued certificate does not parse back: {e}"))
    })?;
    let parsed_serial = certificate.serial_number().map_err(|e| {
        CertgenError::CryptoError(format!("issued certificate serial is unreadable: {e}"))
    })?;
    if parsed_serial != serial_number {
        return Err(CertgenError::CryptoError(format!(
            "issued certificate serial {parsed_serial:x} does not match {serial_number:x}"
        )));
    }

    Ok(IssuedCertificate::new(serial_number, der, certificate))
}

/// Subject key identifier of an issued certificate, for logging.
pub(crate) fn subject_key_id_hex(certificate: &Certificate) -> Option<String> {
    certificate
        .extension::<SubjectKeyIdentifier>()
        .ok()
        .flatten()
        .map(|ski| ski.0.iter().map(|b| format!("{b:02x}")).collect())
}
