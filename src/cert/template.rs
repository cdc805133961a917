//! Unsigned certificate templates.
//!
//! Builds the to-be-signed description of a root, intermediate or leaf
//! certificate from a validated request. Every class dependent value comes
//! from the policy table.

use const_oid::ObjectIdentifier;
use der::flagset::FlagSet;

use super::extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName,
    SubjectKeyIdentifier,
};
use super::params::{DistinguishedName, ExtensionParam, Validity};
use crate::error::Result;
use crate::key::{generate_key_identifier, generate_serial};
use crate::policy::{self, CertificateClass, CertificateType};
use crate::validate::{ValidatedCaRequest, ValidatedLeafRequest};

/// An unsigned certificate description.
///
/// The signer turns it into a `TBSCertificate` by adding the issuer name,
/// the subject public key and the signature algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    pub certificate_type: CertificateType,
    pub class: CertificateClass,
    pub serial_number: u128,
    pub subject: DistinguishedName,
    pub validity: Validity,
    pub basic_constraints: BasicConstraints,
    pub key_usage: KeyUsage,
    pub extended_key_usage: ExtendedKeyUsage,
    pub subject_key_id: Option<Vec<u8>>,
    /// Set for roots. The signer fills it in from the parent otherwise.
    pub authority_key_id: Option<Vec<u8>>,
    pub policies: Vec<ObjectIdentifier>,
    pub dns_names: Vec<String>,
    pub crl_distribution_points: Vec<String>,
    pub authority_info_access: AuthorityInfoAccess,
}

impl CertificateTemplate {
    /// Encodes the template's extensions in the order they appear in the
    /// certificate. Basic constraints and key usage are critical.
    pub fn extensions(&self) -> Result<Vec<ExtensionParam>> {
        let mut extensions = vec![
            ExtensionParam::from_extension(self.basic_constraints, true)?,
            ExtensionParam::from_extension(self.key_usage, true)?,
        ];
        if !self.extended_key_usage.usage.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                self.extended_key_usage.clone(),
                false,
            )?);
        }
        if let Some(ski) = &self.subject_key_id {
            extensions.push(ExtensionParam::from_extension(
                SubjectKeyIdentifier(ski.clone()),
                false,
            )?);
        }
        if let Some(aki) = &self.authority_key_id {
            extensions.push(ExtensionParam::from_extension(
                AuthorityKeyIdentifier {
                    key_identifier: aki.clone(),
                },
                false,
            )?);
        }
        if !self.dns_names.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                SubjectAltName {
                    names: self.dns_names.clone(),
                },
                false,
            )?);
        }
        if !self.policies.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                CertificatePolicies {
                    policies: self.policies.clone(),
                },
                false,
            )?);
        }
        if !self.crl_distribution_points.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                CrlDistributionPoints {
                    urls: self.crl_distribution_points.clone(),
                },
                false,
            )?);
        }
        let aia = &self.authority_info_access;
        if !aia.ocsp_servers.is_empty() || !aia.issuing_certificate_urls.is_empty() {
            extensions.push(ExtensionParam::from_extension(aia.clone(), false)?);
        }
        Ok(extensions)
    }
}

fn ca_key_usage() -> KeyUsage {
    KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign | KeyUsages::DigitalSignature)
}

/// Builds a root or intermediate CA template.
pub fn build_ca_template(request: &ValidatedCaRequest) -> Result<CertificateTemplate> {
    let requirements = request.requirements;
    let is_root = request.certificate_type == CertificateType::Root;

    let subject_key_id = generate_key_identifier()?.to_vec();
    let authority_key_id = is_root.then(|| subject_key_id.clone());

    let usage = if is_root {
        policy::root_extended_key_usages()
    } else {
        requirements.allowed_extended_key_usages.to_vec()
    };

    let mut policies = requirements.policy_oids.to_vec();
    if is_root {
        for oid in policy::ROOT_POLICY_OIDS {
            if !policies.contains(oid) {
                policies.push(*oid);
            }
        }
    }

    let (crl_distribution_points, authority_info_access) = if request.class == CertificateClass::Class3
    {
        (
            request.class3.crl_distribution_points.clone(),
            AuthorityInfoAccess {
                ocsp_servers: request.class3.ocsp_servers.clone(),
                issuing_certificate_urls: request.class3.issuing_certificate_urls.clone(),
            },
        )
    } else {
        (Vec::new(), AuthorityInfoAccess::default())
    };

    Ok(CertificateTemplate {
        certificate_type: request.certificate_type,
        class: request.class,
        serial_number: generate_serial()?,
        subject: request.subject.clone(),
        validity: Validity::for_days(request.validity_days)?,
        basic_constraints: BasicConstraints {
            is_ca: true,
            max_path_length: Some(requirements.max_path_length),
        },
        key_usage: ca_key_usage(),
        extended_key_usage: ExtendedKeyUsage { usage },
        subject_key_id: Some(subject_key_id),
        authority_key_id,
        policies,
        dns_names: Vec::new(),
        crl_distribution_points,
        authority_info_access,
    })
}

/// Builds an end-entity template.
pub fn build_leaf_template(request: &ValidatedLeafRequest) -> Result<CertificateTemplate> {
    let requirements = request.requirements;
    let key_usage: FlagSet<KeyUsages> = KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment;

    Ok(CertificateTemplate {
        certificate_type: CertificateType::Leaf,
        class: request.class,
        serial_number: generate_serial()?,
        subject: request.subject.clone(),
        validity: Validity::for_days(request.validity_days)?,
        basic_constraints: BasicConstraints {
            is_ca: false,
            max_path_length: None,
        },
        key_usage: KeyUsage(key_usage),
        extended_key_usage: ExtendedKeyUsage {
            usage: requirements.allowed_extended_key_usages.to_vec(),
        },
        subject_key_id: None,
        authority_key_id: None,
        policies: requirements.policy_oids.to_vec(),
        dns_names: request.dns_names.clone(),
        crl_distribution_points: Vec::new(),
        authority_info_access: AuthorityInfoAccess::default(),
    })
}
