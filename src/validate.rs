//! Request validation.
//!
//! Turns raw requests into validated ones: fills defaults from the class
//! policy table, enforces the class and root bounds, normalizes the output
//! directory and checks that referenced files exist. Only validated requests
//! are accepted by the issuance flows.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::cert::params::{DistinguishedName, MAX_ENCODABLE_YEAR, Validity};
use crate::error::ConfigError;
use crate::issuer::{CaBundle, IssuerSource};
use crate::key::MAX_RSA_BITS;
use crate::policy::{
    self, CertificateClass, CertificateType, PolicyRequirements, ROOT_MIN_CLASS,
    ROOT_MIN_KEY_SIZE_BITS, ROOT_MIN_VALIDITY_DAYS,
};
use crate::request::{CaRequest, Class3Extras, LeafRequest, SignRequest, TrustRequest};

/// Output directory used when a request names none.
pub const DEFAULT_OUTPUT_DIR: &str = "certs";

/// Largest RSA modulus the key generator accepts.
const MAX_KEY_SIZE_BITS: u32 = MAX_RSA_BITS as u32;

type Result<T> = std::result::Result<T, ConfigError>;

/// A CA request that passed validation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ValidatedCaRequest {
    pub certificate_type: CertificateType,
    pub class: CertificateClass,
    pub requirements: PolicyRequirements,
    pub subject: DistinguishedName,
    pub key_size_bits: u32,
    pub validity_days: u32,
    /// Empty unless the class is 3.
    pub class3: Class3Extras,
    /// Parent CA; present exactly when the type is intermediate.
    pub issuer: Option<IssuerSource>,
    pub output_dir: PathBuf,
}

/// A leaf request that passed validation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ValidatedLeafRequest {
    pub class: CertificateClass,
    pub requirements: PolicyRequirements,
    pub subject: DistinguishedName,
    pub key_size_bits: u32,
    pub validity_days: u32,
    /// Never empty.
    pub dns_names: Vec<String>,
    pub issuer: IssuerSource,
    pub output_dir: PathBuf,
}

/// A sign request that passed validation. Every path exists.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ValidatedSignRequest {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub ca_cert_path: PathBuf,
    pub ca_key_path: PathBuf,
    pub output_dir: PathBuf,
}

/// A trust request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ValidatedTrustRequest {
    pub cert_path: PathBuf,
    pub output_dir: PathBuf,
}

/// Validates a CA request.
///
/// Roots must be Class 2 or higher, use at least 4096-bit keys and be valid
/// for at least five years; their class validity ceiling does not apply.
/// Intermediates are held to their class bounds and need a parent CA.
pub fn validate_ca(request: CaRequest) -> Result<ValidatedCaRequest> {
    let subject = subject(
        &request.common_name,
        &request.organization,
        &request.country,
        request.organizational_unit.as_deref(),
        request.province.as_deref(),
        request.locality.as_deref(),
    )?;

    let class = resolve_class(request.class);
    let requirements = policy::resolve(class);
    let certificate_type = CertificateType::from(request.kind);
    let is_root = certificate_type == CertificateType::Root;

    let default_key_size = if is_root {
        requirements.min_key_size_bits.max(ROOT_MIN_KEY_SIZE_BITS)
    } else {
        requirements.min_key_size_bits
    };
    let key_size_bits = key_size(request.key_size, default_key_size, &requirements, "CA")?;

    let validity_days = match unset_if_zero(request.validity_days) {
        Some(days) => days,
        None if is_root => ROOT_MIN_VALIDITY_DAYS,
        None => requirements.max_validity_days,
    };

    if is_root {
        if class < ROOT_MIN_CLASS {
            return Err(ConfigError::RootClassTooLow {
                min: ROOT_MIN_CLASS,
            });
        }
        if key_size_bits < ROOT_MIN_KEY_SIZE_BITS {
            return Err(ConfigError::RootKeySizeTooSmall {
                min: ROOT_MIN_KEY_SIZE_BITS,
            });
        }
        if validity_days < ROOT_MIN_VALIDITY_DAYS {
            return Err(ConfigError::RootValidityTooShort {
                min: ROOT_MIN_VALIDITY_DAYS,
            });
        }
        if Validity::for_days(validity_days).is_err() {
            return Err(ConfigError::ValidityNotEncodable {
                days: validity_days,
                max_year: MAX_ENCODABLE_YEAR,
            });
        }
    } else {
        check_validity_ceiling(validity_days, &requirements, "CA")?;
    }

    let output_dir = output_dir(request.output_dir.as_deref());

    let issuer = if is_root {
        if request.ca_bundle.is_some() || request.ca_cert.is_some() || request.ca_key.is_some() {
            tracing::warn!("root certificates are self-signed; ignoring parent CA settings");
        }
        None
    } else {
        Some(issuer_source(
            request.ca_bundle,
            request.ca_cert.as_deref(),
            request.ca_key.as_deref(),
        )?)
    };

    let class3 = if class == CertificateClass::Class3 {
        request.class3
    } else {
        if !request.class3.is_empty() {
            tracing::warn!(
                %class,
                "CRL distribution points, OCSP servers and issuing certificate URLs only apply to Class 3; ignoring"
            );
        }
        Class3Extras::default()
    };

    Ok(ValidatedCaRequest {
        certificate_type,
        class,
        requirements,
        subject,
        key_size_bits,
        validity_days,
        class3,
        issuer,
        output_dir,
    })
}

/// Validates a leaf certificate request.
pub fn validate_leaf(request: LeafRequest) -> Result<ValidatedLeafRequest> {
    let subject = subject(
        &request.common_name,
        &request.organization,
        &request.country,
        request.organizational_unit.as_deref(),
        request.province.as_deref(),
        request.locality.as_deref(),
    )?;

    let class = resolve_class(request.class);
    let requirements = policy::resolve(class);

    let key_size_bits = key_size(
        request.key_size,
        requirements.min_key_size_bits,
        &requirements,
        "certificate",
    )?;
    let validity_days =
        unset_if_zero(request.validity_days).unwrap_or(requirements.max_validity_days);
    check_validity_ceiling(validity_days, &requirements, "certificate")?;

    let dns_names = if request.dns_names.is_empty() {
        vec![request.common_name.clone()]
    } else {
        request.dns_names
    };

    let output_dir = output_dir(request.output_dir.as_deref());
    let issuer = issuer_source(
        request.ca_bundle,
        request.ca_cert.as_deref(),
        request.ca_key.as_deref(),
    )?;

    Ok(ValidatedLeafRequest {
        class,
        requirements,
        subject,
        key_size_bits,
        validity_days,
        dns_names,
        issuer,
        output_dir,
    })
}

/// Validates a sign request.
///
/// All four paths must be present before any of them is checked for
/// existence; nothing is read.
pub fn validate_sign(request: SignRequest) -> Result<ValidatedSignRequest> {
    let cert_path = required_path("certPath", request.cert_path)?;
    let key_path = required_path("keyPath", request.key_path)?;
    let ca_cert_path = required_path("caCertPath", request.ca_cert_path)?;
    let ca_key_path = required_path("caKeyPath", request.ca_key_path)?;

    must_exist("certPath", "certificate", &cert_path)?;
    must_exist("keyPath", "certificate key", &key_path)?;
    must_exist("caCertPath", "CA certificate", &ca_cert_path)?;
    must_exist("caKeyPath", "CA private key", &ca_key_path)?;

    Ok(ValidatedSignRequest {
        cert_path,
        key_path,
        ca_cert_path,
        ca_key_path,
        output_dir: output_dir(request.output_dir.as_deref()),
    })
}

/// Validates a trust request.
pub fn validate_trust(request: TrustRequest) -> Result<ValidatedTrustRequest> {
    let cert_path = required_path("certPath", request.cert_path)?;
    must_exist("certPath", "certificate", &cert_path)?;

    Ok(ValidatedTrustRequest {
        cert_path,
        output_dir: output_dir(request.output_dir.as_deref()),
    })
}

/// Lexically cleans a path: drops `.` components and folds `name/..` pairs.
/// `..` at the root is dropped; leading `..` of a relative path is kept.
/// An empty result becomes `.`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }

    if components.is_empty() {
        PathBuf::from(".")
    } else {
        components.iter().collect()
    }
}

/// The single output directory normalization step shared by every request.
pub fn output_dir(raw: Option<&Path>) -> PathBuf {
    match raw {
        Some(dir) if !dir.as_os_str().is_empty() => clean_path(dir),
        _ => PathBuf::from(DEFAULT_OUTPUT_DIR),
    }
}

fn unset_if_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

fn resolve_class(raw: Option<u8>) -> CertificateClass {
    match raw {
        None | Some(0) => CertificateClass::default(),
        Some(value) => {
            let class = policy::class_or_default(value);
            if class.as_u8() != value {
                tracing::warn!(
                    requested = value,
                    %class,
                    "unknown certificate class, using Class 1 requirements"
                );
            }
            class
        }
    }
}

fn key_size(
    raw: Option<u32>,
    default: u32,
    requirements: &PolicyRequirements,
    kind: &'static str,
) -> Result<u32> {
    match unset_if_zero(raw) {
        None => Ok(default),
        Some(bits) if bits < requirements.min_key_size_bits => Err(ConfigError::KeySizeTooSmall {
            min: requirements.min_key_size_bits,
            class: requirements.class,
            kind,
        }),
        Some(bits) if bits > MAX_KEY_SIZE_BITS => Err(ConfigError::KeySizeTooLarge {
            max: MAX_KEY_SIZE_BITS,
        }),
        Some(bits) => Ok(bits),
    }
}

fn check_validity_ceiling(
    days: u32,
    requirements: &PolicyRequirements,
    kind: &'static str,
) -> Result<()> {
    if days > requirements.max_validity_days {
        return Err(ConfigError::ValidityTooLong {
            max: requirements.max_validity_days,
            class: requirements.class,
            kind,
        });
    }
    Ok(())
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    Ok(())
}

fn subject(
    common_name: &str,
    organization: &str,
    country: &str,
    organizational_unit: Option<&str>,
    province: Option<&str>,
    locality: Option<&str>,
) -> Result<DistinguishedName> {
    require("commonName", common_name)?;
    require("organization", organization)?;
    require("country", country)?;

    let optional = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);
    Ok(DistinguishedName {
        common_name: common_name.to_string(),
        country: Some(country.to_string()),
        state: optional(province),
        locality: optional(locality),
        organization: Some(organization.to_string()),
        organization_unit: optional(organizational_unit),
    })
}

fn required_path(field: &'static str, path: Option<PathBuf>) -> Result<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
        .ok_or(ConfigError::MissingField { field })
}

fn must_exist(field: &'static str, what: &'static str, path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            field,
            what,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn issuer_source(
    bundle: Option<Arc<CaBundle>>,
    ca_cert: Option<&Path>,
    ca_key: Option<&Path>,
) -> Result<IssuerSource> {
    if let Some(bundle) = bundle {
        return Ok(IssuerSource::InMemory(bundle));
    }

    let cert_path = required_path("caCert", ca_cert.map(Path::to_path_buf))?;
    let key_path = required_path("caKey", ca_key.map(Path::to_path_buf))?;
    must_exist("caCert", "CA certificate", &cert_path)?;
    must_exist("caKey", "CA private key", &key_path)?;

    Ok(IssuerSource::Files {
        cert_path,
        key_path,
    })
}
