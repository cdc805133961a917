//! Certificate class policy table.
//!
//! A single data-driven table consulted by both the validator and the
//! template builder, so the per-class limits cannot drift apart.

use std::fmt;

use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use crate::cert::extensions::ExtendedKeyUsageOption;

/// The `anyPolicy` certificate policy identifier (RFC 5280 § 4.2.1.4).
pub const ANY_POLICY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32.0");

/// Policy identifiers every root carries, whatever its class.
pub const ROOT_POLICY_OIDS: &[ObjectIdentifier] = &[ANY_POLICY];

/// Lowest class a root certificate may carry.
pub const ROOT_MIN_CLASS: CertificateClass = CertificateClass::Class2;
/// Minimum RSA modulus for root certificates, overriding the class minimum.
pub const ROOT_MIN_KEY_SIZE_BITS: u32 = 4096;
/// Minimum validity for root certificates (5 years).
pub const ROOT_MIN_VALIDITY_DAYS: u32 = 365 * 5;

/// Assurance tier of a certificate. Ordered: `Class3 > Class2 > Class1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum CertificateClass {
    /// Low assurance: email and personal use.
    #[default]
    Class1 = 1,
    /// Medium assurance: organization validation.
    Class2 = 2,
    /// High assurance: extended validation and code signing.
    Class3 = 3,
}

impl CertificateClass {
    pub const ALL: [CertificateClass; 3] = [
        CertificateClass::Class1,
        CertificateClass::Class2,
        CertificateClass::Class3,
    ];

    /// Returns the policy requirements for this class.
    pub fn requirements(self) -> PolicyRequirements {
        resolve(self)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CertificateClass {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CertificateClass::Class1),
            2 => Ok(CertificateClass::Class2),
            3 => Ok(CertificateClass::Class3),
            other => Err(other),
        }
    }
}

impl fmt::Display for CertificateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Position of a certificate in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateType {
    Root,
    Intermediate,
    Leaf,
}

impl CertificateType {
    pub fn is_ca(self) -> bool {
        !matches!(self, CertificateType::Leaf)
    }
}

/// The kind of CA a CA request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaKind {
    #[default]
    Root,
    Intermediate,
}

impl From<CaKind> for CertificateType {
    fn from(kind: CaKind) -> Self {
        match kind {
            CaKind::Root => CertificateType::Root,
            CaKind::Intermediate => CertificateType::Intermediate,
        }
    }
}

/// Limits and usages fixed by a certificate class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRequirements {
    pub class: CertificateClass,
    pub min_key_size_bits: u32,
    pub max_validity_days: u32,
    pub allowed_extended_key_usages: &'static [ExtendedKeyUsageOption],
    /// Maximum number of intermediate CAs below a CA of this class.
    pub max_path_length: u8,
    pub policy_oids: &'static [ObjectIdentifier],
}

const CLASS_TABLE: [PolicyRequirements; 3] = [
    PolicyRequirements {
        class: CertificateClass::Class1,
        min_key_size_bits: 2048,
        max_validity_days: 365 * 5,
        allowed_extended_key_usages: &[
            ExtendedKeyUsageOption::ClientAuth,
            ExtendedKeyUsageOption::EmailProtection,
        ],
        max_path_length: 0,
        policy_oids: &[],
    },
    PolicyRequirements {
        class: CertificateClass::Class2,
        min_key_size_bits: 3072,
        max_validity_days: 365 * 3,
        allowed_extended_key_usages: &[
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ],
        max_path_length: 1,
        policy_oids: &[],
    },
    PolicyRequirements {
        class: CertificateClass::Class3,
        min_key_size_bits: 4096,
        max_validity_days: 365 * 2,
        allowed_extended_key_usages: &[
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
            ExtendedKeyUsageOption::CodeSigning,
        ],
        max_path_length: 2,
        policy_oids: &[ANY_POLICY],
    },
];

/// Looks up the requirements of a class.
pub fn resolve(class: CertificateClass) -> PolicyRequirements {
    CLASS_TABLE[class.as_u8() as usize - 1]
}

/// Maps a raw class number to a class. Out-of-range values become Class 1.
pub fn class_or_default(class: u8) -> CertificateClass {
    CertificateClass::try_from(class).unwrap_or_default()
}

/// Looks up the requirements of a raw class number.
///
/// Out-of-range values resolve to Class 1's requirements instead of failing.
pub fn resolve_raw(class: u8) -> PolicyRequirements {
    resolve(class_or_default(class))
}

/// Extended key usages of a root certificate: the union of every class's
/// usages plus time stamping.
pub fn root_extended_key_usages() -> Vec<ExtendedKeyUsageOption> {
    let mut usages: Vec<ExtendedKeyUsageOption> = Vec::new();
    let all = CLASS_TABLE
        .iter()
        .flat_map(|req| req.allowed_extended_key_usages.iter().copied())
        .chain(std::iter::once(ExtendedKeyUsageOption::TimeStamping));
    for usage in all {
        if !usages.contains(&usage) {
            usages.push(usage);
        }
    }
    usages
}
