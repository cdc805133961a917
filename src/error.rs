//! Error types for certificate issuance.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::policy::CertificateClass;

/// Represents errors that can occur while issuing certificates.
///
/// Every layer returns the most specific variant it can determine; none of
/// them is ever downgraded to a warning.
#[derive(Debug, Error)]
pub enum CertgenError {
    /// A request failed validation. Raised before any cryptographic work.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Key generation, signing, randomness or re-parse failure.
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Issuer certificate or key could not be read, parsed or paired.
    #[error("Failed to load {}: {reason}", file.display())]
    ChainError { file: PathBuf, reason: String },

    /// Output directory or artifact write failure.
    #[error("I/O error at {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Installing into the OS trust store failed.
    #[error("Trust store error: {0}")]
    TrustInstallError(#[from] TrustInstallError),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CertgenError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        CertgenError::IoError {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn chain(file: impl AsRef<Path>, reason: impl ToString) -> Self {
        CertgenError::ChainError {
            file: file.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CertgenError>;

impl From<der::Error> for CertgenError {
    /// Converts a `der::Error` into a `CertgenError`.
    fn from(err: der::Error) -> Self {
        CertgenError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CertgenError {
    fn from(err: rsa::Error) -> Self {
        CertgenError::CryptoError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertgenError {
    fn from(err: pkcs8::Error) -> Self {
        CertgenError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CertgenError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CertgenError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertgenError {
    fn from(err: pem::PemError) -> Self {
        CertgenError::DecodingError(err.to_string())
    }
}

/// A single violated request invariant.
///
/// The message names the offending field and, where one applies, the
/// limit computed for the resolved class and type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("keySize must be at least {min} bits for Class {class} {kind}")]
    KeySizeTooSmall {
        min: u32,
        class: CertificateClass,
        kind: &'static str,
    },

    #[error("keySize cannot exceed {max} bits")]
    KeySizeTooLarge { max: u32 },

    #[error("validity period cannot exceed {max} days for Class {class} {kind}")]
    ValidityTooLong {
        max: u32,
        class: CertificateClass,
        kind: &'static str,
    },

    #[error("validity period of {days} days ends after the year {max_year}")]
    ValidityNotEncodable { days: u32, max_year: i32 },

    #[error("root certificates must be Class {min} or higher")]
    RootClassTooLow { min: CertificateClass },

    #[error("root certificates must use at least {min}-bit keys")]
    RootKeySizeTooSmall { min: u32 },

    #[error("root certificates must have at least {min} days validity")]
    RootValidityTooShort { min: u32 },

    #[error("{what} not found at {}", path.display())]
    FileNotFound {
        field: &'static str,
        what: &'static str,
        path: PathBuf,
    },
}

impl ConfigError {
    /// Name of the request field that violated its invariant, as spelled in
    /// the configuration schema.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::MissingField { field } => *field,
            ConfigError::RootClassTooLow { .. } => "class",
            ConfigError::KeySizeTooSmall { .. }
            | ConfigError::KeySizeTooLarge { .. }
            | ConfigError::RootKeySizeTooSmall { .. } => "keySize",
            ConfigError::ValidityTooLong { .. }
            | ConfigError::ValidityNotEncodable { .. }
            | ConfigError::RootValidityTooShort { .. } => "validityDays",
            ConfigError::FileNotFound { field, .. } => *field,
        }
    }
}

/// Failure to install a certificate into the platform trust store.
#[derive(Debug, Error)]
pub enum TrustInstallError {
    #[error("unsupported operating system: {os}")]
    UnsupportedPlatform { os: String },

    #[error("certificate file not found: {}", path.display())]
    CertificateNotFound { path: PathBuf },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("`{command}` failed with elevated privileges: {output}")]
    ElevatedCommandFailed { command: String, output: String },
}
