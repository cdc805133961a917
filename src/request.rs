//! Raw issuance requests.
//!
//! These are what the configuration layer produces: every field is optional
//! or may be empty, nothing has been checked yet. They deserialize from any
//! serde format using the camelCase keys of the YAML schema and can be built
//! programmatically with their `bon` builders. Pass them through
//! [`crate::validate`] before handing them to the issuance flows.

use std::path::PathBuf;
use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::issuer::CaBundle;
use crate::policy::CaKind;

/// Optional Class 3 CA extras: revocation and issuer lookup locations.
///
/// Only honoured for Class 3 CA certificates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase", default)]
pub struct Class3Extras {
    #[builder(default)]
    pub crl_distribution_points: Vec<String>,
    #[builder(default)]
    pub ocsp_servers: Vec<String>,
    #[builder(default)]
    pub issuing_certificate_urls: Vec<String>,
}

impl Class3Extras {
    pub fn is_empty(&self) -> bool {
        self.crl_distribution_points.is_empty()
            && self.ocsp_servers.is_empty()
            && self.issuing_certificate_urls.is_empty()
    }
}

/// Request for a root or intermediate CA certificate.
///
/// # Example
/// ```
/// use certgen::policy::CaKind;
/// use certgen::request::CaRequest;
///
/// let request = CaRequest::builder()
///     .kind(CaKind::Root)
///     .class(2)
///     .common_name("Example Root CA")
///     .organization("Example Corp")
///     .country("US")
///     .output_dir("certs/root")
///     .build();
/// assert_eq!(request.key_size, None);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase", default)]
pub struct CaRequest {
    /// Root or intermediate. Defaults to root.
    #[serde(rename = "type")]
    #[builder(default)]
    pub kind: CaKind,
    /// Assurance class, 1 to 3. Absent or zero means Class 1.
    pub class: Option<u8>,
    #[builder(into, default)]
    pub common_name: String,
    #[builder(into, default)]
    pub organization: String,
    #[builder(into)]
    pub organizational_unit: Option<String>,
    #[builder(into, default)]
    pub country: String,
    #[builder(into)]
    pub province: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    /// Absent or zero picks the class default.
    pub validity_days: Option<u32>,
    /// RSA modulus size in bits. Absent or zero picks the class default.
    pub key_size: Option<u32>,
    #[builder(into)]
    pub output_dir: Option<PathBuf>,
    /// Parent CA certificate, required for intermediates.
    #[builder(into)]
    pub ca_cert: Option<PathBuf>,
    /// Parent CA private key, required for intermediates.
    #[builder(into)]
    pub ca_key: Option<PathBuf>,
    /// Parent CA held in memory; takes precedence over `ca_cert`/`ca_key`.
    #[serde(skip)]
    pub ca_bundle: Option<Arc<CaBundle>>,
    #[serde(flatten)]
    #[builder(default)]
    pub class3: Class3Extras,
}

/// Request for an end-entity certificate issued by an existing CA.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase", default)]
pub struct LeafRequest {
    pub class: Option<u8>,
    #[builder(into, default)]
    pub common_name: String,
    #[builder(into, default)]
    pub organization: String,
    #[builder(into)]
    pub organizational_unit: Option<String>,
    #[builder(into, default)]
    pub country: String,
    #[builder(into)]
    pub province: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    pub validity_days: Option<u32>,
    pub key_size: Option<u32>,
    /// Subject alternative DNS names. Empty means `[common_name]`.
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(into)]
    pub ca_cert: Option<PathBuf>,
    #[builder(into)]
    pub ca_key: Option<PathBuf>,
    #[serde(skip)]
    pub ca_bundle: Option<Arc<CaBundle>>,
    #[builder(into)]
    pub output_dir: Option<PathBuf>,
}

/// Request to countersign an existing certificate with a CA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase", default)]
pub struct SignRequest {
    #[builder(into)]
    pub cert_path: Option<PathBuf>,
    /// Private key of the certificate being signed; supplies its public key.
    #[builder(into)]
    pub key_path: Option<PathBuf>,
    #[builder(into)]
    pub ca_cert_path: Option<PathBuf>,
    #[builder(into)]
    pub ca_key_path: Option<PathBuf>,
    #[builder(into)]
    pub output_dir: Option<PathBuf>,
}

/// Request to install a certificate into the operating system trust store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustRequest {
    #[builder(into)]
    pub cert_path: Option<PathBuf>,
    #[builder(into)]
    pub output_dir: Option<PathBuf>,
}
