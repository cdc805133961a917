//! End-to-end issuance flows.
//!
//! Each flow validates its request before doing any cryptographic work,
//! checks that the output directory is writable, then builds, signs and
//! persists. The first error aborts the flow; files already written stay.
//!
//! [`issue_ca`] and [`issue_leaf`] stop short of persistence and return the
//! issued certificate with its freshly generated key.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cert::template::{build_ca_template, build_leaf_template};
use crate::cert::{Certificate, IssuedCertificate};
use crate::error::{CertgenError, Result};
use crate::issuer::{CaBundle, Issuer, SelfIssuer, sign_existing, subject_key_id_hex};
use crate::key::KeyPair;
use crate::persist::{self, Artifact, ArtifactPaths};
use crate::request::{CaRequest, LeafRequest, SignRequest, TrustRequest};
use crate::trust::TrustStore;
use crate::validate::{
    ValidatedCaRequest, ValidatedLeafRequest, validate_ca, validate_leaf, validate_sign,
    validate_trust,
};

/// File stem of a generated CA (`ca.crt`, `ca.key`).
pub const CA_FILE_STEM: &str = "ca";
/// File stem of a generated end-entity certificate (`cert.crt`, `cert.key`).
pub const CERT_FILE_STEM: &str = "cert";
/// Name of a countersigned certificate.
pub const SIGNED_FILE_NAME: &str = "signed.crt";
/// Name of the copy made before installing into the trust store.
pub const TRUSTED_FILE_NAME: &str = "trusted.crt";

/// A certificate and its private key, written to disk.
#[derive(Debug)]
pub struct Issued {
    pub certificate: IssuedCertificate,
    pub paths: ArtifactPaths,
}

/// A countersigned certificate, written to disk.
#[derive(Debug)]
pub struct Signed {
    pub certificate: IssuedCertificate,
    pub path: PathBuf,
}

/// Issues a root or intermediate CA without writing anything.
///
/// Roots are self-signed. Intermediates are signed by the parent named in the
/// request, which is loaded before the key is generated.
#[tracing::instrument(skip_all, fields(certificate_type = ?request.certificate_type, class = %request.class))]
pub fn issue_ca(request: &ValidatedCaRequest) -> Result<(IssuedCertificate, KeyPair)> {
    let parent = request.issuer.as_ref().map(|source| source.load()).transpose()?;

    let template = build_ca_template(request)?;
    tracing::debug!(serial = %format!("{:x}", template.serial_number), "built CA template");

    let key = KeyPair::generate_rsa(request.key_size_bits as usize)?;
    tracing::info!(bits = request.key_size_bits, "generated CA key");

    let issued = match &parent {
        Some(parent) => parent.issue(&template, &key.public_key())?,
        None => SelfIssuer {
            name: template.subject.clone(),
            key: &key,
        }
        .issue(&template, &key.public_key())?,
    };
    tracing::info!(
        serial = %format!("{:x}", issued.serial_number()),
        ski = %subject_key_id_hex(issued.certificate()).unwrap_or_default(),
        "signed CA certificate"
    );
    Ok((issued, key))
}

/// Issues an end-entity certificate without writing anything.
#[tracing::instrument(skip_all, fields(class = %request.class))]
pub fn issue_leaf(request: &ValidatedLeafRequest) -> Result<(IssuedCertificate, KeyPair)> {
    let parent = request.issuer.load()?;

    let template = build_leaf_template(request)?;
    tracing::debug!(dns_names = ?template.dns_names, "built certificate template");

    let key = KeyPair::generate_rsa(request.key_size_bits as usize)?;
    tracing::info!(bits = request.key_size_bits, "generated certificate key");

    let issued = parent.issue(&template, &key.public_key())?;
    tracing::info!(
        serial = %format!("{:x}", issued.serial_number()),
        "signed certificate"
    );
    Ok((issued, key))
}

/// Generates a CA and writes `ca.crt` and `ca.key` to the output directory.
#[tracing::instrument(skip_all, fields(common_name = %request.common_name, kind = ?request.kind))]
pub fn generate_ca(request: CaRequest) -> Result<Issued> {
    let request = validate_ca(request)?;
    tracing::info!(
        class = %request.class,
        key_size = request.key_size_bits,
        validity_days = request.validity_days,
        "validated CA request"
    );
    persist::ensure_writable_directory(&request.output_dir)?;

    let (certificate, key) = issue_ca(&request)?;
    let artifact = Artifact::new(&certificate, &key)?;
    let paths = persist::write_artifacts(&request.output_dir, CA_FILE_STEM, &artifact)?;
    Ok(Issued { certificate, paths })
}

/// Generates an end-entity certificate and writes `cert.crt` and `cert.key`
/// to the output directory.
#[tracing::instrument(skip_all, fields(common_name = %request.common_name))]
pub fn generate_certificate(request: LeafRequest) -> Result<Issued> {
    let request = validate_leaf(request)?;
    tracing::info!(
        class = %request.class,
        key_size = request.key_size_bits,
        validity_days = request.validity_days,
        "validated certificate request"
    );
    persist::ensure_writable_directory(&request.output_dir)?;

    let (certificate, key) = issue_leaf(&request)?;
    let artifact = Artifact::new(&certificate, &key)?;
    let paths = persist::write_artifacts(&request.output_dir, CERT_FILE_STEM, &artifact)?;
    Ok(Issued { certificate, paths })
}

/// Countersigns an existing certificate with a CA and writes the result.
///
/// The certificate keeps its serial, validity, subject and extensions. Its
/// public key is taken from the private key named in the request. The output
/// is `signed.crt`, or `<stem>.signed.crt` when `signed.crt` is the input.
#[tracing::instrument(skip_all)]
pub fn sign_certificate(request: SignRequest) -> Result<Signed> {
    let request = validate_sign(request)?;
    tracing::info!(cert = %request.cert_path.display(), "validated sign request");
    persist::ensure_writable_directory(&request.output_dir)?;

    let certificate = load_certificate(&request.cert_path)?;
    let key = load_private_key(&request.key_path)?;
    if certificate.public_key()? != key.public_key() {
        tracing::warn!(
            cert = %request.cert_path.display(),
            key = %request.key_path.display(),
            "private key does not match the certificate, its public key will be used"
        );
    }
    let ca = CaBundle::load(&request.ca_cert_path, &request.ca_key_path)?;

    let signed = sign_existing(&certificate, &ca, &key.public_key())?;
    tracing::info!(
        serial = %format!("{:x}", signed.serial_number()),
        "signed existing certificate"
    );

    let path = signed_output_path(&request.output_dir, &request.cert_path);
    persist::write_certificate(&path, &signed.to_pem())?;
    Ok(Signed {
        certificate: signed,
        path,
    })
}

/// Copies a certificate to `trusted.crt` in the output directory and
/// installs the copy into `store`.
///
/// Returns the path of the copy.
#[tracing::instrument(skip_all, fields(store = store.name()))]
pub fn trust_certificate(request: TrustRequest, store: &dyn TrustStore) -> Result<PathBuf> {
    let request = validate_trust(request)?;
    persist::ensure_writable_directory(&request.output_dir)?;

    let pem = fs::read_to_string(&request.cert_path)
        .map_err(|e| CertgenError::io(&request.cert_path, e))?;
    Certificate::from_pem(&pem)?;

    let trusted = request.output_dir.join(TRUSTED_FILE_NAME);
    persist::write_certificate(&trusted, &pem)?;

    let trusted = std::path::absolute(&trusted).map_err(|e| CertgenError::io(&trusted, e))?;
    store.install_root_certificate(&trusted)?;
    tracing::info!(cert = %trusted.display(), "installed certificate into the trust store");
    Ok(trusted)
}

fn load_certificate(path: &Path) -> Result<Certificate> {
    let pem = fs::read_to_string(path)
        .map_err(|e| CertgenError::chain(path, format!("cannot read certificate: {e}")))?;
    Certificate::from_pem(&pem)
        .map_err(|e| CertgenError::chain(path, format!("cannot parse certificate: {e}")))
}

fn load_private_key(path: &Path) -> Result<KeyPair> {
    let pem = fs::read_to_string(path)
        .map_err(|e| CertgenError::chain(path, format!("cannot read private key: {e}")))?;
    KeyPair::import_from_pkcs8_pem(&pem)
        .map_err(|e| CertgenError::chain(path, format!("cannot parse private key: {e}")))
}

fn signed_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let target = output_dir.join(SIGNED_FILE_NAME);
    if !is_same_file(&target, input) {
        return target;
    }
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "certificate".to_string());
    output_dir.join(format!("{stem}.{SIGNED_FILE_NAME}"))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
