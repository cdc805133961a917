mod util;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use certgen::cert::Certificate;
use certgen::cert::extensions::ExtendedKeyUsageOption;
use certgen::error::{CertgenError, ConfigError, TrustInstallError};
use certgen::issuance;
use certgen::key::KeyPair;
use certgen::policy::CaKind;
use certgen::request::{CaRequest, LeafRequest, SignRequest, TrustRequest};
use certgen::trust::TrustStore;
use certgen::validate::{validate_ca, validate_leaf};

pub type Result<T> = std::result::Result<T, CertgenError>;

fn leaf_request(dns_names: &[&str]) -> LeafRequest {
    LeafRequest::builder()
        .class(2)
        .common_name("example.com")
        .organization("Example Corp")
        .country("US")
        .dns_names(dns_names.iter().map(|name| name.to_string()).collect())
        .build()
}

/// Class 2 root: CA, path length 1, self-signed.
#[test]
fn root_ca_is_self_signed() -> Result<()> {
    let root = util::root();
    let info = root.issued.info()?;

    assert!(info.is_ca());
    assert_eq!(info.basic_constraints.unwrap().max_path_length, Some(1));
    assert_eq!(info.subject.common_name, "Root CA");
    assert_eq!(info.issuer, info.subject);
    assert!(info.subject_key_id.is_some());
    assert_eq!(info.authority_key_id, info.subject_key_id);
    assert_eq!((info.not_after - info.not_before).whole_days(), 3650);
    assert!(
        info.extended_key_usage
            .contains(&ExtendedKeyUsageOption::TimeStamping)
    );
    assert_eq!(root.bundle.certificate().public_key()?.size_bits(), 4096);

    root.issued
        .certificate()
        .verify_issued_by(root.issued.certificate())?;
    Ok(())
}

#[test]
fn class1_root_is_rejected() {
    let mut request = util::root_request();
    request.class = Some(1);

    let err = validate_ca(request).unwrap_err();
    assert_eq!(err.field(), "class");
    assert_eq!(err.to_string(), "root certificates must be Class 2 or higher");
}

#[test]
fn leaf_key_below_class_minimum_is_rejected() {
    let mut request = leaf_request(&[]);
    request.key_size = Some(2048);
    request.ca_bundle = Some(util::root().bundle.clone());

    let err = validate_leaf(request).unwrap_err();
    assert!(matches!(err, ConfigError::KeySizeTooSmall { min: 3072, .. }));
    assert!(
        err.to_string()
            .starts_with("keySize must be at least 3072 bits for Class 2"),
        "{err}"
    );
}

#[test]
fn leaf_chains_to_its_ca_only() -> Result<()> {
    let root = util::root();
    let mut request = leaf_request(&["example.com", "www.example.com"]);
    request.ca_bundle = Some(root.bundle.clone());

    let (issued, key) = issuance::issue_leaf(&validate_leaf(request)?)?;
    let info = issued.info()?;
    let root_info = root.issued.info()?;

    assert_eq!(info.dns_names, vec!["example.com", "www.example.com"]);
    assert_eq!(info.issuer, root_info.subject);
    assert_eq!(info.authority_key_id, root_info.subject_key_id);
    assert!(!info.is_ca());
    assert_eq!(
        info.extended_key_usage,
        vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth
        ]
    );
    assert_eq!((info.not_after - info.not_before).whole_days(), 365 * 3);
    assert_eq!(issued.certificate().public_key()?, key.public_key());
    assert_eq!(key.public_key().size_bits(), 3072);

    issued
        .certificate()
        .verify_issued_by(root.bundle.certificate())?;
    let other = util::other_ca();
    assert!(
        issued
            .certificate()
            .verify_issued_by(other.certificate())
            .is_err()
    );
    Ok(())
}

#[test]
fn missing_ca_key_is_reported_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = dir.path().join("garbage.crt");
    fs::write(&garbage, b"not a certificate").unwrap();
    let missing = dir.path().join("absent/ca.key");

    let err = issuance::sign_certificate(
        SignRequest::builder()
            .cert_path(&garbage)
            .key_path(&garbage)
            .ca_cert_path(&garbage)
            .ca_key_path(&missing)
            .output_dir(dir.path().join("out"))
            .build(),
    )
    .unwrap_err();

    match err {
        CertgenError::InvalidConfig(ConfigError::FileNotFound { field, path, .. }) => {
            assert_eq!(field, "caKeyPath");
            assert_eq!(path, missing);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("out").exists());
}

#[test]
fn pem_round_trip_is_byte_identical() -> Result<()> {
    let root = util::root();
    let pem = root.issued.to_pem();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));

    let parsed = Certificate::from_pem(&pem)?;
    assert_eq!(parsed.to_der()?, root.issued.der());
    assert_eq!(parsed.serial_number()?, root.issued.serial_number());
    Ok(())
}

#[test]
fn generate_certificate_writes_cert_and_key() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let (ca_cert, ca_key) = util::write_root(dir.path());
    let out = dir.path().join("server/./tls");

    let mut request = leaf_request(&[]);
    request.class = Some(1);
    request.common_name = "client.example.com".into();
    request.ca_cert = Some(ca_cert);
    request.ca_key = Some(ca_key);
    request.output_dir = Some(out);

    let issued = issuance::generate_certificate(request)?;
    let expected_dir = dir.path().join("server/tls");
    assert_eq!(issued.paths.certificate, expected_dir.join("cert.crt"));
    assert_eq!(issued.paths.private_key, expected_dir.join("cert.key"));

    let cert = Certificate::from_pem(&fs::read_to_string(&issued.paths.certificate).unwrap())?;
    assert_eq!(cert.to_der()?, issued.certificate.der());
    assert_eq!(cert.info()?.dns_names, vec!["client.example.com"]);
    assert_eq!(
        cert.info()?.extended_key_usage,
        vec![
            ExtendedKeyUsageOption::ClientAuth,
            ExtendedKeyUsageOption::EmailProtection
        ]
    );

    let key =
        KeyPair::import_from_pkcs8_pem(&fs::read_to_string(&issued.paths.private_key).unwrap())?;
    assert_eq!(key.public_key(), cert.public_key()?);
    assert_eq!(key.public_key().size_bits(), 2048);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&issued.paths.certificate), 0o644);
        assert_eq!(mode(&issued.paths.private_key), 0o600);
    }
    Ok(())
}

#[test]
fn intermediate_ca_from_files() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let (ca_cert, ca_key) = util::write_root(dir.path());
    let out = dir.path().join("intermediate");

    let request = CaRequest::builder()
        .kind(CaKind::Intermediate)
        .class(2)
        .common_name("Issuing CA")
        .organization("Example Corp")
        .organizational_unit("PKI")
        .country("US")
        .ca_cert(ca_cert)
        .ca_key(ca_key)
        .output_dir(&out)
        .build();

    let issued = issuance::generate_ca(request)?;
    assert_eq!(issued.paths.certificate, out.join("ca.crt"));
    assert_eq!(issued.paths.private_key, out.join("ca.key"));

    let info = issued.certificate.info()?;
    let root_info = util::root().issued.info()?;
    assert!(info.is_ca());
    assert_eq!(info.basic_constraints.unwrap().max_path_length, Some(1));
    assert_eq!(info.subject.organization_unit.as_deref(), Some("PKI"));
    assert_eq!(info.issuer, root_info.subject);
    assert_eq!(info.authority_key_id, root_info.subject_key_id);
    assert_ne!(info.subject_key_id, root_info.subject_key_id);
    assert_eq!((info.not_after - info.not_before).whole_days(), 365 * 3);
    issued
        .certificate
        .certificate()
        .verify_issued_by(util::root().issued.certificate())?;
    Ok(())
}

#[test]
fn intermediate_ca_needs_a_parent() {
    let request = CaRequest::builder()
        .kind(CaKind::Intermediate)
        .class(2)
        .common_name("Issuing CA")
        .organization("Example Corp")
        .country("US")
        .build();
    let err = issuance::generate_ca(request).unwrap_err();
    assert!(matches!(
        err,
        CertgenError::InvalidConfig(ConfigError::MissingField { field: "caCert" })
    ));
}

#[test]
fn mismatched_ca_key_is_a_chain_error() {
    let dir = tempfile::tempdir().unwrap();
    let (ca_cert, _) = util::write_root(dir.path());
    let foreign_key = dir.path().join("foreign.key");
    fs::write(
        &foreign_key,
        KeyPair::generate_ecdsa_p256().to_pkcs8_pem().unwrap(),
    )
    .unwrap();

    let mut request = leaf_request(&[]);
    request.ca_cert = Some(ca_cert);
    request.ca_key = Some(foreign_key.clone());
    request.output_dir = Some(dir.path().join("out"));

    match issuance::generate_certificate(request).unwrap_err() {
        CertgenError::ChainError { file, reason } => {
            assert_eq!(file, foreign_key);
            assert!(reason.contains("does not match"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("out/cert.crt").exists());
}

#[test]
fn sign_existing_certificate_with_another_ca() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let (ca_cert, ca_key) = util::write_root(dir.path());

    // A leaf issued by an unrelated CA, written next to its key.
    let mut request = leaf_request(&["api.example.com"]);
    request.class = Some(1);
    request.ca_bundle = Some(util::other_ca());
    let (original, key) = issuance::issue_leaf(&validate_leaf(request)?)?;
    let cert_path = dir.path().join("leaf.crt");
    let key_path = dir.path().join("leaf.key");
    fs::write(&cert_path, original.to_pem()).unwrap();
    fs::write(&key_path, key.to_pkcs8_pem()?).unwrap();

    let signed = issuance::sign_certificate(
        SignRequest::builder()
            .cert_path(&cert_path)
            .key_path(&key_path)
            .ca_cert_path(&ca_cert)
            .ca_key_path(&ca_key)
            .output_dir(dir.path())
            .build(),
    )?;
    assert_eq!(signed.path, dir.path().join("signed.crt"));

    let written = Certificate::from_pem(&fs::read_to_string(&signed.path).unwrap())?;
    let before = original.info()?;
    let after = written.info()?;
    assert_eq!(after.serial_number, before.serial_number);
    assert_eq!(after.subject, before.subject);
    assert_eq!(after.dns_names, vec!["api.example.com"]);
    assert_eq!(after.issuer, util::root().issued.info()?.subject);
    written.verify_issued_by(util::root().issued.certificate())?;
    assert!(written.verify_issued_by(original.certificate()).is_err());

    // Signing signed.crt again must not overwrite its input.
    let again = issuance::sign_certificate(
        SignRequest::builder()
            .cert_path(&signed.path)
            .key_path(&key_path)
            .ca_cert_path(&ca_cert)
            .ca_key_path(&ca_key)
            .output_dir(dir.path())
            .build(),
    )?;
    assert_eq!(again.path, dir.path().join("signed.signed.crt"));
    Ok(())
}

/// Records installed paths instead of touching the system store.
#[derive(Default)]
struct RecordingStore {
    installed: Mutex<Vec<PathBuf>>,
}

impl TrustStore for RecordingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn install_root_certificate(
        &self,
        path: &Path,
    ) -> std::result::Result<(), TrustInstallError> {
        self.installed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[test]
fn trust_copies_then_installs() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let (ca_cert, _) = util::write_root(dir.path());
    let out = dir.path().join("trusted");
    let store = RecordingStore::default();

    let trusted = issuance::trust_certificate(
        TrustRequest::builder()
            .cert_path(&ca_cert)
            .output_dir(&out)
            .build(),
        &store,
    )?;

    assert!(trusted.is_absolute());
    assert!(trusted.ends_with("trusted/trusted.crt"));
    assert_eq!(
        fs::read(&trusted).unwrap(),
        fs::read(&ca_cert).unwrap()
    );
    assert_eq!(*store.installed.lock().unwrap(), vec![trusted]);
    Ok(())
}

#[test]
fn trust_rejects_non_certificates() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.crt");
    fs::write(&bogus, "hello").unwrap();
    let store = RecordingStore::default();

    let result = issuance::trust_certificate(
        TrustRequest::builder()
            .cert_path(&bogus)
            .output_dir(dir.path())
            .build(),
        &store,
    );
    assert!(result.is_err());
    assert!(store.installed.lock().unwrap().is_empty());
}

#[test]
fn validation_failures_create_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never");

    let mut request = util::root_request();
    request.validity_days = Some(365);
    request.output_dir = Some(out.clone());

    let err = issuance::generate_ca(request).unwrap_err();
    assert!(matches!(
        err,
        CertgenError::InvalidConfig(ConfigError::RootValidityTooShort { min: 1825 })
    ));
    assert!(!out.exists());

    let mut request = util::root_request();
    request.key_size = Some(8192);
    request.output_dir = Some(out.clone());
    let err = issuance::generate_ca(request).unwrap_err();
    assert!(matches!(
        err,
        CertgenError::InvalidConfig(ConfigError::KeySizeTooLarge { max: 4096 })
    ));
    assert!(!out.exists());

    let mut request = util::root_request();
    request.validity_days = Some(4_000_000);
    request.output_dir = Some(out.clone());
    let err = issuance::generate_ca(request).unwrap_err();
    assert!(matches!(
        err,
        CertgenError::InvalidConfig(ConfigError::ValidityNotEncodable { .. })
    ));
    assert!(!out.exists());
}

#[test]
fn yaml_request_drives_generation() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let (ca_cert, ca_key) = util::write_root(dir.path());
    let yaml = format!(
        "class: 1\ncommonName: mail.example.com\norganization: Example Corp\ncountry: US\n\
         validityDays: 30\ndnsNames:\n  - mail.example.com\n  - smtp.example.com\n\
         caCert: {}\ncaKey: {}\noutputDir: {}\n",
        ca_cert.display(),
        ca_key.display(),
        dir.path().join("mail").display()
    );
    let request: LeafRequest = serde_norway::from_str(&yaml).unwrap();

    let issued = issuance::generate_certificate(request)?;
    let info = issued.certificate.info()?;
    assert_eq!(info.dns_names, vec!["mail.example.com", "smtp.example.com"]);
    assert_eq!((info.not_after - info.not_before).whole_days(), 30);
    Ok(())
}
