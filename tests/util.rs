#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use certgen::cert::IssuedCertificate;
use certgen::cert::template::build_ca_template;
use certgen::issuance;
use certgen::issuer::{CaBundle, Issuer, SelfIssuer};
use certgen::key::KeyPair;
use certgen::policy::CaKind;
use certgen::request::CaRequest;
use certgen::validate::validate_ca;

pub struct Root {
    pub issued: IssuedCertificate,
    pub bundle: Arc<CaBundle>,
}

/// Class 2 root, 4096-bit RSA, valid for ten years. Generated once per test
/// binary.
pub fn root() -> &'static Root {
    static ROOT: OnceLock<Root> = OnceLock::new();
    ROOT.get_or_init(|| {
        let request = validate_ca(root_request()).unwrap();
        let (issued, key) = issuance::issue_ca(&request).unwrap();
        let bundle = CaBundle::new(issued.certificate().clone(), key).unwrap();
        Root {
            issued,
            bundle: Arc::new(bundle),
        }
    })
}

pub fn root_request() -> CaRequest {
    CaRequest::builder()
        .kind(CaKind::Root)
        .class(2)
        .common_name("Root CA")
        .organization("Example Corp")
        .country("US")
        .key_size(4096)
        .validity_days(3650)
        .build()
}

/// Writes the shared root to `dir` as `root.crt` and `root.key`.
pub fn write_root(dir: &Path) -> (PathBuf, PathBuf) {
    let root = root();
    let cert_path = dir.join("root.crt");
    let key_path = dir.join("root.key");
    std::fs::write(&cert_path, root.issued.to_pem()).unwrap();
    std::fs::write(&key_path, root.bundle.key().to_pkcs8_pem().unwrap()).unwrap();
    (cert_path, key_path)
}

/// An unrelated self-signed Class 2 CA with a P-256 key.
pub fn other_ca() -> Arc<CaBundle> {
    let request = validate_ca(
        CaRequest::builder()
            .class(2)
            .common_name("Other CA")
            .organization("Elsewhere Inc")
            .country("DE")
            .build(),
    )
    .unwrap();
    let template = build_ca_template(&request).unwrap();
    let key = KeyPair::generate_ecdsa_p256();
    let issued = SelfIssuer {
        name: template.subject.clone(),
        key: &key,
    }
    .issue(&template, &key.public_key())
    .unwrap();
    Arc::new(CaBundle::new(issued.into_certificate(), key).unwrap())
}
