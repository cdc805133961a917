mod util;

use std::process::Command;

use certgen::issuance;
use certgen::request::LeafRequest;
use certgen::validate::validate_leaf;
use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509StoreContext};
use regex::Regex;

fn issue_leaf_pem() -> String {
    let request = LeafRequest::builder()
        .class(2)
        .common_name("server.example.com")
        .organization("Example Corp")
        .country("US")
        .dns_names(vec![
            "server.example.com".to_string(),
            "www.example.com".to_string(),
        ])
        .ca_bundle(util::root().bundle.clone())
        .build();
    let (issued, _key) = issuance::issue_leaf(&validate_leaf(request).unwrap()).unwrap();
    issued.to_pem()
}

fn openssl_text(pem: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let cert_path = dir.path().join("cert.pem");
    std::fs::write(&cert_path, pem).expect("Failed to write certificate");

    let output = Command::new("openssl")
        .arg("x509")
        .arg("-in")
        .arg(&cert_path)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_openssl_cli_reads_root() {
    let root = util::root();
    let output_text = openssl_text(&root.issued.to_pem());

    assert!(
        output_text.contains("Version: 3 (0x2)"),
        "Version field is incorrect"
    );
    assert!(
        output_text.contains("Signature Algorithm: sha256WithRSAEncryption"),
        "Signature Algorithm field is incorrect"
    );
    assert!(
        output_text.contains("Public-Key: (4096 bit)"),
        "Key size is incorrect"
    );
    assert!(
        output_text.contains("CA:TRUE, pathlen:1"),
        "Basic Constraints are incorrect"
    );
    assert!(
        output_text.contains("Certificate Sign, CRL Sign"),
        "Key Usage is incorrect"
    );

    let subject = Regex::new(r"Subject: C\s?=\s?US, O\s?=\s?Example Corp, CN\s?=\s?Root CA").unwrap();
    assert!(subject.is_match(&output_text), "Subject field is incorrect");
    let issuer = Regex::new(r"Issuer: C\s?=\s?US, O\s?=\s?Example Corp, CN\s?=\s?Root CA").unwrap();
    assert!(issuer.is_match(&output_text), "Issuer field is incorrect");

    let not_before_regex = Regex::new(r"Not Before: .+").unwrap();
    let not_after_regex = Regex::new(r"Not After : .+").unwrap();
    assert!(
        not_before_regex.is_match(&output_text),
        "Missing or incorrect Not Before field"
    );
    assert!(
        not_after_regex.is_match(&output_text),
        "Missing or incorrect Not After field"
    );
}

#[test]
fn test_openssl_cli_reads_leaf() {
    let output_text = openssl_text(&issue_leaf_pem());

    assert!(
        output_text.contains("CA:FALSE"),
        "Basic Constraints are incorrect"
    );
    assert!(
        output_text.contains("DNS:server.example.com, DNS:www.example.com"),
        "Subject Alternative Name is incorrect"
    );
    assert!(
        output_text.contains("TLS Web Server Authentication, TLS Web Client Authentication"),
        "Extended Key Usage is incorrect"
    );
    assert!(
        output_text.contains("Public-Key: (3072 bit)"),
        "Key size is incorrect"
    );
}

#[test]
fn test_openssl_crate_validate_chain() {
    let root = util::root();
    let ca = X509::from_pem(root.issued.to_pem().as_bytes()).expect("Failed to parse CA PEM");
    let leaf = X509::from_pem(issue_leaf_pem().as_bytes()).expect("Failed to parse PEM");

    // Check subject
    let subject = leaf
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(subject.to_string(), "server.example.com", "Subject CN mismatch");

    // Check issuer
    let issuer = leaf
        .issuer_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(issuer.to_string(), "Root CA", "Issuer CN mismatch");

    assert_eq!(leaf.version(), 2, "X509 version should be 3 (0-based index)");
    assert_eq!(
        leaf.signature_algorithm().object().nid(),
        Nid::SHA256WITHRSAENCRYPTION,
        "Signature algorithm should be sha256WithRSAEncryption"
    );

    let names: Vec<String> = leaf
        .subject_alt_names()
        .unwrap()
        .iter()
        .filter_map(|name| name.dnsname().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["server.example.com", "www.example.com"]);

    assert!(leaf.verify(&ca.public_key().unwrap()).unwrap());
    let other = util::other_ca();
    let other = X509::from_der(&other.certificate().to_der().unwrap()).unwrap();
    assert!(!matches!(leaf.verify(&other.public_key().unwrap()), Ok(true)));

    // Full path validation against a store holding only the root.
    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(ca).unwrap();
    let store = store.build();
    let chain: Stack<X509> = Stack::new().unwrap();
    let mut context = X509StoreContext::new().unwrap();
    let verified = context
        .init(&store, &leaf, &chain, |c| c.verify_cert())
        .unwrap();
    assert!(verified, "OpenSSL rejected the chain");
}
