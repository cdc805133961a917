//! # certgen - Class-Graded X.509 Certificate Issuance
//!
//! certgen issues root CAs, intermediate CAs and end-entity certificates whose
//! key sizes, validity periods, extended key usages, path lengths and policy
//! identifiers follow a three-tier assurance class. It is built entirely on
//! the RustCrypto stack, without ring or OpenSSL (except for testing).
//!
//! ## Certificate Classes
//!
//! | Class | Min key | Max validity | Extended key usages | Path length |
//! |-------|---------|--------------|---------------------|-------------|
//! | 1 | 2048 | 1825 days | clientAuth, emailProtection | 0 |
//! | 2 | 3072 | 1095 days | serverAuth, clientAuth | 1 |
//! | 3 | 4096 | 730 days | serverAuth, clientAuth, codeSigning | 2 |
//!
//! Class 3 certificates and every root carry the `anyPolicy` policy
//! identifier. Roots must be Class 2 or higher, use at least 4096-bit keys
//! and be valid for at least five years.
//!
//! ## Supported Key Types
//!
//! Generated keys are RSA. Issuer keys loaded from PKCS#8 may be:
//! - **RSA**: signed with sha256WithRSAEncryption
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Quick Start
//!
//! ### Generating a Root CA
//!
//! ```rust,no_run
//! use certgen::{issuance, policy::CaKind, request::CaRequest};
//!
//! # fn main() -> Result<(), certgen::error::CertgenError> {
//! let request = CaRequest::builder()
//!     .kind(CaKind::Root)
//!     .class(2)
//!     .common_name("Example Root CA")
//!     .organization("Example Corp")
//!     .country("US")
//!     .validity_days(3650)
//!     .output_dir("certs/root")
//!     .build();
//!
//! // Writes certs/root/ca.crt (0644) and certs/root/ca.key (0600)
//! let issued = issuance::generate_ca(request)?;
//! println!("serial {:x}", issued.certificate.serial_number());
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing a Server Certificate
//!
//! ```rust,no_run
//! use certgen::{issuance, request::LeafRequest};
//!
//! # fn main() -> Result<(), certgen::error::CertgenError> {
//! let request = LeafRequest::builder()
//!     .class(2)
//!     .common_name("example.com")
//!     .organization("Example Corp")
//!     .country("US")
//!     .dns_names(vec!["example.com".into(), "www.example.com".into()])
//!     .ca_cert("certs/root/ca.crt")
//!     .ca_key("certs/root/ca.key")
//!     .output_dir("certs/server")
//!     .build();
//!
//! let issued = issuance::generate_certificate(request)?;
//! assert_eq!(issued.certificate.info()?.dns_names.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing in Memory
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use certgen::issuer::CaBundle;
//! use certgen::request::{CaRequest, LeafRequest};
//! use certgen::{issuance, validate};
//!
//! # fn main() -> Result<(), certgen::error::CertgenError> {
//! let root = validate::validate_ca(
//!     CaRequest::builder()
//!         .class(2)
//!         .common_name("Example Root CA")
//!         .organization("Example Corp")
//!         .country("US")
//!         .build(),
//! )?;
//! let (root_cert, root_key) = issuance::issue_ca(&root)?;
//! let bundle = Arc::new(CaBundle::new(root_cert.into_certificate(), root_key)?);
//!
//! let mut leaf = LeafRequest::builder()
//!     .common_name("client.example.com")
//!     .organization("Example Corp")
//!     .country("US")
//!     .build();
//! leaf.ca_bundle = Some(bundle);
//! let (certificate, _key) = issuance::issue_leaf(&validate::validate_leaf(leaf)?)?;
//! println!("{}", certificate.to_pem());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every request is validated before any key is generated. Validation
//! failures are [`error::ConfigError`]s that name the offending field:
//!
//! ```rust
//! use certgen::error::{CertgenError, ConfigError};
//! use certgen::{issuance, policy::CaKind, request::CaRequest};
//!
//! let request = CaRequest::builder()
//!     .kind(CaKind::Root)
//!     .class(1)
//!     .common_name("Root CA")
//!     .organization("Example Corp")
//!     .country("US")
//!     .build();
//!
//! match issuance::generate_ca(request) {
//!     Err(CertgenError::InvalidConfig(err)) => {
//!         assert_eq!(err.field(), "class");
//!         assert_eq!(err.to_string(), "root certificates must be Class 2 or higher");
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`policy`]: The class policy table
//! - [`request`]: Raw request types, deserialized or built
//! - [`validate`]: Request validation and validated request types
//! - [`cert`]: Certificates, typed extensions and templates
//! - [`key`]: Key generation, import/export, serial numbers
//! - [`issuer`]: Signing, for self-signed roots and loaded CAs
//! - [`tbs_certificate`]: Low-level certificate structure assembly
//! - [`persist`]: Writing certificates and keys to disk
//! - [`trust`]: Operating system trust store installation
//! - [`issuance`]: The end-to-end flows
//! - [`error`]: Error types

pub mod cert;
pub mod error;
pub mod issuance;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod persist;
pub mod policy;
pub mod request;
pub mod tbs_certificate;
pub mod trust;
pub mod validate;
