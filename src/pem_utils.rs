use crate::error::CertgenError;

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
/// PEM label of an unencrypted PKCS#8 private key.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert the first block of a PEM‑encoded string to DER‑encoded bytes.
///
/// Fails when the block is labelled anything other than `expected_label`.
pub fn pem_to_der(pem_str: &str, expected_label: &str) -> Result<Vec<u8>, CertgenError> {
    let pem = pem::parse(pem_str)?;
    if pem.tag() != expected_label {
        return Err(CertgenError::DecodingError(format!(
            "expected a PEM {expected_label} block, found {}",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}
