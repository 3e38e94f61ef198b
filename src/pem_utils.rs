/// PEM label for X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// PEM label for certificate revocation lists.
pub const CRL_LABEL: &str = "X509 CRL";

/// Convert DER‑encoded data into a PEM block with the provided label.
///
/// Lines end in `\n` and the surrounding whitespace is trimmed, so the block
/// never ends in a newline.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    let encoded = pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF));
    encoded.trim().to_string()
}

/// Convert a PEM‑encoded string to DER‑encoded bytes.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<u8>, pem::PemError> {
    let pem = pem::parse(pem_str)?;
    Ok(pem.contents().to_vec())
}
