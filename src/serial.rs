//! Serial number normalization.
//!
//! Serials arrive colon- or hyphen-separated and in either case. Storage keys
//! use the bare lowercase hex form; humans get colon-separated byte pairs.

use crate::error::CertFetchError;
use crate::error::Result;

const SEPARATORS: [char; 2] = [':', '-'];

/// Canonicalize a user-supplied serial into its storage key form.
///
/// Separators are stripped and hex digits lowercased. The digits are kept
/// as given, so an odd-length serial addresses an odd-length key.
pub fn normalize(input: &str) -> Result<String> {
    let hex: String = input
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if hex.is_empty() {
        return Err(CertFetchError::InvalidSerial(format!("'{input}' contains no hex digits")));
    }
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CertFetchError::InvalidSerial(format!(
            "'{input}' contains non-hex character '{bad}'"
        )));
    }
    Ok(hex)
}

/// Render a storage key as colon-separated byte pairs.
///
/// Accepts the canonical form as well as keys written with separators.
pub fn denormalize(key: &str) -> String {
    byte_pairs(key).join(":")
}

/// The hyphen-separated key layout used by older writers.
pub fn legacy_key(canonical: &str) -> String {
    byte_pairs(canonical).join("-")
}

fn byte_pairs(key: &str) -> Vec<String> {
    let hex: Vec<char> = key
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    // A leading odd digit stays on its own.
    let split = hex.len() % 2;
    let mut pairs = Vec::with_capacity(hex.len() / 2 + split);
    if split == 1 {
        pairs.push(hex[0].to_string());
    }
    pairs.extend(hex[split..].chunks(2).map(|pair| pair.iter().collect::<String>()));
    pairs
}
