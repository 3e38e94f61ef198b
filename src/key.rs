use std::fmt;

use const_oid::ObjectIdentifier;
use const_oid::db::rfc5912;
use const_oid::db::rfc8410;
use der::Decode;
use serde::Serialize;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

/// Public key families reported for issued certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    Ec,
    Ed25519,
    Unknown,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Rsa => "rsa",
            KeyType::Ec => "ec",
            KeyType::Ed25519 => "ed25519",
            KeyType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Key family and strength of a certificate's subject public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    pub key_type: KeyType,
    pub bits: u32,
}

impl KeyInfo {
    const UNKNOWN: KeyInfo = KeyInfo {
        key_type: KeyType::Unknown,
        bits: 0,
    };

    /// Classify a subject public key.
    ///
    /// RSA strength is the modulus length in whole bytes times eight. EC
    /// strength comes from the named curve. Ed25519 is always 256. Anything
    /// else, including an RSA key that fails to decode, is reported as
    /// `unknown` with zero bits.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Self {
        match spki.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => {
                match rsa::pkcs1::RsaPublicKey::from_der(spki.subject_public_key.raw_bytes()) {
                    Ok(key) => KeyInfo {
                        key_type: KeyType::Rsa,
                        bits: (key.modulus.as_bytes().len() * 8) as u32,
                    },
                    Err(_) => Self::UNKNOWN,
                }
            }
            rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.decode_as::<ObjectIdentifier>().ok());
                KeyInfo {
                    key_type: KeyType::Ec,
                    bits: curve.map(curve_bits).unwrap_or(0),
                }
            }
            rfc8410::ID_ED_25519 => KeyInfo {
                key_type: KeyType::Ed25519,
                bits: 256,
            },
            _ => Self::UNKNOWN,
        }
    }
}

fn curve_bits(curve: ObjectIdentifier) -> u32 {
    match curve {
        rfc5912::SECP_224_R_1 => 224,
        rfc5912::SECP_256_R_1 => 256,
        rfc5912::SECP_384_R_1 => 384,
        rfc5912::SECP_521_R_1 => 521,
        _ => 0,
    }
}
