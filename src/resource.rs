//! Mapping of request paths onto fetchable resources.
//!
//! Fixed CA, chain and CRL forms are checked before the serial-keyed
//! `cert/<serial>` form, so `cert/ca` always means the CA certificate even
//! though `ca` is valid hex.

use std::sync::LazyLock;

use regex::Regex;

use crate::conditional::ResourceClass;
use crate::error::CertFetchError;
use crate::error::Result;

static CERT_BY_SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^cert/(?P<serial>[0-9A-Fa-f:-]*)(?P<raw>/raw(?P<pem>/pem)?)?$").expect("static pattern")
});

/// Representation requested for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Raw DER body.
    Der,
    /// Raw body holding a single PEM block.
    Pem,
    /// Structured response with the PEM text and revocation metadata.
    Json,
}

/// A fetchable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// The active CA certificate.
    Ca(Encoding),
    /// The CA certificate and its issuers as concatenated PEM.
    CaChain { raw: bool },
    /// The CRL or delta CRL of the active CA.
    Crl { delta: bool, encoding: Encoding },
    /// An issued certificate.
    Certificate { serial: String, encoding: Encoding },
}

impl ResourceKind {
    /// Classify a request path.
    pub fn classify(path: &str) -> Result<Self> {
        let path = path.trim_start_matches('/');
        let kind = match path {
            "ca" | "cert/ca/raw" => ResourceKind::Ca(Encoding::Der),
            "ca/pem" | "cert/ca/raw/pem" => ResourceKind::Ca(Encoding::Pem),
            "cert/ca" => ResourceKind::Ca(Encoding::Json),

            "ca_chain" => ResourceKind::CaChain { raw: true },
            "cert/ca_chain" => ResourceKind::CaChain { raw: false },

            "crl" | "cert/crl/raw" => crl(false, Encoding::Der),
            "crl/pem" | "cert/crl/raw/pem" => crl(false, Encoding::Pem),
            "cert/crl" => crl(false, Encoding::Json),
            "crl/delta" | "cert/delta-crl/raw" => crl(true, Encoding::Der),
            "crl/delta/pem" | "cert/delta-crl/raw/pem" => crl(true, Encoding::Pem),
            "cert/delta-crl" => crl(true, Encoding::Json),

            _ => {
                let captures = CERT_BY_SERIAL
                    .captures(path)
                    .ok_or_else(|| CertFetchError::UnsupportedPath(path.to_string()))?;
                let encoding = match (captures.name("raw"), captures.name("pem")) {
                    (None, _) => Encoding::Json,
                    (Some(_), None) => Encoding::Der,
                    (Some(_), Some(_)) => Encoding::Pem,
                };
                ResourceKind::Certificate {
                    serial: captures["serial"].to_string(),
                    encoding,
                }
            }
        };
        Ok(kind)
    }

    /// Whether the response is a raw body rather than a structured document.
    pub fn is_raw(&self) -> bool {
        match self {
            ResourceKind::Ca(encoding)
            | ResourceKind::Crl { encoding, .. }
            | ResourceKind::Certificate { encoding, .. } => *encoding != Encoding::Json,
            ResourceKind::CaChain { raw } => *raw,
        }
    }

    /// Content type of raw responses; structured responses have none.
    pub fn content_type(&self) -> Option<&'static str> {
        let content_type = match self {
            ResourceKind::Ca(Encoding::Der) | ResourceKind::Certificate { encoding: Encoding::Der, .. } => {
                "application/pkix-cert"
            }
            ResourceKind::Ca(Encoding::Pem) | ResourceKind::Certificate { encoding: Encoding::Pem, .. } => {
                "application/pem-certificate-chain"
            }
            ResourceKind::CaChain { raw: true } => "application/pkix-cert",
            ResourceKind::Crl { encoding: Encoding::Der, .. } => "application/pkix-crl",
            ResourceKind::Crl { encoding: Encoding::Pem, .. } => "application/x-pem-file",
            _ => return None,
        };
        Some(content_type)
    }

    /// The conditional-caching class, for resources that have one.
    pub fn conditional_class(&self) -> Option<ResourceClass> {
        match self {
            ResourceKind::Ca(_) => Some(ResourceClass::Ca),
            ResourceKind::Crl { delta: false, .. } => Some(ResourceClass::Crl),
            ResourceKind::Crl { delta: true, .. } => Some(ResourceClass::DeltaCrl),
            ResourceKind::CaChain { .. } | ResourceKind::Certificate { .. } => None,
        }
    }
}

fn crl(delta: bool, encoding: Encoding) -> ResourceKind {
    ResourceKind::Crl { delta, encoding }
}
