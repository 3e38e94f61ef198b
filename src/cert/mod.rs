pub mod info;

use std::sync::Arc;

use der::Decode;
use tracing::debug;
use x509_cert::Certificate;

use crate::error::Result;
use crate::issuer::IssuerDirectory;
use crate::issuer::IssuerRef;
use crate::issuer::IssuerUsage;
use crate::pem_utils::CERTIFICATE_LABEL;
use crate::pem_utils::der_to_pem;
use crate::serial;
use crate::storage::Storage;

/// Storage prefix holding issued certificates.
pub const CERTS_PREFIX: &str = "certs/";

/// An issued certificate as stored, keyed by its canonical serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    /// Canonical serial number.
    pub serial: String,
    /// DER-encoded certificate.
    pub der: Vec<u8>,
}

/// The active CA certificate together with its issuing chain.
///
/// `chain` lists the certificates above the CA certificate, leaf-to-root. It
/// may also contain the CA certificate itself; [`CaInfo::full_chain`] skips it.
#[derive(Debug, Clone)]
pub struct CaInfo {
    pub issuer_id: String,
    pub certificate: Certificate,
    pub certificate_der: Vec<u8>,
    pub chain: Vec<Vec<u8>>,
}

impl CaInfo {
    /// Builds a `CaInfo` from a DER CA certificate and its DER chain.
    pub fn new(issuer_id: impl Into<String>, certificate_der: Vec<u8>, chain: Vec<Vec<u8>>) -> Result<Self> {
        let certificate = Certificate::from_der(&certificate_der)?;
        Ok(Self {
            issuer_id: issuer_id.into(),
            certificate,
            certificate_der,
            chain,
        })
    }

    /// The CA certificate followed by every chain certificate that is not the
    /// CA certificate itself.
    pub fn full_chain(&self) -> Vec<&[u8]> {
        std::iter::once(self.certificate_der.as_slice())
            .chain(
                self.chain
                    .iter()
                    .map(Vec::as_slice)
                    .filter(|der| *der != self.certificate_der.as_slice()),
            )
            .collect()
    }
}

/// Concatenate certificates as PEM blocks separated by single newlines.
///
/// Output never contains a blank line and never ends in a newline. An empty
/// chain yields an empty string.
pub fn build_chain<B: AsRef<[u8]>>(chain: &[B]) -> String {
    chain
        .iter()
        .map(|der| der_to_pem(der.as_ref(), CERTIFICATE_LABEL))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Read access to issued certificates and the active CA.
#[derive(Clone)]
pub struct CertificateStore {
    storage: Arc<dyn Storage>,
    issuers: Arc<dyn IssuerDirectory>,
    default_issuer: IssuerRef,
}

impl CertificateStore {
    pub fn new(storage: Arc<dyn Storage>, issuers: Arc<dyn IssuerDirectory>, default_issuer: IssuerRef) -> Self {
        Self {
            storage,
            issuers,
            default_issuer,
        }
    }

    /// Fetch an issued certificate by serial.
    ///
    /// Returns `Ok(None)` when no certificate is stored under that serial.
    /// Certificates written under the older hyphenated key are found too.
    pub async fn fetch_by_serial(&self, serial: &str) -> Result<Option<CertificateEntry>> {
        let canonical = serial::normalize(serial)?;

        if let Some(der) = self.storage.get(&format!("{CERTS_PREFIX}{canonical}")).await? {
            return Ok(Some(CertificateEntry { serial: canonical, der }));
        }

        let legacy = serial::legacy_key(&canonical);
        if legacy != canonical {
            if let Some(der) = self.storage.get(&format!("{CERTS_PREFIX}{legacy}")).await? {
                debug!(serial = %canonical, "Found certificate under legacy key");
                return Ok(Some(CertificateEntry { serial: canonical, der }));
            }
        }

        Ok(None)
    }

    /// Fetch the configured CA for the given usage.
    pub async fn fetch_ca_info(&self, usage: IssuerUsage) -> Result<CaInfo> {
        self.issuers.current_issuer(&self.default_issuer, usage).await
    }

    /// Fetch the configured CA's full or delta CRL, DER-encoded.
    pub async fn fetch_crl(&self, delta: bool) -> Result<Option<Vec<u8>>> {
        self.issuers.crl(&self.default_issuer, delta).await
    }

    /// The issuer reference this store resolves the CA through.
    pub fn default_issuer(&self) -> &IssuerRef {
        &self.default_issuer
    }
}

impl std::fmt::Debug for CertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateStore")
            .field("default_issuer", &self.default_issuer)
            .finish_non_exhaustive()
    }
}
