use std::sync::Arc;

use bon::Builder;
use time::OffsetDateTime;
use tracing::debug;

use crate::cert::CertificateStore;
use crate::cert::build_chain;
use crate::conditional::ConditionalGate;
use crate::conditional::GateDecision;
use crate::conditional::parse_http_date;
use crate::config::FetchConfig;
use crate::error::CertFetchError;
use crate::error::Result;
use crate::issuer::IssuerDirectory;
use crate::issuer::StoredIssuerDirectory;
use crate::listing::DetailedListResponse;
use crate::listing::ListRequest;
use crate::listing::ListResponse;
use crate::listing::Listing;
use crate::pem_utils::CERTIFICATE_LABEL;
use crate::pem_utils::CRL_LABEL;
use crate::pem_utils::der_to_pem;
use crate::resource::Encoding;
use crate::resource::ResourceKind;
use crate::response::FetchResponse;
use crate::response::Outcome;
use crate::response::Resolved;
use crate::response::finalize;
use crate::revocation::RevocationIndex;
use crate::storage::Storage;

/// Serial values that always address the CA rather than a stored certificate.
const CA_SERIAL: &str = "ca";
const CA_CHAIN_SERIAL: &str = "ca_chain";

/// A single read request.
///
/// # Fields
/// * `kind` - The resource to read.
/// * `if_modified_since` - The caller's cached copy time, for CA and CRL reads.
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct FetchRequest {
    pub kind: ResourceKind,
    pub if_modified_since: Option<OffsetDateTime>,
}

impl FetchRequest {
    /// Build a request from a path and a raw `If-Modified-Since` header value.
    ///
    /// A header that is not a valid HTTP date is ignored.
    pub fn from_path(path: &str, if_modified_since: Option<&str>) -> Result<Self> {
        Ok(Self {
            kind: ResourceKind::classify(path)?,
            if_modified_since: if_modified_since.and_then(parse_http_date),
        })
    }
}

/// Read-side entry point for CA certificates, chains, CRLs and issued
/// certificates.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use certfetch::config::FetchConfig;
/// use certfetch::fetch::CertFetcher;
/// use certfetch::storage::MemoryStorage;
///
/// # async fn run() -> Result<(), certfetch::error::CertFetchError> {
/// let fetcher = CertFetcher::with_storage(Arc::new(MemoryStorage::new()), FetchConfig::default());
/// let response = fetcher.fetch_path("ca/pem", None).await?;
/// assert_eq!(response.status_code, 204);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CertFetcher {
    store: CertificateStore,
    revocations: RevocationIndex,
    gate: ConditionalGate,
    listing: Listing,
    config: FetchConfig,
}

impl CertFetcher {
    pub fn new(storage: Arc<dyn Storage>, issuers: Arc<dyn IssuerDirectory>, config: FetchConfig) -> Self {
        Self {
            store: CertificateStore::new(storage.clone(), issuers.clone(), config.default_issuer.clone()),
            revocations: RevocationIndex::new(storage.clone()),
            gate: ConditionalGate::new(issuers, config.default_issuer.clone()),
            listing: Listing::new(storage, config.max_dns_names),
            config,
        }
    }

    /// Build a fetcher whose issuer state is read from the same storage.
    pub fn with_storage(storage: Arc<dyn Storage>, config: FetchConfig) -> Self {
        let issuers = Arc::new(StoredIssuerDirectory::new(storage.clone()));
        Self::new(storage, issuers, config)
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    /// Serve a read request.
    ///
    /// Raw reads never fail. Structured reads fail only on internal errors;
    /// caller-fixable problems come back as a 400 error envelope.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let outcome = self.resolve(&request.kind, request.if_modified_since).await;
        finalize(&request.kind, outcome)
    }

    /// Serve a read request addressed by path.
    pub async fn fetch_path(&self, path: &str, if_modified_since: Option<OffsetDateTime>) -> Result<FetchResponse> {
        let request = FetchRequest {
            kind: ResourceKind::classify(path)?,
            if_modified_since,
        };
        self.fetch(&request).await
    }

    pub async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        self.listing.list(request).await
    }

    pub async fn list_detailed(&self, request: &ListRequest) -> Result<DetailedListResponse> {
        self.listing.list_detailed(request).await
    }

    async fn resolve(&self, kind: &ResourceKind, if_modified_since: Option<OffsetDateTime>) -> Result<Outcome> {
        if let Some(class) = kind.conditional_class() {
            if let GateDecision::NotModified { last_modified } = self.gate.check(class, if_modified_since).await {
                return Ok(Outcome::NotModified { last_modified });
            }
        }

        match kind {
            ResourceKind::Ca(encoding) => self.ca(*encoding).await,
            ResourceKind::CaChain { .. } => self.ca_chain().await,
            ResourceKind::Crl { delta, encoding } => self.crl(*delta, *encoding).await,
            ResourceKind::Certificate { serial, encoding } => self.certificate(serial, *encoding).await,
        }
    }

    async fn ca(&self, encoding: Encoding) -> Result<Outcome> {
        let ca = self.store.fetch_ca_info(self.config.ca_usage).await?;
        debug!(issuer_id = %ca.issuer_id, ?encoding, "Serving CA certificate");
        Ok(found(encode(ca.certificate_der, encoding, CERTIFICATE_LABEL)))
    }

    async fn ca_chain(&self) -> Result<Outcome> {
        let ca = self.store.fetch_ca_info(self.config.ca_usage).await?;
        let chain = ca.full_chain();
        debug!(issuer_id = %ca.issuer_id, len = chain.len(), "Serving CA chain");
        Ok(Outcome::Found(Resolved {
            body: build_chain(&chain).into_bytes(),
            revocation: None,
            chain: true,
        }))
    }

    async fn crl(&self, delta: bool, encoding: Encoding) -> Result<Outcome> {
        match self.store.fetch_crl(delta).await? {
            Some(der) => Ok(found(encode(der, encoding, CRL_LABEL))),
            None => {
                debug!(delta, "No CRL has been built");
                Ok(Outcome::NotFound)
            }
        }
    }

    async fn certificate(&self, serial: &str, encoding: Encoding) -> Result<Outcome> {
        match serial {
            "" => {
                return Err(CertFetchError::User(
                    "The serial number must be provided".to_string(),
                ));
            }
            CA_SERIAL => return self.ca(encoding).await,
            CA_CHAIN_SERIAL => return self.ca_chain().await,
            _ => {}
        }

        let Some(entry) = self.store.fetch_by_serial(serial).await? else {
            debug!(serial, "Certificate not found");
            return Ok(Outcome::NotFound);
        };

        // Raw bodies never carry revocation metadata.
        let revocation = match encoding {
            Encoding::Json => self.revocations.lookup(serial).await?,
            Encoding::Der | Encoding::Pem => None,
        };

        Ok(Outcome::Found(Resolved {
            body: encode(entry.der, encoding, CERTIFICATE_LABEL),
            revocation,
            chain: false,
        }))
    }
}

impl std::fmt::Debug for CertFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn found(body: Vec<u8>) -> Outcome {
    Outcome::Found(Resolved {
        body,
        ..Resolved::default()
    })
}

fn encode(der: Vec<u8>, encoding: Encoding, label: &str) -> Vec<u8> {
    match encoding {
        Encoding::Der => der,
        Encoding::Pem | Encoding::Json => der_to_pem(&der, label).into_bytes(),
    }
}
