//! Paginated enumeration of issued certificates.

use std::collections::BTreeMap;
use std::sync::Arc;

use bon::Builder;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::cert::CERTS_PREFIX;
use crate::cert::info::CertificateInfo;
use crate::error::CertFetchError;
use crate::error::Result;
use crate::serial;
use crate::storage::Storage;

/// A page request over issued certificates.
///
/// # Fields
/// * `after` - Only serials sorting strictly after this one are returned.
///   Accepts the colon-separated display form or the bare hex form.
/// * `limit` - Maximum number of serials; zero or negative means no limit.
#[derive(Clone, Debug, Default, Builder, PartialEq, Eq)]
pub struct ListRequest {
    #[builder(into)]
    pub after: Option<String>,
    #[builder(default)]
    pub limit: i64,
}

impl ListRequest {
    fn cursor(&self) -> Option<String> {
        let after = self.after.as_deref().filter(|after| !after.is_empty())?;
        Some(serial::normalize(after).unwrap_or_else(|_| after.to_string()))
    }

    fn page_size(&self) -> Option<usize> {
        usize::try_from(self.limit).ok().filter(|limit| *limit > 0)
    }
}

/// Serials of one page, in display form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListResponse {
    pub keys: Vec<String>,
}

/// Serials of one page together with a summary of each certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetailedListResponse {
    pub keys: Vec<String>,
    pub key_info: BTreeMap<String, CertificateInfo>,
}

/// Lists issued certificates.
#[derive(Clone)]
pub struct Listing {
    storage: Arc<dyn Storage>,
    max_dns_names: usize,
}

impl Listing {
    pub fn new(storage: Arc<dyn Storage>, max_dns_names: usize) -> Self {
        Self { storage, max_dns_names }
    }

    /// List serials without any consistency guarantee across the page.
    pub async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        let entries = self
            .storage
            .list_page(CERTS_PREFIX, request.cursor().as_deref(), request.page_size())
            .await?;
        Ok(ListResponse {
            keys: entries.iter().map(|key| serial::denormalize(key)).collect(),
        })
    }

    /// List serials and summarize every certificate on the page.
    ///
    /// Runs inside a read-only transaction when the backend offers one, so
    /// the whole page reflects a single point in time. The transaction is
    /// rolled back however the listing ends. Any entry that cannot be read
    /// or parsed fails the whole listing.
    pub async fn list_detailed(&self, request: &ListRequest) -> Result<DetailedListResponse> {
        let Some(txn) = self.storage.begin_read_only().await? else {
            return self.detailed(self.storage.as_ref(), request).await;
        };

        let result = self.detailed(txn.as_storage(), request).await;
        if let Err(err) = txn.rollback().await {
            warn!(error = %err, "Failed to roll back read-only transaction");
        }
        result
    }

    async fn detailed(&self, storage: &dyn Storage, request: &ListRequest) -> Result<DetailedListResponse> {
        let entries = storage
            .list_page(CERTS_PREFIX, request.cursor().as_deref(), request.page_size())
            .await?;
        debug!(count = entries.len(), "Listing certificate details");

        let mut response = DetailedListResponse::default();
        for key in entries {
            let der = storage
                .get(&format!("{CERTS_PREFIX}{key}"))
                .await?
                .ok_or_else(|| CertFetchError::User(format!("failed to retrieve entry for {key}")))?;

            let display = serial::denormalize(&key);
            let info = CertificateInfo::from_der(&der, self.max_dns_names).map_err(|e| {
                CertFetchError::User(format!("failed to parse certificate for {display}: {e}"))
            })?;

            response.keys.push(display.clone());
            response.key_info.insert(display, info);
        }
        Ok(response)
    }
}

impl std::fmt::Debug for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listing")
            .field("max_dns_names", &self.max_dns_names)
            .finish_non_exhaustive()
    }
}
