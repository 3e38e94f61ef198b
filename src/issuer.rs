use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::cert::CaInfo;
use crate::conditional::ResourceClass;
use crate::conditional::populated;
use crate::error::CertFetchError;
use crate::error::Result;
use crate::pem_utils::pem_to_der;
use crate::storage::Storage;

/// Storage key of the issuer configuration (default issuer selection).
pub const ISSUERS_CONFIG_KEY: &str = "config/issuers";
/// Storage prefix of issuer entries.
pub const ISSUER_PREFIX: &str = "issuer/";
/// Storage prefix of generated CRLs.
pub const CRL_PREFIX: &str = "crls/";
/// Storage key of the CRL build state.
pub const CRL_CONFIG_KEY: &str = "config/crl";

const DELTA_CRL_SUFFIX: &str = "-delta";

/// Selects which configured CA a request pertains to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IssuerRef {
    /// Whatever issuer is currently configured as the default.
    #[default]
    Default,
    /// An issuer by identifier.
    Id(String),
    /// An issuer by its human-assigned name.
    Name(String),
}

impl IssuerRef {
    /// Interpret a free-form reference: `default`, an existing issuer ID, or a
    /// name. Identifiers and names are told apart during resolution.
    pub fn parse(reference: &str) -> Self {
        match reference {
            "" | "default" => IssuerRef::Default,
            other => IssuerRef::Name(other.to_string()),
        }
    }
}

impl fmt::Display for IssuerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssuerRef::Default => f.write_str("default"),
            IssuerRef::Id(id) => f.write_str(id),
            IssuerRef::Name(name) => f.write_str(name),
        }
    }
}

/// Purposes an issuer may be restricted to.
///
/// Stored as a bitmask; [`IssuerUsage::ReadOnly`] is always permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum IssuerUsage {
    #[default]
    ReadOnly = 0,
    IssuingCertificates = 2,
    CrlSigning = 4,
    OcspSigning = 8,
}

impl IssuerUsage {
    /// Whether an issuer with the stored `bits` may be used for this purpose.
    pub fn permitted_by(self, bits: u32) -> bool {
        let wanted = self as u32;
        bits & wanted == wanted
    }
}

impl fmt::Display for IssuerUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssuerUsage::ReadOnly => "read-only",
            IssuerUsage::IssuingCertificates => "issuing-certificates",
            IssuerUsage::CrlSigning => "crl-signing",
            IssuerUsage::OcspSigning => "ocsp-signing",
        };
        f.write_str(name)
    }
}

/// Default issuer selection, as written by the issuance subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuersConfig {
    #[serde(default)]
    pub default: String,
}

/// A configured issuer, as written by the issuance subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// PEM-encoded CA certificate.
    pub certificate: String,
    /// PEM-encoded certificates above this one, leaf-to-root.
    #[serde(default)]
    pub ca_chain: Vec<String>,
    #[serde(default)]
    pub usage: u32,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
}

/// CRL build state, as written by the CRL builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrlConfig {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub delta_last_modified: Option<OffsetDateTime>,
}

/// Read interface to the CA and CRL issuance subsystem.
#[async_trait]
pub trait IssuerDirectory: Send + Sync {
    /// Returns the CA referenced by `issuer`, checked against `usage`.
    ///
    /// An unconfigured or unusable issuer is a [`CertFetchError::User`] error.
    async fn current_issuer(&self, issuer: &IssuerRef, usage: IssuerUsage) -> Result<CaInfo>;

    /// Returns the DER-encoded CRL (or delta CRL) of the referenced issuer.
    async fn crl(&self, issuer: &IssuerRef, delta: bool) -> Result<Option<Vec<u8>>>;

    /// Returns when the resource of the given class was last regenerated.
    async fn last_modified(&self, class: ResourceClass, issuer: &IssuerRef) -> Result<Option<OffsetDateTime>>;
}

/// [`IssuerDirectory`] reading issuer state from the shared storage backend.
#[derive(Clone)]
pub struct StoredIssuerDirectory {
    storage: Arc<dyn Storage>,
}

impl StoredIssuerDirectory {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CertFetchError::Internal(format!("corrupted entry at {key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn entry(&self, id: &str) -> Result<Option<IssuerEntry>> {
        self.read_json(&format!("{ISSUER_PREFIX}{id}")).await
    }

    /// Resolve a reference to the entry it names.
    async fn resolve(&self, issuer: &IssuerRef) -> Result<IssuerEntry> {
        match issuer {
            IssuerRef::Default => {
                let config: IssuersConfig = self.read_json(ISSUERS_CONFIG_KEY).await?.unwrap_or_default();
                if config.default.is_empty() {
                    return Err(CertFetchError::User(
                        "no default issuer currently configured".to_string(),
                    ));
                }
                self.entry(&config.default).await?.ok_or_else(|| {
                    CertFetchError::Internal(format!(
                        "default issuer {} is configured but has no entry",
                        config.default
                    ))
                })
            }
            IssuerRef::Id(id) => self
                .entry(id)
                .await?
                .ok_or_else(|| CertFetchError::User(format!("unable to find issuer {id}"))),
            IssuerRef::Name(name) => {
                if let Some(entry) = self.entry(name).await? {
                    return Ok(entry);
                }
                for id in self.storage.list_page(ISSUER_PREFIX, None, None).await? {
                    if let Some(entry) = self.entry(&id).await? {
                        if entry.name == *name {
                            return Ok(entry);
                        }
                    }
                }
                Err(CertFetchError::User(format!("unable to find issuer {name}")))
            }
        }
    }
}

#[async_trait]
impl IssuerDirectory for StoredIssuerDirectory {
    async fn current_issuer(&self, issuer: &IssuerRef, usage: IssuerUsage) -> Result<CaInfo> {
        let entry = self.resolve(issuer).await?;
        if !usage.permitted_by(entry.usage) {
            return Err(CertFetchError::User(format!(
                "issuer {} is not permitted for {usage} usage",
                entry.id
            )));
        }

        let corrupt = |e: String| CertFetchError::Internal(format!("corrupted issuer {}: {e}", entry.id));
        let certificate = pem_to_der(&entry.certificate).map_err(|e| corrupt(e.to_string()))?;
        let chain = entry
            .ca_chain
            .iter()
            .map(|pem| pem_to_der(pem))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| corrupt(e.to_string()))?;

        debug!(issuer_id = %entry.id, chain_len = chain.len(), "Resolved issuer");
        CaInfo::new(entry.id.clone(), certificate, chain).map_err(|e| corrupt(e.to_string()))
    }

    async fn crl(&self, issuer: &IssuerRef, delta: bool) -> Result<Option<Vec<u8>>> {
        let entry = self.resolve(issuer).await?;
        let suffix = if delta { DELTA_CRL_SUFFIX } else { "" };
        Ok(self.storage.get(&format!("{CRL_PREFIX}{}{suffix}", entry.id)).await?)
    }

    async fn last_modified(&self, class: ResourceClass, issuer: &IssuerRef) -> Result<Option<OffsetDateTime>> {
        let marker = match class {
            ResourceClass::Ca => self.resolve(issuer).await?.last_modified,
            ResourceClass::Crl | ResourceClass::DeltaCrl => {
                let config: CrlConfig = self.read_json(CRL_CONFIG_KEY).await?.unwrap_or_default();
                if class == ResourceClass::Crl {
                    config.last_modified
                } else {
                    config.delta_last_modified
                }
            }
        };
        Ok(populated(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_is_always_permitted() {
        assert!(IssuerUsage::ReadOnly.permitted_by(0));
        assert!(!IssuerUsage::CrlSigning.permitted_by(IssuerUsage::IssuingCertificates as u32));
        assert!(IssuerUsage::CrlSigning.permitted_by(2 | 4 | 8));
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(IssuerRef::parse("default"), IssuerRef::Default);
        assert_eq!(IssuerRef::parse(""), IssuerRef::Default);
        assert_eq!(IssuerRef::parse("root-2024"), IssuerRef::Name("root-2024".to_string()));
    }

    #[test]
    fn test_entry_without_optional_fields() {
        let entry: IssuerEntry = serde_json::from_str(r#"{"id":"abc","certificate":"pem"}"#).unwrap();
        assert_eq!(entry.usage, 0);
        assert!(entry.ca_chain.is_empty());
        assert!(entry.last_modified.is_none());
    }
}
