use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::conditional::populated;
use crate::error::CertFetchError;
use crate::error::Result;
use crate::serial;
use crate::storage::Storage;

/// Storage prefix holding revocation records.
pub const REVOKED_PREFIX: &str = "revoked/";

/// Revocation record for one certificate.
///
/// A record exists for a serial iff that certificate has been revoked. Older
/// writers did not populate `revocation_time_utc`; such records keep it unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// Canonical serial number the record was found under.
    #[serde(skip)]
    pub serial: String,
    /// DER bytes of the revoked certificate.
    #[serde(default, with = "base64_bytes")]
    pub certificate_bytes: Vec<u8>,
    /// Revocation time in seconds since the Unix epoch.
    #[serde(default)]
    pub revocation_time: i64,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub revocation_time_utc: Option<OffsetDateTime>,
    /// Identifier of the issuer that revoked the certificate.
    #[serde(default)]
    pub issuer_id: String,
}

impl RevocationEntry {
    /// The UTC revocation time in RFC 3339 form with nanosecond precision, or
    /// an empty string when the record never carried one.
    pub fn revocation_time_rfc3339(&self) -> String {
        populated(self.revocation_time_utc)
            .and_then(|t| t.format(&Rfc3339).ok())
            .unwrap_or_default()
    }
}

/// Looks up revocation status by serial.
#[derive(Clone)]
pub struct RevocationIndex {
    storage: Arc<dyn Storage>,
}

impl RevocationIndex {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Returns the revocation record for `serial`, or `None` if the
    /// certificate is not revoked.
    pub async fn lookup(&self, serial: &str) -> Result<Option<RevocationEntry>> {
        let canonical = serial::normalize(serial)?;

        let mut stored = self.storage.get(&format!("{REVOKED_PREFIX}{canonical}")).await?;
        if stored.is_none() {
            let legacy = serial::legacy_key(&canonical);
            if legacy != canonical {
                stored = self.storage.get(&format!("{REVOKED_PREFIX}{legacy}")).await?;
            }
        }

        let Some(bytes) = stored else {
            return Ok(None);
        };

        let mut entry: RevocationEntry =
            serde_json::from_slice(&bytes).map_err(|e| CertFetchError::CorruptedRecord {
                serial: serial.to_string(),
                reason: e.to_string(),
            })?;
        entry.serial = canonical;
        debug!(serial = %entry.serial, issuer_id = %entry.issuer_id, "Certificate is revoked");
        Ok(Some(entry))
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
