//! Rendering of resolved resources into responses.
//!
//! Every fetch converges on [`finalize`]. Raw resources always answer with a
//! body (possibly empty) and never fail; structured resources answer with a
//! JSON document, an error envelope, or propagate internal failures.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::debug;
use tracing::warn;

use crate::error::CertFetchError;
use crate::error::Result;
use crate::resource::ResourceKind;
use crate::revocation::RevocationEntry;

/// A resolved resource ready to be rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    /// DER bytes, or PEM text for PEM and structured encodings.
    pub body: Vec<u8>,
    /// Revocation record, only looked up for structured certificate reads.
    pub revocation: Option<RevocationEntry>,
    /// The body is the CA chain and is echoed as `ca_chain`.
    pub chain: bool,
}

/// What resolution produced, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Found(Resolved),
    NotFound,
    NotModified { last_modified: OffsetDateTime },
}

/// Structured body of a successful read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateData {
    /// PEM text of the certificate, CRL or chain.
    pub certificate: String,
    /// Revocation time in Unix seconds, 0 if not revoked.
    pub revocation_time: i64,
    /// Revocation time in RFC 3339 form, empty if not revoked or unrecorded.
    pub revocation_time_rfc3339: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issuer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_chain: Option<String>,
}

/// Body of a caller-facing error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<String>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

/// Final answer to a fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status_code: u16,
    /// Content type of raw bodies; `None` for structured answers.
    pub content_type: Option<&'static str>,
    /// Raw body. Empty for structured answers.
    pub body: Vec<u8>,
    pub data: Option<CertificateData>,
    pub error: Option<ErrorEnvelope>,
    /// `Last-Modified` value of a not-modified answer.
    pub last_modified: Option<OffsetDateTime>,
}

impl FetchResponse {
    fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            content_type: None,
            body: Vec::new(),
            data: None,
            error: None,
            last_modified: None,
        }
    }

    /// The structured body as JSON, if there is one.
    pub fn json(&self) -> Result<Option<serde_json::Value>> {
        let value = match (&self.data, &self.error) {
            (Some(data), _) => serde_json::to_value(data),
            (None, Some(error)) => serde_json::to_value(error),
            (None, None) => return Ok(None),
        };
        value
            .map(Some)
            .map_err(|e| CertFetchError::EncodingError(e.to_string()))
    }
}

/// Assemble the response for `kind` from the outcome of its resolution.
pub fn finalize(kind: &ResourceKind, outcome: Result<Outcome>) -> Result<FetchResponse> {
    match outcome {
        Ok(Outcome::NotModified { last_modified }) => Ok(FetchResponse {
            last_modified: Some(last_modified),
            ..FetchResponse::empty(304)
        }),
        outcome if kind.is_raw() => Ok(raw(kind, outcome)),
        Ok(Outcome::Found(resolved)) => Ok(FetchResponse {
            data: Some(structured(resolved)),
            ..FetchResponse::empty(200)
        }),
        Ok(Outcome::NotFound) => Ok(FetchResponse::empty(404)),
        Err(err) if err.is_user_error() => {
            debug!(?kind, error = %err, "Rejecting fetch request");
            Ok(FetchResponse {
                error: Some(ErrorEnvelope::new(err.to_string())),
                ..FetchResponse::empty(400)
            })
        }
        Err(err) => Err(err),
    }
}

fn raw(kind: &ResourceKind, outcome: Result<Outcome>) -> FetchResponse {
    let body = match outcome {
        Ok(Outcome::Found(resolved)) => resolved.body,
        Ok(_) => Vec::new(),
        Err(err) if err.is_user_error() => {
            debug!(?kind, error = %err, "Serving empty raw response");
            Vec::new()
        }
        Err(err) => {
            warn!(
                ?kind,
                error = %err,
                "Possible error, but cannot return in raw response. An empty CA probably means none was configured, and an empty CRL is possibly correct"
            );
            Vec::new()
        }
    };

    let status_code = if body.is_empty() { 204 } else { 200 };
    FetchResponse {
        content_type: kind.content_type(),
        body,
        ..FetchResponse::empty(status_code)
    }
}

fn structured(resolved: Resolved) -> CertificateData {
    let certificate = String::from_utf8_lossy(&resolved.body).into_owned();
    let ca_chain = resolved.chain.then(|| certificate.clone());

    let mut data = CertificateData {
        certificate,
        revocation_time: 0,
        revocation_time_rfc3339: String::new(),
        issuer_id: String::new(),
        ca_chain,
    };
    if let Some(entry) = resolved.revocation {
        data.revocation_time = entry.revocation_time;
        data.revocation_time_rfc3339 = entry.revocation_time_rfc3339();
        data.issuer_id = entry.issuer_id;
    }
    data
}
