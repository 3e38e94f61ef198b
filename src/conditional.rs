//! If-Modified-Since handling for CA and CRL resources.
//!
//! The issuance subsystem records when the CA certificate, the CRL and the
//! delta CRL were last regenerated. A request whose precondition is at or
//! after that marker gets a bodyless "not modified" answer. The gate never
//! blocks: when the marker cannot be read, the request is served in full.

use std::sync::Arc;

use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::datetime;
use time::macros::format_description;
use tracing::debug;

use crate::issuer::IssuerDirectory;
use crate::issuer::IssuerRef;

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

/// Zero value written by writers that never populated a timestamp.
const UNSET: OffsetDateTime = datetime!(0001-01-01 0:00 UTC);

/// Resource classes that carry a regeneration marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Ca,
    Crl,
    DeltaCrl,
}

/// Outcome of a conditional check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Serve the resource normally.
    Proceed,
    /// The caller's copy is current; answer 304 with this `Last-Modified`.
    NotModified { last_modified: OffsetDateTime },
}

/// Pure decision: not modified iff both times are known and
/// `marker <= if_modified_since`.
///
/// HTTP dates carry whole seconds, so the marker is truncated to the second
/// before comparing and reported that way.
pub fn decide(marker: Option<OffsetDateTime>, if_modified_since: Option<OffsetDateTime>) -> GateDecision {
    match (populated(marker).map(whole_seconds), if_modified_since) {
        (Some(marker), Some(since)) if marker <= since => GateDecision::NotModified { last_modified: marker },
        _ => GateDecision::Proceed,
    }
}

/// Checks conditional requests against the issuance subsystem's markers.
#[derive(Clone)]
pub struct ConditionalGate {
    issuers: Arc<dyn IssuerDirectory>,
    issuer: IssuerRef,
}

impl ConditionalGate {
    pub fn new(issuers: Arc<dyn IssuerDirectory>, issuer: IssuerRef) -> Self {
        Self { issuers, issuer }
    }

    pub async fn check(&self, class: ResourceClass, if_modified_since: Option<OffsetDateTime>) -> GateDecision {
        if if_modified_since.is_none() {
            return GateDecision::Proceed;
        }

        let marker = match self.issuers.last_modified(class, &self.issuer).await {
            Ok(marker) => marker,
            Err(err) => {
                debug!(?class, error = %err, "Could not read last-modified marker, serving full response");
                return GateDecision::Proceed;
            }
        };

        let decision = decide(marker, if_modified_since);
        debug!(?class, ?decision, "Conditional check");
        decision
    }
}

/// Parse an HTTP date header value. Unparsable values yield `None`.
pub fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    PrimitiveDateTime::parse(value.trim(), HTTP_DATE)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Format a timestamp as an HTTP date header value.
pub fn format_http_date(time: OffsetDateTime) -> String {
    time.to_offset(time::UtcOffset::UTC)
        .format(HTTP_DATE)
        .unwrap_or_default()
}

fn whole_seconds(time: OffsetDateTime) -> OffsetDateTime {
    time - time::Duration::nanoseconds(i64::from(time.nanosecond()))
}

/// Drops unset (zero-valued) timestamps.
pub(crate) fn populated(time: Option<OffsetDateTime>) -> Option<OffsetDateTime> {
    time.filter(|t| *t != UNSET)
}
