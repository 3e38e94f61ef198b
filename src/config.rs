use bon::Builder;

use crate::issuer::IssuerRef;
use crate::issuer::IssuerUsage;

/// Number of DNS names reported per certificate by detailed listings.
pub const DEFAULT_MAX_DNS_NAMES: usize = 5;

/// Settings for a [`CertFetcher`](crate::fetch::CertFetcher).
///
/// # Fields
/// * `default_issuer` - The issuer CA and CRL reads resolve through.
/// * `ca_usage` - The usage the CA is checked against when read.
/// * `max_dns_names` - How many DNS names detailed listings keep per certificate.
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct FetchConfig {
    #[builder(default)]
    pub default_issuer: IssuerRef,
    #[builder(default)]
    pub ca_usage: IssuerUsage,
    #[builder(default = DEFAULT_MAX_DNS_NAMES)]
    pub max_dns_names: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
