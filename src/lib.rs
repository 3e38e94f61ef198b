//! # CertFetch - Read Path for a Certificate Authority Secrets Engine
//!
//! CertFetch serves the public, read-only side of a certificate authority: the active CA
//! certificate and its chain, the CRL and delta CRL, issued certificates by serial number,
//! and paginated listings of everything that was issued. All state lives in a pluggable
//! key/value [`storage`] backend written by the issuance subsystem; this crate only reads.
//!
//! ## Supported Resources
//!
//! | Path | Representation |
//! |---|---|
//! | `ca`, `ca/pem` | CA certificate, DER or PEM |
//! | `cert/ca`, `cert/ca/raw`, `cert/ca/raw/pem` | CA certificate, structured / DER / PEM |
//! | `ca_chain`, `cert/ca_chain` | CA chain as concatenated PEM, raw or structured |
//! | `crl`, `crl/pem`, `crl/delta`, `crl/delta/pem` | CRL or delta CRL, DER or PEM |
//! | `cert/crl`, `cert/delta-crl` (+ `/raw`, `/raw/pem`) | CRL or delta CRL, structured / DER / PEM |
//! | `cert/<serial>` (+ `/raw`, `/raw/pem`) | Issued certificate, structured / DER / PEM |
//!
//! Structured responses carry the PEM text along with revocation metadata. Raw responses
//! carry the bytes and a content type, answer 204 when there is nothing to serve, and never
//! fail.
//!
//! ## Key Features
//!
//! - **Conditional reads**: CA and CRL reads honour `If-Modified-Since` and answer 304
//! - **Serial normalization**: `1A:2B:3C`, `1a-2b-3c` and `1a2b3c` address the same certificate
//! - **Revocation metadata**: revoked certificates stay fetchable and report when they were revoked
//! - **Consistent listings**: detailed listings run inside a read-only snapshot when the backend
//!   supports one
//!
//! ## Quick Start
//!
//! ### Fetching the CA Certificate
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use certfetch::{config::FetchConfig, fetch::CertFetcher, storage::MemoryStorage};
//!
//! # async fn run() -> Result<(), certfetch::error::CertFetchError> {
//! let storage = Arc::new(MemoryStorage::new());
//! let fetcher = CertFetcher::with_storage(storage, FetchConfig::default());
//!
//! let response = fetcher.fetch_path("ca/pem", None).await?;
//! if response.status_code == 200 {
//!     println!("{}", String::from_utf8_lossy(&response.body));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Fetching a Certificate with Revocation Metadata
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use certfetch::{config::FetchConfig, fetch::CertFetcher, storage::MemoryStorage};
//!
//! # async fn run() -> Result<(), certfetch::error::CertFetchError> {
//! let fetcher = CertFetcher::with_storage(Arc::new(MemoryStorage::new()), FetchConfig::default());
//!
//! let response = fetcher.fetch_path("cert/1a:2b:3c", None).await?;
//! if let Some(data) = &response.data {
//!     println!("revoked at {}", data.revocation_time);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Listing Issued Certificates
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use certfetch::{config::FetchConfig, fetch::CertFetcher, listing::ListRequest, storage::MemoryStorage};
//!
//! # async fn run() -> Result<(), certfetch::error::CertFetchError> {
//! let fetcher = CertFetcher::with_storage(Arc::new(MemoryStorage::new()), FetchConfig::default());
//!
//! let page = fetcher.list_detailed(&ListRequest::builder().limit(10).build()).await?;
//! for serial in &page.keys {
//!     println!("{serial}: {:?}", page.key_info[serial].common_name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Caller-fixable problems are reported in the response as an error envelope; only
//! internal failures on structured reads come back as an `Err`:
//!
//! ```rust
//! use certfetch::error::CertFetchError;
//! use certfetch::resource::ResourceKind;
//!
//! match ResourceKind::classify("cert/not-a-serial") {
//!     Ok(kind) => println!("Resolved {kind:?}"),
//!     Err(CertFetchError::UnsupportedPath(path)) => println!("Unsupported path: {path}"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`fetch`]: The read entry point tying everything together
//! - [`resource`]: Classification of request paths
//! - [`response`]: Response assembly and raw/structured rendering
//! - [`cert`]: Issued certificate and CA access, chain building, certificate summaries
//! - [`revocation`]: Revocation record lookup
//! - [`conditional`]: If-Modified-Since handling
//! - [`listing`]: Paginated and detailed listings
//! - [`issuer`]: Interface to the issuance subsystem
//! - [`serial`]: Serial number normalization
//! - [`storage`]: Storage backend abstraction and an in-memory backend
//! - [`error`]: Error types

pub mod cert;
pub mod conditional;
pub mod config;
pub mod error;
pub mod fetch;
pub mod issuer;
pub mod key;
pub mod listing;
pub mod pem_utils;
pub mod resource;
pub mod response;
pub mod revocation;
pub mod serial;
pub mod storage;
