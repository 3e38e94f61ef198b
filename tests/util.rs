#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use bon::Builder;
use const_oid::AssociatedOid;
use const_oid::db::rfc5912;
use const_oid::db::rfc8410;
use der::Encode;
use der::asn1::BitString;
use der::asn1::Ia5String;
use der::asn1::OctetString;
use p256::ecdsa::signature::Signer;
use rand_core::OsRng;
use time::OffsetDateTime;
use time::macros::datetime;
use x509_cert::Version;
use x509_cert::certificate::CertificateInner;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::ext::Extension;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;
use x509_cert::time::Validity;

use certfetch::config::FetchConfig;
use certfetch::fetch::CertFetcher;
use certfetch::issuer::CRL_CONFIG_KEY;
use certfetch::issuer::CRL_PREFIX;
use certfetch::issuer::CrlConfig;
use certfetch::issuer::ISSUER_PREFIX;
use certfetch::issuer::ISSUERS_CONFIG_KEY;
use certfetch::issuer::IssuerEntry;
use certfetch::issuer::IssuersConfig;
use certfetch::pem_utils::CERTIFICATE_LABEL;
use certfetch::pem_utils::der_to_pem;
use certfetch::storage::MemoryStorage;
use certfetch::storage::ReadOnlyTransaction;
use certfetch::storage::Storage;
use certfetch::storage::StorageError;

pub const ISSUER_ID: &str = "5f2b6d1e-0c1a-4b7e-9d3a-2f6c8e1a4b90";
pub const CA_LAST_MODIFIED: OffsetDateTime = datetime!(2024-03-01 12:00:00 UTC);
pub const CRL_LAST_MODIFIED: OffsetDateTime = datetime!(2024-03-02 08:30:00 UTC);
pub const DELTA_CRL_LAST_MODIFIED: OffsetDateTime = datetime!(2024-03-02 09:00:00.250 UTC);
pub const NOT_BEFORE: OffsetDateTime = datetime!(2024-01-01 0:00 UTC);
pub const NOT_AFTER: OffsetDateTime = datetime!(2034-01-01 0:00 UTC);

/// Subject key families issued certificates can carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TestKey {
    Rsa2048,
    #[default]
    P256,
    P384,
    P521,
    Ed25519,
}

impl TestKey {
    pub fn spki(self) -> SubjectPublicKeyInfoOwned {
        match self {
            TestKey::Rsa2048 => {
                // Only the modulus length matters to readers; no private half is needed.
                let mut modulus = vec![0xC5u8; 256];
                modulus[255] = 0x01;
                let public = rsa::RsaPublicKey::new(
                    rsa::BigUint::from_bytes_be(&modulus),
                    rsa::BigUint::from_bytes_be(&[0x01, 0x00, 0x01]),
                )
                .unwrap();
                SubjectPublicKeyInfoOwned::from_key(public).unwrap()
            }
            TestKey::P256 => SubjectPublicKeyInfoOwned::from_key(p256::SecretKey::random(&mut OsRng).public_key()).unwrap(),
            TestKey::P384 => SubjectPublicKeyInfoOwned::from_key(p384::SecretKey::random(&mut OsRng).public_key()).unwrap(),
            TestKey::P521 => SubjectPublicKeyInfoOwned::from_key(p521::SecretKey::random(&mut OsRng).public_key()).unwrap(),
            TestKey::Ed25519 => {
                let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
                SubjectPublicKeyInfoOwned {
                    algorithm: AlgorithmIdentifierOwned {
                        oid: rfc8410::ID_ED_25519,
                        parameters: None,
                    },
                    subject_public_key: BitString::from_bytes(&signing_key.verifying_key().to_bytes()).unwrap(),
                }
            }
        }
    }
}

/// What to put into an issued certificate.
#[derive(Clone, Debug, Builder)]
pub struct CertRequest {
    #[builder(into)]
    pub serial: String,
    #[builder(into)]
    pub common_name: String,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default)]
    pub key: TestKey,
}

/// A self-signed P-256 CA able to issue certificates.
pub struct TestCa {
    pub signing_key: p256::ecdsa::SigningKey,
    pub name: Name,
    pub der: Vec<u8>,
}

impl TestCa {
    pub fn generate(common_name: &str) -> Self {
        let signing_key = p256::ecdsa::SigningKey::random(&mut OsRng);
        let name = Name::from_str(&format!("CN={common_name}")).unwrap();
        let spki = SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key()).unwrap();
        let der = sign(&signing_key, tbs(&name, &name, "01", spki, Vec::new()));
        Self { signing_key, name, der }
    }

    /// Issue a certificate and return its DER encoding.
    pub fn issue(&self, request: &CertRequest) -> Vec<u8> {
        let subject = Name::from_str(&format!("CN={}", request.common_name)).unwrap();

        let mut extensions = Vec::new();
        if !request.dns_names.is_empty() {
            let names = request
                .dns_names
                .iter()
                .map(|name| GeneralName::DnsName(Ia5String::new(name).unwrap()))
                .collect();
            extensions.push(Extension {
                extn_id: SubjectAltName::OID,
                critical: false,
                extn_value: OctetString::new(SubjectAltName(names).to_der().unwrap()).unwrap(),
            });
        }

        let tbs = tbs(&self.name, &subject, &request.serial, request.key.spki(), extensions);
        sign(&self.signing_key, tbs)
    }

    pub fn pem(&self) -> String {
        der_to_pem(&self.der, CERTIFICATE_LABEL)
    }
}

fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: rfc5912::ECDSA_WITH_SHA_256,
        parameters: None,
    }
}

fn tbs(
    issuer: &Name,
    subject: &Name,
    serial_hex: &str,
    subject_public_key_info: SubjectPublicKeyInfoOwned,
    extensions: Vec<Extension>,
) -> TbsCertificateInner {
    let validity = Validity {
        not_before: Time::UtcTime(der::asn1::UtcTime::from_system_time(NOT_BEFORE.into()).unwrap()),
        not_after: Time::UtcTime(der::asn1::UtcTime::from_system_time(NOT_AFTER.into()).unwrap()),
    };

    TbsCertificateInner {
        version: Version::V3,
        serial_number: serial_number(serial_hex),
        signature: ecdsa_with_sha256(),
        issuer: issuer.clone(),
        validity,
        subject: subject.clone(),
        subject_public_key_info,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: (!extensions.is_empty()).then_some(extensions),
    }
}

fn sign(key: &p256::ecdsa::SigningKey, tbs_certificate: TbsCertificateInner) -> Vec<u8> {
    let signature: p256::ecdsa::Signature = key.sign(&tbs_certificate.to_der().unwrap());
    CertificateInner {
        tbs_certificate,
        signature_algorithm: ecdsa_with_sha256(),
        signature: BitString::from_bytes(signature.to_der().as_bytes()).unwrap(),
    }
    .to_der()
    .unwrap()
}

pub fn hex_bytes(hex: &str) -> Vec<u8> {
    let hex: String = hex.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    let hex = if hex.len() % 2 == 1 { format!("0{hex}") } else { hex };
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

/// Serial bytes as a positive DER integer.
fn serial_number(hex: &str) -> SerialNumber {
    let mut bytes = hex_bytes(hex);
    if bytes.first().is_some_and(|b| *b >= 0x80) {
        bytes.insert(0, 0);
    }
    SerialNumber::new(&bytes).unwrap()
}

/// A store seeded with a default issuer, plus helpers to add state.
pub struct Fixture {
    pub storage: Arc<MemoryStorage>,
    pub ca: TestCa,
}

impl Fixture {
    /// A store with no CA configured.
    pub fn empty() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            ca: TestCa::generate("myca.local"),
        }
    }

    /// A store whose default issuer is a freshly generated CA with an empty chain.
    pub async fn new() -> Self {
        let fixture = Self::empty();
        fixture.configure_issuer(Vec::new()).await;
        fixture
    }

    pub fn fetcher(&self) -> CertFetcher {
        CertFetcher::with_storage(self.storage.clone(), FetchConfig::default())
    }

    pub async fn configure_issuer(&self, ca_chain: Vec<String>) {
        let entry = IssuerEntry {
            id: ISSUER_ID.to_string(),
            name: "root-2024".to_string(),
            certificate: self.ca.pem(),
            ca_chain,
            usage: 2 | 4 | 8,
            last_modified: Some(CA_LAST_MODIFIED),
        };
        self.put_json(&format!("{ISSUER_PREFIX}{ISSUER_ID}"), &entry).await;
        self.put_json(
            ISSUERS_CONFIG_KEY,
            &IssuersConfig {
                default: ISSUER_ID.to_string(),
            },
        )
        .await;
    }

    /// Issue a certificate and store it under its canonical serial.
    pub async fn issue(&self, request: &CertRequest) -> Vec<u8> {
        let der = self.ca.issue(request);
        let canonical = certfetch::serial::normalize(&request.serial).unwrap();
        self.storage.put(&format!("certs/{canonical}"), &der).await;
        der
    }

    pub async fn issue_serial(&self, serial: &str) -> Vec<u8> {
        self.issue(&CertRequest::builder().serial(serial).common_name(format!("{serial}.example.com")).build())
            .await
    }

    pub async fn revoke(&self, canonical: &str, record: serde_json::Value) {
        self.put_json(&format!("revoked/{canonical}"), &record).await;
    }

    pub async fn put_crl(&self, delta: bool, der: &[u8]) {
        let suffix = if delta { "-delta" } else { "" };
        self.storage.put(&format!("{CRL_PREFIX}{ISSUER_ID}{suffix}"), der).await;
        self.put_json(
            CRL_CONFIG_KEY,
            &CrlConfig {
                last_modified: Some(CRL_LAST_MODIFIED),
                delta_last_modified: Some(DELTA_CRL_LAST_MODIFIED),
            },
        )
        .await;
    }

    pub async fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        self.storage.put(key, &serde_json::to_vec(value).unwrap()).await;
    }
}

/// Storage whose reads under `prefix` fail.
pub struct FailingStorage {
    pub inner: Arc<MemoryStorage>,
    pub prefix: &'static str,
}

impl FailingStorage {
    fn check(&self, key: &str) -> Result<(), StorageError> {
        if key.starts_with(self.prefix) {
            return Err(StorageError::Unavailable(format!("cannot read {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn list_page(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        self.check(prefix)?;
        self.inner.list_page(prefix, after, limit).await
    }

    async fn begin_read_only(&self) -> Result<Option<Box<dyn ReadOnlyTransaction>>, StorageError> {
        self.inner.begin_read_only().await
    }
}

/// Storage that deletes `victim` while a listing is in progress.
///
/// With `snapshots` the delete lands right after the read-only transaction
/// starts; without, it lands on the first read after the page was listed.
pub struct DeletingStorage {
    pub inner: Arc<MemoryStorage>,
    pub victim: String,
    pub snapshots: bool,
    deleted: AtomicBool,
}

impl DeletingStorage {
    pub fn new(inner: Arc<MemoryStorage>, victim: impl Into<String>, snapshots: bool) -> Self {
        Self {
            inner,
            victim: victim.into(),
            snapshots,
            deleted: AtomicBool::new(false),
        }
    }

    async fn delete_once(&self) {
        if !self.deleted.swap(true, Ordering::SeqCst) {
            self.inner.delete(&self.victim).await;
        }
    }
}

#[async_trait]
impl Storage for DeletingStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.delete_once().await;
        self.inner.get(key).await
    }

    async fn list_page(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<String>, StorageError> {
        self.inner.list_page(prefix, after, limit).await
    }

    async fn begin_read_only(&self) -> Result<Option<Box<dyn ReadOnlyTransaction>>, StorageError> {
        if !self.snapshots {
            return Ok(None);
        }
        let txn = self.inner.begin_read_only().await?;
        self.delete_once().await;
        Ok(txn)
    }
}
