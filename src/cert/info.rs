use const_oid::AssociatedOid;
use const_oid::db::rfc4519;
use der::Decode;
use der::Tag;
use der::Tagged;
use der::asn1::Ia5StringRef;
use der::asn1::PrintableStringRef;
use der::asn1::TeletexStringRef;
use der::asn1::Utf8StringRef;
use serde::Serialize;
use time::OffsetDateTime;
use x509_cert::Certificate;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::pkix::name::GeneralName;

use crate::error::Result;
use crate::key::KeyInfo;
use crate::key::KeyType;

/// Summary of an issued certificate, as reported by detailed listings.
///
/// # Fields
/// * `common_name` - The last CN attribute of the subject, or empty.
/// * `issuer` - The issuer name in RFC 4514 form.
/// * `key_type` - Family of the subject public key.
/// * `key_bits` - Strength of the subject public key, 0 when unknown.
/// * `not_before` / `not_after` - The validity window.
/// * `dns_names` - Leading DNS subject alternative names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateInfo {
    pub common_name: String,
    pub issuer: String,
    pub key_type: KeyType,
    pub key_bits: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    pub dns_names: Vec<String>,
}

impl CertificateInfo {
    /// Parse a DER certificate and summarize it, keeping at most
    /// `max_dns_names` DNS names.
    pub fn from_der(der: &[u8], max_dns_names: usize) -> Result<Self> {
        let cert = Certificate::from_der(der)?;
        Self::from_certificate(&cert, max_dns_names)
    }

    pub fn from_certificate(cert: &Certificate, max_dns_names: usize) -> Result<Self> {
        let tbs = &cert.tbs_certificate;
        let key = KeyInfo::from_spki(&tbs.subject_public_key_info);

        let mut dns_names = dns_names(cert)?;
        dns_names.truncate(max_dns_names);

        Ok(Self {
            common_name: common_name(&tbs.subject),
            issuer: tbs.issuer.to_string(),
            key_type: key.key_type,
            key_bits: key.bits,
            not_after: to_offset_date_time(tbs.validity.not_after),
            not_before: to_offset_date_time(tbs.validity.not_before),
            dns_names,
        })
    }
}

/// Extracts the common name from a distinguished name, if present.
pub fn common_name(name: &x509_cert::name::Name) -> String {
    let mut common_name = String::new();
    for rdn in name.0.iter() {
        for attr in rdn.0.iter() {
            if attr.oid == rfc4519::CN {
                if let Some(value) = attribute_string(&attr.value) {
                    common_name = value;
                }
            }
        }
    }
    common_name
}

fn attribute_string(value: &der::Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String => value.decode_as::<Utf8StringRef<'_>>().ok().map(|s| s.to_string()),
        Tag::PrintableString => value.decode_as::<PrintableStringRef<'_>>().ok().map(|s| s.to_string()),
        Tag::Ia5String => value.decode_as::<Ia5StringRef<'_>>().ok().map(|s| s.to_string()),
        Tag::TeletexString => value.decode_as::<TeletexStringRef<'_>>().ok().map(|s| s.to_string()),
        _ => None,
    }
}

/// All DNS names from the subject alternative name extension, in order.
fn dns_names(cert: &Certificate) -> Result<Vec<String>> {
    let Some(extensions) = cert.tbs_certificate.extensions.as_ref() else {
        return Ok(Vec::new());
    };

    let mut names = Vec::new();
    for ext in extensions.iter().filter(|ext| ext.extn_id == SubjectAltName::OID) {
        let san = SubjectAltName::from_der(ext.extn_value.as_bytes())?;
        names.extend(san.0.iter().filter_map(|name| match name {
            GeneralName::DnsName(dns) => Some(dns.to_string()),
            _ => None,
        }));
    }
    Ok(names)
}

fn to_offset_date_time(time: x509_cert::time::Time) -> OffsetDateTime {
    match time {
        x509_cert::time::Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        x509_cert::time::Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
