//! Provides implementation of a manually populated in-memory store of trust anchors, intermediate CA
//! certificates and CRLs. The following snip illustrates preparation of a [`MemoryStore`] object.
//!
//! ```
//! use certpath::{CertificateStore, MemoryStore, parse_cert};
//!
//! let mut store = MemoryStore::new();
//! let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
//! store.add_trust_anchor(root.clone());
//! store.add_crl_buffer(include_bytes!("../../tests/examples/root.crl"), "root.crl").unwrap();
//!
//! assert!(store.is_trust_anchor(&root));
//! assert_eq!(1, store.find_anchors_by_subject(&root.subject).len());
//! assert_eq!(1, store.find_crls_by_issuer(&root.subject).len());
//! ```
//!
//! All lookups are keyed by the normalized form of a name (see [`normalize_name`]), so names that
//! differ only in case or insignificant whitespace resolve to the same entries.

use alloc::collections::BTreeMap;
use log::{debug, info};
use x509_cert::name::Name;

use crate::{
    environment::pki_environment_traits::CertificateStore, name_to_string, normalize_name,
    parse_cert, parse_cert_pem, parse_crl, parse_crl_pem, util::error::*, ParsedCertificate,
    ParsedCrl,
};

/// Returns true if the buffer appears to hold a PEM-encoded object rather than a DER-encoded one.
pub(crate) fn is_pem(buffer: &[u8]) -> bool {
    buffer
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|b| *b == b'-')
        .unwrap_or(false)
}

/// `parse_cert_buffer` parses a certificate from a buffer holding either DER or PEM.
pub fn parse_cert_buffer(buffer: &[u8], locator: &str) -> Result<ParsedCertificate> {
    if is_pem(buffer) {
        parse_cert_pem(buffer, locator)
    } else {
        parse_cert(buffer, locator)
    }
}

/// `parse_crl_buffer` parses a CRL from a buffer holding either DER or PEM.
pub fn parse_crl_buffer(buffer: &[u8], locator: &str) -> Result<ParsedCrl> {
    if is_pem(buffer) {
        parse_crl_pem(buffer, locator)
    } else {
        parse_crl(buffer, locator)
    }
}

/// Structure containing trust anchors, intermediate CA certificates and CRLs along with maps that
/// correlate normalized names to indices in each list.
///
/// A `MemoryStore` is only mutated while it is being populated. Validation borrows it immutably.
/// See [`SharedStore`](crate::SharedStore) for a store that can be extended while validations are
/// in flight.
#[derive(Clone, Default, Debug)]
pub struct MemoryStore {
    /// list of trust anchors
    tas: Vec<ParsedCertificate>,

    /// list of intermediate CA certificates
    certs: Vec<ParsedCertificate>,

    /// list of CRLs
    crls: Vec<ParsedCrl>,

    /// Maps TA subject names to indices in the tas list
    ta_name_map: BTreeMap<String, Vec<usize>>,

    /// Maps certificate subject names to indices in the certs list
    cert_name_map: BTreeMap<String, Vec<usize>>,

    /// Maps CRL issuer names to indices in the crls list
    crl_name_map: BTreeMap<String, Vec<usize>>,
}

impl MemoryStore {
    /// instantiates a new, empty MemoryStore
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// `add_trust_anchor` adds a certificate to the set of trust anchors. Returns false if a trust
    /// anchor with the same encoding is already present.
    pub fn add_trust_anchor(&mut self, ta: ParsedCertificate) -> bool {
        if self.is_trust_anchor(&ta) {
            debug!("Ignoring duplicate trust anchor from {}", ta.locator);
            return false;
        }
        self.ta_name_map
            .entry(ta.subject_id.clone())
            .or_default()
            .push(self.tas.len());
        self.tas.push(ta);
        true
    }

    /// `add_certificate` adds a certificate to the set of intermediate CA certificates available
    /// for path building. Returns false if a certificate with the same encoding is already present.
    pub fn add_certificate(&mut self, cert: ParsedCertificate) -> bool {
        if let Some(indices) = self.cert_name_map.get(&cert.subject_id) {
            if indices
                .iter()
                .any(|i| self.certs[*i].is_same_certificate(&cert))
            {
                debug!("Ignoring duplicate certificate from {}", cert.locator);
                return false;
            }
        }
        self.cert_name_map
            .entry(cert.subject_id.clone())
            .or_default()
            .push(self.certs.len());
        self.certs.push(cert);
        true
    }

    /// `add_crl` adds a CRL to the store. Returns false if a CRL with the same encoding is already
    /// present.
    pub fn add_crl(&mut self, crl: ParsedCrl) -> bool {
        if let Some(indices) = self.crl_name_map.get(&crl.issuer_id) {
            if indices
                .iter()
                .any(|i| self.crls[*i].encoded_crl == crl.encoded_crl)
            {
                debug!("Ignoring duplicate CRL from {}", crl.locator);
                return false;
            }
        }
        self.crl_name_map
            .entry(crl.issuer_id.clone())
            .or_default()
            .push(self.crls.len());
        self.crls.push(crl);
        true
    }

    /// `add_trust_anchor_buffer` parses a DER or PEM encoded certificate and adds it as a trust anchor.
    pub fn add_trust_anchor_buffer(&mut self, buffer: &[u8], locator: &str) -> Result<()> {
        let ta = parse_cert_buffer(buffer, locator)?;
        self.add_trust_anchor(ta);
        Ok(())
    }

    /// `add_certificate_buffer` parses a DER or PEM encoded certificate and adds it as an intermediate.
    pub fn add_certificate_buffer(&mut self, buffer: &[u8], locator: &str) -> Result<()> {
        let cert = parse_cert_buffer(buffer, locator)?;
        self.add_certificate(cert);
        Ok(())
    }

    /// `add_crl_buffer` parses a DER or PEM encoded CRL and adds it to the store.
    pub fn add_crl_buffer(&mut self, buffer: &[u8], locator: &str) -> Result<()> {
        let crl = parse_crl_buffer(buffer, locator)?;
        self.add_crl(crl);
        Ok(())
    }

    /// number of trust anchors in the store
    pub fn num_trust_anchors(&self) -> usize {
        self.tas.len()
    }

    /// number of intermediate CA certificates in the store
    pub fn num_certificates(&self) -> usize {
        self.certs.len()
    }

    /// number of CRLs in the store
    pub fn num_crls(&self) -> usize {
        self.crls.len()
    }

    /// log_contents writes the subject of each trust anchor and certificate and the issuer of each
    /// CRL to the log at info level
    pub fn log_contents(&self) {
        for (i, ta) in self.tas.iter().enumerate() {
            info!("TA #{} - {} - {}", i, name_to_string(&ta.subject), ta.locator);
        }
        for (i, c) in self.certs.iter().enumerate() {
            info!("Cert #{} - {} - {}", i, name_to_string(&c.subject), c.locator);
        }
        for (i, crl) in self.crls.iter().enumerate() {
            info!("CRL #{} - {} - {}", i, name_to_string(&crl.issuer), crl.locator);
        }
    }
}

fn lookup<'a, T>(map: &BTreeMap<String, Vec<usize>>, items: &'a [T], name: &Name) -> Vec<&'a T> {
    match map.get(&normalize_name(name)) {
        Some(indices) => indices.iter().map(|i| &items[*i]).collect(),
        None => vec![],
    }
}

impl CertificateStore for MemoryStore {
    fn find_anchors_by_subject(&self, subject: &Name) -> Vec<&ParsedCertificate> {
        lookup(&self.ta_name_map, &self.tas, subject)
    }

    fn find_certificates_by_subject(&self, subject: &Name) -> Vec<&ParsedCertificate> {
        lookup(&self.cert_name_map, &self.certs, subject)
    }

    fn find_crls_by_issuer(&self, issuer: &Name) -> Vec<&ParsedCrl> {
        lookup(&self.crl_name_map, &self.crls, issuer)
    }

    fn is_trust_anchor(&self, cert: &ParsedCertificate) -> bool {
        match self.ta_name_map.get(&cert.subject_id) {
            Some(indices) => indices
                .iter()
                .any(|i| self.tas[*i].is_same_certificate(cert)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn load(name: &str, buffer: &[u8]) -> ParsedCertificate {
        parse_cert(buffer, name).unwrap()
    }

    #[test]
    fn memory_store_lookups() {
        let root = load("root.der", include_bytes!("../../tests/examples/root.der"));
        let int = load("int.der", include_bytes!("../../tests/examples/int.der"));
        let other_root = load(
            "other_root.der",
            include_bytes!("../../tests/examples/other_root.der"),
        );

        let mut store = MemoryStore::new();
        assert!(store.add_trust_anchor(root.clone()));
        assert!(!store.add_trust_anchor(root.clone()));
        assert!(store.add_certificate(int.clone()));
        assert!(!store.add_certificate(int.clone()));
        assert_eq!(1, store.num_trust_anchors());
        assert_eq!(1, store.num_certificates());

        assert!(store.is_trust_anchor(&root));
        assert!(!store.is_trust_anchor(&int));
        assert!(!store.is_trust_anchor(&other_root));

        // lookups tolerate differences in case and whitespace
        let n = Name::from_str("CN=test  root ca,O=CERTPATH,C=us").unwrap();
        assert_eq!(1, store.find_anchors_by_subject(&n).len());
        assert_eq!(1, store.find_certificates_by_subject(&int.subject).len());
        assert!(store.find_anchors_by_subject(&int.subject).is_empty());
        assert!(store.find_crls_by_issuer(&int.subject).is_empty());
    }

    #[test]
    fn memory_store_buffers() {
        let mut store = MemoryStore::new();
        store
            .add_crl_buffer(include_bytes!("../../tests/examples/int.crl"), "int.crl")
            .unwrap();
        store
            .add_crl_buffer(include_bytes!("../../tests/examples/int.crl"), "int.crl")
            .unwrap();
        assert_eq!(1, store.num_crls());
        assert!(store.add_crl_buffer(b"junk", "junk.crl").is_err());
        assert!(store
            .add_certificate_buffer(include_bytes!("../../tests/examples/int.crl"), "int.crl")
            .is_err());

        let der = include_bytes!("../../tests/examples/root.der");
        let pem =
            pem_rfc7468::encode_string("CERTIFICATE", pem_rfc7468::LineEnding::LF, der).unwrap();
        store
            .add_trust_anchor_buffer(pem.as_bytes(), "root.pem")
            .unwrap();
        store.add_trust_anchor_buffer(der, "root.der").unwrap();
        assert_eq!(1, store.num_trust_anchors());
    }
}
