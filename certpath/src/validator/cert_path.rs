//! Provides structure that represents a certification path including target, optional intermediate CAs
//! and trust anchor.

use crate::ParsedCertificate;

/// `CertificationPath` is used to represent the trust anchor, intermediate CA certificates and target
/// certificate that comprise a certification path.
///
/// Certificates are indexed from the target (index 0) toward the trust anchor. The trust anchor is
/// held separately and, when a position is needed, occupies index `len()`.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct CertificationPath {
    /// `certificates` contains the target certificate followed by zero or more intermediate CA
    /// certificates, i.e., `certificates\[1\]` can be used to verify `certificates\[0\]`, and the last
    /// element was issued by `trust_anchor`. Empty when the target is itself a trust anchor.
    pub certificates: Vec<ParsedCertificate>,
    /// `trust_anchor` contains the trust anchor for the certification path
    pub trust_anchor: ParsedCertificate,
}

impl CertificationPath {
    /// instantiates a new CertificationPath
    pub fn new(
        trust_anchor: ParsedCertificate,
        certificates: Vec<ParsedCertificate>,
    ) -> CertificationPath {
        CertificationPath {
            certificates,
            trust_anchor,
        }
    }

    /// number of certificates in the path, not counting the trust anchor
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// true when the path consists of the trust anchor alone
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// `target` returns the certificate the path was built for, which is the trust anchor when the
    /// path is empty.
    pub fn target(&self) -> &ParsedCertificate {
        self.certificates.first().unwrap_or(&self.trust_anchor)
    }

    /// `get` returns the certificate at the given index, with `len()` referring to the trust anchor.
    pub fn get(&self, index: usize) -> Option<&ParsedCertificate> {
        if index == self.certificates.len() {
            Some(&self.trust_anchor)
        } else {
            self.certificates.get(index)
        }
    }

    /// `issuer_of` returns the certificate whose key verifies the certificate at the given index.
    pub fn issuer_of(&self, index: usize) -> Option<&ParsedCertificate> {
        if index >= self.certificates.len() {
            None
        } else {
            self.get(index + 1)
        }
    }
}

#[test]
fn cert_path_test() {
    use crate::parse_cert;

    let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
    let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
    let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();

    let path = CertificationPath::new(root.clone(), vec![ee.clone(), int.clone()]);
    assert_eq!(2, path.len());
    assert!(path.target().is_same_certificate(&ee));
    assert!(path.issuer_of(0).unwrap().is_same_certificate(&int));
    assert!(path.issuer_of(1).unwrap().is_same_certificate(&root));
    assert!(path.issuer_of(2).is_none());
    assert!(path.get(2).unwrap().is_same_certificate(&root));

    let anchor_only = CertificationPath::new(root.clone(), vec![]);
    assert!(anchor_only.is_empty());
    assert!(anchor_only.target().is_same_certificate(&root));
}
