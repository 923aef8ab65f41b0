//! Wrappers around asn.1 encoder/decoder structures to support certification path processing

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_CRL_DISTRIBUTION_POINTS, ID_CE_CRL_NUMBER, ID_CE_CRL_REASONS, ID_CE_EXT_KEY_USAGE,
    ID_CE_KEY_USAGE, ID_CE_NAME_CONSTRAINTS, ID_CE_SUBJECT_ALT_NAME,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use der::{asn1::ObjectIdentifier, Decode};
use x509_cert::ext::pkix::*;
use x509_cert::ext::Extension;

use crate::util::error::*;

/// [`EXTS_OF_INTEREST`] lists the certificate extensions that are understood by the path validation
/// engine. A critical certificate extension that does not appear here causes
/// [`StatusCode::UnsupportedCriticalExtension`] to be reported.
pub const EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_KEY_USAGE,
    ID_CE_EXT_KEY_USAGE,
    ID_CE_SUBJECT_ALT_NAME,
    ID_CE_NAME_CONSTRAINTS,
    ID_CE_CERTIFICATE_POLICIES,
    ID_CE_AUTHORITY_KEY_IDENTIFIER,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_CE_CRL_DISTRIBUTION_POINTS,
];

/// [`PDVExtension`] provides a closed set of wrappers for the extension types recognized when
/// certificates and CRLs are loaded. Each extension is decoded exactly once, at load time.
#[derive(PartialEq, Clone, Eq)]
pub enum PDVExtension {
    /// Parsed BasicConstraints extension
    BasicConstraints(BasicConstraints),
    /// Parsed KeyUsage extension
    KeyUsage(KeyUsage),
    /// Parsed ExtendedKeyUsage extension
    ExtendedKeyUsage(ExtendedKeyUsage),
    /// Parsed SubjectAltName extension
    SubjectAltName(SubjectAltName),
    /// Parsed NameConstraints extension
    NameConstraints(NameConstraints),
    /// Parsed CertificatePolicies extension
    CertificatePolicies(CertificatePolicies),
    /// Parsed AuthorityKeyIdentifier extension
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    /// Parsed SubjectKeyIdentifier extension
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    /// Parsed CRLDistributionPoints extension
    CrlDistributionPoints(CrlDistributionPoints),
    /// Parsed CRLNumber extension
    CrlNumber(CrlNumber),
    /// Parsed CRLReason extension
    CrlReason(CrlReason),
    /// Unparsed, unrecognized extension
    Unrecognized(ObjectIdentifier),
}

/// `parse_extension` decodes the value of an extension into the matching [`PDVExtension`] variant.
///
/// Extensions that are not recognized yield [`PDVExtension::Unrecognized`]. A recognized extension
/// that cannot be decoded yields an [`Error::Asn1Error`].
pub fn parse_extension(ext: &Extension) -> Result<PDVExtension> {
    macro_rules! parse_as {
        ($v:ident, $t:ident) => {
            match $t::from_der($v) {
                Ok(r) => Ok(PDVExtension::$t(r)),
                Err(e) => Err(Error::Asn1Error(e)),
            }
        };
    }

    let v = ext.extn_value.as_bytes();
    match ext.extn_id {
        ID_CE_BASIC_CONSTRAINTS => parse_as!(v, BasicConstraints),
        ID_CE_KEY_USAGE => parse_as!(v, KeyUsage),
        ID_CE_EXT_KEY_USAGE => parse_as!(v, ExtendedKeyUsage),
        ID_CE_SUBJECT_ALT_NAME => parse_as!(v, SubjectAltName),
        ID_CE_NAME_CONSTRAINTS => parse_as!(v, NameConstraints),
        ID_CE_CERTIFICATE_POLICIES => parse_as!(v, CertificatePolicies),
        ID_CE_AUTHORITY_KEY_IDENTIFIER => parse_as!(v, AuthorityKeyIdentifier),
        ID_CE_SUBJECT_KEY_IDENTIFIER => parse_as!(v, SubjectKeyIdentifier),
        ID_CE_CRL_DISTRIBUTION_POINTS => parse_as!(v, CrlDistributionPoints),
        ID_CE_CRL_NUMBER => parse_as!(v, CrlNumber),
        ID_CE_CRL_REASONS => parse_as!(v, CrlReason),
        _ => Ok(PDVExtension::Unrecognized(ext.extn_id)),
    }
}

#[test]
fn parse_extension_test() {
    use der::asn1::OctetString;

    // BasicConstraints with cA TRUE and pathLenConstraint 0
    let bc = Extension {
        extn_id: ID_CE_BASIC_CONSTRAINTS,
        critical: true,
        extn_value: OctetString::new(vec![0x30, 0x06, 0x01, 0x01, 0xFF, 0x02, 0x01, 0x00]).unwrap(),
    };
    match parse_extension(&bc).unwrap() {
        PDVExtension::BasicConstraints(bc) => {
            assert!(bc.ca);
            assert_eq!(Some(0), bc.path_len_constraint);
        }
        _ => panic!("expected BasicConstraints"),
    }

    let unknown = Extension {
        extn_id: ObjectIdentifier::new_unwrap("1.2.3.4"),
        critical: true,
        extn_value: OctetString::new(vec![0x05, 0x00]).unwrap(),
    };
    assert!(parse_extension(&unknown).unwrap() == PDVExtension::Unrecognized(unknown.extn_id));

    let garbage = Extension {
        extn_id: ID_CE_KEY_USAGE,
        critical: true,
        extn_value: OctetString::new(vec![0x05, 0x00]).unwrap(),
    };
    assert!(parse_extension(&garbage).is_err());
}
