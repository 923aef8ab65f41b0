//! Typed, load-time representation of X.509 certificates used throughout certification path processing

use core::fmt;

use const_oid::db::rfc4519::COMMON_NAME;
use der::asn1::{BitString, ObjectIdentifier};
use der::Decode;
use flagset::FlagSet;
use log::error;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::ext::pkix::{
    name::{DistributionPointName, GeneralName},
    KeyUsages, NameConstraints,
};
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::{
    estimate_key_strength, get_attribute_values, is_self_issued, normalize_name,
    pdv_extension::*, util::error::*, KeyStrength, PkiEnvironment,
};

/// `PublicKeyInfo` describes the public key carried by a certificate.
#[derive(Clone, Eq, PartialEq)]
pub struct PublicKeyInfo {
    /// Public key algorithm
    pub algorithm: ObjectIdentifier,
    /// Key size and estimated security strength, if the key type is recognized
    pub strength: Option<KeyStrength>,
    /// Encoded SubjectPublicKeyInfo
    pub spki: SubjectPublicKeyInfoOwned,
}

/// [`ParsedCertificate`] is the load-time representation of a certificate. All extensions that
/// influence certification path processing are decoded once, when the certificate is parsed, and the
/// structure is immutable thereafter.
#[derive(Clone, Eq, PartialEq)]
#[readonly::make]
pub struct ParsedCertificate {
    /// Locator for troubleshooting purposes, i.e., a file name
    pub locator: String,
    /// Binary, encoded Certificate object
    pub encoded_cert: Vec<u8>,
    /// Subject name
    pub subject: Name,
    /// Issuer name
    pub issuer: Name,
    /// Normalized form of the subject name used for lookups
    pub subject_id: String,
    /// Normalized form of the issuer name used for lookups
    pub issuer_id: String,
    /// Contents of the serial number field
    pub serial_number: Vec<u8>,
    /// notBefore as seconds since the Unix epoch
    pub not_before: u64,
    /// notAfter as seconds since the Unix epoch
    pub not_after: u64,
    /// Public key material
    pub public_key: PublicKeyInfo,
    /// True if a basicConstraints extension asserts cA
    pub is_ca: bool,
    /// pathLenConstraint from basicConstraints, if any
    pub path_len_constraint: Option<u8>,
    /// Key usage bits. None means the extension is absent, i.e., usage is unrestricted.
    pub key_usage: Option<FlagSet<KeyUsages>>,
    /// Extended key usage purposes. None means the extension is absent.
    pub ext_key_usage: Option<Vec<ObjectIdentifier>>,
    /// Name constraints, if any
    pub name_constraints: Option<NameConstraints>,
    /// Certificate policy identifiers. None means the extension is absent.
    pub policies: Option<Vec<ObjectIdentifier>>,
    /// Key identifier from the authority key identifier extension
    pub authority_key_id: Option<Vec<u8>>,
    /// Key identifier from the subject key identifier extension
    pub subject_key_id: Option<Vec<u8>>,
    /// Subject alternative names
    pub subject_alt_names: Vec<GeneralName>,
    /// DNS names from the subject alternative name extension
    pub dns_names: Vec<String>,
    /// URIs from the CRL distribution points extension
    pub crl_distribution_points: Vec<String>,
    /// Critical extensions that are not recognized
    pub unsupported_critical_extensions: Vec<ObjectIdentifier>,
    /// Signature algorithm from the outer Certificate structure
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// Signature bytes
    pub signature: Vec<u8>,
    /// Encoded TBSCertificate exactly as it appears in encoded_cert
    pub tbs: Vec<u8>,
    /// True if subject and issuer names match
    pub self_issued: bool,
}

impl fmt::Debug for ParsedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedCertificate")
            .field("locator", &self.locator)
            .field("subject", &self.subject.to_string())
            .field("issuer", &self.issuer.to_string())
            .finish()
    }
}

impl ParsedCertificate {
    /// `common_names` returns the values of all common name attributes in the subject.
    pub fn common_names(&self) -> Vec<String> {
        get_attribute_values(&self.subject, &COMMON_NAME)
    }

    /// `is_same_certificate` returns true if both structures were parsed from the same encoding.
    pub fn is_same_certificate(&self, other: &ParsedCertificate) -> bool {
        self.encoded_cert == other.encoded_cert
    }
}

impl TryFrom<&[u8]> for ParsedCertificate {
    type Error = Error;

    fn try_from(enc_cert: &[u8]) -> Result<Self> {
        parse_cert(enc_cert, "")
    }
}

/// [`DeferDecodeSigned`] used to parse only the top-level Certificate (or CertificateList) structure,
/// without parsing the details of the TBSCertificate, AlgorithmIdentifier or BIT STRING fields.
///
/// Deferred decoding is used to retain the to-be-signed bytes exactly as they were signed, avoiding
/// re-encoding (and potentially encountering problems with structures that were not DER-encoded
/// prior to signing).
pub struct DeferDecodeSigned {
    /// tbsCertificate       TBSCertificate,
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    pub signature: BitString,
}

impl ::der::FixedTag for DeferDecodeSigned {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeSigned {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_certificate = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_certificate.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

/// `parse_cert` takes a buffer containing a binary DER encoded certificate and returns
/// a [`ParsedCertificate`] if parsing was successful.
///
/// Parsing fails if the certificate or any recognized extension cannot be decoded. Unrecognized
/// critical extensions do not cause parsing to fail and are recorded in
/// `unsupported_critical_extensions` instead.
pub fn parse_cert(buffer: &[u8], filename: &str) -> Result<ParsedCertificate> {
    match parse_cert_inner(buffer, filename) {
        Ok(c) => Ok(c),
        Err(e) => {
            error!("Failed to parse certificate from {}: {}", filename, e);
            Err(e)
        }
    }
}

/// `parse_cert_pem` decodes a single PEM-encoded certificate then parses it via [`parse_cert`].
pub fn parse_cert_pem(buffer: &[u8], filename: &str) -> Result<ParsedCertificate> {
    match pem_rfc7468::decode_vec(buffer) {
        Ok((label, der)) if label == "CERTIFICATE" => parse_cert(&der, filename),
        Ok((label, _)) => {
            error!("Unexpected PEM label in {}: {}", filename, label);
            Err(Error::ParseError)
        }
        Err(e) => {
            error!("Failed to decode PEM from {}: {}", filename, e);
            Err(Error::ParseError)
        }
    }
}

fn parse_cert_inner(buffer: &[u8], filename: &str) -> Result<ParsedCertificate> {
    let cert = Certificate::from_der(buffer)?;
    let defer_cert = DeferDecodeSigned::from_der(buffer)?;
    let tbs = &cert.tbs_certificate;

    let mut is_ca = false;
    let mut path_len_constraint = None;
    let mut key_usage = None;
    let mut ext_key_usage = None;
    let mut name_constraints = None;
    let mut policies = None;
    let mut authority_key_id = None;
    let mut subject_key_id = None;
    let mut subject_alt_names = vec![];
    let mut crl_distribution_points = vec![];
    let mut unsupported_critical_extensions = vec![];

    if let Some(exts) = &tbs.extensions {
        for ext in exts {
            match parse_extension(ext)? {
                PDVExtension::BasicConstraints(bc) => {
                    is_ca = bc.ca;
                    path_len_constraint = bc.path_len_constraint;
                }
                PDVExtension::KeyUsage(ku) => key_usage = Some(ku.0),
                PDVExtension::ExtendedKeyUsage(eku) => ext_key_usage = Some(eku.0),
                PDVExtension::SubjectAltName(san) => subject_alt_names = san.0,
                PDVExtension::NameConstraints(nc) => name_constraints = Some(nc),
                PDVExtension::CertificatePolicies(cp) => {
                    policies = Some(cp.0.iter().map(|pi| pi.policy_identifier).collect())
                }
                PDVExtension::AuthorityKeyIdentifier(akid) => {
                    authority_key_id = akid.key_identifier.map(|k| k.as_bytes().to_vec())
                }
                PDVExtension::SubjectKeyIdentifier(skid) => {
                    subject_key_id = Some(skid.0.as_bytes().to_vec())
                }
                PDVExtension::CrlDistributionPoints(crldp) => {
                    for dp in crldp.0 {
                        if let Some(DistributionPointName::FullName(gns)) = dp.distribution_point {
                            for gn in gns {
                                if let GeneralName::UniformResourceIdentifier(uri) = gn {
                                    crl_distribution_points.push(uri.to_string());
                                }
                            }
                        }
                    }
                }
                _ => {
                    if ext.critical {
                        unsupported_critical_extensions.push(ext.extn_id);
                    }
                }
            }
        }
    }

    let dns_names = subject_alt_names
        .iter()
        .filter_map(|gn| match gn {
            GeneralName::DnsName(dns) => Some(dns.to_string()),
            _ => None,
        })
        .collect();

    let spki = tbs.subject_public_key_info.clone();
    let strength = estimate_key_strength(&spki).ok();

    Ok(ParsedCertificate {
        locator: filename.to_string(),
        encoded_cert: buffer.to_vec(),
        subject_id: normalize_name(&tbs.subject),
        issuer_id: normalize_name(&tbs.issuer),
        self_issued: is_self_issued(&tbs.subject, &tbs.issuer),
        subject: tbs.subject.clone(),
        issuer: tbs.issuer.clone(),
        serial_number: tbs.serial_number.as_bytes().to_vec(),
        not_before: tbs.validity.not_before.to_unix_duration().as_secs(),
        not_after: tbs.validity.not_after.to_unix_duration().as_secs(),
        public_key: PublicKeyInfo {
            algorithm: spki.algorithm.oid,
            strength,
            spki,
        },
        is_ca,
        path_len_constraint,
        key_usage,
        ext_key_usage,
        name_constraints,
        policies,
        authority_key_id,
        subject_key_id,
        subject_alt_names,
        dns_names,
        crl_distribution_points,
        unsupported_critical_extensions,
        signature_algorithm: defer_cert.signature_algorithm,
        signature: defer_cert.signature.raw_bytes().to_vec(),
        tbs: defer_cert.tbs_field,
    })
}

/// `is_self_signed` returns true if the certificate is self-issued and its public key verifies the
/// signature on the certificate.
pub fn is_self_signed(pe: &PkiEnvironment, cert: &ParsedCertificate) -> bool {
    if !cert.self_issued {
        return false;
    }
    pe.verify_signature_message(
        &cert.tbs,
        &cert.signature,
        &cert.signature_algorithm,
        &cert.public_key.spki,
    )
    .is_ok()
}

#[test]
fn parse_cert_test() {
    use x509_cert::ext::pkix::KeyUsages;

    let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();
    assert_eq!("ee.der", ee.locator);
    assert!(!ee.is_ca);
    assert!(!ee.self_issued);
    assert_eq!(vec![0x10, 0x03], ee.serial_number);
    assert_eq!(vec!["www.tls.test".to_string()], ee.dns_names);
    assert_eq!(vec!["www.tls.test".to_string()], ee.common_names());
    let ku = ee.key_usage.unwrap();
    assert!(ku.contains(KeyUsages::DigitalSignature));
    assert!(!ku.contains(KeyUsages::KeyCertSign));
    assert!(ee.ext_key_usage.is_some());
    assert!(ee.authority_key_id.is_some());
    assert!(ee.unsupported_critical_extensions.is_empty());
    assert_eq!(112, ee.public_key.strength.unwrap().security_bits);
    // 2024-01-01 through 2044-01-01
    assert_eq!(1704067200, ee.not_before);
    assert_eq!(2335219200, ee.not_after);

    let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
    assert!(root.is_ca);
    assert!(root.self_issued);
    assert!(root.authority_key_id.is_none());
    assert!(root.subject_key_id.is_some());

    let pl0 = parse_cert(include_bytes!("../../tests/examples/pl0_ca.der"), "pl0_ca.der").unwrap();
    assert_eq!(Some(0), pl0.path_len_constraint);

    let nc = parse_cert(include_bytes!("../../tests/examples/nc_ca.der"), "nc_ca.der").unwrap();
    assert!(nc.name_constraints.is_some());

    let crit =
        parse_cert(include_bytes!("../../tests/examples/ee_crit.der"), "ee_crit.der").unwrap();
    assert_eq!(
        vec![ObjectIdentifier::new_unwrap("1.2.3.4")],
        crit.unsupported_critical_extensions
    );

    let mut pe = PkiEnvironment::default();
    pe.populate_default();
    assert!(is_self_signed(&pe, &root));
    let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
    assert!(!is_self_signed(&pe, &int));
}

#[test]
fn parse_bad_cert_test() {
    assert!(parse_cert(&[0x30, 0x03, 0x02, 0x01, 0x01], "junk").is_err());
    assert!(parse_cert_pem(b"not pem", "junk").is_err());
    let pem = "-----BEGIN CERTIFICATE-----\nAAECAwQFBgcICQ==\n-----END CERTIFICATE-----\n";
    assert!(parse_cert_pem(pem.as_bytes(), "junk").is_err());
}
