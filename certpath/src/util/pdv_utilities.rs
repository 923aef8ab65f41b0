//! Utility functions that support certification path processing

use lazy_static::lazy_static;
use log::error;
use regex::Regex;

use der::asn1::{Ia5String, PrintableString, Utf8StringRef};
use der::{asn1::ObjectIdentifier, Encode, Tagged};
use spki::{AlgorithmIdentifier, AlgorithmIdentifierOwned};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::{
    constraints::name::GeneralSubtree,
    name::GeneralName,
};
use x509_cert::name::{Name, RelativeDistinguishedName};

use crate::{util::error::*, util::pdv_alg_oids::*, ParsedCertificate};

/// `is_self_issued` returns true if the subject and issuer names match (after normalization).
pub fn is_self_issued(subject: &Name, issuer: &Name) -> bool {
    compare_names(subject, issuer)
}

/// `valid_at_time` evaluates the not_before and not_after fields of the given certificate and
/// provides an indication of validity relative to presented time of interest.
///
/// It returns the number of seconds left to live if the certificate is valid at the given time or
/// an error indicating which field failed if the certificate is not valid. The not_before field is
/// evaluated first. A time of interest of zero disables the check.
///
/// To stifle logging output upon error, pass true for the stifle_log parameter.
pub fn valid_at_time(target: &ParsedCertificate, toi: u64, stifle_log: bool) -> Result<u64> {
    if 0 == toi {
        // zero is used to disable validity check
        return Ok(0);
    }

    if target.not_before > toi {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                "certificate is not yet valid, i.e., not_before is later than the configured time of interest",
            );
        }
        return Err(Error::PathValidation(StatusCode::NotYetValid));
    }

    if target.not_after < toi {
        if !stifle_log {
            log_error_for_name(
                &target.subject,
                format!(
                    "certificate is expired relative to the configured time of interest: {}",
                    target.not_after
                )
                .as_str(),
            );
        }
        Err(Error::PathValidation(StatusCode::Expired))
    } else {
        Ok(target.not_after - toi)
    }
}

/// `descended_from_host` returns true if cand is equal to or descended from prev_name and false otherwise.
///
/// When is_uri is true, a constraint beginning with a period matches any host within the domain
/// but not the domain itself, per RFC 5280 section 4.2.1.10.
pub(crate) fn descended_from_host(prev_name: &Ia5String, cand: &str, is_uri: bool) -> bool {
    let base = prev_name.to_string().to_lowercase();
    let cand = cand.to_lowercase();

    if is_uri && base.starts_with('.') {
        return cand.ends_with(base.as_str());
    }

    if cand == base {
        return true;
    }

    match cand.strip_suffix(base.as_str()) {
        Some(prefix) => prefix.ends_with('.') || base.starts_with('.'),
        None => false,
    }
}

/// `is_email` returns true if addr looks like a mailbox, i.e., a local part and a host part.
pub(crate) fn is_email(addr: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(
            "^([a-z0-9_+]([a-z0-9_+.]*[a-z0-9_+])?)@([a-z0-9]+([-.]{1}[a-z0-9]+)*.[a-z]{2,6})"
        )
        .unwrap();
    }

    EMAIL_RE.is_match(addr.to_lowercase().as_str())
}

/// `descended_from_rfc822` returns true if new_name is equal to or descended from prev_name and false otherwise.
///
/// A constraint that is a full mailbox matches only that mailbox, a constraint beginning with a
/// period matches any mailbox on a host within that domain and any other constraint matches
/// mailboxes on that host.
pub(crate) fn descended_from_rfc822(prev_name: &Ia5String, new_name: &str) -> bool {
    let cand = new_name.to_lowercase();
    let base = prev_name.to_string().to_lowercase();

    if is_email(base.as_str()) {
        return cand == base;
    }

    let host = match cand.rsplit_once('@') {
        Some((_, host)) => host,
        None => return false,
    };

    if base.starts_with('.') {
        host.ends_with(base.as_str())
    } else {
        host == base
    }
}

/// `descended_from_dn` returns true if name is equal to or descended from subtree and false otherwise.
///
/// RDNs are compared after normalization so that differences in character set, case or whitespace
/// do not defeat a match.
pub(crate) fn descended_from_dn(subtree: &Name, name: &Name) -> bool {
    //if descendant has fewer rdns then it is not a descendant
    if subtree.0.len() > name.0.len() {
        return false;
    }

    subtree
        .0
        .iter()
        .zip(name.0.iter())
        .all(|(l, r)| l == r || normalize_rdn(l) == normalize_rdn(r))
}

/// `host_from_uri` returns the host portion of a URI, if any.
pub(crate) fn host_from_uri(uri: &str) -> Option<String> {
    match url::Url::parse(uri) {
        Ok(u) => u.host_str().map(|h| h.to_string()),
        Err(_e) => None,
    }
}

/// get_hash_alg_from_sig_alg takes an ObjectIdentifier that notionally contains a signature algorithm,
/// i.e., PKIXALG_SHA256_WITH_RSA_ENCRYPTION or PKIXALG_ECDSA_WITH_SHA256, and returns the indicated hash
/// algorithm.
pub fn get_hash_alg_from_sig_alg(sig_alg: &ObjectIdentifier) -> Result<AlgorithmIdentifierOwned> {
    let oid = if PKIXALG_SHA256_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA256 == *sig_alg
    {
        PKIXALG_SHA256
    } else if PKIXALG_SHA384_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA384 == *sig_alg
    {
        PKIXALG_SHA384
    } else if PKIXALG_SHA224_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA224 == *sig_alg
    {
        PKIXALG_SHA224
    } else if PKIXALG_SHA512_WITH_RSA_ENCRYPTION == *sig_alg
        || PKIXALG_ECDSA_WITH_SHA512 == *sig_alg
    {
        PKIXALG_SHA512
    } else if PKIXALG_SHA1_WITH_RSA_ENCRYPTION == *sig_alg {
        PKIXALG_SHA1
    } else {
        return Err(Error::Unrecognized);
    };
    Ok(AlgorithmIdentifier {
        oid,
        parameters: None,
    })
}

/// `get_hash_name` returns the name used to list a hash algorithm in
/// [`Restrictions::trusted_hashes`](../../validator/path_settings/struct.Restrictions.html), i.e., "SHA-256".
pub fn get_hash_name(hash_alg: &ObjectIdentifier) -> Option<&'static str> {
    match *hash_alg {
        PKIXALG_SHA1 => Some("SHA-1"),
        PKIXALG_SHA224 => Some("SHA-224"),
        PKIXALG_SHA256 => Some("SHA-256"),
        PKIXALG_SHA384 => Some("SHA-384"),
        PKIXALG_SHA512 => Some("SHA-512"),
        _ => None,
    }
}

pub(crate) fn log_error_for_name(name: &Name, msg: &str) {
    let name_str = name_to_string(name);
    error!(
        "Encountered error while processing certificate with subject {}: {}",
        name_str, msg
    );
}

pub(crate) fn log_error_for_cert(cert: &ParsedCertificate, msg: &str) {
    log_error_for_name(&cert.subject, msg);
}

/// `name_to_string` returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// get_value_from_rdn returns the value from AttributeTypeAndValue as a string for use in comparing
/// values where leading whitespace may be a factor
pub fn get_value_from_rdn(atav: &AttributeTypeAndValue) -> Result<String> {
    let val = match atav.value.tag() {
        der::Tag::PrintableString => atav
            .value
            .decode_as()
            .ok()
            .map(|s: PrintableString| s.to_string()),
        der::Tag::Utf8String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Utf8StringRef<'_>| s.to_string()),
        der::Tag::Ia5String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Ia5String| s.to_string()),
        _ => None,
    };

    let mut s = "".to_string();
    if let Some(val) = val {
        let mut iter = val.char_indices().peekable();
        while let Some((i, c)) = iter.next() {
            match c {
                '#' if i == 0 => s.push_str("\\#"),
                ' ' if i == 0 || iter.peek().is_none() => s.push_str("\\ "),
                '"' | '+' | ',' | ';' | '<' | '>' | '\\' => s.push_str(format!("\\{}", c).as_str()),
                '\x00'..='\x1f' | '\x7f' => s.push_str(format!("\\{:02x}", c as u8).as_str()),
                _ => s.push(c),
            }
        }
    } else {
        let val = atav.value.to_der()?;
        s.push_str(format!("{}=#", atav.oid).as_str());
        s.push_str(buffer_to_hex(&val).as_str());
    }
    Ok(s)
}

/// `normalize_value` trims, lowercases and collapses runs of whitespace in an attribute value.
fn normalize_value(value: &str) -> String {
    lazy_static! {
        static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
    }
    let v = value.replace("\\ ", " ");
    let v = v.trim().to_lowercase();
    WS_RE.replace_all(v.as_str(), " ").to_string()
}

fn normalize_rdn(rdn: &RelativeDistinguishedName) -> String {
    let mut atavs: Vec<String> = rdn
        .0
        .iter()
        .map(|atav| match get_value_from_rdn(atav) {
            Ok(v) => format!("{}={}", atav.oid, normalize_value(v.as_str())),
            Err(_e) => format!("{}=?", atav.oid),
        })
        .collect();
    atavs.sort();
    atavs.join("+")
}

/// `normalize_name` returns a string form of a Name that is suitable for use as a lookup key. Each
/// attribute value is case-folded, trimmed and has runs of whitespace collapsed, so names that differ
/// only in those respects produce the same key.
pub fn normalize_name(name: &Name) -> String {
    name.0
        .iter()
        .map(normalize_rdn)
        .collect::<Vec<String>>()
        .join(",")
}

/// [`compare_names`] compares two Name values returning true if they match and false otherwise.
pub fn compare_names(left: &Name, right: &Name) -> bool {
    // no match if not the same number of RDNs
    if left.0.len() != right.0.len() {
        return false;
    }
    if left == right {
        return true;
    }
    normalize_name(left) == normalize_name(right)
}

/// `get_attribute_values` returns the string values of all attributes of the given type found in a Name.
pub fn get_attribute_values(name: &Name, oid: &ObjectIdentifier) -> Vec<String> {
    let mut retval = vec![];
    for rdn in name.0.iter() {
        for atav in rdn.0.iter() {
            if atav.oid == *oid {
                if let Ok(v) = get_value_from_rdn(atav) {
                    retval.push(v.replace("\\ ", " "));
                }
            }
        }
    }
    retval
}

/// `hostname_matches` returns true if host matches a DNS name taken from a certificate. The pattern
/// may feature a wildcard as the complete left-most label, i.e., `*.example.com`, which matches
/// exactly one label.
pub fn hostname_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_lowercase();
    let host = host.trim_end_matches('.').to_lowercase();
    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    if let Some(suffix) = pattern.strip_prefix("*.") {
        match host.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest == suffix,
            None => false,
        }
    } else {
        pattern == host
    }
}

/// `buffer_to_hex` returns an upper case hex representation of the given buffer.
pub fn buffer_to_hex(buffer: &[u8]) -> String {
    let hex = subtle_encoding::hex::encode_upper(buffer);
    String::from_utf8_lossy(&hex).to_string()
}

pub(crate) fn general_subtree_to_string(gs: &GeneralSubtree) -> String {
    match &gs.base {
        GeneralName::DirectoryName(dn) => {
            format!("DirectoryName: {}", dn)
        }
        GeneralName::UniformResourceIdentifier(uri) => {
            format!("UniformResourceIdentifier: {}", uri)
        }
        GeneralName::DnsName(dns) => format!("DnsName: {}", dns),
        GeneralName::Rfc822Name(rfc822) => {
            format!("Rfc822Name: {}", rfc822)
        }
        _ => format!("{:?}", gs.base),
    }
}

#[test]
fn get_hash_alg_from_sig_alg_test() {
    assert_eq!(
        PKIXALG_SHA256,
        get_hash_alg_from_sig_alg(&PKIXALG_SHA256_WITH_RSA_ENCRYPTION)
            .unwrap()
            .oid
    );
    assert_eq!(
        PKIXALG_SHA384,
        get_hash_alg_from_sig_alg(&PKIXALG_ECDSA_WITH_SHA384)
            .unwrap()
            .oid
    );
    assert_eq!(
        PKIXALG_SHA1,
        get_hash_alg_from_sig_alg(&PKIXALG_SHA1_WITH_RSA_ENCRYPTION)
            .unwrap()
            .oid
    );
    assert_eq!(
        Err(Error::Unrecognized),
        get_hash_alg_from_sig_alg(&PKIXALG_RSA_ENCRYPTION)
    );
}

#[test]
fn hostname_matches_test() {
    assert!(hostname_matches("www.tls.test", "www.tls.test"));
    assert!(hostname_matches("WWW.tls.test", "www.TLS.test."));
    assert!(hostname_matches("*.tls.test", "www.tls.test"));
    assert!(!hostname_matches("*.tls.test", "tls.test"));
    assert!(!hostname_matches("*.tls.test", "a.b.tls.test"));
    assert!(!hostname_matches("www.tls.test", "tls.test"));
    assert!(!hostname_matches("", "tls.test"));
}

#[test]
fn descended_from_test() {
    use core::str::FromStr;

    let base = Ia5String::new("example.com").unwrap();
    assert!(descended_from_host(&base, "example.com", false));
    assert!(descended_from_host(&base, "host.example.com", false));
    assert!(!descended_from_host(&base, "badexample.com", false));
    let dot = Ia5String::new(".example.com").unwrap();
    assert!(descended_from_host(&dot, "host.example.com", true));
    assert!(!descended_from_host(&dot, "example.com", true));

    assert!(is_email("user@example.com"));
    assert!(!is_email("example.com"));
    let mailbox = Ia5String::new("user@example.com").unwrap();
    assert!(descended_from_rfc822(&mailbox, "USER@example.com"));
    assert!(!descended_from_rfc822(&mailbox, "other@example.com"));
    let host = Ia5String::new("example.com").unwrap();
    assert!(descended_from_rfc822(&host, "other@example.com"));
    assert!(!descended_from_rfc822(&host, "other@sub.example.com"));
    assert!(descended_from_rfc822(&dot, "other@sub.example.com"));

    let subtree = Name::from_str("O=certpath,C=US").unwrap();
    let name = Name::from_str("CN=Test,O=CertPath,C=US").unwrap();
    let other = Name::from_str("CN=Test,O=Other,C=US").unwrap();
    assert!(descended_from_dn(&subtree, &name));
    assert!(!descended_from_dn(&subtree, &other));
    assert!(!descended_from_dn(&name, &subtree));
}

#[test]
fn compare_names_test() {
    use core::str::FromStr;

    let l = Name::from_str("CN=Test  Root,O=certpath,C=US").unwrap();
    let r = Name::from_str("CN=test root,O=CERTPATH,C=us").unwrap();
    let o = Name::from_str("CN=Other Root,O=certpath,C=US").unwrap();
    assert!(compare_names(&l, &r));
    assert!(!compare_names(&l, &o));
    assert_eq!(normalize_name(&l), normalize_name(&r));
    assert_eq!(
        vec!["Test  Root".to_string()],
        get_attribute_values(&l, &const_oid::db::rfc4519::COMMON_NAME)
    );
}

#[test]
fn buffer_to_hex_test() {
    assert_eq!("0A1BFF", buffer_to_hex(&[0x0a, 0x1b, 0xff]));
    assert_eq!(
        Some("ca.example.com".to_string()),
        host_from_uri("https://ca.example.com/crl")
    );
    assert_eq!(None, host_from_uri("not a uri"));
}
