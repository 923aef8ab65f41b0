//! Structures and functions related to configuring certification path processing operations

use core::str::FromStr;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use const_oid::db::rfc5280::{
    ANY_EXTENDED_KEY_USAGE, ID_KP_CLIENT_AUTH, ID_KP_CODE_SIGNING, ID_KP_EMAIL_PROTECTION,
    ID_KP_OCSP_SIGNING, ID_KP_SERVER_AUTH,
};
use der::asn1::ObjectIdentifier;
use flagset::FlagSet;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Result as SerdeResult;
use x509_cert::ext::pkix::KeyUsages;

use crate::builder::file_utils::get_file_as_byte_vec;
use crate::{Error, Result};

/// Default minimum public key strength, in bits of security
pub const DEFAULT_MIN_KEY_STRENGTH: usize = 110;

/// Default maximum number of certificates explored along one branch during path building
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Key strength, in bits of security, at or below which SHA-1 is treated as a trusted hash
pub const SHA1_KEY_STRENGTH_THRESHOLD: usize = 80;

/// `get_now` returns the current time as seconds since the Unix epoch, or 0 if the clock is not
/// available.
pub fn get_now() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(n) => n.as_secs(),
        Err(_) => 0,
    }
}

/// `default_trusted_hashes` returns the names of the hash algorithms trusted for the given minimum
/// key strength.
pub fn default_trusted_hashes(min_key_strength: usize) -> Vec<String> {
    let mut v = vec![];
    if min_key_strength <= SHA1_KEY_STRENGTH_THRESHOLD {
        v.push("SHA-1".to_string());
    }
    for h in ["SHA-224", "SHA-256", "SHA-384", "SHA-512"] {
        v.push(h.to_string());
    }
    v
}

/// [`Restrictions`] governs certification path validation. All fields have defaults, so partial JSON
/// documents can be deserialized.
///
/// ```
/// use certpath::Restrictions;
///
/// let r: Restrictions = serde_json::from_str(r#"{"require_revocation": true}"#).unwrap();
/// assert!(r.require_revocation);
/// assert_eq!(110, r.min_key_strength);
/// assert!(!r.trusted_hash_names().contains(&"SHA-1".to_string()));
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restrictions {
    /// Minimum acceptable public key strength, expressed in bits of security
    pub min_key_strength: usize,
    /// When true, absence of applicable revocation information causes validation to fail
    pub require_revocation: bool,
    /// When true, the revocation status of the trust anchor itself is checked
    pub check_anchor_revocation: bool,
    /// Reference time as seconds since the Unix epoch. Zero disables all time checks.
    pub time_of_interest: u64,
    /// When true, a self-issued trust anchor that does not assert cA may sign certificates
    pub allow_non_ca_anchor: bool,
    /// When true, certificate policies are intersected along the path
    pub policy_processing: bool,
    /// Initial acceptable policy set, as dotted OID strings. Empty means any policy.
    pub initial_policies: Vec<String>,
    /// Names of trusted signature hash algorithms, i.e., "SHA-256". When absent, the set is derived
    /// from `min_key_strength` (see [`default_trusted_hashes`]).
    pub trusted_hashes: Option<Vec<String>>,
    /// Maximum number of certificates explored along one branch during path building
    pub max_depth: usize,
}

impl Default for Restrictions {
    fn default() -> Self {
        Restrictions {
            min_key_strength: DEFAULT_MIN_KEY_STRENGTH,
            require_revocation: false,
            check_anchor_revocation: false,
            time_of_interest: get_now(),
            allow_non_ca_anchor: false,
            policy_processing: false,
            initial_policies: vec![],
            trusted_hashes: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Restrictions {
    /// Restrictions::new returns default restrictions with the given key strength floor, revocation
    /// requirement and time of interest.
    pub fn new(min_key_strength: usize, require_revocation: bool, time_of_interest: u64) -> Self {
        Restrictions {
            min_key_strength,
            require_revocation,
            time_of_interest,
            ..Default::default()
        }
    }

    /// `trusted_hash_names` returns the configured trusted hash names, or the defaults for
    /// `min_key_strength` when none are configured.
    pub fn trusted_hash_names(&self) -> Vec<String> {
        match &self.trusted_hashes {
            Some(th) => th.clone(),
            None => default_trusted_hashes(self.min_key_strength),
        }
    }

    /// `is_hash_trusted` returns true if the named hash algorithm is trusted. Comparison ignores case.
    pub fn is_hash_trusted(&self, hash_name: &str) -> bool {
        self.trusted_hash_names()
            .iter()
            .any(|h| h.eq_ignore_ascii_case(hash_name))
    }

    /// `get_initial_policy_set` returns the initial policy set as object identifiers. An entry that
    /// is not a valid dotted OID causes [`Error::Misconfiguration`].
    pub fn get_initial_policy_set(&self) -> Result<Vec<ObjectIdentifier>> {
        let mut v = vec![];
        for p in &self.initial_policies {
            match ObjectIdentifier::from_str(p) {
                Ok(oid) => v.push(oid),
                Err(e) => {
                    error!("Invalid initial policy {}: {}", p, e);
                    return Err(Error::Misconfiguration);
                }
            }
        }
        Ok(v)
    }
}

/// `read_restrictions` deserializes a JSON [`Restrictions`] document from the named file. When no
/// file name is given, default restrictions are returned.
pub fn read_restrictions(fname: Option<&str>) -> Result<Restrictions> {
    let fname = match fname {
        Some(f) => f,
        None => return Ok(Restrictions::default()),
    };
    let json = get_file_as_byte_vec(Path::new(fname))?;
    let r: SerdeResult<Restrictions> = serde_json::from_slice(&json);
    match r {
        Ok(r) => Ok(r),
        Err(e) => {
            error!("Failed to parse restrictions from {}: {}", fname, e);
            Err(Error::ParseError)
        }
    }
}

/// `Usage` identifies the purpose the end-entity certificate is being validated for.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Usage {
    /// No usage checks are performed
    #[default]
    Unspecified,
    /// TLS server authentication
    TlsServerAuth,
    /// TLS client authentication
    TlsClientAuth,
    /// Code signing
    CodeSigning,
    /// Email protection
    EmailProtection,
    /// OCSP response signing
    OcspSigning,
}

impl Usage {
    /// `extended_key_usage` returns the key purpose that an extended key usage extension must
    /// contain for this usage.
    pub fn extended_key_usage(&self) -> Option<ObjectIdentifier> {
        match self {
            Usage::Unspecified => None,
            Usage::TlsServerAuth => Some(ID_KP_SERVER_AUTH),
            Usage::TlsClientAuth => Some(ID_KP_CLIENT_AUTH),
            Usage::CodeSigning => Some(ID_KP_CODE_SIGNING),
            Usage::EmailProtection => Some(ID_KP_EMAIL_PROTECTION),
            Usage::OcspSigning => Some(ID_KP_OCSP_SIGNING),
        }
    }

    /// `key_usages` returns the key usage bits acceptable for this usage. A key usage extension
    /// must assert at least one of them. An empty set means no requirement.
    pub fn key_usages(&self) -> FlagSet<KeyUsages> {
        match self {
            Usage::Unspecified => FlagSet::default(),
            Usage::TlsServerAuth => {
                KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment | KeyUsages::KeyAgreement
            }
            Usage::TlsClientAuth => KeyUsages::DigitalSignature | KeyUsages::KeyAgreement,
            Usage::CodeSigning => FlagSet::from(KeyUsages::DigitalSignature),
            Usage::EmailProtection => {
                KeyUsages::DigitalSignature
                    | KeyUsages::NonRepudiation
                    | KeyUsages::KeyEncipherment
                    | KeyUsages::KeyAgreement
            }
            Usage::OcspSigning => KeyUsages::DigitalSignature | KeyUsages::NonRepudiation,
        }
    }

    /// `permits` returns true if the given extended key usage and key usage values, either of which
    /// may be absent, allow this usage.
    pub fn permits(
        &self,
        ext_key_usage: &Option<Vec<ObjectIdentifier>>,
        key_usage: &Option<FlagSet<KeyUsages>>,
    ) -> bool {
        if let (Some(required), Some(ekus)) = (self.extended_key_usage(), ext_key_usage) {
            if !ekus.contains(&required) && !ekus.contains(&ANY_EXTENDED_KEY_USAGE) {
                return false;
            }
        }
        let required = self.key_usages();
        if let Some(ku) = key_usage {
            if !required.is_empty() && (*ku & required).is_empty() {
                return false;
            }
        }
        true
    }
}

#[test]
fn default_restrictions() {
    let r = Restrictions::default();
    assert_eq!(110, r.min_key_strength);
    assert_eq!(10, r.max_depth);
    assert!(!r.require_revocation);
    assert!(!r.check_anchor_revocation);
    assert!(!r.allow_non_ca_anchor);
    assert!(r.time_of_interest > 0);
    assert!(r.is_hash_trusted("sha-256"));
    assert!(!r.is_hash_trusted("SHA-1"));

    let r = Restrictions::new(80, true, 0);
    assert!(r.is_hash_trusted("SHA-1"));
    assert!(r.require_revocation);
    assert_eq!(0, r.time_of_interest);
}

#[test]
fn initial_policy_set() {
    let mut r = Restrictions::default();
    assert!(r.get_initial_policy_set().unwrap().is_empty());
    r.initial_policies = vec!["2.5.29.32.0".to_string()];
    assert_eq!(
        vec![const_oid::db::rfc5280::ANY_POLICY],
        r.get_initial_policy_set().unwrap()
    );
    r.initial_policies = vec!["not an oid".to_string()];
    assert_eq!(Err(Error::Misconfiguration), r.get_initial_policy_set());
}

#[test]
fn usage_permits() {
    let server = Some(vec![ID_KP_SERVER_AUTH]);
    let ds: Option<FlagSet<KeyUsages>> = Some(KeyUsages::DigitalSignature.into());
    let cs: Option<FlagSet<KeyUsages>> = Some(KeyUsages::KeyCertSign.into());

    assert!(Usage::TlsServerAuth.permits(&server, &ds));
    assert!(Usage::TlsServerAuth.permits(&None, &None));
    assert!(!Usage::TlsServerAuth.permits(&server, &cs));
    assert!(!Usage::TlsClientAuth.permits(&server, &ds));
    assert!(Usage::TlsClientAuth.permits(&Some(vec![ANY_EXTENDED_KEY_USAGE]), &ds));
    assert!(Usage::Unspecified.permits(&server, &cs));
}
