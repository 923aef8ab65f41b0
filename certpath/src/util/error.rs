//! Error types and status codes

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// `StatusCode` enumerates the findings that certification path validation can produce.
///
/// Each code has a fixed severity (see [`StatusCode::severity`]) and a stable name (see
/// [`StatusCode::as_str`]) suitable for exact-match comparison against recorded fixtures. Codes with
/// severity below 1000 are informational and never cause validation to fail.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum StatusCode {
    /// No errors were encountered while validating certification path
    Ok,
    /// A CRL covering the certificate was found, verified and did not list the certificate
    ValidCrlChecked,
    /// No applicable CRL was found and revocation information was not required
    RevocationNotChecked,

    /// A public key in the path is weaker than the minimum key strength restriction
    InsufficientKeyStrength,
    /// A certificate was signed using a hash algorithm that is not in the trusted set
    UntrustedHash,
    /// Revocation information was required but no applicable CRL was found
    NoRevocationData,
    /// Revocation information was required and the only CRLs found were not yet valid
    CrlNotYetValid,
    /// Revocation information was required and the only CRLs found had expired
    CrlExpired,

    /// No certificate could be found to serve as issuer of a certificate in the path
    IssuerNotFound,
    /// Path building reached a self-signed certificate that is not a trust anchor
    CannotEstablishTrust,
    /// Path building encountered a certificate already present in the branch
    ChainCycleDetected,
    /// Path building exceeded the maximum depth
    ChainTooLong,

    /// The intersection of certificate policies across the path became empty
    PolicyConstraintViolation,
    /// The target certificate's extended key usage or key usage does not permit the intended usage
    UsageMismatch,
    /// The target certificate does not match the requested hostname
    HostnameMismatch,
    /// A CRL issuer's key usage does not include cRLSign
    CrlSignNotPermitted,
    /// More CA certificates follow an issuer than its path length constraint allows
    PathLengthExceeded,
    /// A certificate that issued another certificate is not a CA
    CaFlagMissing,
    /// A name in the path falls outside a permitted subtree or within an excluded subtree
    NameConstraintViolation,
    /// A certificate features a critical extension that is not supported
    UnsupportedCriticalExtension,

    /// The signature on a CRL did not verify
    CrlBadSignature,
    /// The signature algorithm or public key algorithm is not supported
    SignatureAlgorithmUnknown,
    /// A public key could not be decoded
    PublicKeyInvalid,
    /// The signature on a certificate did not verify
    SignatureError,

    /// A certificate's notBefore is later than the reference time
    NotYetValid,
    /// A certificate's notAfter is earlier than the reference time
    Expired,

    /// A certificate in the path is listed on an applicable CRL
    CertRevoked,
}

impl StatusCode {
    /// `severity` returns the rank used to order findings. Higher is worse.
    pub fn severity(&self) -> u32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::ValidCrlChecked => 1,
            StatusCode::RevocationNotChecked => 2,

            StatusCode::InsufficientKeyStrength => 1000,
            StatusCode::UntrustedHash => 1001,
            StatusCode::NoRevocationData => 1002,
            StatusCode::CrlNotYetValid => 1003,
            StatusCode::CrlExpired => 1004,

            StatusCode::IssuerNotFound => 2000,
            StatusCode::CannotEstablishTrust => 2001,
            StatusCode::ChainCycleDetected => 2002,
            StatusCode::ChainTooLong => 2003,

            StatusCode::PolicyConstraintViolation => 3000,
            StatusCode::UsageMismatch => 3001,
            StatusCode::HostnameMismatch => 3002,
            StatusCode::CrlSignNotPermitted => 3003,
            StatusCode::PathLengthExceeded => 3004,
            StatusCode::CaFlagMissing => 3005,
            StatusCode::NameConstraintViolation => 3006,
            StatusCode::UnsupportedCriticalExtension => 3007,

            StatusCode::CrlBadSignature => 4000,
            StatusCode::SignatureAlgorithmUnknown => 4001,
            StatusCode::PublicKeyInvalid => 4002,
            StatusCode::SignatureError => 4003,

            StatusCode::NotYetValid => 5000,
            StatusCode::Expired => 5001,

            StatusCode::CertRevoked => 6000,
        }
    }

    /// `is_failure` returns true if presence of this code causes validation to fail.
    pub fn is_failure(&self) -> bool {
        self.severity() >= 1000
    }

    /// `as_str` returns the stable name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::ValidCrlChecked => "VALID_CRL_CHECKED",
            StatusCode::RevocationNotChecked => "REVOCATION_NOT_CHECKED",
            StatusCode::InsufficientKeyStrength => "INSUFFICIENT_KEY_STRENGTH",
            StatusCode::UntrustedHash => "UNTRUSTED_HASH",
            StatusCode::NoRevocationData => "NO_REVOCATION_DATA",
            StatusCode::CrlNotYetValid => "CRL_NOT_YET_VALID",
            StatusCode::CrlExpired => "CRL_EXPIRED",
            StatusCode::IssuerNotFound => "CERT_ISSUER_NOT_FOUND",
            StatusCode::CannotEstablishTrust => "CANNOT_ESTABLISH_TRUST",
            StatusCode::ChainCycleDetected => "CHAIN_CYCLE_DETECTED",
            StatusCode::ChainTooLong => "CHAIN_TOO_LONG",
            StatusCode::PolicyConstraintViolation => "POLICY_CONSTRAINT_VIOLATION",
            StatusCode::UsageMismatch => "USAGE_MISMATCH",
            StatusCode::HostnameMismatch => "CERT_NAME_NOMATCH",
            StatusCode::CrlSignNotPermitted => "CRL_SIGN_NOT_PERMITTED",
            StatusCode::PathLengthExceeded => "PATH_LENGTH_EXCEEDED",
            StatusCode::CaFlagMissing => "CA_FLAG_MISSING",
            StatusCode::NameConstraintViolation => "NAME_CONSTRAINT_VIOLATION",
            StatusCode::UnsupportedCriticalExtension => "UNSUPPORTED_CRITICAL_EXTENSION",
            StatusCode::CrlBadSignature => "CRL_BAD_SIGNATURE",
            StatusCode::SignatureAlgorithmUnknown => "SIGNATURE_ALGO_UNKNOWN",
            StatusCode::PublicKeyInvalid => "CERT_PUBKEY_INVALID",
            StatusCode::SignatureError => "SIGNATURE_ERROR",
            StatusCode::NotYetValid => "NOT_YET_VALID",
            StatusCode::Expired => "EXPIRED",
            StatusCode::CertRevoked => "CERT_REVOKED",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A validation finding reported by a callback, i.e., a signature verification failure
    PathValidation(StatusCode),
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Unrecognized occurs when an error conditions does not match anything else here.
    Unrecognized,
    /// An artifact could not be parsed
    ParseError,
    /// A CRL was ignored due to an invalid extension.
    UnsupportedCrlExtension,
    /// A configuration error was detected. See textual log output for more details.
    Misconfiguration,
    /// Asn1Error is used to propagate error information from the x509 crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PathValidation(status) => write!(f, "PathValidationError: {}", status),
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::ParseError => write!(f, "ParseError"),
            Error::UnsupportedCrlExtension => write!(f, "UnsupportedCrlExtension"),
            Error::Misconfiguration => write!(f, "Misconfiguration"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn status_code_names_are_stable() {
    assert_eq!(StatusCode::Ok.to_string(), "OK");
    assert_eq!(StatusCode::CertRevoked.to_string(), "CERT_REVOKED");
    assert_eq!(StatusCode::HostnameMismatch.as_str(), "CERT_NAME_NOMATCH");
    assert_eq!(
        StatusCode::PathLengthExceeded.as_str(),
        "PATH_LENGTH_EXCEEDED"
    );
}

#[test]
fn status_code_ordering() {
    assert!(!StatusCode::Ok.is_failure());
    assert!(!StatusCode::ValidCrlChecked.is_failure());
    assert!(!StatusCode::RevocationNotChecked.is_failure());
    assert!(StatusCode::NoRevocationData.is_failure());
    assert!(StatusCode::CertRevoked.severity() > StatusCode::Expired.severity());
    assert!(StatusCode::Expired.severity() > StatusCode::SignatureError.severity());
    assert!(StatusCode::SignatureError.severity() > StatusCode::PathLengthExceeded.severity());
    assert!(StatusCode::PathLengthExceeded.severity() > StatusCode::IssuerNotFound.severity());
    assert!(StatusCode::IssuerNotFound.severity() > StatusCode::NoRevocationData.severity());
}

#[test]
fn error_test() {
    let _s = format!("{}", Error::PathValidation(StatusCode::SignatureError));
    let _s = format!("{}", Error::NotFound);
    let _s = format!("{}", Error::Unrecognized);
    let _s = format!("{}", Error::ParseError);
    let _s = format!("{}", Error::UnsupportedCrlExtension);
    let _s = format!("{}", Error::Misconfiguration);
    let _s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
}
