//! The pki_environment_traits module features the function signatures and trait definitions used by
//! [`PkiEnvironment`] and by the path validation engine to reach cryptographic primitives and stored
//! PKI artifacts.

use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::name::Name;

use crate::util::error::*;
use crate::{ParsedCertificate, ParsedCrl, PkiEnvironment};

/// `CalculateHash` provides a function signature for implementations that perform hashing
pub type CalculateHash = fn(
    &PkiEnvironment,
    &AlgorithmIdentifierOwned, // hash alg
    &[u8],                     // buffer to hash
) -> Result<Vec<u8>>;

/// `VerifySignatureMessage` provides a function signature for implementations that perform signature
/// verification over a message.
///
/// Implementations return `Ok(())` when the signature verifies, `Err(Error::PathValidation(_))` when
/// a definitive finding is available (i.e., a bad signature or an undecodable key) and
/// `Err(Error::Unrecognized)` when the algorithm is not supported, so that other implementations can
/// be tried.
pub type VerifySignatureMessage = fn(
    &PkiEnvironment,
    &[u8],                      // message to hash and verify
    &[u8],                      // signature
    &AlgorithmIdentifierOwned,  // signature algorithm
    &SubjectPublicKeyInfoOwned, // public key
) -> Result<()>;

/// The `CertificateStore` trait defines the lookups the chain builder and revocation checker perform
/// against a collection of trust anchors, intermediate CA certificates and CRLs.
///
/// Lookups never mutate the store and return an empty vector when nothing matches. Names are
/// compared after normalization (see [`normalize_name`](../../util/pdv_utilities/fn.normalize_name.html)).
pub trait CertificateStore {
    /// Returns all trust anchors whose subject matches `subject`. More than one anchor may share a
    /// subject, i.e., during key rollover.
    fn find_anchors_by_subject(&self, subject: &Name) -> Vec<&ParsedCertificate>;

    /// Returns all non-anchor certificates whose subject matches `subject`.
    fn find_certificates_by_subject(&self, subject: &Name) -> Vec<&ParsedCertificate>;

    /// Returns all CRLs whose issuer matches `issuer`.
    fn find_crls_by_issuer(&self, issuer: &Name) -> Vec<&ParsedCrl>;

    /// Returns true if the given certificate is one of the trust anchors.
    fn is_trust_anchor(&self, cert: &ParsedCertificate) -> bool;
}
