//! PkiEnvironment aggregates a set of function pointers that supply the cryptographic functionality
//! used when validating a certification path.
//!
//! The sample below illustrates preparation of a PkiEnvironment object and a trust store for use in
//! validating certification paths.
//! ```
//! use certpath::*;
//!
//! // the default PkiEnvironment has no callbacks
//! let mut pe = PkiEnvironment::default();
//!
//! // add hashing and signature verification capabilities
//! pe.populate_default();
//!
//! let mut store = MemoryStore::new();
//! // populate the store using add_trust_anchor, add_certificate and add_crl then pass it to
//! // x509_path_validate along with the environment.
//! assert!(store.add_crl_buffer(b"not a crl", "bogus.crl").is_err());
//! ```
//!
//! The aggregation of function pointers allows implementations of features to vary. For example,
//! one app may prefer a hardware-backed verifier while another uses the Rust Crypto implementations
//! registered by [`PkiEnvironment::populate_default`].

use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::{environment::pki_environment_traits::*, util::crypto::*, util::error::*};

/// [`PkiEnvironment`] provides a switchboard of callback functions that allow support to vary on
/// different platforms or to allow support to be tailored for specific use cases.
#[derive(Clone, Default)]
pub struct PkiEnvironment {
    /// List of functions that provide a message digest functionality
    calculate_hash_callbacks: Vec<CalculateHash>,

    /// List of functions that provide a signature verification functionality given a message
    verify_signature_message_callbacks: Vec<VerifySignatureMessage>,
}

impl PkiEnvironment {
    /// PkiEnvironment::new returns a new [`PkiEnvironment`] with empty callback vectors for each type of callback
    pub fn new() -> PkiEnvironment {
        PkiEnvironment::default()
    }

    /// populate_default adds the Rust Crypto hashing and signature verification callbacks.
    pub fn populate_default(&mut self) {
        self.add_calculate_hash_callback(calculate_hash_rust_crypto);
        self.add_verify_signature_message_callback(verify_signature_message_rust_crypto);
    }

    /// add_calculate_hash_callback adds a [`CalculateHash`] callback to the list used by calculate_hash.
    pub fn add_calculate_hash_callback(&mut self, c: CalculateHash) {
        self.calculate_hash_callbacks.push(c);
    }

    /// calculate_hash iterates over calculate_hash_callbacks until an authoritative answer is found
    /// or all options have been exhausted
    pub fn calculate_hash(
        &self,
        hash_alg: &AlgorithmIdentifierOwned,
        buffer_to_hash: &[u8],
    ) -> Result<Vec<u8>> {
        for f in &self.calculate_hash_callbacks {
            if let Ok(r) = f(self, hash_alg, buffer_to_hash) {
                return Ok(r);
            }
        }
        Err(Error::Unrecognized)
    }

    /// add_verify_signature_message_callback adds a [`VerifySignatureMessage`] callback to the list
    /// used by verify_signature_message.
    pub fn add_verify_signature_message_callback(&mut self, c: VerifySignatureMessage) {
        self.verify_signature_message_callbacks.push(c);
    }

    /// verify_signature_message iterates over verify_signature_message_callbacks until an
    /// authoritative answer is found or all options have been exhausted.
    ///
    /// A callback returning [`Error::Unrecognized`] defers to the next callback. Any other result is
    /// authoritative. When no callback recognizes the algorithm, [`Error::Unrecognized`] is returned.
    pub fn verify_signature_message(
        &self,
        message_to_verify: &[u8],
        signature: &[u8],
        signature_alg: &AlgorithmIdentifierOwned,
        spki: &SubjectPublicKeyInfoOwned,
    ) -> Result<()> {
        for f in &self.verify_signature_message_callbacks {
            match f(self, message_to_verify, signature, signature_alg, spki) {
                Err(Error::Unrecognized) => continue,
                r => return r,
            }
        }
        Err(Error::Unrecognized)
    }
}

#[test]
fn verify_falls_through_unrecognized() {
    fn never(
        _pe: &PkiEnvironment,
        _m: &[u8],
        _s: &[u8],
        _a: &AlgorithmIdentifierOwned,
        _k: &SubjectPublicKeyInfoOwned,
    ) -> Result<()> {
        Err(Error::Unrecognized)
    }

    let root =
        crate::parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
    let int = crate::parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();

    let mut pe = PkiEnvironment::new();
    pe.add_verify_signature_message_callback(never);
    assert_eq!(
        Err(Error::Unrecognized),
        pe.verify_signature_message(
            &int.tbs,
            &int.signature,
            &int.signature_algorithm,
            &root.public_key.spki
        )
    );

    pe.populate_default();
    assert!(pe
        .verify_signature_message(
            &int.tbs,
            &int.signature,
            &int.signature_algorithm,
            &root.public_key.spki
        )
        .is_ok());
}

#[test]
fn signatures_use_hash_callbacks() {
    let root =
        crate::parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
    let int = crate::parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();

    // RSA verification hashes the message using the environment's hash callbacks
    let mut pe = PkiEnvironment::new();
    pe.add_verify_signature_message_callback(verify_signature_message_rust_crypto);
    assert_eq!(
        Err(Error::Unrecognized),
        pe.verify_signature_message(
            &int.tbs,
            &int.signature,
            &int.signature_algorithm,
            &root.public_key.spki
        )
    );

    pe.add_calculate_hash_callback(calculate_hash_rust_crypto);
    assert!(pe
        .verify_signature_message(
            &int.tbs,
            &int.signature,
            &int.signature_algorithm,
            &root.public_key.spki
        )
        .is_ok());
}
