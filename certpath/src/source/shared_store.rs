//! A [`MemoryStore`] that can be extended while validations are in flight.
//!
//! ```
//! use certpath::{parse_cert, CertificateStore, SharedStore};
//!
//! let store = SharedStore::new();
//! let before = store.snapshot();
//! let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
//! store.add_trust_anchor(root.clone()).unwrap();
//!
//! // snapshots taken earlier are unaffected by later additions
//! assert!(!before.is_trust_anchor(&root));
//! assert!(store.snapshot().is_trust_anchor(&root));
//! ```

use alloc::sync::Arc;
use std::sync::RwLock;

use log::error;

use crate::{util::error::*, MemoryStore, ParsedCertificate, ParsedCrl};

/// `SharedStore` holds an immutable [`MemoryStore`] snapshot behind a reader-writer lock.
///
/// Readers take a snapshot, an `Arc` that is never mutated, and validate against it. Writers clone
/// the current contents when a snapshot is outstanding, apply the addition and publish the result.
#[derive(Default, Debug)]
pub struct SharedStore {
    current: RwLock<Arc<MemoryStore>>,
}

impl SharedStore {
    /// instantiates a new SharedStore with an empty MemoryStore
    pub fn new() -> SharedStore {
        SharedStore::default()
    }

    /// instantiates a new SharedStore from a populated MemoryStore
    pub fn from_store(store: MemoryStore) -> SharedStore {
        SharedStore {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// `snapshot` returns the current point-in-time view of the store.
    pub fn snapshot(&self) -> Arc<MemoryStore> {
        match self.current.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update<F: FnOnce(&mut MemoryStore) -> bool>(&self, f: F) -> Result<bool> {
        let mut guard = match self.current.write() {
            Ok(g) => g,
            Err(e) => {
                error!("Failed to acquire store lock for writing: {}", e);
                return Err(Error::Unrecognized);
            }
        };
        Ok(f(Arc::make_mut(&mut guard)))
    }

    /// `add_trust_anchor` adds a trust anchor. Returns Ok(false) for duplicates.
    pub fn add_trust_anchor(&self, ta: ParsedCertificate) -> Result<bool> {
        self.update(|s| s.add_trust_anchor(ta))
    }

    /// `add_certificate` adds an intermediate CA certificate. Returns Ok(false) for duplicates.
    pub fn add_certificate(&self, cert: ParsedCertificate) -> Result<bool> {
        self.update(|s| s.add_certificate(cert))
    }

    /// `add_crl` adds a CRL. Returns Ok(false) for duplicates.
    pub fn add_crl(&self, crl: ParsedCrl) -> Result<bool> {
        self.update(|s| s.add_crl(crl))
    }
}

#[test]
fn snapshot_isolation() {
    use crate::{parse_cert, parse_crl, CertificateStore};

    let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
    let crl = parse_crl(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap();

    let store = SharedStore::from_store(MemoryStore::new());
    let s1 = store.snapshot();
    assert!(store.add_certificate(int.clone()).unwrap());
    assert!(!store.add_certificate(int.clone()).unwrap());
    let s2 = store.snapshot();
    assert!(store.add_crl(crl).unwrap());

    assert_eq!(0, s1.num_certificates());
    assert_eq!(1, s2.num_certificates());
    assert_eq!(0, s2.num_crls());
    assert_eq!(1, store.snapshot().find_crls_by_issuer(&int.subject).len());
}
