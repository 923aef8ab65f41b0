//! Revocation status determination using CRLs held in a [`CertificateStore`](crate::CertificateStore)
//!
//! Revocation status determination is performed after validating a certification path. Findings are
//! returned as status codes paired with the index of the certificate they concern so they can be
//! added to a [`ValidationResult`](crate::ValidationResult).
//!
//! ```
//! use certpath::*;
//!
//! let mut pe = PkiEnvironment::default();
//! pe.populate_default();
//!
//! let root = parse_cert(include_bytes!("../tests/examples/root.der"), "root.der").unwrap();
//! let int = parse_cert(include_bytes!("../tests/examples/int.der"), "int.der").unwrap();
//! let ee = parse_cert(include_bytes!("../tests/examples/ee_revoked.der"), "ee_revoked.der").unwrap();
//! let mut store = MemoryStore::new();
//! store.add_crl_buffer(include_bytes!("../tests/examples/int.crl"), "int.crl").unwrap();
//!
//! let path = CertificationPath::new(root, vec![ee, int]);
//! let restrictions = Restrictions::new(110, true, 1893456000);
//! let statuses = check_revocation(&pe, &restrictions, &store, &path);
//! assert!(statuses.contains(&(0, StatusCode::CertRevoked)));
//! ```
//!
//! Revocation processing is influenced by the following fields of [`Restrictions`](crate::Restrictions):
//!
//! - `time_of_interest`
//! - `require_revocation`
//! - `check_anchor_revocation`
pub mod check_revocation;
pub mod crl;

pub use crate::revocation::{check_revocation::*, crl::*};
