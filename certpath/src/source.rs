//! Stores of trust anchors, certificates and CRLs

pub mod cert_store;
pub mod shared_store;

pub use crate::{source::cert_store::*, source::shared_store::*};
