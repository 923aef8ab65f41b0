//! RFC5280-compliant certification path validation

pub mod cert_path;
pub mod name_constraints_set;
pub mod path_results;
pub mod path_settings;
pub mod path_validator;
pub mod pdv_certificate;
pub mod pdv_crl;
pub mod pdv_extension;
pub mod x509_path;

pub use crate::{
    validator::cert_path::*, validator::name_constraints_set::*, validator::path_results::*,
    validator::path_settings::*, validator::path_validator::*, validator::pdv_certificate::*,
    validator::pdv_crl::*, validator::pdv_extension::*, validator::x509_path::*,
};
