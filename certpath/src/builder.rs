//! Certification path building and filesystem helpers used to populate stores

pub mod chain_builder;
pub mod file_utils;

pub use crate::builder::{chain_builder::*, file_utils::*};
