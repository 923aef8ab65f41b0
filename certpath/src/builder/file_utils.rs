//! The file_utils module contains utility functions related to interactions with the filesystem.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{error, info};
use walkdir::WalkDir;

use crate::{parse_cert_buffer, parse_crl_buffer, util::error::*, ParsedCertificate, ParsedCrl};

/// File extensions treated as certificates by [`cert_folder_to_vec`]
pub const CERT_FILE_EXTENSIONS: &[&str] = &["der", "crt", "cer", "pem"];

/// File extensions treated as CRLs by [`crl_folder_to_vec`]
pub const CRL_FILE_EXTENSIONS: &[&str] = &["crl"];

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes containing
/// the contents of that file or an [Error::StdIoError].
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    match File::open(filename) {
        Ok(mut f) => match std::fs::metadata(filename) {
            Ok(metadata) => {
                let mut buffer = vec![0; metadata.len() as usize];
                match f.read_exact(&mut buffer) {
                    Ok(_) => Ok(buffer),
                    Err(e) => Err(Error::StdIoError(e.kind())),
                }
            }
            Err(e) => Err(Error::StdIoError(e.kind())),
        },
        Err(e) => Err(Error::StdIoError(e.kind())),
    }
}

/// Returns the files directly within dir that feature one of the given extensions, sorted by name.
/// Files named in skip are omitted.
fn files_in_folder(dir: &str, exts: &[&str], skip: &[&str]) -> Result<Vec<std::path::PathBuf>> {
    if !Path::is_dir(Path::new(dir)) {
        error!("{} does not exist or is not a directory", dir);
        return Err(Error::NotFound);
    }

    let mut retval = vec![];
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(e) => {
                if !e.file_type().is_file() {
                    continue;
                }
                let path = e.path();
                match path.extension().and_then(OsStr::to_str) {
                    Some(ext) if exts.contains(&ext) => {}
                    _ => continue,
                }
                if let Some(name) = path.file_name().and_then(OsStr::to_str) {
                    if skip.contains(&name) {
                        continue;
                    }
                }
                retval.push(path.to_path_buf());
            }
            Err(e) => {
                error!("Failed to read entry in {}: {}", dir, e);
                continue;
            }
        }
    }
    Ok(retval)
}

/// `cert_folder_to_vec` parses each DER or PEM encoded certificate file directly within a folder and
/// returns the results in file name order. Files named in `skip` are ignored, as are files that do
/// not parse.
///
/// Only files with .der, .crt, .cer or .pem extensions are processed.
pub fn cert_folder_to_vec(dir: &str, skip: &[&str]) -> Result<Vec<ParsedCertificate>> {
    let mut retval = vec![];
    for path in files_in_folder(dir, CERT_FILE_EXTENSIONS, skip)? {
        let locator = path.to_str().unwrap_or("");
        let buffer = get_file_as_byte_vec(&path)?;
        match parse_cert_buffer(&buffer, locator) {
            Ok(cert) => retval.push(cert),
            Err(_e) => {
                info!("Ignoring {} as it could not be parsed as a certificate", locator);
            }
        }
    }
    Ok(retval)
}

/// `crl_folder_to_vec` parses each DER or PEM encoded CRL file directly within a folder and returns
/// the results in file name order. Files that do not parse are ignored.
pub fn crl_folder_to_vec(dir: &str) -> Result<Vec<ParsedCrl>> {
    let mut retval = vec![];
    for path in files_in_folder(dir, CRL_FILE_EXTENSIONS, &[])? {
        let locator = path.to_str().unwrap_or("");
        let buffer = get_file_as_byte_vec(&path)?;
        match parse_crl_buffer(&buffer, locator) {
            Ok(crl) => retval.push(crl),
            Err(_e) => {
                info!("Ignoring {} as it could not be parsed as a CRL", locator);
            }
        }
    }
    Ok(retval)
}

#[test]
fn non_existent_dir() {
    let r = cert_folder_to_vec("tests/examples/nonexistent", &[]);
    assert_eq!(Some(Error::NotFound), r.err());
    let r = get_file_as_byte_vec(Path::new("tests/examples/nonexistent.der"));
    assert_eq!(
        Some(Error::StdIoError(std::io::ErrorKind::NotFound)),
        r.err()
    );
}

#[test]
fn folder_to_vec() {
    let certs = cert_folder_to_vec("tests/examples", &["ee.der"]).unwrap();
    assert!(certs.iter().any(|c| c.locator.ends_with("root.der")));
    assert!(!certs.iter().any(|c| c.locator.ends_with("/ee.der")));
    let mut sorted = certs.iter().map(|c| c.locator.clone()).collect::<Vec<String>>();
    sorted.sort();
    assert_eq!(
        sorted,
        certs.iter().map(|c| c.locator.clone()).collect::<Vec<String>>()
    );

    let crls = crl_folder_to_vec("tests/examples").unwrap();
    assert_eq!(2, crls.len());
}
