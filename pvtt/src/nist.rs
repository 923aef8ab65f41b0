//! Runs test cases laid out in the NIST style: one folder per case holding end.crt, CA certificates
//! and CRLs

use std::collections::BTreeSet;
use std::path::Path;

use log::{debug, error, info};
use walkdir::WalkDir;

use certpath::*;

use crate::results::{ExpectedResult, Stats};

const TARGET_FILENAME: &str = "end.crt";

/// `validate_case` validates the end.crt file in `case_folder` using the certificates and CRLs
/// alongside it. Revocation checking is always mandatory.
pub fn validate_case(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    case_folder: &str,
) -> Result<ValidationResult> {
    let target_path = Path::new(case_folder).join(TARGET_FILENAME);
    let buffer = get_file_as_byte_vec(&target_path)?;
    let target = parse_cert_buffer(&buffer, &target_path.to_string_lossy())?;

    let mut store = MemoryStore::new();
    for cert in cert_folder_to_vec(case_folder, &[TARGET_FILENAME])? {
        if is_self_signed(pe, &cert) {
            store.add_trust_anchor(cert);
        } else {
            store.add_certificate(cert);
        }
    }
    for crl in crl_folder_to_vec(case_folder)? {
        store.add_crl(crl);
    }
    store.log_contents();

    let mut restrictions = restrictions.clone();
    restrictions.require_revocation = true;

    let input = PathValidationInput::new(&target);
    Ok(x509_path_validate(pe, &restrictions, &store, &input))
}

/// Logs each folder that has no entry in the results file.
fn log_unlisted_cases(folder: &str, expected: &[ExpectedResult]) {
    let listed: BTreeSet<&str> = expected.iter().map(|e| e.identifier.as_str()).collect();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .flatten()
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !listed.contains(name) {
                info!("Skipping {} as it has no expected result", name);
            }
        }
    }
}

/// `run_nist` validates each case listed in `expected` and records the outcome in `stats`.
pub fn run_nist(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    folder: &str,
    expected: &[ExpectedResult],
    stats: &mut Stats,
) {
    log_unlisted_cases(folder, expected);
    for e in expected {
        let case_folder = Path::new(folder).join(&e.identifier);
        let case_folder = case_folder.to_string_lossy();
        debug!("Running {}", case_folder);
        let observed = match validate_case(pe, restrictions, &case_folder) {
            Ok(result) => result.result_string().to_string(),
            Err(err) => {
                error!("Failed to run {}: {}", e.identifier, err);
                format!("ERROR ({})", err)
            }
        };
        stats.record(&e.identifier, &e.status, &observed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pe() -> PkiEnvironment {
        let mut pe = PkiEnvironment::default();
        pe.populate_default();
        pe
    }

    #[test]
    fn nist_cases() {
        let r = Restrictions::new(DEFAULT_MIN_KEY_STRENGTH, false, 1893456000);
        let cases = [
            ("valid", StatusCode::Ok),
            ("revoked", StatusCode::CertRevoked),
            ("missing_crl", StatusCode::NoRevocationData),
            ("pathlen", StatusCode::PathLengthExceeded),
        ];
        for (case, expected) in cases {
            let folder = format!("tests/examples/nist/{}", case);
            let result = validate_case(&pe(), &r, &folder).unwrap();
            assert_eq!(expected, result.overall_status, "{}", case);
        }
    }

    #[test]
    fn missing_case() {
        let r = Restrictions::new(DEFAULT_MIN_KEY_STRENGTH, false, 1893456000);
        assert!(validate_case(&pe(), &r, "tests/examples/nist/absent").is_err());
    }
}
