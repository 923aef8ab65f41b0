//! Runs test cases laid out in the x509test style: a single root.pem trust anchor and one PEM bundle
//! per case

use std::path::Path;

use log::{debug, error, info};

use certpath::*;

use crate::results::{ExpectedResult, Stats};

const ROOT_FILENAME: &str = "root.pem";
const HOSTNAME: &str = "www.tls.test";
const PEM_END: &str = "-----END ";

/// `split_pem_bundle` returns each `-----BEGIN`/`-----END` delimited block found in `contents`.
pub fn split_pem_bundle(contents: &str) -> Vec<String> {
    let mut retval = vec![];
    let mut cur: Option<String> = None;
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with("-----BEGIN ") {
            cur = Some(format!("{}\n", line));
        } else if let Some(block) = cur.as_mut() {
            block.push_str(line);
            block.push('\n');
            if line.starts_with(PEM_END) {
                retval.extend(cur.take());
            }
        }
    }
    retval
}

/// `read_bundle` returns the certificates in a PEM bundle, skipping blocks that cannot be parsed.
/// A bundle with no usable certificate is an error.
pub fn read_bundle(filename: &Path) -> Result<Vec<ParsedCertificate>> {
    let buffer = get_file_as_byte_vec(filename)?;
    let contents = String::from_utf8_lossy(&buffer);
    let locator = filename.to_string_lossy();

    let mut retval = vec![];
    for (i, block) in split_pem_bundle(&contents).iter().enumerate() {
        match parse_cert_pem(block.as_bytes(), &format!("{}[{}]", locator, i)) {
            Ok(cert) => retval.push(cert),
            Err(e) => info!("Skipping entry {} of {}: {}", i, locator, e),
        }
    }
    if retval.is_empty() {
        error!("{} contains no usable certificates", locator);
        return Err(Error::ParseError);
    }
    Ok(retval)
}

/// `validate_bundle` validates the first certificate in a bundle, using the remaining certificates
/// as intermediates, for TLS server authentication to www.tls.test. The result is downgraded unless
/// the path terminates at `root`.
pub fn validate_bundle(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    store: &MemoryStore,
    root: &ParsedCertificate,
    bundle: &Path,
) -> Result<ValidationResult> {
    let certs = read_bundle(bundle)?;
    let (target, intermediates) = match certs.split_first() {
        Some(split) => split,
        None => return Err(Error::ParseError),
    };
    debug!(
        "Validating {} with {} intermediates",
        target.locator,
        intermediates.len()
    );
    let input = PathValidationInput::new(target)
        .with_intermediates(intermediates)
        .with_hostname(HOSTNAME)
        .with_usage(Usage::TlsServerAuth);
    let mut result = x509_path_validate(pe, restrictions, store, &input);
    result.require_anchor(root);
    Ok(result)
}

/// `load_root` reads root.pem from the folder.
pub fn load_root(folder: &str) -> Result<ParsedCertificate> {
    let root_path = Path::new(folder).join(ROOT_FILENAME);
    let buffer = get_file_as_byte_vec(&root_path)?;
    parse_cert_buffer(&buffer, &root_path.to_string_lossy())
}

/// `run_x509test` validates each bundle listed in `expected` and records the outcome in `stats`.
pub fn run_x509test(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    folder: &str,
    expected: &[ExpectedResult],
    stats: &mut Stats,
) -> Result<()> {
    let root = load_root(folder)?;
    let mut store = MemoryStore::new();
    store.add_trust_anchor(root.clone());

    for e in expected {
        let bundle = Path::new(folder).join(&e.identifier);
        let observed = match validate_bundle(pe, restrictions, &store, &root, &bundle) {
            Ok(result) => result.result_string().to_string(),
            Err(err) => {
                error!("Failed to run {}: {}", e.identifier, err);
                format!("ERROR ({})", err)
            }
        };
        stats.record(&e.identifier, &e.status, &observed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOLDER: &str = "tests/examples/x509test";

    #[test]
    fn split_pem_bundle_test() {
        let contents = "junk\n-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n\
                        -----BEGIN CERTIFICATE-----\nBBBB\n";
        let blocks = split_pem_bundle(contents);
        assert_eq!(1, blocks.len());
        assert!(blocks[0].contains("AAAA"));
    }

    #[test]
    fn bundles() {
        let mut pe = PkiEnvironment::default();
        pe.populate_default();
        let r = Restrictions::new(DEFAULT_MIN_KEY_STRENGTH, false, 1893456000);
        let root = load_root(FOLDER).unwrap();
        let mut store = MemoryStore::new();
        store.add_trust_anchor(root.clone());

        let cases = [
            ("valid.pem", StatusCode::Ok),
            ("garbage.pem", StatusCode::Ok),
            ("nomatch.pem", StatusCode::HostnameMismatch),
            ("otherroot.pem", StatusCode::CannotEstablishTrust),
        ];
        for (bundle, expected) in cases {
            let path = Path::new(FOLDER).join(bundle);
            let result = validate_bundle(&pe, &r, &store, &root, &path).unwrap();
            assert_eq!(expected, result.overall_status, "{}", bundle);
        }

        assert_eq!(2, read_bundle(&Path::new(FOLDER).join("garbage.pem")).unwrap().len());
        assert!(read_bundle(&Path::new(FOLDER).join("expected.txt")).is_err());
    }
}
