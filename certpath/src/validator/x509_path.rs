//! Top level certification path building, validation and revocation checking

use log::{debug, info};

use crate::{
    build_paths, check_revocation, environment::pki_environment::PkiEnvironment,
    environment::pki_environment_traits::CertificateStore, path_results::*, path_settings::*,
    validate_path, ParsedCertificate, StatusCode,
};

/// `PathValidationInput` carries the per-call inputs to [`x509_path_validate`].
#[derive(Clone, Debug)]
pub struct PathValidationInput<'a> {
    /// Certificate to validate
    pub end_entity: &'a ParsedCertificate,
    /// Intermediate CA certificates supplied alongside the end entity, i.e., from a TLS handshake
    pub intermediates: &'a [ParsedCertificate],
    /// Hostname the end entity is expected to match, if any
    pub hostname: Option<&'a str>,
    /// Intended usage of the end entity's key
    pub usage: Usage,
    /// Trust anchor to favor when branches are otherwise equivalent
    pub preferred_anchor: Option<&'a ParsedCertificate>,
}

impl<'a> PathValidationInput<'a> {
    /// Creates input for validating `end_entity` with no intermediates, hostname, usage or preferred
    /// anchor.
    pub fn new(end_entity: &'a ParsedCertificate) -> Self {
        PathValidationInput {
            end_entity,
            intermediates: &[],
            hostname: None,
            usage: Usage::Unspecified,
            preferred_anchor: None,
        }
    }

    /// Sets the intermediates supplied alongside the end entity
    pub fn with_intermediates(mut self, intermediates: &'a [ParsedCertificate]) -> Self {
        self.intermediates = intermediates;
        self
    }

    /// Sets the hostname
    pub fn with_hostname(mut self, hostname: &'a str) -> Self {
        self.hostname = Some(hostname);
        self
    }

    /// Sets the intended usage
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Sets the preferred trust anchor
    pub fn with_preferred_anchor(mut self, anchor: &'a ParsedCertificate) -> Self {
        self.preferred_anchor = Some(anchor);
        self
    }
}

/// `x509_path_validate` builds every certification path from the end entity to a trust anchor in
/// `store`, checks each one, determines revocation status for each path that passed signature
/// verification, and returns the result of the branch with the least severe overall status.
///
/// A [`ValidationResult`] is always returned. Branches that end before reaching a trust anchor are
/// only reported when no path can be built, in which case the result carries the chain-level status
/// of the least severe dead end and no path.
///
/// ```
/// use certpath::*;
///
/// let mut pe = PkiEnvironment::default();
/// pe.populate_default();
///
/// let mut store = MemoryStore::new();
/// store.add_trust_anchor_buffer(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
/// store.add_certificate_buffer(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
/// store.add_crl_buffer(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap();
/// store.add_crl_buffer(include_bytes!("../../tests/examples/root.crl"), "root.crl").unwrap();
///
/// let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();
/// let input = PathValidationInput::new(&ee)
///     .with_hostname("www.tls.test")
///     .with_usage(Usage::TlsServerAuth);
/// let restrictions = Restrictions::new(110, true, 1893456000);
///
/// let result = x509_path_validate(&pe, &restrictions, &store, &input);
/// assert!(result.successful());
/// assert_eq!("root.der", result.trust_anchor().unwrap().locator);
/// ```
pub fn x509_path_validate(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    store: &dyn CertificateStore,
    input: &PathValidationInput<'_>,
) -> ValidationResult {
    let built = build_paths(
        pe,
        restrictions,
        store,
        input.end_entity,
        input.intermediates,
    );
    debug!(
        "Found {} paths and {} dead ends for {}",
        built.paths.len(),
        built.dead_ends.len(),
        input.end_entity.locator
    );

    let mut results = vec![];
    for path in built.paths {
        let mut result = validate_path(pe, restrictions, path, input.hostname, input.usage);
        let signatures_ok = !result.has_status(StatusCode::SignatureError)
            && !result.has_status(StatusCode::SignatureAlgorithmUnknown)
            && !result.has_status(StatusCode::PublicKeyInvalid);
        if signatures_ok {
            let statuses = match &result.path {
                Some(p) => check_revocation(pe, restrictions, store, p),
                None => vec![],
            };
            for (index, code) in statuses {
                result.add_cert_status(index, code);
            }
        }
        info!(
            "Path to {} for {}: {}",
            result
                .trust_anchor()
                .map(|ta| ta.locator.as_str())
                .unwrap_or(""),
            input.end_entity.locator,
            result.result_string()
        );
        results.push(result);
    }
    for code in built.dead_ends {
        results.push(ValidationResult::from_chain_status(code));
    }

    select_result(results, input.preferred_anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_cert, parse_crl, MemoryStore};

    const TOI: u64 = 1893456000;

    fn pe() -> PkiEnvironment {
        let mut pe = PkiEnvironment::default();
        pe.populate_default();
        pe
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_trust_anchor(
            parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap(),
        );
        store.add_certificate(
            parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap(),
        );
        store.add_crl(
            parse_crl(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap(),
        );
        store.add_crl(
            parse_crl(include_bytes!("../../tests/examples/root.crl"), "root.crl").unwrap(),
        );
        store
    }

    #[test]
    fn revoked_end_entity() {
        let ee = parse_cert(include_bytes!("../../tests/examples/ee_revoked.der"), "ee_revoked.der")
            .unwrap();
        let input = PathValidationInput::new(&ee).with_hostname("revoked.tls.test");
        let r = Restrictions::new(110, true, TOI);
        let result = x509_path_validate(&pe(), &r, &store(), &input);
        assert_eq!("CERT_REVOKED", result.result_string());
        assert!(result.cert_statuses[0].contains(&StatusCode::CertRevoked));
        assert!(result.cert_statuses[1].contains(&StatusCode::ValidCrlChecked));
    }

    #[test]
    fn missing_issuer() {
        let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();
        let mut store = MemoryStore::new();
        store.add_trust_anchor(
            parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap(),
        );
        let result = x509_path_validate(
            &pe(),
            &Restrictions::new(110, false, TOI),
            &store,
            &PathValidationInput::new(&ee),
        );
        assert_eq!(StatusCode::IssuerNotFound, result.overall_status);
        assert!(result.path.is_none());
    }

    #[test]
    fn dead_end_alongside_failing_path() {
        let ee = parse_cert(include_bytes!("../../tests/examples/ee_expired.der"), "ee_expired.der")
            .unwrap();
        // same subject as int.der, no key identifiers and an issuer that is not in the store
        let stray = parse_cert(
            include_bytes!("../../tests/examples/extra/int_stray.der"),
            "int_stray.der",
        )
        .unwrap();
        let r = Restrictions::new(110, false, TOI);

        let result = x509_path_validate(&pe(), &r, &store(), &PathValidationInput::new(&ee));
        assert_eq!(StatusCode::Expired, result.overall_status);

        let intermediates = [stray];
        let input = PathValidationInput::new(&ee).with_intermediates(&intermediates);
        let result = x509_path_validate(&pe(), &r, &store(), &input);
        assert_eq!(StatusCode::Expired, result.overall_status);
        assert!(result.path.is_some());
        assert!(result.cert_statuses[0].contains(&StatusCode::Expired));
    }

    #[test]
    fn anchor_as_end_entity() {
        let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
        let result = x509_path_validate(
            &pe(),
            &Restrictions::new(110, false, TOI),
            &store(),
            &PathValidationInput::new(&root),
        );
        assert!(result.successful());
        assert_eq!(1, result.cert_statuses.len());
    }
}
