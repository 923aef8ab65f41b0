use certpath::*;

const TOI: u64 = 1893456000;

fn pe() -> PkiEnvironment {
    let mut pe = PkiEnvironment::default();
    pe.populate_default();
    pe
}

fn load(name: &str) -> ParsedCertificate {
    let path = format!("tests/examples/{}", name);
    let buffer = get_file_as_byte_vec(std::path::Path::new(&path)).unwrap();
    parse_cert(&buffer, name).unwrap()
}

fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_trust_anchor(load("root.der"));
    store.add_trust_anchor(load("ec_root.der"));
    for c in ["int.der", "pl0_ca.der", "pl0_sub.der", "nc_ca.der"] {
        store.add_certificate(load(c));
    }
    for crl in crl_folder_to_vec("tests/examples").unwrap() {
        store.add_crl(crl);
    }
    store
}

fn validate(ee: &str, hostname: Option<&str>, usage: Usage) -> ValidationResult {
    let ee = load(ee);
    let mut input = PathValidationInput::new(&ee).with_usage(usage);
    if let Some(h) = hostname {
        input = input.with_hostname(h);
    }
    x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store(), &input)
}

#[test]
fn expected_statuses() {
    let cases = [
        ("ee.der", Some("www.tls.test"), Usage::TlsServerAuth, "OK"),
        ("ee.der", Some("mail.tls.test"), Usage::TlsServerAuth, "CERT_NAME_NOMATCH"),
        ("ee_revoked.der", None, Usage::TlsServerAuth, "CERT_REVOKED"),
        ("ee_expired.der", None, Usage::Unspecified, "EXPIRED"),
        ("ee_client.der", Some("www.tls.test"), Usage::TlsServerAuth, "USAGE_MISMATCH"),
        ("ee_client.der", None, Usage::TlsClientAuth, "OK"),
        ("ee_weak.der", None, Usage::Unspecified, "INSUFFICIENT_KEY_STRENGTH"),
        ("ee_sha1.der", None, Usage::Unspecified, "UNTRUSTED_HASH"),
        ("ee_crit.der", None, Usage::Unspecified, "UNSUPPORTED_CRITICAL_EXTENSION"),
        ("pl0_ee.der", Some("www.tls.test"), Usage::TlsServerAuth, "PATH_LENGTH_EXCEEDED"),
        ("nc_good.der", Some("host.example.com"), Usage::Unspecified, "OK"),
        ("nc_bad.der", None, Usage::Unspecified, "NAME_CONSTRAINT_VIOLATION"),
        ("orphan.der", None, Usage::Unspecified, "CERT_ISSUER_NOT_FOUND"),
    ];
    for (ee, hostname, usage, expected) in cases {
        let result = validate(ee, hostname, usage);
        assert_eq!(expected, result.result_string(), "{}", ee);
    }
}

#[test]
fn ec_path() {
    // no CRL for the EC root, so revocation is left optional
    let ee = load("ec_ee.der");
    let input = PathValidationInput::new(&ee)
        .with_hostname("www.tls.test")
        .with_usage(Usage::TlsServerAuth);
    let result = x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store(), &input);
    assert!(result.successful());
    assert_eq!("ec_root.der", result.trust_anchor().unwrap().locator);
    assert!(result.cert_statuses[0].contains(&StatusCode::RevocationNotChecked));
}

#[test]
fn untrusted_root() {
    let ee = load("orphan.der");
    let intermediates = vec![load("other_int.der"), load("other_root.der")];
    let input = PathValidationInput::new(&ee).with_intermediates(&intermediates);
    let result = x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store(), &input);
    assert_eq!("CANNOT_ESTABLISH_TRUST", result.result_string());
    assert!(result.path.is_none());
}

#[test]
fn bundled_intermediates() {
    let mut store = MemoryStore::new();
    store.add_trust_anchor(load("root.der"));
    let ee = load("ee.der");
    let intermediates = vec![load("int.der")];
    let input = PathValidationInput::new(&ee)
        .with_intermediates(&intermediates)
        .with_hostname("www.tls.test")
        .with_usage(Usage::TlsServerAuth);
    let result = x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store, &input);
    assert!(result.successful());

    let result = x509_path_validate(&pe(), &Restrictions::new(110, true, TOI), &store, &input);
    assert_eq!("NO_REVOCATION_DATA", result.result_string());
}

#[test]
fn crl_not_yet_valid() {
    let ee = load("ee.der");
    let input = PathValidationInput::new(&ee);
    let result = x509_path_validate(
        &pe(),
        &Restrictions::new(110, true, 1735689600),
        &store(),
        &input,
    );
    assert_eq!("CRL_NOT_YET_VALID", result.result_string());
}

#[test]
fn anchor_post_check() {
    let ee = load("ee.der");
    let input = PathValidationInput::new(&ee).with_hostname("www.tls.test");
    let mut result =
        x509_path_validate(&pe(), &Restrictions::new(110, true, TOI), &store(), &input);
    assert!(result.successful());
    result.require_anchor(&load("root.der"));
    assert!(result.successful());
    result.require_anchor(&load("other_root.der"));
    assert_eq!("CANNOT_ESTABLISH_TRUST", result.result_string());
}

#[test]
fn deterministic_results() {
    let first = validate("ee_revoked.der", None, Usage::TlsServerAuth);
    for _ in 0..5 {
        let again = validate("ee_revoked.der", None, Usage::TlsServerAuth);
        assert_eq!(first.overall_status, again.overall_status);
        assert_eq!(first.cert_statuses, again.cert_statuses);
        assert_eq!(first.chain_statuses, again.chain_statuses);
    }
}

fn assert_unique_subjects(built: &BuildResult) {
    for path in &built.paths {
        let mut seen = std::collections::BTreeSet::new();
        for c in &path.certificates {
            assert!(seen.insert(c.subject_id.clone()), "{}", c.locator);
        }
        assert!(seen.insert(path.trust_anchor.subject_id.clone()));
    }
}

#[test]
fn paths_are_cycle_free() {
    let mut store = store();
    store.add_certificate(load("extra/int_rollover.der"));
    for ee in ["pl0_ee.der", "ee.der", "nc_good.der", "extra/int_rollover.der"] {
        let built = build_paths(&pe(), &Restrictions::default(), &store, &load(ee), &[]);
        assert_unique_subjects(&built);
    }

    let built = build_paths(&pe(), &Restrictions::default(), &store, &load("pl0_ee.der"), &[]);
    assert_eq!(1, built.paths.len());
    assert_eq!(3, built.paths[0].len());
}

#[test]
fn cross_certified_cas() {
    let ee = load("extra/cross_ee.der");
    let cas = vec![load("extra/cross_a.der"), load("extra/cross_b.der")];
    let built = build_paths(&pe(), &Restrictions::default(), &store(), &ee, &cas);
    assert!(built.paths.is_empty());
    assert!(built.dead_ends.contains(&StatusCode::ChainCycleDetected));

    let input = PathValidationInput::new(&ee).with_intermediates(&cas);
    let result = x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store(), &input);
    assert_eq!("CHAIN_CYCLE_DETECTED", result.result_string());
    assert!(result.path.is_none());

    // the same cycle reached through the store rather than the supplied intermediates
    let mut store = store();
    for c in cas {
        store.add_certificate(c);
    }
    let input = PathValidationInput::new(&ee);
    let result = x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store, &input);
    assert_eq!(StatusCode::ChainCycleDetected, result.overall_status);
}

#[test]
fn rollover_certificate() {
    let rollover = load("extra/int_rollover.der");
    let input = PathValidationInput::new(&rollover);
    let result = x509_path_validate(&pe(), &Restrictions::new(110, false, TOI), &store(), &input);
    assert_eq!(StatusCode::ChainCycleDetected, result.overall_status);
}

#[test]
fn concurrent_validation() {
    let shared = std::sync::Arc::new(SharedStore::from_store(store()));
    let mut handles = vec![];
    for _ in 0..4 {
        let shared = shared.clone();
        handles.push(std::thread::spawn(move || {
            let snapshot = shared.snapshot();
            let ee = load("ee.der");
            let input = PathValidationInput::new(&ee).with_hostname("www.tls.test");
            x509_path_validate(&pe(), &Restrictions::new(110, true, TOI), snapshot.as_ref(), &input)
                .overall_status
        }));
    }
    shared.add_certificate(load("other_int.der")).unwrap();
    for h in handles {
        assert_eq!(StatusCode::Ok, h.join().unwrap());
    }
}
