use certpath::*;

const TOI: u64 = 1893456000;

fn setup() -> (PkiEnvironment, MemoryStore) {
    let mut pe = PkiEnvironment::default();
    pe.populate_default();
    let mut store = MemoryStore::new();
    store
        .add_trust_anchor_buffer(include_bytes!("examples/root.der"), "root.der")
        .unwrap();
    store
        .add_certificate_buffer(include_bytes!("examples/int.der"), "int.der")
        .unwrap();
    for crl in crl_folder_to_vec("tests/examples").unwrap() {
        store.add_crl(crl);
    }
    (pe, store)
}

#[test]
fn revoked_end_entity() {
    let (pe, store) = setup();
    let ee = parse_cert(include_bytes!("examples/ee_revoked.der"), "ee_revoked.der").unwrap();
    let input = PathValidationInput::new(&ee).with_hostname("revoked.tls.test");

    for require in [false, true] {
        let result = x509_path_validate(&pe, &Restrictions::new(110, require, TOI), &store, &input);
        assert_eq!(StatusCode::CertRevoked, result.overall_status);
        assert!(result.cert_statuses[0].contains(&StatusCode::CertRevoked));
    }

    // revocation is not in effect before the revocation date (and the CRL is not yet valid)
    let result =
        x509_path_validate(&pe, &Restrictions::new(110, false, 1735689600), &store, &input);
    assert!(result.successful());
    assert!(result.has_status(StatusCode::RevocationNotChecked));
}

#[test]
fn anchor_revocation() {
    let (pe, store) = setup();
    let ee = parse_cert(include_bytes!("examples/ee.der"), "ee.der").unwrap();
    let input = PathValidationInput::new(&ee);
    let mut r = Restrictions::new(110, true, TOI);
    r.check_anchor_revocation = true;
    let result = x509_path_validate(&pe, &r, &store, &input);
    assert!(result.successful());
    assert_eq!(3, result.cert_statuses.len());
    assert!(result
        .cert_statuses
        .iter()
        .all(|s| s.contains(&StatusCode::ValidCrlChecked)));
}

#[test]
fn pem_crl() {
    let (pe, _) = setup();
    let mut store = MemoryStore::new();
    store
        .add_trust_anchor_buffer(include_bytes!("examples/root.der"), "root.der")
        .unwrap();
    store
        .add_certificate_buffer(include_bytes!("examples/int.der"), "int.der")
        .unwrap();
    let pem = pem_rfc7468::encode_string(
        "X509 CRL",
        pem_rfc7468::LineEnding::LF,
        include_bytes!("examples/int.crl"),
    )
    .unwrap();
    store.add_crl_buffer(pem.as_bytes(), "int.pem").unwrap();

    let ee = parse_cert(include_bytes!("examples/ee_revoked.der"), "ee_revoked.der").unwrap();
    let result = x509_path_validate(
        &pe,
        &Restrictions::new(110, false, TOI),
        &store,
        &PathValidationInput::new(&ee),
    );
    assert_eq!("CERT_REVOKED", result.result_string());
}

#[test]
fn stray_crl() {
    let (pe, mut store) = setup();
    store
        .add_crl_buffer(include_bytes!("examples/extra/int_decoy.crl"), "int_decoy.crl")
        .unwrap();
    let ee = parse_cert(include_bytes!("examples/ee.der"), "ee.der").unwrap();
    let input = PathValidationInput::new(&ee);

    for require in [false, true] {
        let result = x509_path_validate(&pe, &Restrictions::new(110, require, TOI), &store, &input);
        assert!(result.successful());
        assert!(!result.has_status(StatusCode::CrlBadSignature));
        assert!(result.cert_statuses[0].contains(&StatusCode::ValidCrlChecked));
    }
}
