use certpath::*;
use const_oid::db::rfc5280::ANY_POLICY;
use std::io::Write;

#[test]
fn restrictions_serialize_deserialize() {
    let r = Restrictions::default();
    let json_r = serde_json::to_string(&r).unwrap();
    let r_de: Restrictions = serde_json::from_slice(json_r.as_bytes()).unwrap();
    assert_eq!(r, r_de);
}

#[test]
fn read_restrictions_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = format!(
        r#"{{
            "min_key_strength": 80,
            "require_revocation": true,
            "time_of_interest": 1893456000,
            "policy_processing": true,
            "initial_policies": ["{}"],
            "max_depth": 4
        }}"#,
        ANY_POLICY
    );
    file.write_all(json.as_bytes()).unwrap();

    let r = read_restrictions(file.path().to_str()).unwrap();
    assert_eq!(80, r.min_key_strength);
    assert!(r.require_revocation);
    assert!(!r.check_anchor_revocation);
    assert_eq!(1893456000, r.time_of_interest);
    assert_eq!(4, r.max_depth);
    assert_eq!(vec![ANY_POLICY], r.get_initial_policy_set().unwrap());
    assert!(r.is_hash_trusted("SHA-1"));
}

#[test]
fn read_restrictions_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();
    assert_eq!(
        Err(Error::ParseError),
        read_restrictions(file.path().to_str())
    );

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(read_restrictions(missing.to_str()).is_err());

    let r = read_restrictions(None).unwrap();
    assert_eq!(DEFAULT_MIN_KEY_STRENGTH, r.min_key_strength);
    assert!(!r.is_hash_trusted("SHA-1"));
}

#[test]
fn restrictions_in_validation() {
    let mut pe = PkiEnvironment::default();
    pe.populate_default();
    let mut store = MemoryStore::new();
    for ta in cert_folder_to_vec("tests/examples", &[]).unwrap() {
        if ta.locator.ends_with("root.der") && !ta.locator.ends_with("other_root.der") {
            store.add_trust_anchor(ta);
        } else if ta.is_ca {
            store.add_certificate(ta);
        }
    }
    let ee = parse_cert(include_bytes!("examples/ee_weak.der"), "ee_weak.der").unwrap();
    let input = PathValidationInput::new(&ee);

    let strict = Restrictions::new(110, false, 1893456000);
    let result = x509_path_validate(&pe, &strict, &store, &input);
    assert_eq!("INSUFFICIENT_KEY_STRENGTH", result.result_string());

    let lenient: Restrictions =
        serde_json::from_str(r#"{"min_key_strength": 80, "time_of_interest": 1893456000}"#)
            .unwrap();
    let result = x509_path_validate(&pe, &lenient, &store, &input);
    assert!(result.successful());
}
