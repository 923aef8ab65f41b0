use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn no_args() {
    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.assert().failure();
}

#[test]
fn nist_folder() {
    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--nist-folder")
        .arg("tests/examples/nist")
        .arg("-i")
        .arg("1893456000");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASS revoked: CERT_REVOKED"))
        .stdout(predicate::str::contains("PASS missing_crl: NO_REVOCATION_DATA"))
        .stdout(predicate::str::contains("4 of 4 cases passed, 0 failed"));
}

#[test]
fn x509test_folder() {
    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--x509test-folder")
        .arg("tests/examples/x509test")
        .arg("-i")
        .arg("1893456000");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASS otherroot.pem: CANNOT_ESTABLISH_TRUST"))
        .stdout(predicate::str::contains("7 of 7 cases passed, 0 failed"));
}

#[test]
fn failing_case() {
    let mut results = tempfile::NamedTempFile::new().unwrap();
    results.write_all(b"valid.pem:EXPIRED\nexpired.pem:EXPIRED\n").unwrap();

    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--x509test-folder")
        .arg("tests/examples/x509test")
        .arg("-i")
        .arg("1893456000")
        .arg("--results")
        .arg(results.path());
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("FAIL valid.pem: expected EXPIRED, observed OK"))
        .stdout(predicate::str::contains("1 of 2 cases passed, 1 failed"));
}

#[test]
fn malformed_results() {
    let mut results = tempfile::NamedTempFile::new().unwrap();
    results.write_all(b"valid.pem\n").unwrap();

    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--x509test-folder")
        .arg("tests/examples/x509test")
        .arg("--results")
        .arg(results.path());
    cmd.assert().failure();
}

#[test]
fn settings_file() {
    // the CRLs are not yet valid at this time of interest
    let mut settings = tempfile::NamedTempFile::new().unwrap();
    settings.write_all(br#"{"min_key_strength": 112}"#).unwrap();
    let mut results = tempfile::NamedTempFile::new().unwrap();
    results.write_all(b"valid:CRL_NOT_YET_VALID\n").unwrap();

    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--nist-folder")
        .arg("tests/examples/nist")
        .arg("-i")
        .arg("1735689600")
        .arg("-s")
        .arg(settings.path())
        .arg("-r")
        .arg(results.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 of 1 cases passed, 0 failed"));
}

#[test]
fn nist_layout_in_temp_folder() {
    let dir = tempfile::tempdir().unwrap();
    let case = dir.path().join("case1");
    std::fs::create_dir(&case).unwrap();
    for f in ["end.crt", "int.crt", "root.crt", "int.crl", "root.crl"] {
        std::fs::copy(format!("tests/examples/nist/revoked/{}", f), case.join(f)).unwrap();
    }
    std::fs::write(dir.path().join("expected.txt"), "# copied\ncase1:CERT_REVOKED\n").unwrap();

    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--nist-folder")
        .arg(dir.path())
        .arg("-i")
        .arg("1893456000");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASS case1: CERT_REVOKED"));
}

#[test]
fn duplicate_results() {
    let mut results = tempfile::NamedTempFile::new().unwrap();
    results
        .write_all(b"valid.pem:EXPIRED\nvalid.pem:OK\n")
        .unwrap();

    let mut cmd = Command::cargo_bin("pvtt").unwrap();
    cmd.arg("--x509test-folder")
        .arg("tests/examples/x509test")
        .arg("-i")
        .arg("1893456000")
        .arg("--results")
        .arg(results.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASS valid.pem: OK"))
        .stdout(predicate::str::contains("1 of 1 cases passed, 0 failed"));
}
