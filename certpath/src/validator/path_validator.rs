//! Functions related to checking the constraints of a certification path

use alloc::collections::BTreeSet;

use const_oid::db::rfc5280::ANY_POLICY;
use der::asn1::ObjectIdentifier;
use log::debug;
use x509_cert::ext::pkix::KeyUsages;

use crate::{
    environment::pki_environment::*, path_results::*, path_settings::*, pdv_certificate::*,
    util::error::*, util::pdv_utilities::*, CertificationPath, NameConstraintsSet,
};

/// `signature_status` maps an error from signature verification to the status code it represents.
pub fn signature_status(e: &Error) -> StatusCode {
    match e {
        Error::PathValidation(code) => *code,
        Error::Unrecognized => StatusCode::SignatureAlgorithmUnknown,
        _ => StatusCode::SignatureError,
    }
}

/// `check_validity` records NOT_YET_VALID or EXPIRED when the certificate is not valid at the time of
/// interest.
fn check_validity(cert: &ParsedCertificate, toi: u64, statuses: &mut BTreeSet<StatusCode>) {
    if let Err(Error::PathValidation(code)) = valid_at_time(cert, toi, false) {
        statuses.insert(code);
    }
}

fn check_key_strength(
    cert: &ParsedCertificate,
    restrictions: &Restrictions,
    statuses: &mut BTreeSet<StatusCode>,
) {
    // keys of unrecognized type have no estimate and are not subject to the floor
    if let Some(strength) = cert.public_key.strength {
        if strength.security_bits < restrictions.min_key_strength {
            log_error_for_cert(
                cert,
                format!(
                    "public key offers {} bits of security, which is less than the minimum of {}",
                    strength.security_bits, restrictions.min_key_strength
                )
                .as_str(),
            );
            statuses.insert(StatusCode::InsufficientKeyStrength);
        }
    }
}

fn check_critical_extensions(cert: &ParsedCertificate, statuses: &mut BTreeSet<StatusCode>) {
    for oid in &cert.unsupported_critical_extensions {
        log_error_for_cert(
            cert,
            format!("unsupported critical extension: {}", oid).as_str(),
        );
        statuses.insert(StatusCode::UnsupportedCriticalExtension);
    }
}

fn check_hash(
    cert: &ParsedCertificate,
    restrictions: &Restrictions,
    statuses: &mut BTreeSet<StatusCode>,
) {
    let hash_name = get_hash_alg_from_sig_alg(&cert.signature_algorithm.oid)
        .ok()
        .and_then(|h| get_hash_name(&h.oid));
    match hash_name {
        Some(name) if restrictions.is_hash_trusted(name) => {}
        _ => {
            log_error_for_cert(cert, "signature uses a hash algorithm that is not trusted");
            statuses.insert(StatusCode::UntrustedHash);
        }
    }
}

/// Returns true if the issuer may sign certificates. The keyCertSign bit is required when a key
/// usage extension is present.
fn issuer_can_sign(issuer: &ParsedCertificate) -> bool {
    let ku_ok = match &issuer.key_usage {
        Some(ku) => ku.contains(KeyUsages::KeyCertSign),
        None => true,
    };
    issuer.is_ca && ku_ok
}

fn check_hostname(cert: &ParsedCertificate, hostname: &str) -> bool {
    let names = if cert.dns_names.is_empty() {
        cert.common_names()
    } else {
        cert.dns_names.clone()
    };
    names.iter().any(|n| hostname_matches(n, hostname))
}

/// Intersects the valid policy set with the policies asserted by a certificate. anyPolicy in either
/// set acts as a wildcard.
fn intersect_policies(
    valid: &BTreeSet<ObjectIdentifier>,
    asserted: &[ObjectIdentifier],
) -> BTreeSet<ObjectIdentifier> {
    let asserted: BTreeSet<ObjectIdentifier> = asserted.iter().copied().collect();
    if valid.contains(&ANY_POLICY) {
        asserted
    } else if asserted.contains(&ANY_POLICY) {
        valid.clone()
    } else {
        valid.intersection(&asserted).copied().collect()
    }
}

/// `validate_path` checks the structural, temporal, cryptographic, usage, name and policy
/// constraints of a certification path, walking from the trust anchor toward the target, and
/// returns a [`ValidationResult`] that records each finding.
///
/// - The trust anchor's validity period is checked but its signature is not.
/// - A signature failure is fatal for the path: the failing certificate's code is recorded and the
/// certificates below it are not checked.
/// - Usage and hostname checks apply to the target only.
/// - Revocation status is not checked here (see [`check_revocation`](crate::check_revocation)).
pub fn validate_path(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    path: CertificationPath,
    hostname: Option<&str>,
    usage: Usage,
) -> ValidationResult {
    let n = path.len();
    let toi = restrictions.time_of_interest;
    let mut cert_statuses: Vec<BTreeSet<StatusCode>> = vec![BTreeSet::new(); n + 1];
    let mut chain_statuses: BTreeSet<StatusCode> = BTreeSet::new();

    let anchor = &path.trust_anchor;
    check_validity(anchor, toi, &mut cert_statuses[n]);
    check_key_strength(anchor, restrictions, &mut cert_statuses[n]);
    check_critical_extensions(anchor, &mut cert_statuses[n]);

    let mut permitted = NameConstraintsSet::default();
    let mut excluded = NameConstraintsSet::default();
    if let Some(nc) = &anchor.name_constraints {
        if let Some(p) = &nc.permitted_subtrees {
            permitted.calculate_intersection(p);
        }
        if let Some(e) = &nc.excluded_subtrees {
            excluded.calculate_union(e);
        }
    }

    let mut policy_processing = restrictions.policy_processing;
    let mut valid_policies: BTreeSet<ObjectIdentifier> = BTreeSet::new();
    if policy_processing {
        match restrictions.get_initial_policy_set() {
            Ok(initial) if !initial.is_empty() => valid_policies.extend(initial),
            Ok(_) => {
                valid_policies.insert(ANY_POLICY);
            }
            Err(_e) => {
                chain_statuses.insert(StatusCode::PolicyConstraintViolation);
                policy_processing = false;
            }
        }
    }

    let mut path_len_budget = anchor.path_len_constraint;

    for i in (0..n).rev() {
        let cert = &path.certificates[i];
        let issuer_index = i + 1;
        let issuer_is_anchor = issuer_index == n;
        let issuer = if issuer_is_anchor {
            anchor
        } else {
            &path.certificates[issuer_index]
        };
        let is_target = i == 0;

        check_validity(cert, toi, &mut cert_statuses[i]);

        if let Err(e) = pe.verify_signature_message(
            &cert.tbs,
            &cert.signature,
            &cert.signature_algorithm,
            &issuer.public_key.spki,
        ) {
            let code = signature_status(&e);
            log_error_for_cert(
                cert,
                format!("signature verification failed: {}", code).as_str(),
            );
            cert_statuses[i].insert(code);
            break;
        }

        check_hash(cert, restrictions, &mut cert_statuses[i]);

        let non_ca_anchor_ok =
            issuer_is_anchor && issuer.self_issued && restrictions.allow_non_ca_anchor;
        if !non_ca_anchor_ok && !issuer_can_sign(issuer) {
            log_error_for_cert(issuer, "issuer is not a CA or lacks keyCertSign");
            cert_statuses[issuer_index].insert(StatusCode::CaFlagMissing);
        }

        if !is_target {
            if !cert.self_issued {
                match path_len_budget {
                    Some(0) => {
                        log_error_for_cert(cert, "path length constraint violation");
                        cert_statuses[i].insert(StatusCode::PathLengthExceeded);
                    }
                    Some(b) => path_len_budget = Some(b - 1),
                    None => {}
                }
            }
            if let Some(pl) = cert.path_len_constraint {
                path_len_budget = Some(match path_len_budget {
                    Some(b) => b.min(pl),
                    None => pl,
                });
            }
        }

        // self-issued intermediates are exempt from name constraints
        if is_target || !cert.self_issued {
            if !permitted.permits_certificate(cert) || excluded.excludes_certificate(cert) {
                cert_statuses[i].insert(StatusCode::NameConstraintViolation);
            }
        }
        if !is_target {
            if let Some(nc) = &cert.name_constraints {
                if let Some(p) = &nc.permitted_subtrees {
                    for gs in p {
                        debug!(
                            "Permitted subtree from {}: {}",
                            cert.locator,
                            general_subtree_to_string(gs)
                        );
                    }
                    permitted.calculate_intersection(p);
                }
                if let Some(e) = &nc.excluded_subtrees {
                    for gs in e {
                        debug!(
                            "Excluded subtree from {}: {}",
                            cert.locator,
                            general_subtree_to_string(gs)
                        );
                    }
                    excluded.calculate_union(e);
                }
            }
        }

        if is_target {
            if !usage.permits(&cert.ext_key_usage, &cert.key_usage) {
                log_error_for_cert(cert, format!("usage violation for {:?}", usage).as_str());
                cert_statuses[i].insert(StatusCode::UsageMismatch);
            }
            if let Some(hostname) = hostname {
                if !check_hostname(cert, hostname) {
                    log_error_for_cert(
                        cert,
                        format!("certificate does not match hostname {}", hostname).as_str(),
                    );
                    cert_statuses[i].insert(StatusCode::HostnameMismatch);
                }
            }
        }

        if policy_processing {
            valid_policies = match &cert.policies {
                Some(asserted) => intersect_policies(&valid_policies, asserted),
                None => BTreeSet::new(),
            };
            if valid_policies.is_empty() {
                log_error_for_cert(cert, "valid policy set is empty");
                chain_statuses.insert(StatusCode::PolicyConstraintViolation);
                policy_processing = false;
            }
        }

        check_key_strength(cert, restrictions, &mut cert_statuses[i]);
        check_critical_extensions(cert, &mut cert_statuses[i]);
    }

    ValidationResult::new(path, cert_statuses, chain_statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_cert;

    const TOI: u64 = 1893456000;

    fn pe() -> PkiEnvironment {
        let mut pe = PkiEnvironment::default();
        pe.populate_default();
        pe
    }

    fn load(name: &str, buffer: &[u8]) -> ParsedCertificate {
        parse_cert(buffer, name).unwrap()
    }

    fn rsa_path(ee: ParsedCertificate) -> CertificationPath {
        let root = load("root.der", include_bytes!("../../tests/examples/root.der"));
        let int = load("int.der", include_bytes!("../../tests/examples/int.der"));
        CertificationPath::new(root, vec![ee, int])
    }

    #[test]
    fn valid_path() {
        let ee = load("ee.der", include_bytes!("../../tests/examples/ee.der"));
        let r = Restrictions::new(110, false, TOI);
        let result = validate_path(
            &pe(),
            &r,
            rsa_path(ee),
            Some("www.tls.test"),
            Usage::TlsServerAuth,
        );
        assert!(result.successful());
        assert_eq!(3, result.cert_statuses.len());
    }

    #[test]
    fn hostname_and_usage() {
        let ee = load("ee.der", include_bytes!("../../tests/examples/ee.der"));
        let r = Restrictions::new(110, false, TOI);
        let result = validate_path(
            &pe(),
            &r,
            rsa_path(ee),
            Some("other.tls.test"),
            Usage::TlsServerAuth,
        );
        assert_eq!("CERT_NAME_NOMATCH", result.result_string());
        assert!(result.cert_statuses[0].contains(&StatusCode::HostnameMismatch));

        let client = load("ee_client.der", include_bytes!("../../tests/examples/ee_client.der"));
        let result = validate_path(&pe(), &r, rsa_path(client.clone()), None, Usage::TlsServerAuth);
        assert_eq!(StatusCode::UsageMismatch, result.overall_status);
        let result = validate_path(&pe(), &r, rsa_path(client), None, Usage::TlsClientAuth);
        assert!(result.successful());
    }

    #[test]
    fn wrong_issuer_signature() {
        let root = load("root.der", include_bytes!("../../tests/examples/root.der"));
        let ee = load("ee.der", include_bytes!("../../tests/examples/ee.der"));
        let r = Restrictions::new(110, false, TOI);
        // ee was not signed by root, so the signature check fails and nothing below is checked
        let result = validate_path(
            &pe(),
            &r,
            CertificationPath::new(root, vec![ee]),
            Some("nomatch"),
            Usage::Unspecified,
        );
        assert_eq!(StatusCode::SignatureError, result.overall_status);
        assert!(!result.has_status(StatusCode::HostnameMismatch));

        let empty = PkiEnvironment::new();
        let ee = load("ee.der", include_bytes!("../../tests/examples/ee.der"));
        let result = validate_path(&empty, &r, rsa_path(ee), None, Usage::Unspecified);
        assert_eq!(StatusCode::SignatureAlgorithmUnknown, result.overall_status);
    }

    #[test]
    fn path_length() {
        let root = load("root.der", include_bytes!("../../tests/examples/root.der"));
        let pl0 = load("pl0_ca.der", include_bytes!("../../tests/examples/pl0_ca.der"));
        let sub = load("pl0_sub.der", include_bytes!("../../tests/examples/pl0_sub.der"));
        let ee = load("pl0_ee.der", include_bytes!("../../tests/examples/pl0_ee.der"));
        let r = Restrictions::new(110, false, TOI);
        let result = validate_path(
            &pe(),
            &r,
            CertificationPath::new(root, vec![ee, sub, pl0]),
            None,
            Usage::TlsServerAuth,
        );
        assert_eq!("PATH_LENGTH_EXCEEDED", result.result_string());
        assert!(result.cert_statuses[1].contains(&StatusCode::PathLengthExceeded));
    }

    #[test]
    fn policy_processing() {
        let ee = load("ee.der", include_bytes!("../../tests/examples/ee.der"));
        let mut r = Restrictions::new(110, false, TOI);
        r.policy_processing = true;
        let result = validate_path(&pe(), &r, rsa_path(ee), None, Usage::Unspecified);
        assert_eq!(StatusCode::PolicyConstraintViolation, result.overall_status);
        assert!(result.chain_statuses.contains(&StatusCode::PolicyConstraintViolation));

        let a = ObjectIdentifier::new_unwrap("1.2.3.1");
        let b = ObjectIdentifier::new_unwrap("1.2.3.2");
        let mut valid = BTreeSet::new();
        valid.insert(ANY_POLICY);
        let valid = intersect_policies(&valid, &[a, b]);
        assert_eq!(2, valid.len());
        let valid = intersect_policies(&valid, &[ANY_POLICY]);
        assert_eq!(2, valid.len());
        let valid = intersect_policies(&valid, &[b]);
        assert_eq!(1, valid.len());
        assert!(intersect_policies(&valid, &[a]).is_empty());
    }

    #[test]
    fn per_certificate_checks() {
        let r = Restrictions::new(110, false, TOI);
        let cases: [(&str, &[u8], StatusCode); 4] = [
            (
                "ee_weak.der",
                include_bytes!("../../tests/examples/ee_weak.der"),
                StatusCode::InsufficientKeyStrength,
            ),
            (
                "ee_sha1.der",
                include_bytes!("../../tests/examples/ee_sha1.der"),
                StatusCode::UntrustedHash,
            ),
            (
                "ee_crit.der",
                include_bytes!("../../tests/examples/ee_crit.der"),
                StatusCode::UnsupportedCriticalExtension,
            ),
            (
                "ee_expired.der",
                include_bytes!("../../tests/examples/ee_expired.der"),
                StatusCode::Expired,
            ),
        ];
        for (name, buffer, expected) in cases {
            let result =
                validate_path(&pe(), &r, rsa_path(load(name, buffer)), None, Usage::Unspecified);
            assert_eq!(expected, result.overall_status, "{}", name);
            assert!(result.cert_statuses[0].contains(&expected));
        }

        // an 80-bit floor admits both the weak key and SHA-1
        let r = Restrictions::new(80, false, TOI);
        let weak = load("ee_weak.der", include_bytes!("../../tests/examples/ee_weak.der"));
        assert!(validate_path(&pe(), &r, rsa_path(weak), None, Usage::Unspecified).successful());
        let sha1 = load("ee_sha1.der", include_bytes!("../../tests/examples/ee_sha1.der"));
        assert!(validate_path(&pe(), &r, rsa_path(sha1), None, Usage::Unspecified).successful());
    }

    #[test]
    fn name_constraints() {
        let root = load("root.der", include_bytes!("../../tests/examples/root.der"));
        let nc_ca = load("nc_ca.der", include_bytes!("../../tests/examples/nc_ca.der"));
        let good = load("nc_good.der", include_bytes!("../../tests/examples/nc_good.der"));
        let bad = load("nc_bad.der", include_bytes!("../../tests/examples/nc_bad.der"));
        let r = Restrictions::new(110, false, TOI);
        let path = CertificationPath::new(root.clone(), vec![good, nc_ca.clone()]);
        assert!(validate_path(&pe(), &r, path, None, Usage::Unspecified).successful());
        let path = CertificationPath::new(root, vec![bad, nc_ca]);
        let result = validate_path(&pe(), &r, path, None, Usage::Unspecified);
        assert_eq!("NAME_CONSTRAINT_VIOLATION", result.result_string());
    }
}
