//! Top level revocation status determination for a certification path

use log::{debug, info};

use crate::{
    environment::pki_environment_traits::CertificateStore, path_settings::Restrictions,
    revocation::crl::*, CertificationPath, ParsedCertificate, PkiEnvironment, StatusCode,
};

/// `check_certificate` determines the revocation status of `target` using the CRLs in `store` that
/// were issued by `issuer`.
///
/// Findings from discarded CRLs are returned only when no usable CRL was found and revocation status
/// is required.
pub fn check_certificate(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    store: &dyn CertificateStore,
    target: &ParsedCertificate,
    issuer: &ParsedCertificate,
) -> Vec<StatusCode> {
    let toi = restrictions.time_of_interest;
    let mut discarded = vec![];
    let mut time_finding: Option<StatusCode> = None;
    let mut applicable = false;

    for crl in store.find_crls_by_issuer(&target.issuer) {
        match process_crl(pe, toi, target, issuer, crl) {
            CrlOutcome::Revoked => return vec![StatusCode::CertRevoked],
            CrlOutcome::NotRevoked => applicable = true,
            CrlOutcome::Discarded(Some(code))
                if code == StatusCode::CrlNotYetValid || code == StatusCode::CrlExpired =>
            {
                time_finding = Some(code);
            }
            CrlOutcome::Discarded(Some(code)) => {
                if !discarded.contains(&code) {
                    discarded.push(code);
                }
            }
            CrlOutcome::Discarded(None) => {}
        }
    }

    if applicable {
        vec![StatusCode::ValidCrlChecked]
    } else if restrictions.require_revocation {
        info!("No usable CRL found for {}", target.locator);
        discarded.push(time_finding.unwrap_or(StatusCode::NoRevocationData));
        discarded
    } else {
        debug!("Revocation status not determined for {}", target.locator);
        vec![StatusCode::RevocationNotChecked]
    }
}

/// `check_revocation` determines the revocation status of each certificate in a path and returns the
/// resulting status codes paired with the index of the certificate they concern, using the same
/// indexing as [`CertificationPath::get`].
///
/// The trust anchor is checked only when `check_anchor_revocation` is set, in which case it must be
/// self-issued so that its own key verifies its CRLs.
pub fn check_revocation(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    store: &dyn CertificateStore,
    path: &CertificationPath,
) -> Vec<(usize, StatusCode)> {
    let mut retval = vec![];
    for index in 0..path.len() {
        let (target, issuer) = match (path.get(index), path.issuer_of(index)) {
            (Some(t), Some(i)) => (t, i),
            _ => continue,
        };
        for code in check_certificate(pe, restrictions, store, target, issuer) {
            retval.push((index, code));
        }
    }

    if restrictions.check_anchor_revocation {
        let ta = &path.trust_anchor;
        if ta.self_issued {
            for code in check_certificate(pe, restrictions, store, ta, ta) {
                retval.push((path.len(), code));
            }
        } else {
            info!(
                "Revocation status of trust anchor {} cannot be determined",
                ta.locator
            );
            retval.push((path.len(), StatusCode::RevocationNotChecked));
        }
    }
    retval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_cert, parse_crl, MemoryStore};

    fn pe() -> PkiEnvironment {
        let mut pe = PkiEnvironment::default();
        pe.populate_default();
        pe
    }

    fn setup(ee: &[u8]) -> (MemoryStore, CertificationPath) {
        let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
        let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
        let ee = parse_cert(ee, "ee.der").unwrap();
        let mut store = MemoryStore::new();
        store.add_trust_anchor(root.clone());
        store.add_crl(
            parse_crl(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap(),
        );
        store.add_crl(
            parse_crl(include_bytes!("../../tests/examples/root.crl"), "root.crl").unwrap(),
        );
        (store, CertificationPath::new(root, vec![ee, int]))
    }

    #[test]
    fn revoked_and_good() {
        let r = Restrictions::new(110, true, 1893456000);
        let (store, path) = setup(include_bytes!("../../tests/examples/ee_revoked.der"));
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert_eq!(
            vec![(0, StatusCode::CertRevoked), (1, StatusCode::ValidCrlChecked)],
            statuses
        );

        let (store, path) = setup(include_bytes!("../../tests/examples/ee.der"));
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert_eq!(
            vec![(0, StatusCode::ValidCrlChecked), (1, StatusCode::ValidCrlChecked)],
            statuses
        );
    }

    #[test]
    fn crl_time_findings() {
        let (store, path) = setup(include_bytes!("../../tests/examples/ee.der"));
        let r = Restrictions::new(110, true, 1735689600);
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert!(statuses.contains(&(0, StatusCode::CrlNotYetValid)));

        let r = Restrictions::new(110, false, 1735689600);
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert!(statuses.contains(&(0, StatusCode::RevocationNotChecked)));
    }

    #[test]
    fn bad_crl_alongside_good_crl() {
        let (mut store, path) = setup(include_bytes!("../../tests/examples/ee.der"));
        // same issuer name as int.crl, signed by an unrelated key
        let decoy =
            parse_crl(include_bytes!("../../tests/examples/extra/int_decoy.crl"), "int_decoy.crl")
                .unwrap();
        store.add_crl(decoy.clone());

        let r = Restrictions::new(110, false, 1893456000);
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert_eq!(
            vec![(0, StatusCode::ValidCrlChecked), (1, StatusCode::ValidCrlChecked)],
            statuses
        );

        // with only the bad CRL available the finding is kept when revocation is required
        let (_, path) = setup(include_bytes!("../../tests/examples/ee.der"));
        let mut store = MemoryStore::new();
        store.add_crl(decoy);
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert!(statuses.contains(&(0, StatusCode::RevocationNotChecked)));
        assert!(!statuses.contains(&(0, StatusCode::CrlBadSignature)));

        let r = Restrictions::new(110, true, 1893456000);
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert!(statuses.contains(&(0, StatusCode::CrlBadSignature)));
        assert!(statuses.contains(&(0, StatusCode::NoRevocationData)));
    }

    #[test]
    fn no_revocation_data() {
        let (_, path) = setup(include_bytes!("../../tests/examples/ee.der"));
        let store = MemoryStore::new();
        let mut r = Restrictions::new(110, true, 1893456000);
        r.check_anchor_revocation = true;
        let statuses = check_revocation(&pe(), &r, &store, &path);
        assert_eq!(3, statuses.len());
        assert!(statuses.iter().all(|(_, s)| *s == StatusCode::NoRevocationData));
    }
}
