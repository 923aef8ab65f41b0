//! Structures and functions related to results from certification path processing operations

use alloc::collections::BTreeSet;

use log::info;

use crate::{CertificationPath, ParsedCertificate, StatusCode};

/// `ValidationResult` records the findings from validating one candidate certification path, or the
/// reason no path could be built.
///
/// `cert_statuses` is index-aligned with the path: entry 0 is the target, the last entry is the trust
/// anchor. Codes that concern the chain as a whole are in `chain_statuses`. `overall_status` is the
/// most severe failure among all recorded codes, or [`StatusCode::Ok`] when there is none.
#[derive(Clone, Debug)]
#[readonly::make]
pub struct ValidationResult {
    /// The path that was validated, if one could be built
    pub path: Option<CertificationPath>,
    /// Status codes observed per certificate, target first and trust anchor last
    pub cert_statuses: Vec<BTreeSet<StatusCode>>,
    /// Status codes that concern the chain as a whole
    pub chain_statuses: BTreeSet<StatusCode>,
    /// The most severe failure code, or Ok
    pub overall_status: StatusCode,
}

impl ValidationResult {
    /// `new` returns a result for a path along with the findings recorded while checking it.
    pub fn new(
        path: CertificationPath,
        cert_statuses: Vec<BTreeSet<StatusCode>>,
        chain_statuses: BTreeSet<StatusCode>,
    ) -> ValidationResult {
        let mut r = ValidationResult {
            path: Some(path),
            cert_statuses,
            chain_statuses,
            overall_status: StatusCode::Ok,
        };
        r.update_overall_status();
        r
    }

    /// `from_chain_status` returns a result for a branch that did not yield a path.
    pub fn from_chain_status(status: StatusCode) -> ValidationResult {
        let mut chain_statuses = BTreeSet::new();
        chain_statuses.insert(status);
        let mut r = ValidationResult {
            path: None,
            cert_statuses: vec![],
            chain_statuses,
            overall_status: StatusCode::Ok,
        };
        r.update_overall_status();
        r
    }

    fn update_overall_status(&mut self) {
        self.overall_status = self
            .cert_statuses
            .iter()
            .flatten()
            .chain(self.chain_statuses.iter())
            .filter(|s| s.is_failure())
            .max_by_key(|s| s.severity())
            .copied()
            .unwrap_or(StatusCode::Ok);
    }

    /// `add_cert_status` records a code against the certificate at the given index.
    pub fn add_cert_status(&mut self, index: usize, status: StatusCode) {
        if let Some(s) = self.cert_statuses.get_mut(index) {
            s.insert(status);
            self.update_overall_status();
        }
    }

    /// `add_chain_status` records a code against the chain as a whole.
    pub fn add_chain_status(&mut self, status: StatusCode) {
        self.chain_statuses.insert(status);
        self.update_overall_status();
    }

    /// true if no failure was recorded
    pub fn successful(&self) -> bool {
        self.overall_status == StatusCode::Ok
    }

    /// `result_string` returns the stable name of the overall status.
    pub fn result_string(&self) -> &'static str {
        self.overall_status.as_str()
    }

    /// `trust_anchor` returns the trust anchor of the validated path, if any.
    pub fn trust_anchor(&self) -> Option<&ParsedCertificate> {
        self.path.as_ref().map(|p| &p.trust_anchor)
    }

    /// `has_status` returns true if the code was recorded anywhere in the result.
    pub fn has_status(&self, status: StatusCode) -> bool {
        self.chain_statuses.contains(&status)
            || self.cert_statuses.iter().any(|s| s.contains(&status))
    }

    /// `require_anchor` downgrades a successful result to [`StatusCode::CannotEstablishTrust`] when
    /// the path does not terminate at the expected trust anchor.
    pub fn require_anchor(&mut self, expected: &ParsedCertificate) {
        if !self.successful() {
            return;
        }
        let matches = match self.trust_anchor() {
            Some(ta) => ta.is_same_certificate(expected),
            None => false,
        };
        if !matches {
            info!(
                "Path for {} does not terminate at the expected trust anchor {}",
                self.path
                    .as_ref()
                    .map(|p| p.target().locator.as_str())
                    .unwrap_or(""),
                expected.locator
            );
            self.add_chain_status(StatusCode::CannotEstablishTrust);
        }
    }
}

/// `select_result` picks the result of the branch with the least severe overall status. Ties are
/// resolved in favor of a branch anchored at preferred_anchor, if given, else the first branch.
///
/// Branches that did not yield a path are only considered when no branch did.
pub fn select_result(
    results: Vec<ValidationResult>,
    preferred_anchor: Option<&ParsedCertificate>,
) -> ValidationResult {
    let is_preferred = |r: &ValidationResult| match (preferred_anchor, r.trust_anchor()) {
        (Some(p), Some(ta)) => ta.is_same_certificate(p),
        _ => false,
    };

    let have_path = results.iter().any(|r| r.path.is_some());
    let mut best: Option<ValidationResult> = None;
    for r in results.into_iter().filter(|r| !have_path || r.path.is_some()) {
        best = match best {
            None => Some(r),
            Some(b) => {
                let rs = r.overall_status.severity();
                let bs = b.overall_status.severity();
                if rs < bs || (rs == bs && is_preferred(&r) && !is_preferred(&b)) {
                    Some(r)
                } else {
                    Some(b)
                }
            }
        };
    }
    best.unwrap_or_else(|| ValidationResult::from_chain_status(StatusCode::IssuerNotFound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_cert;

    fn path() -> CertificationPath {
        let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
        let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
        let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();
        CertificationPath::new(root, vec![ee, int])
    }

    #[test]
    fn overall_status_test() {
        let mut r = ValidationResult::new(path(), vec![BTreeSet::new(); 3], BTreeSet::new());
        assert!(r.successful());
        assert_eq!("OK", r.result_string());

        r.add_cert_status(0, StatusCode::ValidCrlChecked);
        assert!(r.successful());
        r.add_cert_status(1, StatusCode::PathLengthExceeded);
        r.add_cert_status(0, StatusCode::InsufficientKeyStrength);
        assert_eq!(StatusCode::PathLengthExceeded, r.overall_status);
        r.add_chain_status(StatusCode::CertRevoked);
        assert_eq!("CERT_REVOKED", r.result_string());
        assert!(r.has_status(StatusCode::ValidCrlChecked));

        // out of range indices are ignored
        r.add_cert_status(7, StatusCode::Expired);
        assert!(!r.has_status(StatusCode::Expired));
    }

    #[test]
    fn require_anchor_test() {
        let other =
            parse_cert(include_bytes!("../../tests/examples/other_root.der"), "other_root.der")
                .unwrap();
        let p = path();
        let root = p.trust_anchor.clone();

        let mut r = ValidationResult::new(p.clone(), vec![BTreeSet::new(); 3], BTreeSet::new());
        r.require_anchor(&root);
        assert!(r.successful());
        r.require_anchor(&other);
        assert_eq!(StatusCode::CannotEstablishTrust, r.overall_status);

        // failures are left alone
        let mut r = ValidationResult::from_chain_status(StatusCode::IssuerNotFound);
        r.require_anchor(&other);
        assert_eq!(StatusCode::IssuerNotFound, r.overall_status);
    }

    #[test]
    fn select_result_test() {
        let p = path();
        let root = p.trust_anchor.clone();
        let failed = ValidationResult::from_chain_status(StatusCode::ChainTooLong);
        let mut expired =
            ValidationResult::new(p.clone(), vec![BTreeSet::new(); 3], BTreeSet::new());
        expired.add_cert_status(0, StatusCode::Expired);
        let ok = ValidationResult::new(p, vec![BTreeSet::new(); 3], BTreeSet::new());

        let r = select_result(vec![failed.clone(), expired.clone(), ok], None);
        assert!(r.successful());

        let r = select_result(vec![expired.clone(), failed.clone()], None);
        assert_eq!(StatusCode::Expired, r.overall_status);
        assert!(r.path.is_some());

        // a dead end never hides a failure found on a complete path
        let mut revoked = ValidationResult::new(path(), vec![BTreeSet::new(); 3], BTreeSet::new());
        revoked.add_cert_status(0, StatusCode::CertRevoked);
        let cycle = ValidationResult::from_chain_status(StatusCode::ChainCycleDetected);
        let r = select_result(vec![cycle, revoked], None);
        assert_eq!(StatusCode::CertRevoked, r.overall_status);

        let a = ValidationResult::from_chain_status(StatusCode::IssuerNotFound);
        let r = select_result(vec![a, failed], Some(&root));
        assert_eq!(StatusCode::IssuerNotFound, r.overall_status);

        assert_eq!(
            StatusCode::IssuerNotFound,
            select_result(vec![], None).overall_status
        );
    }
}
