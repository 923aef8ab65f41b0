//! Builds candidate certification paths from a target certificate to the trust anchors in a
//! [`CertificateStore`].
//!
//! The search is depth-first over an explicit worklist. Partial paths are stored in an arena of nodes,
//! each holding the index of its parent and a reference to the certificate it adds, so no partial path
//! is copied until it reaches a trust anchor.

use log::{debug, info};

use crate::{
    compare_names, environment::pki_environment::*, environment::pki_environment_traits::*,
    is_self_signed, path_settings::*, CertificationPath, ParsedCertificate, StatusCode,
};

/// `BuildResult` holds the complete paths found by [`build_paths`] along with the status codes of
/// the branches that did not reach a trust anchor.
#[derive(Clone, Debug, Default)]
pub struct BuildResult {
    /// Complete paths, longest first. Paths of equal length appear in the order they were found.
    pub paths: Vec<CertificationPath>,
    /// One chain-level status code per dead-end branch
    pub dead_ends: Vec<StatusCode>,
}

struct PathNode<'a> {
    parent: Option<usize>,
    cert: &'a ParsedCertificate,
    depth: usize,
}

/// Orders issuer candidates for a certificate. Candidates whose SKID matches the certificate's AKID
/// come first. When at least one matches, candidates with a different SKID are dropped.
fn order_candidates<'a>(
    cert: &ParsedCertificate,
    candidates: Vec<&'a ParsedCertificate>,
) -> Vec<&'a ParsedCertificate> {
    let akid = match &cert.authority_key_id {
        Some(akid) => akid,
        None => return candidates,
    };
    let (exact, rest): (Vec<&ParsedCertificate>, Vec<&ParsedCertificate>) = candidates
        .into_iter()
        .partition(|c| c.subject_key_id.as_ref() == Some(akid));
    if exact.is_empty() {
        rest
    } else {
        let mut retval = exact;
        retval.extend(rest.into_iter().filter(|c| c.subject_key_id.is_none()));
        retval
    }
}

fn push_unique<'a>(list: &mut Vec<&'a ParsedCertificate>, cert: &'a ParsedCertificate) {
    if !list.iter().any(|c| c.is_same_certificate(cert)) {
        list.push(cert);
    }
}

/// Collects the path ending at `index`, target first.
fn collect_path<'a>(arena: &[PathNode<'a>], index: usize) -> Vec<ParsedCertificate> {
    let mut certs = vec![];
    let mut cur = Some(index);
    while let Some(i) = cur {
        certs.push(arena[i].cert.clone());
        cur = arena[i].parent;
    }
    certs.reverse();
    certs
}

/// Returns true if a certificate with the same subject is already on the branch ending at `index`.
fn on_branch(arena: &[PathNode<'_>], index: usize, cert: &ParsedCertificate) -> bool {
    let mut cur = Some(index);
    while let Some(i) = cur {
        if arena[i].cert.subject_id == cert.subject_id {
            return true;
        }
        cur = arena[i].parent;
    }
    false
}

/// `build_paths` returns every certification path from `target` to a trust anchor in `store`.
///
/// Issuer candidates are drawn from the trust anchors, then from `intermediates`, then from the
/// non-anchor certificates in `store`, matching on subject name. Each candidate is explored as a
/// separate branch. A branch ends when an anchor is reached, when a subject name already on the
/// branch would be added again (`CHAIN_CYCLE_DETECTED`), when the path would grow beyond
/// `restrictions.max_depth` (`CHAIN_TOO_LONG`) or when no candidate exists (`CERT_ISSUER_NOT_FOUND`, or
/// `CANNOT_ESTABLISH_TRUST` if the last certificate is self-signed).
///
/// When `target` is itself a trust anchor the only path returned is the anchor alone.
pub fn build_paths(
    pe: &PkiEnvironment,
    restrictions: &Restrictions,
    store: &dyn CertificateStore,
    target: &ParsedCertificate,
    intermediates: &[ParsedCertificate],
) -> BuildResult {
    let mut result = BuildResult::default();

    if store.is_trust_anchor(target) {
        debug!("{} is a trust anchor", target.locator);
        result
            .paths
            .push(CertificationPath::new(target.clone(), vec![]));
        return result;
    }

    let mut arena: Vec<PathNode<'_>> = vec![PathNode {
        parent: None,
        cert: target,
        depth: 1,
    }];
    let mut worklist: Vec<usize> = vec![0];

    while let Some(index) = worklist.pop() {
        let cur = arena[index].cert;
        let depth = arena[index].depth;

        let anchors = order_candidates(cur, store.find_anchors_by_subject(&cur.issuer));
        for ta in &anchors {
            if on_branch(&arena, index, ta) {
                info!(
                    "Discarding trust anchor {} as issuer of {}: subject already present on the path",
                    ta.locator, cur.locator
                );
                result.dead_ends.push(StatusCode::ChainCycleDetected);
                continue;
            }
            debug!(
                "Found path of length {} from {} to trust anchor {}",
                depth, target.locator, ta.locator
            );
            result
                .paths
                .push(CertificationPath::new((*ta).clone(), collect_path(&arena, index)));
        }

        let mut cas: Vec<&ParsedCertificate> = vec![];
        for c in intermediates
            .iter()
            .filter(|c| compare_names(&c.subject, &cur.issuer))
        {
            push_unique(&mut cas, c);
        }
        for c in store.find_certificates_by_subject(&cur.issuer) {
            push_unique(&mut cas, c);
        }
        let cas: Vec<&ParsedCertificate> = order_candidates(cur, cas)
            .into_iter()
            .filter(|c| !c.is_same_certificate(cur) && !store.is_trust_anchor(c))
            .collect();

        if anchors.is_empty() && cas.is_empty() {
            let code = if cur.self_issued && is_self_signed(pe, cur) {
                StatusCode::CannotEstablishTrust
            } else {
                StatusCode::IssuerNotFound
            };
            info!(
                "Failed to find issuer for {} while building path for {}: {}",
                cur.locator, target.locator, code
            );
            result.dead_ends.push(code);
            continue;
        }

        let mut children = vec![];
        for ca in cas {
            if on_branch(&arena, index, ca) {
                info!(
                    "Discarding {} as issuer of {}: subject already present on the path",
                    ca.locator, cur.locator
                );
                result.dead_ends.push(StatusCode::ChainCycleDetected);
                continue;
            }
            if depth + 1 > restrictions.max_depth {
                info!(
                    "Discarding {} as issuer of {}: path would exceed {} certificates",
                    ca.locator, cur.locator, restrictions.max_depth
                );
                result.dead_ends.push(StatusCode::ChainTooLong);
                continue;
            }
            arena.push(PathNode {
                parent: Some(index),
                cert: ca,
                depth: depth + 1,
            });
            children.push(arena.len() - 1);
        }
        // first candidate is explored first
        worklist.extend(children.into_iter().rev());
    }

    // sort_by is stable so discovery order is kept among paths of equal length
    result.paths.sort_by(|a, b| b.len().cmp(&a.len()));
    result
}
