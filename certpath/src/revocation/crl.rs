//! Functions that determine whether a CRL may be used to determine the revocation status of a
//! certificate, and what it says about that certificate (minus support for delta CRLs, indirect CRLs
//! and issuing distribution points)

use log::{error, info};
use x509_cert::ext::pkix::KeyUsages;

use crate::{
    name_to_string, signature_status, Error, ParsedCertificate, ParsedCrl, PkiEnvironment, Result,
    StatusCode,
};

/// `CrlOutcome` describes what a single CRL says about a certificate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CrlOutcome {
    /// The CRL is applicable and lists the certificate as revoked at or before the time of interest
    Revoked,
    /// The CRL is applicable and does not list the certificate
    NotRevoked,
    /// The CRL cannot be used. The status code, if any, explains why.
    Discarded(Option<StatusCode>),
}

/// `check_crl_sign` fails with CRL_SIGN_NOT_PERMITTED when the issuer carries a key usage extension
/// that does not assert cRLSign.
pub(crate) fn check_crl_sign(issuer: &ParsedCertificate) -> Result<()> {
    if let Some(ku) = &issuer.key_usage {
        if !ku.contains(KeyUsages::CRLSign) {
            error!(
                "crlSign is not set in key usage extension of {}",
                name_to_string(&issuer.subject)
            );
            return Err(Error::PathValidation(StatusCode::CrlSignNotPermitted));
        }
    }
    Ok(())
}

/// `verify_crl` verifies the signature of a CRL using the issuer's public key. Any failure is
/// reported as CRL_BAD_SIGNATURE.
pub(crate) fn verify_crl(
    pe: &PkiEnvironment,
    crl: &ParsedCrl,
    issuer: &ParsedCertificate,
) -> Result<()> {
    let r = pe.verify_signature_message(
        &crl.tbs,
        &crl.signature,
        &crl.signature_algorithm,
        &issuer.public_key.spki,
    );
    if let Err(e) = r {
        error!(
            "CRL signature verification error for {}: {}",
            crl.locator,
            signature_status(&e)
        );
        return Err(Error::PathValidation(StatusCode::CrlBadSignature));
    }
    Ok(())
}

/// `check_crl_validity` fails with CRL_NOT_YET_VALID or CRL_EXPIRED when the time of interest is
/// outside of the thisUpdate/nextUpdate window. A time of interest of 0 disables the check.
pub(crate) fn check_crl_validity(toi: u64, crl: &ParsedCrl) -> Result<()> {
    if 0 != toi {
        if crl.this_update > toi {
            info!(
                "Discarding CRL from {} as having this update time ({}) later than time of interest ({})",
                name_to_string(&crl.issuer),
                crl.this_update,
                toi
            );
            return Err(Error::PathValidation(StatusCode::CrlNotYetValid));
        }
        if let Some(nu) = crl.next_update {
            if nu < toi {
                info!(
                    "Discarding CRL from {} as having next update time ({}) earlier than time of interest ({})",
                    name_to_string(&crl.issuer),
                    nu,
                    toi
                );
                return Err(Error::PathValidation(StatusCode::CrlExpired));
            }
        }
    }
    Ok(())
}

/// Returns false when the CRL and issuer both carry key identifiers and they differ.
fn key_ids_match(crl: &ParsedCrl, issuer: &ParsedCertificate) -> bool {
    match (&crl.authority_key_id, &issuer.subject_key_id) {
        (Some(akid), Some(skid)) => akid == skid,
        _ => true,
    }
}

/// `process_crl` determines what the CRL says about `target`, whose issuer is `issuer`, at the time
/// of interest `toi`.
pub fn process_crl(
    pe: &PkiEnvironment,
    toi: u64,
    target: &ParsedCertificate,
    issuer: &ParsedCertificate,
    crl: &ParsedCrl,
) -> CrlOutcome {
    if !key_ids_match(crl, issuer) {
        info!(
            "Discarding CRL {} as its authority key identifier does not match {}",
            crl.locator, issuer.locator
        );
        return CrlOutcome::Discarded(None);
    }
    if let Err(Error::PathValidation(code)) = check_crl_sign(issuer) {
        return CrlOutcome::Discarded(Some(code));
    }
    if let Err(Error::PathValidation(code)) = verify_crl(pe, crl, issuer) {
        return CrlOutcome::Discarded(Some(code));
    }
    if crl.unsupported_critical_extension {
        info!(
            "Discarding CRL from {} due to an unsupported critical extension",
            name_to_string(&crl.issuer)
        );
        return CrlOutcome::Discarded(None);
    }
    if let Err(Error::PathValidation(code)) = check_crl_validity(toi, crl) {
        return CrlOutcome::Discarded(Some(code));
    }

    match crl.find_entry(&target.serial_number) {
        Some(entry) if toi == 0 || entry.revocation_date <= toi => {
            info!(
                "{} is revoked per CRL {} (reason: {:?})",
                target.locator, crl.locator, entry.reason
            );
            CrlOutcome::Revoked
        }
        _ => CrlOutcome::NotRevoked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_cert, parse_crl};

    fn pe() -> PkiEnvironment {
        let mut pe = PkiEnvironment::default();
        pe.populate_default();
        pe
    }

    #[test]
    fn process_crl_test() {
        let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
        let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();
        let revoked =
            parse_cert(include_bytes!("../../tests/examples/ee_revoked.der"), "ee_revoked.der")
                .unwrap();
        let crl = parse_crl(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap();

        assert_eq!(CrlOutcome::NotRevoked, process_crl(&pe(), 1893456000, &ee, &int, &crl));
        assert_eq!(CrlOutcome::Revoked, process_crl(&pe(), 1893456000, &revoked, &int, &crl));
        assert_eq!(CrlOutcome::Revoked, process_crl(&pe(), 0, &revoked, &int, &crl));
        assert_eq!(
            CrlOutcome::Discarded(Some(StatusCode::CrlNotYetValid)),
            process_crl(&pe(), 1735689600, &revoked, &int, &crl)
        );
        assert_eq!(
            CrlOutcome::Discarded(Some(StatusCode::CrlExpired)),
            process_crl(&pe(), 2524608000, &revoked, &int, &crl)
        );
    }

    #[test]
    fn wrong_issuer() {
        let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
        let ee = parse_cert(include_bytes!("../../tests/examples/ee.der"), "ee.der").unwrap();
        let crl = parse_crl(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap();
        // int.crl carries no AKID, so the signature check is what rejects it
        assert_eq!(
            CrlOutcome::Discarded(Some(StatusCode::CrlBadSignature)),
            process_crl(&pe(), 1893456000, &ee, &root, &crl)
        );

        assert_eq!(
            Err(Error::PathValidation(StatusCode::CrlSignNotPermitted)),
            check_crl_sign(&ee)
        );
        assert!(check_crl_sign(&root).is_ok());
    }
}
