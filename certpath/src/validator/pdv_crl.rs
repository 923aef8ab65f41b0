//! Typed, load-time representation of certificate revocation lists

use core::fmt;

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_CERTIFICATE_ISSUER, ID_CE_CRL_NUMBER, ID_CE_CRL_REASONS,
    ID_CE_HOLD_INSTRUCTION_CODE, ID_CE_INVALIDITY_DATE,
};
use der::Decode;
use log::{error, info};
use spki::AlgorithmIdentifierOwned;
use x509_cert::crl::{CertificateList, RevokedCert};
use x509_cert::ext::pkix::CrlReason;
use x509_cert::ext::Extensions;
use x509_cert::name::Name;

use crate::{name_to_string, normalize_name, pdv_extension::*, util::error::*, DeferDecodeSigned};

/// `RevokedEntry` describes one entry from the revokedCertificates field of a CRL.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RevokedEntry {
    /// Contents of the serial number of the revoked certificate
    pub serial_number: Vec<u8>,
    /// Revocation date as seconds since the Unix epoch
    pub revocation_date: u64,
    /// Reason code, if present
    pub reason: Option<CrlReason>,
}

/// [`ParsedCrl`] is the load-time representation of a complete CRL issued by the certificate issuer.
#[derive(Clone, Eq, PartialEq)]
#[readonly::make]
pub struct ParsedCrl {
    /// Locator for troubleshooting purposes, i.e., a file name
    pub locator: String,
    /// Binary, encoded CertificateList object
    pub encoded_crl: Vec<u8>,
    /// Issuer name
    pub issuer: Name,
    /// Normalized form of the issuer name used for lookups
    pub issuer_id: String,
    /// thisUpdate as seconds since the Unix epoch
    pub this_update: u64,
    /// nextUpdate as seconds since the Unix epoch, if present
    pub next_update: Option<u64>,
    /// CRL number, if present
    pub crl_number: Option<Vec<u8>>,
    /// Key identifier from the authority key identifier extension
    pub authority_key_id: Option<Vec<u8>>,
    /// Revoked certificates
    pub entries: Vec<RevokedEntry>,
    /// True if the CRL or one of its entries features a critical extension that is not supported,
    /// in which case the CRL must not be used
    pub unsupported_critical_extension: bool,
    /// Signature algorithm from the outer CertificateList structure
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// Signature bytes
    pub signature: Vec<u8>,
    /// Encoded TBSCertList exactly as it appears in encoded_crl
    pub tbs: Vec<u8>,
}

impl fmt::Debug for ParsedCrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedCrl")
            .field("locator", &self.locator)
            .field("issuer", &self.issuer.to_string())
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ParsedCrl {
    /// `find_entry` returns the entry for the given serial number, if the CRL lists it.
    pub fn find_entry(&self, serial_number: &[u8]) -> Option<&RevokedEntry> {
        self.entries
            .iter()
            .find(|e| e.serial_number.as_slice() == serial_number)
    }
}

/// check_entry_extensions inspects the extensions in a CRL entry. Invalidity date, reason and hold
/// instruction are informational. The certificate issuer extension marks an indirect CRL, which is not
/// supported, and any other critical extension is cause to discard the CRL.
fn check_entry_extensions(rc: &RevokedCert) -> Result<()> {
    let exts_to_ignore = [
        ID_CE_INVALIDITY_DATE,
        ID_CE_CRL_REASONS,
        ID_CE_HOLD_INSTRUCTION_CODE,
    ];
    if let Some(exts) = &rc.crl_entry_extensions {
        for e in exts {
            if e.extn_id == ID_CE_CERTIFICATE_ISSUER
                || (e.critical && !exts_to_ignore.contains(&e.extn_id))
            {
                return Err(Error::UnsupportedCrlExtension);
            }
        }
    }
    Ok(())
}

/// check_crl_extensions permits only the CRL number and authority key identifier extensions to be
/// critical. Partitioned, delta and indirect CRLs are thereby excluded.
fn check_crl_extensions(exts: &Extensions) -> Result<()> {
    let exts_to_ignore = [ID_CE_CRL_NUMBER, ID_CE_AUTHORITY_KEY_IDENTIFIER];
    for e in exts {
        if e.critical && !exts_to_ignore.contains(&e.extn_id) {
            return Err(Error::UnsupportedCrlExtension);
        }
    }
    Ok(())
}

fn get_reason(rc: &RevokedCert) -> Option<CrlReason> {
    if let Some(exts) = &rc.crl_entry_extensions {
        for e in exts {
            if let Ok(PDVExtension::CrlReason(r)) = parse_extension(e) {
                return Some(r);
            }
        }
    }
    None
}

/// `parse_crl` takes a buffer containing a binary DER encoded CRL and returns a [`ParsedCrl`] if
/// parsing was successful.
///
/// A CRL featuring an unsupported critical extension parses successfully but is flagged via
/// `unsupported_critical_extension` so revocation checking can discard it.
pub fn parse_crl(buffer: &[u8], filename: &str) -> Result<ParsedCrl> {
    let crl = match CertificateList::from_der(buffer) {
        Ok(crl) => crl,
        Err(e) => {
            error!("Failed to parse CRL from {}: {}", filename, e);
            return Err(Error::Asn1Error(e));
        }
    };
    let defer_crl = DeferDecodeSigned::from_der(buffer)?;
    let tbs = &crl.tbs_cert_list;

    let mut unsupported_critical_extension = false;
    let mut crl_number = None;
    let mut authority_key_id = None;
    if let Some(exts) = &tbs.crl_extensions {
        if check_crl_extensions(exts).is_err() {
            info!(
                "CRL from {} ({}) features an unrecognized critical extension",
                name_to_string(&tbs.issuer),
                filename
            );
            unsupported_critical_extension = true;
        }
        for ext in exts {
            match parse_extension(ext) {
                Ok(PDVExtension::CrlNumber(num)) => crl_number = Some(num.0.as_bytes().to_vec()),
                Ok(PDVExtension::AuthorityKeyIdentifier(akid)) => {
                    authority_key_id = akid.key_identifier.map(|k| k.as_bytes().to_vec())
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to parse CRL extension from {}: {}", filename, e);
                    return Err(e);
                }
            }
        }
    }

    let mut entries = vec![];
    if let Some(revoked_certificates) = &tbs.revoked_certificates {
        for rc in revoked_certificates {
            if check_entry_extensions(rc).is_err() {
                info!(
                    "CRL from {} ({}) features an unsupported CRL entry extension",
                    name_to_string(&tbs.issuer),
                    filename
                );
                unsupported_critical_extension = true;
            }
            entries.push(RevokedEntry {
                serial_number: rc.serial_number.as_bytes().to_vec(),
                revocation_date: rc.revocation_date.to_unix_duration().as_secs(),
                reason: get_reason(rc),
            });
        }
    }

    Ok(ParsedCrl {
        locator: filename.to_string(),
        encoded_crl: buffer.to_vec(),
        issuer_id: normalize_name(&tbs.issuer),
        issuer: tbs.issuer.clone(),
        this_update: tbs.this_update.to_unix_duration().as_secs(),
        next_update: tbs
            .next_update
            .as_ref()
            .map(|nu| nu.to_unix_duration().as_secs()),
        crl_number,
        authority_key_id,
        entries,
        unsupported_critical_extension,
        signature_algorithm: defer_crl.signature_algorithm,
        signature: defer_crl.signature.raw_bytes().to_vec(),
        tbs: defer_crl.tbs_field,
    })
}

/// `parse_crl_pem` decodes a single PEM-encoded CRL then parses it via [`parse_crl`].
pub fn parse_crl_pem(buffer: &[u8], filename: &str) -> Result<ParsedCrl> {
    match pem_rfc7468::decode_vec(buffer) {
        Ok((label, der)) if label == "X509 CRL" => parse_crl(&der, filename),
        Ok((label, _)) => {
            error!("Unexpected PEM label in {}: {}", filename, label);
            Err(Error::ParseError)
        }
        Err(e) => {
            error!("Failed to decode PEM from {}: {}", filename, e);
            Err(Error::ParseError)
        }
    }
}

#[test]
fn parse_crl_test() {
    let crl = parse_crl(include_bytes!("../../tests/examples/int.crl"), "int.crl").unwrap();
    assert_eq!("int.crl", crl.locator);
    assert!(!crl.unsupported_critical_extension);
    assert_eq!(Some(vec![0x10, 0x00]), crl.crl_number);
    assert!(crl.authority_key_id.is_none());
    assert_eq!(1, crl.entries.len());

    let entry = crl.find_entry(&[0x10, 0x04]).unwrap();
    assert_eq!(Some(CrlReason::KeyCompromise), entry.reason);
    assert!(crl.find_entry(&[0x10, 0x03]).is_none());
    assert!(crl.next_update.unwrap() > crl.this_update);

    // root.crl lists serial 1004, which the root never issued, so int.der is not covered
    let root_crl = parse_crl(include_bytes!("../../tests/examples/root.crl"), "root.crl").unwrap();
    assert_eq!(1, root_crl.entries.len());
    assert!(root_crl.find_entry(&[0x10, 0x04]).is_some());
    assert!(root_crl.find_entry(&[0x10, 0x02]).is_none());

    assert!(parse_crl(include_bytes!("../../tests/examples/root.der"), "root.der").is_err());
}
