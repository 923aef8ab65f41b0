//! Provides implementations of crypto-related [`PkiEnvironment`] interfaces using libraries from the
//! [Rust Crypto](https://github.com/RustCrypto) project for support.

use der::{asn1::ObjectIdentifier, Encode};
use p256::ecdsa::{
    signature::Verifier as Verifier256, Signature as Signature256, VerifyingKey as VerifyingKey256,
};
use p384::ecdsa::{
    signature::Verifier as Verifier384, Signature as Signature384, VerifyingKey as VerifyingKey384,
};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::error::{Error, Result, StatusCode};
use crate::{
    environment::pki_environment::*, log_message, util::pdv_alg_oids::*,
    util::pdv_utilities::get_hash_alg_from_sig_alg, PeLogLevels,
};

/// `KeyStrength` describes the size of a public key and an estimate of the security it provides,
/// both in bits.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyStrength {
    /// Size of the key, i.e., modulus size for RSA or field size for EC
    pub key_bits: usize,
    /// Estimated security strength
    pub security_bits: usize,
}

/// is_rsa returns true is the presented OID is one of the PKCS #1 v1.5 signature algorithms
/// supported by [`verify_signature_message_rust_crypto`].
pub(crate) fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_SHA256_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA384_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA224_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA512_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA1_WITH_RSA_ENCRYPTION
}

/// is_ecdsa returns true is the presented OID is one of [`PKIXALG_ECDSA_WITH_SHA224`],
/// [`PKIXALG_ECDSA_WITH_SHA256`], [`PKIXALG_ECDSA_WITH_SHA384`] or [`PKIXALG_ECDSA_WITH_SHA512`] and false otherwise.
pub(crate) fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_ECDSA_WITH_SHA256
        || *oid == PKIXALG_ECDSA_WITH_SHA384
        || *oid == PKIXALG_ECDSA_WITH_SHA224
        || *oid == PKIXALG_ECDSA_WITH_SHA512
}

/// get_padding_scheme returns a PKCS #1 v1.5 signature scheme for the given signature algorithm.
fn get_padding_scheme(signature_alg: &AlgorithmIdentifierOwned) -> Result<Pkcs1v15Sign> {
    match signature_alg.oid {
        PKIXALG_SHA256_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha256>()),
        PKIXALG_SHA384_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha384>()),
        PKIXALG_SHA224_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha224>()),
        PKIXALG_SHA512_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha512>()),
        PKIXALG_SHA1_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha1>()),
        _ => Err(Error::Unrecognized),
    }
}

fn get_named_curve_parameter(alg_id: &AlgorithmIdentifierOwned) -> Result<ObjectIdentifier> {
    if let Some(params) = &alg_id.parameters {
        if let Ok(oid) = params.decode_as::<ObjectIdentifier>() {
            return Ok(oid);
        }
    }
    Err(Error::PathValidation(StatusCode::PublicKeyInvalid))
}

/// calculate_hash_rust_crypto implements the [`CalculateHash`](../pki_environment_traits/type.CalculateHash.html)
/// interface for [`PkiEnvironment`] using implementations from the Rust Crypto project.
///
/// It supports [`PKIXALG_SHA1`], [`PKIXALG_SHA224`], [`PKIXALG_SHA256`], [`PKIXALG_SHA384`] and [`PKIXALG_SHA512`].
pub fn calculate_hash_rust_crypto(
    _pe: &PkiEnvironment,
    hash_alg: &AlgorithmIdentifierOwned,
    buffer_to_hash: &[u8],
) -> Result<Vec<u8>> {
    match hash_alg.oid {
        PKIXALG_SHA1 => Ok(Sha1::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA224 => Ok(Sha224::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA256 => Ok(Sha256::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA384 => Ok(Sha384::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA512 => Ok(Sha512::digest(buffer_to_hash).to_vec()),
        _ => Err(Error::Unrecognized),
    }
}

/// verify_signature_message_rust_crypto implements the [`VerifySignatureMessage`](../pki_environment_traits/type.VerifySignatureMessage.html)
/// interface for [`PkiEnvironment`] using implementations from the [Rust Crypto](https://github.com/RustCrypto) project.
///
/// RSA PKCS #1 v1.5 signatures and ECDSA signatures using P-256 or P-384 keys are supported. A
/// signature that does not verify yields [`StatusCode::SignatureError`], a key that cannot be decoded
/// yields [`StatusCode::PublicKeyInvalid`] and anything else yields [`Error::Unrecognized`].
pub fn verify_signature_message_rust_crypto(
    pe: &PkiEnvironment,
    message_to_verify: &[u8],
    signature: &[u8],
    signature_alg: &AlgorithmIdentifierOwned,
    spki: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        let enc_spki = spki.to_der()?;
        let rsa = match RsaPublicKey::from_public_key_der(&enc_spki) {
            Ok(rsa) => rsa,
            Err(_e) => return Err(Error::PathValidation(StatusCode::PublicKeyInvalid)),
        };
        let hash_alg = get_hash_alg_from_sig_alg(&signature_alg.oid)?;
        let hash_to_verify = pe.calculate_hash(&hash_alg, message_to_verify)?;
        let ps = get_padding_scheme(signature_alg)?;
        return match rsa.verify(ps, hash_to_verify.as_slice(), signature) {
            Ok(()) => Ok(()),
            Err(_e) => Err(Error::PathValidation(StatusCode::SignatureError)),
        };
    } else if is_ecdsa(&signature_alg.oid) {
        let named_curve = get_named_curve_parameter(&spki.algorithm)?;
        let key_bytes = spki.subject_public_key.raw_bytes();

        let verified = match named_curve {
            PKIXALG_SECP256R1 if signature_alg.oid == PKIXALG_ECDSA_WITH_SHA256 => {
                let ecdsa = VerifyingKey256::from_sec1_bytes(key_bytes)
                    .map_err(|_e| Error::PathValidation(StatusCode::PublicKeyInvalid))?;
                let s = Signature256::from_der(signature)
                    .map_err(|_e| Error::PathValidation(StatusCode::SignatureError))?;
                ecdsa.verify(message_to_verify, &s).is_ok()
            }
            PKIXALG_SECP384R1 if signature_alg.oid == PKIXALG_ECDSA_WITH_SHA384 => {
                let ecdsa = VerifyingKey384::from_sec1_bytes(key_bytes)
                    .map_err(|_e| Error::PathValidation(StatusCode::PublicKeyInvalid))?;
                let s = Signature384::from_der(signature)
                    .map_err(|_e| Error::PathValidation(StatusCode::SignatureError))?;
                ecdsa.verify(message_to_verify, &s).is_ok()
            }
            _ => {
                log_message(
                    &PeLogLevels::PeError,
                    format!(
                        "Unsupported named curve and signature algorithm combination: {} and {}",
                        named_curve, signature_alg.oid
                    )
                    .as_str(),
                );
                return Err(Error::Unrecognized);
            }
        };
        if verified {
            return Ok(());
        }
        return Err(Error::PathValidation(StatusCode::SignatureError));
    }
    log_message(
        &PeLogLevels::PeError,
        format!("Unrecognized signature algorithm: {}", signature_alg.oid).as_str(),
    );
    Err(Error::Unrecognized)
}

/// `rsa_security_bits` estimates the security strength of an RSA modulus using the comparable
/// strengths from NIST SP 800-57 Part 1.
fn rsa_security_bits(modulus_bits: usize) -> usize {
    match modulus_bits {
        b if b >= 15360 => 256,
        b if b >= 7680 => 192,
        b if b >= 3072 => 128,
        b if b >= 2048 => 112,
        b if b >= 1024 => 80,
        _ => 0,
    }
}

/// `estimate_key_strength` returns the key size and estimated security strength of a public key.
///
/// RSA keys and EC keys on P-256, P-384 or P-521 are recognized. Other key types yield
/// [`Error::Unrecognized`] and RSA keys that cannot be decoded yield
/// [`StatusCode::PublicKeyInvalid`].
pub fn estimate_key_strength(spki: &SubjectPublicKeyInfoOwned) -> Result<KeyStrength> {
    match spki.algorithm.oid {
        PKIXALG_RSA_ENCRYPTION => {
            let enc_spki = spki.to_der()?;
            match RsaPublicKey::from_public_key_der(&enc_spki) {
                Ok(rsa) => {
                    let key_bits = rsa.size() * 8;
                    Ok(KeyStrength {
                        key_bits,
                        security_bits: rsa_security_bits(key_bits),
                    })
                }
                Err(_e) => Err(Error::PathValidation(StatusCode::PublicKeyInvalid)),
            }
        }
        PKIXALG_EC_PUBLIC_KEY => match get_named_curve_parameter(&spki.algorithm)? {
            PKIXALG_SECP256R1 => Ok(KeyStrength {
                key_bits: 256,
                security_bits: 128,
            }),
            PKIXALG_SECP384R1 => Ok(KeyStrength {
                key_bits: 384,
                security_bits: 192,
            }),
            PKIXALG_SECP521R1 => Ok(KeyStrength {
                key_bits: 521,
                security_bits: 256,
            }),
            _ => Err(Error::Unrecognized),
        },
        _ => Err(Error::Unrecognized),
    }
}

#[test]
fn test_calculate_hash() {
    use hex_literal::hex;
    let mut pe = PkiEnvironment::new();
    pe.add_calculate_hash_callback(calculate_hash_rust_crypto);

    let hash_algorithm = AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA256,
        parameters: None,
    };
    let result = pe.calculate_hash(&hash_algorithm, "abc".as_bytes()).unwrap();
    assert_eq!(
        result,
        hex!("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
    );

    let hash_algorithm = AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA1,
        parameters: None,
    };
    let result = pe.calculate_hash(&hash_algorithm, "abc".as_bytes()).unwrap();
    assert_eq!(result, hex!("A9993E364706816ABA3E25717850C26C9CD0D89D"));
}

#[test]
fn test_rsa_security_bits() {
    assert_eq!(rsa_security_bits(1024), 80);
    assert_eq!(rsa_security_bits(2048), 112);
    assert_eq!(rsa_security_bits(4096), 128);
    assert_eq!(rsa_security_bits(512), 0);
}

#[test]
fn test_verify_signature_message() {
    use crate::parse_cert;

    let mut pe = PkiEnvironment::new();
    pe.add_verify_signature_message_callback(verify_signature_message_rust_crypto);

    let root = parse_cert(include_bytes!("../../tests/examples/root.der"), "root.der").unwrap();
    let int = parse_cert(include_bytes!("../../tests/examples/int.der"), "int.der").unwrap();
    assert!(pe
        .verify_signature_message(
            &int.tbs,
            &int.signature,
            &int.signature_algorithm,
            &root.public_key.spki,
        )
        .is_ok());

    // intermediate did not sign itself
    assert_eq!(
        pe.verify_signature_message(
            &int.tbs,
            &int.signature,
            &int.signature_algorithm,
            &int.public_key.spki,
        ),
        Err(Error::PathValidation(StatusCode::SignatureError))
    );

    let ec_root =
        parse_cert(include_bytes!("../../tests/examples/ec_root.der"), "ec_root.der").unwrap();
    let ec_ee = parse_cert(include_bytes!("../../tests/examples/ec_ee.der"), "ec_ee.der").unwrap();
    assert!(pe
        .verify_signature_message(
            &ec_ee.tbs,
            &ec_ee.signature,
            &ec_ee.signature_algorithm,
            &ec_root.public_key.spki,
        )
        .is_ok());
}

#[test]
fn test_estimate_key_strength() {
    use crate::parse_cert;

    let weak =
        parse_cert(include_bytes!("../../tests/examples/ee_weak.der"), "ee_weak.der").unwrap();
    let ks = estimate_key_strength(&weak.public_key.spki).unwrap();
    assert_eq!(ks.key_bits, 1024);
    assert_eq!(ks.security_bits, 80);

    let ec = parse_cert(include_bytes!("../../tests/examples/ec_ee.der"), "ec_ee.der").unwrap();
    let ks = estimate_key_strength(&ec.public_key.spki).unwrap();
    assert_eq!(ks.key_bits, 256);
    assert_eq!(ks.security_bits, 128);
}
