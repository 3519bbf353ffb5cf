/*
[INPUT]:  Address, challenge message, hex COSE_Sign1 and optional hex COSE_Key
[OUTPUT]: Verified signer identity or the CIP-8 check that failed
[POS]:    Auth layer - server-side signature verification
[UPDATE]: When accepting new signature envelopes or address kinds
*/

use blake2::digest::consts::U28;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signature, VerifyingKey};
use thiserror::Error;

use super::address::ShelleyAddress;
use super::cose::{ALG_EDDSA, CoseKey, CoseSign1};
use crate::types::Network;

/// Which CIP-8 check rejected a signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("malformed COSE structure: {0}")]
    Malformed(String),

    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(i128),

    #[error("no public key supplied")]
    MissingPublicKey,

    #[error("invalid address: {0}")]
    Address(String),

    #[error("signed address does not match the claimed address")]
    AddressMismatch,

    #[error("signed payload does not match the challenge")]
    PayloadMismatch,

    #[error("public key does not control the address")]
    KeyMismatch,

    #[error("invalid public key")]
    BadKey,

    #[error("signature does not verify")]
    BadSignature,
}

/// Identity established by a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    pub address: ShelleyAddress,
    pub network: Network,
    pub public_key: [u8; 32],
}

fn payload_hash(message: &[u8]) -> Vec<u8> {
    Blake2b::<U28>::digest(message).to_vec()
}

/// Verify that `signature_hex` is a CIP-8 signing of exactly `message`
/// by the key controlling `address`.
pub fn verify_data_signature(
    address: &str,
    message: &str,
    signature_hex: &str,
    key_hex: Option<&str>,
) -> Result<VerifiedSignature, VerifyError> {
    let address =
        ShelleyAddress::parse(address).map_err(|e| VerifyError::Address(e.to_string()))?;
    let envelope = CoseSign1::from_hex(signature_hex)?;

    match envelope.algorithm() {
        Some(ALG_EDDSA) => {}
        Some(other) => return Err(VerifyError::UnsupportedAlgorithm(other)),
        None => return Err(VerifyError::Malformed("missing algorithm header".into())),
    }

    if let Some(signed_address) = envelope.address() {
        if signed_address != address.bytes() {
            return Err(VerifyError::AddressMismatch);
        }
    }

    let expected_payload = if envelope.is_hashed() {
        payload_hash(message.as_bytes())
    } else {
        message.as_bytes().to_vec()
    };
    if let Some(payload) = &envelope.payload {
        if *payload != expected_payload {
            return Err(VerifyError::PayloadMismatch);
        }
    }

    let public_key = match key_hex.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => CoseKey::from_hex(key)?.public_key,
        None => envelope
            .kid()
            .and_then(|kid| <[u8; 32]>::try_from(kid).ok())
            .ok_or(VerifyError::MissingPublicKey)?,
    };
    if !address.is_controlled_by(&public_key) {
        return Err(VerifyError::KeyMismatch);
    }

    let verifying_key = VerifyingKey::from_bytes(&public_key).map_err(|_| VerifyError::BadKey)?;
    let signature = Signature::from_slice(&envelope.signature)
        .map_err(|_| VerifyError::Malformed("signature must be 64 bytes".into()))?;
    let signed = envelope.signed_bytes(&expected_payload)?;
    verifying_key
        .verify_strict(&signed, &signature)
        .map_err(|_| VerifyError::BadSignature)?;

    Ok(VerifiedSignature {
        network: address.network(),
        address,
        public_key,
    })
}
