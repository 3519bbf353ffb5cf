/*
[INPUT]:  Message bytes, address bytes and optional secret key bytes
[OUTPUT]: CIP-8 data signatures (COSE_Sign1 + COSE_Key, hex CBOR)
[POS]:    Auth layer - cryptographic signing for wallet authentication
[UPDATE]: When changing signing algorithm or key format
*/

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;

use super::address::{KEY_HASH_LEN, key_hash};
use super::cose::{CoseKey, CoseSign1, protected_header, sig_structure, unhashed_header};
use super::verify::VerifyError;
use crate::http::{Result, WalletError};
use crate::types::DataSignature;

/// Ed25519 payment-key signer producing CIP-8 message signatures
#[derive(Debug)]
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create signer from existing secret key bytes (32 bytes)
    pub fn from_secret_key(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        Self { signing_key }
    }

    /// Sign raw bytes
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Get the raw public key bytes
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Blake2b-224 hash of the public key, the address credential
    pub fn key_hash(&self) -> [u8; KEY_HASH_LEN] {
        key_hash(&self.public_key_bytes())
    }

    /// Verify a raw signature against a message
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.signing_key
            .verifying_key()
            .verify(message, signature)
            .is_ok()
    }

    /// CIP-30 `signData` equivalent.
    ///
    /// `address` is the raw address bytes placed in the protected header.
    pub fn sign_data(&self, address: &[u8], message: &str) -> Result<DataSignature> {
        let to_invalid = |e: VerifyError| WalletError::InvalidSignature(e.to_string());

        let protected = protected_header(address).map_err(to_invalid)?;
        let payload = message.as_bytes().to_vec();
        let signed = sig_structure(&protected, &payload).map_err(to_invalid)?;
        let signature = self.sign(&signed);

        let envelope = CoseSign1 {
            protected,
            protected_header: Vec::new(),
            unprotected: unhashed_header(),
            payload: Some(payload),
            signature: signature.to_bytes().to_vec(),
        };
        let key = CoseKey::new(self.public_key_bytes());

        Ok(DataSignature {
            signature: hex::encode(envelope.to_bytes().map_err(to_invalid)?),
            key: key.to_hex().map_err(to_invalid)?,
        })
    }
}
