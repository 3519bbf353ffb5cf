/*
[INPUT]:  Hex/CBOR COSE_Sign1 and COSE_Key structures (CIP-8 / CIP-30 signData)
[OUTPUT]: Parsed headers, payload, signature and public key; encoders for signing
[POS]:    Auth layer - COSE message-signing envelope
[UPDATE]: When supporting new COSE header labels or key types
*/

use ciborium::value::{Integer, Value};

use super::verify::VerifyError;

/// COSE algorithm id for EdDSA
pub const ALG_EDDSA: i128 = -8;

const LABEL_ALG: i128 = 1;
const LABEL_KID: i128 = 4;
const KEY_LABEL_KTY: i128 = 1;
const KEY_LABEL_ALG: i128 = 3;
const KEY_LABEL_CRV: i128 = -1;
const KEY_LABEL_X: i128 = -2;
const KTY_OKP: i64 = 1;
const CRV_ED25519: i64 = 6;
const COSE_SIGN1_TAG: u64 = 18;

type HeaderMap = Vec<(Value, Value)>;

fn int(value: i64) -> Value {
    Value::Integer(Integer::from(value))
}

fn encode(value: &Value) -> Result<Vec<u8>, VerifyError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| VerifyError::Encoding(e.to_string()))?;
    Ok(buf)
}

fn decode(bytes: &[u8]) -> Result<Value, VerifyError> {
    ciborium::de::from_reader(bytes).map_err(|e| VerifyError::Encoding(e.to_string()))
}

fn decode_hex(value: &str) -> Result<Vec<u8>, VerifyError> {
    hex::decode(value.trim()).map_err(|e| VerifyError::Encoding(format!("hex: {e}")))
}

fn int_label(key: &Value) -> Option<i128> {
    match key {
        Value::Integer(i) => Some(i128::from(*i)),
        _ => None,
    }
}

fn lookup_int<'a>(map: &'a HeaderMap, label: i128) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| int_label(key) == Some(label))
        .map(|(_, value)| value)
}

fn lookup_text<'a>(map: &'a HeaderMap, label: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| matches!(key, Value::Text(text) if text == label))
        .map(|(_, value)| value)
}

/// Decoded COSE_Sign1 envelope
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    /// Protected header exactly as serialized; it is part of the signed bytes
    pub protected: Vec<u8>,
    pub protected_header: HeaderMap,
    pub unprotected: HeaderMap,
    /// `None` when the payload is detached
    pub payload: Option<Vec<u8>>,
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    pub fn from_hex(value: &str) -> Result<Self, VerifyError> {
        Self::from_bytes(&decode_hex(value)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        let value = match decode(bytes)? {
            Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
            other => other,
        };
        let Value::Array(items) = value else {
            return Err(VerifyError::Malformed("COSE_Sign1 must be an array".into()));
        };
        let [protected, unprotected, payload, signature]: [Value; 4] = items
            .try_into()
            .map_err(|_| VerifyError::Malformed("COSE_Sign1 must have 4 elements".into()))?;

        let Value::Bytes(protected) = protected else {
            return Err(VerifyError::Malformed("protected header must be bytes".into()));
        };
        let protected_header = if protected.is_empty() {
            Vec::new()
        } else {
            match decode(&protected)? {
                Value::Map(map) => map,
                _ => {
                    return Err(VerifyError::Malformed(
                        "protected header must encode a map".into(),
                    ));
                }
            }
        };
        let Value::Map(unprotected) = unprotected else {
            return Err(VerifyError::Malformed("unprotected header must be a map".into()));
        };
        let payload = match payload {
            Value::Bytes(bytes) => Some(bytes),
            Value::Null => None,
            _ => return Err(VerifyError::Malformed("payload must be bytes or nil".into())),
        };
        let Value::Bytes(signature) = signature else {
            return Err(VerifyError::Malformed("signature must be bytes".into()));
        };

        Ok(Self {
            protected,
            protected_header,
            unprotected,
            payload,
            signature,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VerifyError> {
        let payload = match &self.payload {
            Some(bytes) => Value::Bytes(bytes.clone()),
            None => Value::Null,
        };
        encode(&Value::Array(vec![
            Value::Bytes(self.protected.clone()),
            Value::Map(self.unprotected.clone()),
            payload,
            Value::Bytes(self.signature.clone()),
        ]))
    }

    pub fn algorithm(&self) -> Option<i128> {
        match lookup_int(&self.protected_header, LABEL_ALG)? {
            Value::Integer(alg) => Some(i128::from(*alg)),
            _ => None,
        }
    }

    /// Raw address bytes from the CIP-8 `address` protected header
    pub fn address(&self) -> Option<&[u8]> {
        match lookup_text(&self.protected_header, "address")? {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Key id from either header bucket; some wallets carry the public key here
    pub fn kid(&self) -> Option<&[u8]> {
        lookup_int(&self.protected_header, LABEL_KID)
            .or_else(|| lookup_int(&self.unprotected, LABEL_KID))
            .and_then(|value| match value {
                Value::Bytes(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
    }

    /// CIP-8 `hashed` flag: payload is blake2b-224 of the message
    pub fn is_hashed(&self) -> bool {
        matches!(lookup_text(&self.unprotected, "hashed"), Some(Value::Bool(true)))
    }

    /// Bytes covered by the signature for the given payload
    pub fn signed_bytes(&self, payload: &[u8]) -> Result<Vec<u8>, VerifyError> {
        sig_structure(&self.protected, payload)
    }
}

/// Serialized `Sig_structure` for a COSE_Sign1 with empty external AAD
pub fn sig_structure(protected: &[u8], payload: &[u8]) -> Result<Vec<u8>, VerifyError> {
    encode(&Value::Array(vec![
        Value::Text("Signature1".to_string()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.to_vec()),
    ]))
}

/// CIP-8 protected header: EdDSA algorithm plus the signing address
pub fn protected_header(address: &[u8]) -> Result<Vec<u8>, VerifyError> {
    encode(&Value::Map(vec![
        (int(LABEL_ALG as i64), int(ALG_EDDSA as i64)),
        (
            Value::Text("address".to_string()),
            Value::Bytes(address.to_vec()),
        ),
    ]))
}

/// Unprotected header used when signing raw (unhashed) payloads
pub fn unhashed_header() -> HeaderMap {
    vec![(Value::Text("hashed".to_string()), Value::Bool(false))]
}

/// OKP/Ed25519 COSE_Key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoseKey {
    pub public_key: [u8; 32],
}

impl CoseKey {
    pub fn new(public_key: [u8; 32]) -> Self {
        Self { public_key }
    }

    pub fn from_hex(value: &str) -> Result<Self, VerifyError> {
        Self::from_bytes(&decode_hex(value)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        let Value::Map(map) = decode(bytes)? else {
            return Err(VerifyError::Malformed("COSE_Key must be a map".into()));
        };
        if let Some(Value::Integer(kty)) = lookup_int(&map, KEY_LABEL_KTY) {
            if i128::from(*kty) != KTY_OKP as i128 {
                return Err(VerifyError::Malformed("COSE_Key kty must be OKP".into()));
            }
        }
        if let Some(Value::Integer(crv)) = lookup_int(&map, KEY_LABEL_CRV) {
            if i128::from(*crv) != CRV_ED25519 as i128 {
                return Err(VerifyError::Malformed("COSE_Key curve must be Ed25519".into()));
            }
        }
        let Some(Value::Bytes(x)) = lookup_int(&map, KEY_LABEL_X) else {
            return Err(VerifyError::MissingPublicKey);
        };
        let public_key: [u8; 32] = x
            .as_slice()
            .try_into()
            .map_err(|_| VerifyError::Malformed("Ed25519 public key must be 32 bytes".into()))?;
        Ok(Self { public_key })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, VerifyError> {
        encode(&Value::Map(vec![
            (int(KEY_LABEL_KTY as i64), int(KTY_OKP)),
            (int(KEY_LABEL_ALG as i64), int(ALG_EDDSA as i64)),
            (int(KEY_LABEL_CRV as i64), int(CRV_ED25519)),
            (int(KEY_LABEL_X as i64), Value::Bytes(self.public_key.to_vec())),
        ]))
    }

    pub fn to_hex(&self) -> Result<String, VerifyError> {
        Ok(hex::encode(self.to_bytes()?))
    }
}
