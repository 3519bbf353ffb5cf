/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust request structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

use crate::http::error::FieldError;

use super::models::DataSignature;

/// Body of `POST /api/wallet-auth`.
///
/// Missing fields deserialize as empty strings so they surface as
/// field-level validation errors rather than a JSON rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WalletAuthRequest {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub message: String,
    /// Hex CBOR COSE_Sign1
    #[serde(default)]
    pub signature: String,
    /// Hex CBOR COSE_Key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl WalletAuthRequest {
    pub fn new(address: &str, message: &str, signature: &DataSignature) -> Self {
        Self {
            address: address.to_string(),
            message: message.to_string(),
            signature: signature.signature.clone(),
            key: Some(signature.key.clone()),
        }
    }

    /// Structural checks only; cryptographic verification happens server-side.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.address.trim().is_empty() {
            errors.push(FieldError::new("address", "Wallet address is required"));
        }
        if self.message.trim().is_empty() {
            errors.push(FieldError::new("message", "Challenge message is required"));
        }
        if self.signature.trim().is_empty() {
            errors.push(FieldError::new("signature", "Signature is required"));
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_every_empty_field() {
        let errors = WalletAuthRequest::default().validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["address", "message", "signature"]);
    }

    #[test]
    fn test_validate_accepts_populated_payload() {
        let request = WalletAuthRequest {
            address: "addr1xyz".into(),
            message: "Authenticate with Littlefish Foundation: 2024-01-01T00:00:00.000Z".into(),
            signature: "84a0".into(),
            key: None,
        };
        assert!(request.validate().is_empty());
    }

    #[test]
    fn test_missing_fields_deserialize_empty() {
        let request: WalletAuthRequest = serde_json::from_str(r#"{"address":"addr1"}"#).unwrap();
        assert_eq!(request.message, "");
        assert_eq!(request.validate().len(), 2);
    }
}
