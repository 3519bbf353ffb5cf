/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{LookupStatus, Network};

pub const LOVELACE_PER_ADA: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub unit: String,
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

impl Asset {
    pub fn new(unit: impl Into<String>, quantity: impl Into<String>) -> Self {
        let unit = unit.into();
        let policy_id = if unit == "lovelace" {
            None
        } else {
            unit.get(..56).map(str::to_string)
        };
        Self {
            unit,
            quantity: quantity.into(),
            fingerprint: None,
            policy_id,
        }
    }
}

/// Holdings of a single address as reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AddressBalance {
    /// Lovelace amount as a decimal integer string
    pub lovelace: String,
    pub assets: Vec<Asset>,
}

impl AddressBalance {
    pub fn empty() -> Self {
        Self {
            lovelace: "0".to_string(),
            assets: Vec::new(),
        }
    }
}

/// Result of a balance lookup through the indexer proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceLookup {
    Ok {
        lovelace: String,
        assets: Vec<Asset>,
    },
    Unavailable {
        reason: String,
    },
    /// Fabricated figures served only when the server runs in demo mode
    Demo {
        lovelace: String,
        assets: Vec<Asset>,
    },
}

impl BalanceLookup {
    pub fn status(&self) -> LookupStatus {
        match self {
            BalanceLookup::Ok { .. } => LookupStatus::Ok,
            BalanceLookup::Unavailable { .. } => LookupStatus::Unavailable,
            BalanceLookup::Demo { .. } => LookupStatus::Demo,
        }
    }

    /// The balance if it is known, real or demo
    pub fn balance(&self) -> Option<AddressBalance> {
        match self {
            BalanceLookup::Ok { lovelace, assets } | BalanceLookup::Demo { lovelace, assets } => {
                Some(AddressBalance {
                    lovelace: lovelace.clone(),
                    assets: assets.clone(),
                })
            }
            BalanceLookup::Unavailable { .. } => None,
        }
    }
}

impl From<AddressBalance> for BalanceLookup {
    fn from(balance: AddressBalance) -> Self {
        BalanceLookup::Ok {
            lovelace: balance.lovelace,
            assets: balance.assets,
        }
    }
}

/// Handle(s) held by an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleResolution {
    pub status: LookupStatus,
    pub handle: Option<String>,
    pub handles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HandleResolution {
    /// No handle assets at this address
    pub fn none(status: LookupStatus) -> Self {
        Self {
            status,
            handle: None,
            handles: None,
            policy_id: None,
            fingerprint: None,
            metadata: None,
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::none(LookupStatus::Unavailable)
        }
    }
}

/// Reverse lookup result: handle name to holder address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleLookup {
    pub found: bool,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Binding of a verified wallet address to a login session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub user_id: u64,
    pub wallet_address: String,
    pub network: Network,
    pub connected_at: DateTime<Utc>,
}

/// Installed wallet as shown in a picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDescriptor {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub version: String,
}

/// CIP-30 `signData` output: hex CBOR COSE_Sign1 plus hex CBOR COSE_Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSignature {
    pub signature: String,
    pub key: String,
}

/// Client-side cached view of the connected wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub name: String,
    pub address: String,
    pub handle: Option<String>,
    pub handles: Vec<String>,
    pub balance: BalanceLookup,
    pub network: Network,
    pub reward_address: Option<String>,
    pub refreshed_at: DateTime<Utc>,
}

/// Render a lovelace amount as ADA, e.g. `"28240000"` -> `"28.24 ₳"`.
///
/// Returns `None` if `lovelace` is not a non-negative integer.
pub fn format_ada(lovelace: &str) -> Option<String> {
    let raw: i128 = lovelace.trim().parse().ok()?;
    if raw < 0 {
        return None;
    }
    let ada = Decimal::try_from_i128_with_scale(raw, LOVELACE_PER_ADA).ok()?;
    let mut ada = ada.normalize();
    if ada.scale() < 2 {
        ada.rescale(2);
    }
    Some(format!("{ada} ₳"))
}
