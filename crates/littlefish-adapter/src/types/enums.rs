/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// Cardano network a wallet or address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    /// Network id as encoded in the low nibble of a Shelley address header
    pub fn id(self) -> u8 {
        match self {
            Network::Testnet => 0,
            Network::Mainnet => 1,
        }
    }

    pub fn from_id(id: u8) -> Self {
        if id == 1 {
            Network::Mainnet
        } else {
            Network::Testnet
        }
    }

    /// Bech32 prefix for payment addresses on this network
    pub fn address_hrp(self) -> &'static str {
        match self {
            Network::Testnet => "addr_test",
            Network::Mainnet => "addr",
        }
    }

    /// Bech32 prefix for reward (stake) addresses on this network
    pub fn reward_hrp(self) -> &'static str {
        match self {
            Network::Testnet => "stake_test",
            Network::Mainnet => "stake",
        }
    }
}

/// Outcome label for indexer-backed lookups.
///
/// `Unavailable` lets the UI tell "0 balance" apart from "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    Ok,
    Unavailable,
    Demo,
}
