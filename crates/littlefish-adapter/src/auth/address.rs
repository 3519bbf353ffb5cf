/*
[INPUT]:  Bech32 or hex encoded Shelley addresses, Ed25519 public keys
[OUTPUT]: Decoded address header, network and credentials
[POS]:    Auth layer - address decoding for signature ownership checks
[UPDATE]: When supporting new address kinds (pointer, Byron, scripts)
*/

use bech32::{Bech32, Hrp};
use blake2::digest::consts::U28;
use blake2::{Blake2b, Digest};

use crate::http::{Result, WalletError};
use crate::types::Network;

type Blake2b224 = Blake2b<U28>;

pub const KEY_HASH_LEN: usize = 28;

/// Hash a verification key the way Shelley addresses commit to it
pub fn key_hash(public_key: &[u8; 32]) -> [u8; KEY_HASH_LEN] {
    let digest = Blake2b224::digest(public_key);
    let mut out = [0u8; KEY_HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Base,
    Pointer,
    Enterprise,
    Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Key([u8; KEY_HASH_LEN]),
    Script([u8; KEY_HASH_LEN]),
}

/// A decoded Shelley-era address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelleyAddress {
    bytes: Vec<u8>,
    kind: AddressKind,
    network: Network,
}

impl ShelleyAddress {
    /// Parse a bech32 (`addr1...`, `stake_test1...`) or raw hex address
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Ok((hrp, data)) = bech32::decode(value) {
            let address = Self::from_bytes(data)?;
            let expected = match address.kind {
                AddressKind::Reward => address.network.reward_hrp(),
                _ => address.network.address_hrp(),
            };
            if hrp.as_str() != expected {
                return Err(WalletError::InvalidAddress(format!(
                    "prefix '{}' does not match address header (expected '{expected}')",
                    hrp.as_str()
                )));
            }
            return Ok(address);
        }

        let bytes = hex::decode(value)
            .map_err(|_| WalletError::InvalidAddress("not bech32 or hex".to_string()))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = *bytes
            .first()
            .ok_or_else(|| WalletError::InvalidAddress("empty address".to_string()))?;
        let network = Network::from_id(header & 0x0f);
        let (kind, expected_len) = match header >> 4 {
            0..=3 => (AddressKind::Base, 1 + 2 * KEY_HASH_LEN),
            4 | 5 => (AddressKind::Pointer, 0),
            6 | 7 => (AddressKind::Enterprise, 1 + KEY_HASH_LEN),
            14 | 15 => (AddressKind::Reward, 1 + KEY_HASH_LEN),
            other => {
                return Err(WalletError::InvalidAddress(format!(
                    "unsupported address type {other}"
                )));
            }
        };

        let length_ok = match kind {
            // Pointer tails are variable-length integers
            AddressKind::Pointer => bytes.len() > 1 + KEY_HASH_LEN,
            _ => bytes.len() == expected_len,
        };
        if !length_ok {
            return Err(WalletError::InvalidAddress(format!(
                "unexpected length {} for {kind:?} address",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            kind,
            network,
        })
    }

    /// Enterprise address paying to a key hash
    pub fn enterprise(network: Network, payment: [u8; KEY_HASH_LEN]) -> Self {
        let mut bytes = Vec::with_capacity(1 + KEY_HASH_LEN);
        bytes.push(0x60 | network.id());
        bytes.extend_from_slice(&payment);
        Self {
            bytes,
            kind: AddressKind::Enterprise,
            network,
        }
    }

    /// Base address with key payment and key stake credentials
    pub fn base(network: Network, payment: [u8; KEY_HASH_LEN], stake: [u8; KEY_HASH_LEN]) -> Self {
        let mut bytes = Vec::with_capacity(1 + 2 * KEY_HASH_LEN);
        bytes.push(network.id());
        bytes.extend_from_slice(&payment);
        bytes.extend_from_slice(&stake);
        Self {
            bytes,
            kind: AddressKind::Base,
            network,
        }
    }

    /// Reward address for a stake key hash
    pub fn reward(network: Network, stake: [u8; KEY_HASH_LEN]) -> Self {
        let mut bytes = Vec::with_capacity(1 + KEY_HASH_LEN);
        bytes.push(0xe0 | network.id());
        bytes.extend_from_slice(&stake);
        Self {
            bytes,
            kind: AddressKind::Reward,
            network,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn to_bech32(&self) -> Result<String> {
        let prefix = match self.kind {
            AddressKind::Reward => self.network.reward_hrp(),
            _ => self.network.address_hrp(),
        };
        let hrp = Hrp::parse(prefix).map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.bytes)
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))
    }

    /// The credential a message signature must be made with.
    ///
    /// Payment credential for payment addresses, stake credential for reward addresses.
    pub fn signing_credential(&self) -> Credential {
        let is_script = (self.bytes[0] >> 4) & 0x01 == 1;
        let mut hash = [0u8; KEY_HASH_LEN];
        hash.copy_from_slice(&self.bytes[1..1 + KEY_HASH_LEN]);
        if is_script {
            Credential::Script(hash)
        } else {
            Credential::Key(hash)
        }
    }

    /// Whether `public_key` controls this address
    pub fn is_controlled_by(&self, public_key: &[u8; 32]) -> bool {
        match self.signing_credential() {
            Credential::Key(hash) => hash == key_hash(public_key),
            Credential::Script(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PUBLIC_KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn test_key_hash_length_and_determinism() {
        let first = key_hash(&PUBLIC_KEY);
        assert_eq!(first.len(), KEY_HASH_LEN);
        assert_eq!(first, key_hash(&PUBLIC_KEY));
        assert_ne!(first, key_hash(&[8u8; 32]));
    }

    #[rstest]
    #[case(Network::Mainnet, "addr1")]
    #[case(Network::Testnet, "addr_test1")]
    fn test_enterprise_bech32_roundtrip(#[case] network: Network, #[case] prefix: &str) {
        let address = ShelleyAddress::enterprise(network, key_hash(&PUBLIC_KEY));
        let encoded = address.to_bech32().unwrap();
        assert!(encoded.starts_with(prefix));

        let parsed = ShelleyAddress::parse(&encoded).unwrap();
        assert_eq!(parsed, address);
        assert_eq!(parsed.kind(), AddressKind::Enterprise);
        assert_eq!(parsed.network(), network);
        assert!(parsed.is_controlled_by(&PUBLIC_KEY));
    }

    #[test]
    fn test_base_address_uses_payment_credential() {
        let stake = key_hash(&[9u8; 32]);
        let address = ShelleyAddress::base(Network::Mainnet, key_hash(&PUBLIC_KEY), stake);
        assert_eq!(address.bytes().len(), 57);
        assert!(address.is_controlled_by(&PUBLIC_KEY));
        assert!(!address.is_controlled_by(&[9u8; 32]));
    }

    #[test]
    fn test_reward_address_uses_stake_credential() {
        let address = ShelleyAddress::reward(Network::Mainnet, key_hash(&PUBLIC_KEY));
        let encoded = address.to_bech32().unwrap();
        assert!(encoded.starts_with("stake1"));
        assert!(ShelleyAddress::parse(&encoded).unwrap().is_controlled_by(&PUBLIC_KEY));
    }

    #[test]
    fn test_hex_address_accepted() {
        let address = ShelleyAddress::enterprise(Network::Testnet, key_hash(&PUBLIC_KEY));
        let parsed = ShelleyAddress::parse(&hex::encode(address.bytes())).unwrap();
        assert_eq!(parsed, address);
    }

    #[rstest]
    #[case("")]
    #[case("addr1notreally")]
    #[case("zz")]
    #[case("8200")]
    fn test_invalid_addresses_rejected(#[case] value: &str) {
        assert!(matches!(
            ShelleyAddress::parse(value),
            Err(WalletError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_prefix_must_match_network() {
        let mainnet = ShelleyAddress::enterprise(Network::Mainnet, key_hash(&PUBLIC_KEY));
        let hrp = Hrp::parse("addr_test").unwrap();
        let mislabeled = bech32::encode::<Bech32>(hrp, mainnet.bytes()).unwrap();
        assert!(ShelleyAddress::parse(&mislabeled).is_err());
    }
}
