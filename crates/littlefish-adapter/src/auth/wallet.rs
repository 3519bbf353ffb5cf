/*
[INPUT]:  Wallet configuration, signing requests from the connector
[OUTPUT]: Uniform wallet capability surface (address, balance, signing)
[POS]:    Auth layer - wallet provider abstraction
[UPDATE]: When adding new wallet types or changing signature format
*/

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ciborium::value::{Integer, Value};
use serde::{Deserialize, Serialize};

use super::address::ShelleyAddress;
use super::signer::Ed25519Signer;
use crate::http::{Result, WalletError};
use crate::types::{DataSignature, Network, WalletDescriptor};

/// An installed wallet that can be asked for access
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn descriptor(&self) -> WalletDescriptor;

    /// Show the permission prompt; `UserRejected` if declined
    async fn enable(&self) -> Result<Arc<dyn WalletApi>>;
}

/// Capabilities of an enabled wallet
///
/// Addresses are bech32. The trait is async because every call may
/// wait on a user prompt or an external signer.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn network(&self) -> Result<Network>;

    async fn address(&self) -> Result<String>;

    async fn reward_address(&self) -> Result<Option<String>>;

    /// Wallet-reported lovelace balance
    async fn balance(&self) -> Result<String>;

    /// CIP-30 `signData`
    async fn sign_data(&self, address: &str, message: &str) -> Result<DataSignature>;

    /// CIP-30 `signTx`: returns the hex CBOR witness set for a hex CBOR transaction body
    async fn sign_transaction(&self, tx_body_cbor: &str) -> Result<String>;
}

/// Software wallet backed by in-memory Ed25519 keys
#[derive(Clone)]
pub struct KeyWallet {
    name: String,
    icon: Option<String>,
    network: Network,
    payment: Arc<Ed25519Signer>,
    stake: Option<Arc<Ed25519Signer>>,
    lovelace: String,
}

impl KeyWallet {
    /// Enterprise-address wallet with a freshly generated key
    pub fn generate(name: impl Into<String>, network: Network) -> Self {
        Self::from_signers(name, network, Ed25519Signer::generate(), None)
    }

    pub fn from_signers(
        name: impl Into<String>,
        network: Network,
        payment: Ed25519Signer,
        stake: Option<Ed25519Signer>,
    ) -> Self {
        Self {
            name: name.into(),
            icon: None,
            network,
            payment: Arc::new(payment),
            stake: stake.map(Arc::new),
            lovelace: "0".to_string(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_balance(mut self, lovelace: impl Into<String>) -> Self {
        self.lovelace = lovelace.into();
        self
    }

    /// Base address when a stake key is present, enterprise otherwise
    pub fn payment_address(&self) -> ShelleyAddress {
        match &self.stake {
            Some(stake) => {
                ShelleyAddress::base(self.network, self.payment.key_hash(), stake.key_hash())
            }
            None => ShelleyAddress::enterprise(self.network, self.payment.key_hash()),
        }
    }

    pub fn stake_address(&self) -> Option<ShelleyAddress> {
        self.stake
            .as_ref()
            .map(|stake| ShelleyAddress::reward(self.network, stake.key_hash()))
    }

    fn signer_for(&self, address: &ShelleyAddress) -> Option<&Ed25519Signer> {
        if *address == self.payment_address() {
            return Some(&self.payment);
        }
        match (&self.stake, self.stake_address()) {
            (Some(stake), Some(reward)) if reward == *address => Some(stake),
            _ => None,
        }
    }
}

impl std::fmt::Debug for KeyWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyWallet")
            .field("name", &self.name)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WalletProvider for KeyWallet {
    fn descriptor(&self) -> WalletDescriptor {
        WalletDescriptor {
            name: self.name.clone(),
            icon: self.icon.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn enable(&self) -> Result<Arc<dyn WalletApi>> {
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl WalletApi for KeyWallet {
    async fn network(&self) -> Result<Network> {
        Ok(self.network)
    }

    async fn address(&self) -> Result<String> {
        self.payment_address().to_bech32()
    }

    async fn reward_address(&self) -> Result<Option<String>> {
        self.stake_address().map(|a| a.to_bech32()).transpose()
    }

    async fn balance(&self) -> Result<String> {
        Ok(self.lovelace.clone())
    }

    async fn sign_data(&self, address: &str, message: &str) -> Result<DataSignature> {
        let address = ShelleyAddress::parse(address)?;
        let signer = self.signer_for(&address).ok_or_else(|| {
            WalletError::InvalidAddress("address does not belong to this wallet".to_string())
        })?;
        signer.sign_data(address.bytes(), message)
    }

    async fn sign_transaction(&self, tx_body_cbor: &str) -> Result<String> {
        let body = hex::decode(tx_body_cbor.trim())
            .map_err(|e| WalletError::Config(format!("transaction body is not hex: {e}")))?;
        let tx_hash = Blake2b::<U32>::digest(&body);
        let signature = self.payment.sign(&tx_hash);

        // witness set {0: [[vkey, signature]]}
        let witness = Value::Map(vec![(
            Value::Integer(Integer::from(0u8)),
            Value::Array(vec![Value::Array(vec![
                Value::Bytes(self.payment.public_key_bytes().to_vec()),
                Value::Bytes(signature.to_bytes().to_vec()),
            ])]),
        )]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&witness, &mut buf)
            .map_err(|e| WalletError::Config(format!("witness encoding failed: {e}")))?;
        Ok(hex::encode(buf))
    }
}

/// Scripted wallet for tests and demos
#[derive(Debug, Clone)]
pub struct MockWallet {
    name: String,
    network: Network,
    address: String,
    lovelace: String,
    signature: DataSignature,
    reject_enable: bool,
    reject_sign: bool,
    prompt_delay: Option<Duration>,
}

impl MockWallet {
    /// Create a mock wallet with a predetermined signature
    pub fn new(name: &str, address: &str, signature: DataSignature) -> Self {
        Self {
            name: name.to_string(),
            network: Network::Testnet,
            address: address.to_string(),
            lovelace: "0".to_string(),
            signature,
            reject_enable: false,
            reject_sign: false,
            prompt_delay: None,
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_balance(mut self, lovelace: impl Into<String>) -> Self {
        self.lovelace = lovelace.into();
        self
    }

    /// Decline the permission prompt
    pub fn rejecting_enable(mut self) -> Self {
        self.reject_enable = true;
        self
    }

    /// Decline every signing prompt
    pub fn rejecting_sign(mut self) -> Self {
        self.reject_sign = true;
        self
    }

    /// Simulate a user who takes `delay` to answer each prompt
    pub fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = Some(delay);
        self
    }

    async fn wait_for_user(&self) {
        if let Some(delay) = self.prompt_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn descriptor(&self) -> WalletDescriptor {
        WalletDescriptor {
            name: self.name.clone(),
            icon: None,
            version: "mock".to_string(),
        }
    }

    async fn enable(&self) -> Result<Arc<dyn WalletApi>> {
        self.wait_for_user().await;
        if self.reject_enable {
            return Err(WalletError::UserRejected {
                name: self.name.clone(),
            });
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl WalletApi for MockWallet {
    async fn network(&self) -> Result<Network> {
        Ok(self.network)
    }

    async fn address(&self) -> Result<String> {
        Ok(self.address.clone())
    }

    async fn reward_address(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn balance(&self) -> Result<String> {
        Ok(self.lovelace.clone())
    }

    async fn sign_data(&self, _address: &str, _message: &str) -> Result<DataSignature> {
        self.wait_for_user().await;
        if self.reject_sign {
            return Err(WalletError::SignatureDeclined);
        }
        Ok(self.signature.clone())
    }

    async fn sign_transaction(&self, _tx_body_cbor: &str) -> Result<String> {
        self.wait_for_user().await;
        if self.reject_sign {
            return Err(WalletError::SignatureDeclined);
        }
        Ok(String::new())
    }
}

/// How a configured wallet is backed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalletKind {
    /// Software keys; a missing key is generated for the lifetime of the process
    Key {
        #[serde(default)]
        payment_key_hex: Option<String>,
        #[serde(default)]
        stake_key_hex: Option<String>,
    },
    Mock {
        address: String,
        #[serde(default)]
        reject_enable: bool,
        #[serde(default)]
        reject_sign: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub name: String,
    #[serde(default)]
    pub network: Network,
    #[serde(flatten)]
    pub kind: WalletKind,
}

fn secret_key(field: &str, value: &str) -> Result<Ed25519Signer> {
    let bytes = hex::decode(value.trim())
        .map_err(|e| WalletError::Config(format!("{field} is not hex: {e}")))?;
    let secret: [u8; 32] = bytes
        .try_into()
        .map_err(|_| WalletError::Config(format!("{field} must be 32 bytes")))?;
    Ok(Ed25519Signer::from_secret_key(&secret))
}

impl WalletConfig {
    /// Build the provider this entry selects
    pub fn build(&self) -> Result<Arc<dyn WalletProvider>> {
        match &self.kind {
            WalletKind::Key {
                payment_key_hex,
                stake_key_hex,
            } => {
                let payment = match payment_key_hex {
                    Some(hex) => secret_key("payment_key_hex", hex)?,
                    None => Ed25519Signer::generate(),
                };
                let stake = stake_key_hex
                    .as_deref()
                    .map(|hex| secret_key("stake_key_hex", hex))
                    .transpose()?;
                Ok(Arc::new(KeyWallet::from_signers(
                    &self.name,
                    self.network,
                    payment,
                    stake,
                )))
            }
            WalletKind::Mock {
                address,
                reject_enable,
                reject_sign,
            } => {
                let placeholder = DataSignature {
                    signature: String::new(),
                    key: String::new(),
                };
                let mut wallet =
                    MockWallet::new(&self.name, address, placeholder).with_network(self.network);
                if *reject_enable {
                    wallet = wallet.rejecting_enable();
                }
                if *reject_sign {
                    wallet = wallet.rejecting_sign();
                }
                Ok(Arc::new(wallet))
            }
        }
    }
}

/// The set of wallets the user could pick from
#[derive(Default, Clone)]
pub struct WalletRegistry {
    providers: Vec<Arc<dyn WalletProvider>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &[WalletConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            registry.register(config.build()?);
        }
        Ok(registry)
    }

    /// Add a provider, replacing any with the same name
    pub fn register(&mut self, provider: Arc<dyn WalletProvider>) {
        let name = provider.descriptor().name;
        self.providers.retain(|p| p.descriptor().name != name);
        self.providers.push(provider);
    }

    /// Installed wallets; empty when none are present
    pub fn list_available(&self) -> Vec<WalletDescriptor> {
        self.providers.iter().map(|p| p.descriptor()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn WalletProvider>> {
        self.providers
            .iter()
            .find(|p| p.descriptor().name == name)
            .cloned()
    }
}

impl std::fmt::Debug for WalletRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.list_available()).finish()
    }
}
