/*
[INPUT]:  WalletRegistry, wallet name, challenges, cancellation tokens
[OUTPUT]: Enabled wallet handle, bounded prompts, data signatures
[POS]:    Auth layer - single-wallet connection and prompt handling
[UPDATE]: When prompt timeout policy or enable semantics change
*/

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::challenge::Challenge;
use super::wallet::{WalletApi, WalletRegistry};
use crate::http::{Result, WalletError};
use crate::types::{DataSignature, Network, WalletDescriptor};

pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connects to one wallet from the registry at a time
pub struct WalletConnector {
    registry: WalletRegistry,
    prompt_timeout: Duration,
    enabled: Option<(String, Arc<dyn WalletApi>)>,
}

impl WalletConnector {
    pub fn new(registry: WalletRegistry) -> Self {
        Self {
            registry,
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
            enabled: None,
        }
    }

    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    pub fn list_available(&self) -> Vec<WalletDescriptor> {
        self.registry.list_available()
    }

    pub fn wallet_name(&self) -> Option<&str> {
        self.enabled.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.is_some()
    }

    /// Ask `name` for access, replacing any previously enabled wallet
    pub async fn enable(&mut self, name: &str) -> Result<()> {
        let provider = self
            .registry
            .get(name)
            .ok_or_else(|| WalletError::WalletUnavailable {
                name: name.to_string(),
            })?;

        let api = self
            .prompt(provider.enable(), &CancellationToken::new())
            .await?;
        info!(wallet = %name, "Wallet enabled");
        self.enabled = Some((name.to_string(), api));
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some((name, _)) = self.enabled.take() {
            info!(wallet = %name, "Wallet disconnected");
        }
    }

    fn api(&self) -> Result<Arc<dyn WalletApi>> {
        self.enabled
            .as_ref()
            .map(|(_, api)| Arc::clone(api))
            .ok_or(WalletError::NotConnected)
    }

    pub async fn address(&self) -> Result<String> {
        self.api()?.address().await
    }

    pub async fn reward_address(&self) -> Result<Option<String>> {
        self.api()?.reward_address().await
    }

    pub async fn network(&self) -> Result<Network> {
        self.api()?.network().await
    }

    pub async fn balance(&self) -> Result<String> {
        self.api()?.balance().await
    }

    /// Sign `challenge` with the enabled wallet's payment address
    pub async fn authenticate(
        &self,
        challenge: &Challenge,
        cancel: &CancellationToken,
    ) -> Result<DataSignature> {
        let api = self.api()?;
        let address = api.address().await?;
        debug!(address = %address, "Requesting challenge signature");

        self.prompt(api.sign_data(&address, &challenge.message), cancel)
            .await
            .map_err(|e| match e {
                WalletError::UserRejected { .. } => WalletError::SignatureDeclined,
                other => other,
            })
    }

    pub async fn sign_transaction(
        &self,
        tx_body_cbor: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let api = self.api()?;
        self.prompt(api.sign_transaction(tx_body_cbor), cancel).await
    }

    /// Wait on a user-paced wallet prompt, bounded by the timeout and `cancel`
    async fn prompt<T, F>(&self, request: F, cancel: &CancellationToken) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Wallet prompt cancelled");
                Err(WalletError::Cancelled)
            }
            outcome = tokio::time::timeout(self.prompt_timeout, request) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_secs = self.prompt_timeout.as_secs(), "Wallet prompt timed out");
                    Err(WalletError::PromptTimeout {
                        duration: self.prompt_timeout.as_secs(),
                    })
                }
            },
        }
    }
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("registry", &self.registry)
            .field("prompt_timeout", &self.prompt_timeout)
            .field("enabled", &self.wallet_name())
            .finish()
    }
}
