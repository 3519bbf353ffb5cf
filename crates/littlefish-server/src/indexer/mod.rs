/*
[INPUT]:  Indexer configuration, addresses, handle names
[OUTPUT]: Typed balance and handle results that tell "unknown" apart from "zero"
[POS]:    Indexer layer - Blockfrost-backed resolvers
[UPDATE]: When lookup semantics or demo behavior change
*/

pub mod handle;

use littlefish_adapter::{
    BalanceLookup, BlockfrostClient, ClientConfig, HandleLookup, HandleResolution, LookupStatus,
    Result, ShelleyAddress, WalletError, http::blockfrost::default_base_url,
};
use tracing::{debug, warn};

use crate::config::{IndexerConfig, IndexerMode};
use handle::{HANDLE_POLICY_ID, handle_units, handles_in};

pub use handle::{decode_handle_name, normalize_handle};

/// Balance served in demo mode (150 ADA)
pub const DEMO_LOVELACE: &str = "150000000";

#[derive(Debug)]
enum Backend {
    Blockfrost(BlockfrostClient),
    Demo,
    Misconfigured,
}

/// Answers balance and handle questions for the HTTP layer.
///
/// Without an indexer key it either serves demo figures or fails closed,
/// depending on [`IndexerMode`].
#[derive(Debug)]
pub struct IndexerResolver {
    backend: Backend,
}

impl IndexerResolver {
    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        let backend = match (config.project_id(), config.mode) {
            (Some(project_id), _) => {
                let base_url = config
                    .base_url
                    .as_deref()
                    .unwrap_or_else(|| default_base_url(config.network));
                let client_config = ClientConfig {
                    timeout: config.timeout(),
                    connect_timeout: config.timeout().min(ClientConfig::default().connect_timeout),
                };
                Backend::Blockfrost(BlockfrostClient::with_config(
                    client_config,
                    base_url,
                    project_id,
                )?)
            }
            (None, IndexerMode::Demo) => Backend::Demo,
            (None, IndexerMode::Production) => Backend::Misconfigured,
        };
        Ok(Self { backend })
    }

    pub fn blockfrost(client: BlockfrostClient) -> Self {
        Self {
            backend: Backend::Blockfrost(client),
        }
    }

    pub fn demo() -> Self {
        Self {
            backend: Backend::Demo,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.backend, Backend::Demo)
    }

    fn client(&self) -> Result<Option<&BlockfrostClient>> {
        match &self.backend {
            Backend::Blockfrost(client) => Ok(Some(client)),
            Backend::Demo => Ok(None),
            Backend::Misconfigured => Err(WalletError::ServiceMisconfigured(
                "indexer API key is not configured".to_string(),
            )),
        }
    }

    /// Holdings of `address`; indexer outages degrade to `Unavailable`
    pub async fn resolve_balance(&self, address: &str) -> Result<BalanceLookup> {
        validate_address(address)?;
        let Some(client) = self.client()? else {
            return Ok(BalanceLookup::Demo {
                lovelace: DEMO_LOVELACE.to_string(),
                assets: Vec::new(),
            });
        };

        match client.address_balance(address).await {
            Ok(balance) => Ok(balance.into()),
            Err(WalletError::IndexerUnavailable(reason)) => {
                warn!(%reason, "Balance lookup degraded");
                Ok(BalanceLookup::Unavailable { reason })
            }
            Err(e) => Err(e),
        }
    }

    /// Handles held by `address`; `handle`/`handles` are null when it holds none
    pub async fn resolve_handle(&self, address: &str) -> Result<HandleResolution> {
        validate_address(address)?;
        let Some(client) = self.client()? else {
            return Ok(HandleResolution::none(LookupStatus::Demo));
        };

        let balance = match client.address_balance(address).await {
            Ok(balance) => balance,
            Err(WalletError::IndexerUnavailable(reason)) => {
                warn!(%reason, "Handle lookup degraded");
                return Ok(HandleResolution::unavailable(reason));
            }
            Err(e) => return Err(e),
        };

        let held = handles_in(&balance.assets);
        let Some(primary) = held.first() else {
            return Ok(HandleResolution::none(LookupStatus::Ok));
        };

        let mut resolution = HandleResolution {
            handle: Some(primary.name.clone()),
            handles: Some(held.iter().map(|h| h.name.clone()).collect()),
            policy_id: Some(HANDLE_POLICY_ID.to_string()),
            ..HandleResolution::none(LookupStatus::Ok)
        };
        match client.asset(&primary.unit).await {
            Ok(details) => {
                resolution.fingerprint = Some(details.fingerprint);
                resolution.metadata = details.onchain_metadata;
            }
            Err(e) => debug!(error = %e, "Handle metadata unavailable"),
        }
        Ok(resolution)
    }

    /// Reverse lookup: which address holds `$name`
    pub async fn lookup(&self, name: &str) -> Result<HandleLookup> {
        let name = normalize_handle(name).ok_or_else(|| WalletError::Validation {
            message: "Handle name is required".to_string(),
            errors: vec![littlefish_adapter::FieldError::new(
                "handleName",
                "Handle name is required",
            )],
        })?;
        let not_found = |reason: &str| HandleLookup {
            found: false,
            handle: name.clone(),
            address: None,
            policy_id: None,
            reason: Some(reason.to_string()),
        };

        let Some(client) = self.client()? else {
            return Ok(not_found("Handle lookups are disabled in demo mode"));
        };

        for unit in handle_units(&name) {
            let holders = match client.asset_addresses(&unit).await {
                Ok(holders) => holders,
                Err(WalletError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if let Some(holder) = holders.into_iter().find(|h| h.quantity != "0") {
                return Ok(HandleLookup {
                    found: true,
                    handle: name,
                    address: Some(holder.address),
                    policy_id: Some(HANDLE_POLICY_ID.to_string()),
                    reason: None,
                });
            }
        }
        Ok(not_found("Handle not registered"))
    }
}

fn validate_address(address: &str) -> Result<()> {
    ShelleyAddress::parse(address).map(|_| ())
}
