/*
[INPUT]:  Blockfrost project id, base URL, addresses and asset units
[OUTPUT]: Address holdings, asset details and asset holders
[POS]:    HTTP layer - external blockchain indexer client (server-side only)
[UPDATE]: When Blockfrost endpoints or error semantics change
*/

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::http::{ClientConfig, Result, WalletError};
use crate::types::{AddressBalance, Asset, Network};

pub const MAINNET_BASE_URL: &str = "https://cardano-mainnet.blockfrost.io/api/v0";
pub const TESTNET_BASE_URL: &str = "https://cardano-preprod.blockfrost.io/api/v0";

/// Default Blockfrost endpoint for `network`
pub fn default_base_url(network: Network) -> &'static str {
    match network {
        Network::Mainnet => MAINNET_BASE_URL,
        Network::Testnet => TESTNET_BASE_URL,
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Amount {
    unit: String,
    quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AddressContent {
    #[serde(default)]
    amount: Vec<Amount>,
}

/// `GET /assets/{unit}` subset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetDetails {
    pub asset: String,
    pub policy_id: String,
    #[serde(default)]
    pub asset_name: Option<String>,
    pub fingerprint: String,
    pub quantity: String,
    #[serde(default)]
    pub onchain_metadata: Option<serde_json::Value>,
}

/// `GET /assets/{unit}/addresses` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetHolder {
    pub address: String,
    pub quantity: String,
}

/// Client for the Blockfrost REST API.
///
/// The project id travels in a header and never appears in URLs or logs.
#[derive(Clone)]
pub struct BlockfrostClient {
    http_client: Client,
    base_url: Url,
    project_id: String,
    timeout: Duration,
}

impl BlockfrostClient {
    pub fn new(base_url: &str, project_id: impl Into<String>) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url, project_id)
    }

    pub fn with_config(
        config: ClientConfig,
        base_url: &str,
        project_id: impl Into<String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(WalletError::Config(format!(
                "indexer base URL cannot be a base: {base_url}"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            project_id: project_id.into(),
            timeout: config.timeout,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments);
        debug!(path = %url.path(), "Indexer request");

        let response = self
            .http_client
            .get(url)
            .header("project_id", &self.project_id)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| self.transport_error(e));
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => WalletError::NotFound(segments.join("/")),
            StatusCode::BAD_REQUEST => WalletError::InvalidAddress(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WalletError::ServiceMisconfigured(
                "indexer rejected the configured project id".to_string(),
            ),
            StatusCode::PAYMENT_REQUIRED => {
                WalletError::IndexerUnavailable("indexer request quota exhausted".to_string())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                WalletError::IndexerUnavailable("indexer rate limit reached".to_string())
            }
            s if s.is_client_error() || s.is_server_error() => {
                WalletError::IndexerUnavailable(format!("indexer returned {s}"))
            }
            s => WalletError::api_error(s, message),
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> WalletError {
        if error.is_timeout() {
            WalletError::IndexerUnavailable(format!(
                "indexer timed out after {}s",
                self.timeout.as_secs()
            ))
        } else if error.is_decode() {
            WalletError::IndexerUnavailable(format!("unexpected indexer response: {error}"))
        } else {
            WalletError::IndexerUnavailable(format!("indexer unreachable: {error}"))
        }
    }

    /// Current holdings of `address`; an address never seen on chain holds nothing
    pub async fn address_balance(&self, address: &str) -> Result<AddressBalance> {
        let content: AddressContent = match self.get(&["addresses", address]).await {
            Ok(content) => content,
            Err(WalletError::NotFound(_)) => return Ok(AddressBalance::empty()),
            Err(e) => return Err(e),
        };

        let mut balance = AddressBalance::empty();
        for amount in content.amount {
            if amount.unit == "lovelace" {
                balance.lovelace = amount.quantity;
            } else {
                balance.assets.push(Asset::new(amount.unit, amount.quantity));
            }
        }
        Ok(balance)
    }

    pub async fn asset(&self, unit: &str) -> Result<AssetDetails> {
        self.get(&["assets", unit]).await
    }

    pub async fn asset_addresses(&self, unit: &str) -> Result<Vec<AssetHolder>> {
        self.get(&["assets", unit, "addresses"]).await
    }
}

impl std::fmt::Debug for BlockfrostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockfrostClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HANDLE_UNIT: &str =
        "f0ff48bbb7bbe9d59a40f1ce90e9e9d0ff5002ec48f232b49ca0fb9a6361726461";

    fn client(server: &MockServer) -> BlockfrostClient {
        BlockfrostClient::new(&format!("{}/api/v0", server.uri()), "preprodTEST").unwrap()
    }

    #[test]
    fn test_default_base_urls() {
        assert!(default_base_url(Network::Mainnet).contains("mainnet"));
        assert!(default_base_url(Network::Testnet).contains("preprod"));
    }

    #[tokio::test]
    async fn test_address_balance_splits_lovelace_and_assets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v0/addresses/addr1xyz"))
            .and(header("project_id", "preprodTEST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": "addr1xyz",
                "amount": [
                    {"unit": "lovelace", "quantity": "28240000"},
                    {"unit": HANDLE_UNIT, "quantity": "1"}
                ],
                "stake_address": null,
                "type": "shelley",
                "script": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let balance = client(&server).address_balance("addr1xyz").await.unwrap();
        assert_eq!(balance.lovelace, "28240000");
        assert_eq!(balance.assets.len(), 1);
        assert_eq!(
            balance.assets[0].policy_id.as_deref(),
            Some("f0ff48bbb7bbe9d59a40f1ce90e9e9d0ff5002ec48f232b49ca0fb9a")
        );
    }

    #[tokio::test]
    async fn test_unknown_address_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v0/addresses/addr1fresh"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status_code": 404,
                "error": "Not Found",
                "message": "The requested component has not been found."
            })))
            .mount(&server)
            .await;

        let balance = client(&server).address_balance("addr1fresh").await.unwrap();
        assert_eq!(balance, AddressBalance::empty());
    }

    #[tokio::test]
    async fn test_server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client(&server).address_balance("addr1xyz").await;
        assert!(matches!(result, Err(WalletError::IndexerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_quota_and_unexpected_client_errors_are_unavailable() {
        for status in [402, 409, 418, 425] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_string("daily limit"))
                .mount(&server)
                .await;

            let result = client(&server).address_balance("addr1xyz").await;
            assert!(
                matches!(result, Err(WalletError::IndexerUnavailable(_))),
                "status {status}: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_forbidden_is_misconfiguration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = client(&server).asset(HANDLE_UNIT).await;
        assert!(matches!(result, Err(WalletError::ServiceMisconfigured(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = ClientConfig {
            timeout: Duration::from_millis(100),
            connect_timeout: Duration::from_millis(100),
        };
        let client =
            BlockfrostClient::with_config(config, &format!("{}/api/v0", server.uri()), "x")
                .unwrap();
        let result = client.address_balance("addr1xyz").await;
        assert!(matches!(result, Err(WalletError::IndexerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_asset_holders() {
        let server = MockServer::start().await;
        let holders_path = format!("/api/v0/assets/{HANDLE_UNIT}/addresses");
        Mock::given(method("GET"))
            .and(path(holders_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"address": "addr1holder", "quantity": "1"}
            ])))
            .mount(&server)
            .await;

        let holders = client(&server).asset_addresses(HANDLE_UNIT).await.unwrap();
        assert_eq!(holders[0].address, "addr1holder");
    }
}
