/*
[INPUT]:  Credentials, wallet-auth payloads, addresses and handle names
[OUTPUT]: Users, wallet sessions, challenges and indexer lookups
[POS]:    HTTP layer - Littlefish API endpoints
[UPDATE]: When adding new endpoints or changing response format
*/

use reqwest::{Method, StatusCode};
use tracing::warn;

use crate::http::client::parse_response;
use crate::http::{LittlefishClient, Result, WalletError};
use crate::types::{
    BalanceLookup, ChallengeResponse, HandleLookup, HandleResolution, LoginRequest,
    MessageResponse, RegisterRequest, User, WalletAuthRequest, WalletAuthResponse, WalletSession,
};

impl LittlefishClient {
    /// POST /api/register
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let builder = self.request(Method::POST, "/api/register")?.json(request);
        self.send_json(builder).await
    }

    /// POST /api/login
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let builder = self.request(Method::POST, "/api/login")?.json(&body);
        self.send_json(builder).await
    }

    /// POST /api/logout
    pub async fn logout(&self) -> Result<MessageResponse> {
        let builder = self.request(Method::POST, "/api/logout")?;
        self.send_json(builder).await
    }

    /// GET /api/user
    pub async fn current_user(&self) -> Result<User> {
        let builder = self.request(Method::GET, "/api/user")?;
        self.send_json(builder).await
    }

    /// GET /api/wallet-auth/challenge
    pub async fn challenge(&self) -> Result<ChallengeResponse> {
        let builder = self.request(Method::GET, "/api/wallet-auth/challenge")?;
        self.send_json(builder).await
    }

    /// POST /api/wallet-auth
    pub async fn wallet_auth(&self, request: &WalletAuthRequest) -> Result<WalletAuthResponse> {
        let builder = self.request(Method::POST, "/api/wallet-auth")?.json(request);
        self.send_json(builder).await
    }

    /// GET /api/wallet-auth
    pub async fn wallet_session(&self) -> Result<Option<WalletSession>> {
        let builder = self.request(Method::GET, "/api/wallet-auth")?;
        self.send_json(builder).await
    }

    /// DELETE /api/wallet-auth
    pub async fn disconnect_wallet(&self) -> Result<MessageResponse> {
        let builder = self.request(Method::DELETE, "/api/wallet-auth")?;
        self.send_json(builder).await
    }

    /// GET /api/blockfrost/address/{address}
    ///
    /// Transport failures become `Unavailable` so "unknown" never reads as "0".
    pub async fn address_balance(&self, address: &str) -> Result<BalanceLookup> {
        let builder =
            self.request_with_segment(Method::GET, "/api/blockfrost/address", address)?;
        match self.send_json(builder).await {
            Ok(lookup) => Ok(lookup),
            Err(WalletError::Http(e)) => {
                warn!(error = %e, "Balance lookup failed");
                Ok(BalanceLookup::Unavailable {
                    reason: if e.is_timeout() {
                        "indexer proxy timed out".to_string()
                    } else {
                        "indexer proxy unreachable".to_string()
                    },
                })
            }
            Err(WalletError::IndexerUnavailable(reason)) => {
                Ok(BalanceLookup::Unavailable { reason })
            }
            Err(other) => Err(other),
        }
    }

    /// GET /api/handle/{address}
    pub async fn handle(&self, address: &str) -> Result<HandleResolution> {
        let builder = self.request_with_segment(Method::GET, "/api/handle", address)?;
        match self.send_json(builder).await {
            Ok(resolution) => Ok(resolution),
            Err(WalletError::Http(e)) => {
                warn!(error = %e, "Handle lookup failed");
                Ok(HandleResolution::unavailable("indexer proxy unreachable"))
            }
            Err(WalletError::IndexerUnavailable(reason)) => {
                Ok(HandleResolution::unavailable(reason))
            }
            Err(other) => Err(other),
        }
    }

    /// GET /api/handle-lookup/{handleName}
    ///
    /// An unregistered handle yields `found: false` rather than an error.
    pub async fn handle_lookup(&self, name: &str) -> Result<HandleLookup> {
        let builder = self.request_with_segment(Method::GET, "/api/handle-lookup", name)?;
        let response = builder.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            let text = response.text().await.unwrap_or_default();
            return Ok(serde_json::from_str(&text).unwrap_or_else(|_| HandleLookup {
                found: false,
                handle: name.to_string(),
                address: None,
                policy_id: None,
                reason: None,
            }));
        }
        parse_response(response).await
    }
}
