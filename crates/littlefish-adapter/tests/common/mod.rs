/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for littlefish-adapter tests

use std::sync::Arc;

use littlefish_adapter::{
    DataSignature, Ed25519Signer, KeyWallet, LittlefishClient, Network, WalletConnector,
    WalletContext, WalletProvider, WalletRegistry,
};
use serde_json::json;
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

#[allow(dead_code)]
/// Deterministic mainnet key wallet named "TestWallet"
pub fn test_key_wallet() -> KeyWallet {
    KeyWallet::from_signers(
        "TestWallet",
        Network::Mainnet,
        Ed25519Signer::from_secret_key(&[1u8; 32]),
        None,
    )
}

#[allow(dead_code)]
pub fn canned_signature() -> DataSignature {
    DataSignature {
        signature: "84a0".to_string(),
        key: "a0".to_string(),
    }
}

#[allow(dead_code)]
/// Context wired to `server` with one wallet installed
pub fn context_with(server: &MockServer, wallet: impl WalletProvider + 'static) -> WalletContext {
    let mut registry = WalletRegistry::new();
    registry.register(Arc::new(wallet));
    context_for(server, registry)
}

/// Context wired to `server` with no wallets installed
#[allow(dead_code)]
pub fn empty_context(server: &MockServer) -> WalletContext {
    context_for(server, WalletRegistry::new())
}

fn context_for(server: &MockServer, registry: WalletRegistry) -> WalletContext {
    let client = LittlefishClient::new(&server.uri()).expect("client");
    WalletContext::new(client, WalletConnector::new(registry))
}

pub fn user_json(wallet_address: Option<&str>) -> serde_json::Value {
    json!({
        "id": 7,
        "username": "alice",
        "name": "Alice",
        "email": "alice@example.org",
        "avatar": null,
        "walletAddress": wallet_address,
        "createdAt": "2024-01-01T00:00:00Z"
    })
}
