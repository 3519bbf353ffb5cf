/*
[INPUT]:  Test configuration and mock indexer requirements
[OUTPUT]: Running test servers, HTTP clients, signed wallet payloads
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for littlefish-server tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use littlefish_adapter::{Ed25519Signer, KeyWallet, Network, ShelleyAddress};
use littlefish_server::config::SeedUser;
use littlefish_server::http::SESSION_COOKIE;
use littlefish_server::{AppState, Clock, ServerConfig};
use reqwest::header::SET_COOKIE;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

pub const PASSWORD: &str = "correct horse battery";
pub const NEW_YEAR_CHALLENGE: &str =
    "Authenticate with Littlefish Foundation: 2024-01-01T00:00:00.000Z";
pub const PROJECT_ID: &str = "mainnetTESTKEY";

pub fn new_year() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Clock frozen 30 seconds after the new-year challenge was issued
pub fn fixed_clock() -> Clock {
    let now = new_year() + TimeDelta::seconds(30);
    Arc::new(move || now)
}

fn seed(username: &str, name: &str) -> SeedUser {
    SeedUser {
        username: username.to_string(),
        password: PASSWORD.to_string(),
        name: name.to_string(),
        email: format!("{username}@example.org"),
        avatar: None,
    }
}

/// Demo-mode config with users `alice` and `bob`
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.bind_addr = "127.0.0.1:0".to_string();
    config.users = vec![seed("alice", "Alice"), seed("bob", "Bob")];
    config
}

/// Config whose indexer points at `blockfrost`
pub fn indexer_config(blockfrost: &MockServer) -> ServerConfig {
    let mut config = test_config();
    config.indexer.base_url = Some(format!("{}/api/v0", blockfrost.uri()));
    config.indexer.project_id = Some(PROJECT_ID.to_string());
    config
}

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    shutdown: CancellationToken,
    task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestServer {
    /// Start with the clock frozen just after the new-year challenge
    pub async fn start(config: ServerConfig) -> Self {
        let state = AppState::from_config(config).await.expect("state");
        Self::start_with(state.with_clock(fixed_clock())).await
    }

    pub async fn start_with(state: AppState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(littlefish_server::serve(
            listener,
            state.clone(),
            shutdown.clone(),
        ));
        Self {
            base_url: format!("http://{addr}"),
            state,
            shutdown,
            task: Some(task),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Cancel and wait for the serve loop to exit
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();
        match self.task.take() {
            Some(task) => task.await.expect("server task panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Client with its own cookie store, like one browser
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

pub async fn login(client: &reqwest::Client, server: &TestServer, username: &str) -> reqwest::Response {
    let response = client
        .post(server.url("/api/login"))
        .json(&json!({"username": username, "password": PASSWORD}))
        .send()
        .await
        .expect("login request");
    assert_eq!(response.status(), 200, "login as {username} failed");
    response
}

/// Value of the session cookie set by `response`, if any
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix(&format!("{SESSION_COOKIE}=")).map(str::to_string))
        .and_then(|v| v.split(';').next().map(str::to_string))
}

pub fn signer() -> Ed25519Signer {
    Ed25519Signer::from_secret_key(&[1u8; 32])
}

pub fn address_of(signer: &Ed25519Signer) -> String {
    ShelleyAddress::enterprise(Network::Mainnet, signer.key_hash())
        .to_bech32()
        .expect("bech32")
}

/// The deterministic "TestWallet" used by browser-side flows
pub fn test_wallet() -> KeyWallet {
    KeyWallet::from_signers("TestWallet", Network::Mainnet, signer(), None)
}

/// `POST /api/wallet-auth` body: `signer` signs `message` for `address`
pub fn signed_payload(signer: &Ed25519Signer, address: &str, message: &str) -> Value {
    let address_bytes = ShelleyAddress::parse(address).expect("address");
    let signature = signer
        .sign_data(address_bytes.bytes(), message)
        .expect("sign");
    json!({
        "address": address,
        "message": message,
        "signature": signature.signature,
        "key": signature.key,
    })
}

pub async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("error body");
    body["code"].as_str().unwrap_or_default().to_string()
}
