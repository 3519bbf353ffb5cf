/*
[INPUT]:  Wallet authentication requests against a live test server
[OUTPUT]: Verification of the wallet linking rules
[POS]:    Integration test layer - POST/GET/DELETE /api/wallet-auth
[UPDATE]: When changing the wallet linking flow
*/

mod common;

use common::*;
use littlefish_adapter::Ed25519Signer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_link_requires_session() {
    let server = TestServer::start(test_config()).await;
    let signer = signer();
    let address = address_of(&signer);

    let response = browser()
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
    assert!(server.state.users.find_by_wallet(&address).await.is_none());
    assert_eq!(server.state.challenges.consumed_count().await, 0);
}

#[tokio::test]
async fn test_malformed_payload_reports_fields() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    login(&client, &server, "alice").await;

    let response = client
        .post(server.url("/api/wallet-auth"))
        .json(&json!({"address": "", "signature": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<_> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["address", "message", "signature"]);

    let response = client
        .post(server.url("/api/wallet-auth"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["field"], "body");

    let session: Value = client
        .get(server.url("/api/wallet-auth"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(session.is_null());
}

#[tokio::test]
async fn test_non_shelley_address_is_field_error() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    login(&client, &server, "alice").await;
    let signer = signer();
    let genuine = signed_payload(&signer, &address_of(&signer), NEW_YEAR_CHALLENGE);

    for address in [
        "Ae2tdPwUPEZFRbyhz3cpfC2CumGzNkFBN2L42rcUc2yjQpEkxDbkPodpMAi",
        "addr1notreallyanaddress",
    ] {
        let mut payload = genuine.clone();
        payload["address"] = json!(address);
        let response = client
            .post(server.url("/api/wallet-auth"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{address}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"][0]["field"], "address");
    }
    assert_eq!(server.state.challenges.consumed_count().await, 0);
}

#[tokio::test]
async fn test_failed_store_write_links_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let users_path = dir.path().join("users.json");
    let mut config = test_config();
    config.storage.users_path = Some(users_path.clone());
    let server = TestServer::start(config).await;
    let client = browser();
    let login_cookie = session_cookie(&login(&client, &server, "alice").await).unwrap();

    std::fs::create_dir(users_path.with_extension("tmp")).unwrap();

    let signer = signer();
    let address = address_of(&signer);
    let response = client
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    assert!(server.state.users.find_by_wallet(&address).await.is_none());
    let session = server.state.sessions.get(&login_cookie).await.unwrap();
    assert!(session.wallet.is_none());
    assert_eq!(server.state.challenges.consumed_count().await, 0);

    // Once storage recovers the same signed challenge still links
    std::fs::remove_dir(users_path.with_extension("tmp")).unwrap();
    let retry = client
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();
    assert_eq!(retry.status(), 200);
}

#[tokio::test]
async fn test_links_wallet_and_rotates_session() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    let login_response = login(&client, &server, "alice").await;
    let login_cookie = session_cookie(&login_response).unwrap();

    let signer = signer();
    let address = address_of(&signer);
    let response = client
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let linked_cookie = session_cookie(&response).unwrap();
    assert_ne!(linked_cookie, login_cookie);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Wallet linked successfully");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["walletAddress"], address.as_str());
    assert!(address.starts_with("addr1"));

    // The old session id is gone; the client now holds the new one
    assert!(server.state.sessions.get(&login_cookie).await.is_none());
    let session: Value = client
        .get(server.url("/api/wallet-auth"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["walletAddress"], address.as_str());
    assert_eq!(session["network"], "mainnet");

    let user: Value = client
        .get(server.url("/api/user"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user["walletAddress"], address.as_str());
}

#[tokio::test]
async fn test_replayed_challenge_rejected() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    login(&client, &server, "alice").await;

    let signer = signer();
    let payload = signed_payload(&signer, &address_of(&signer), NEW_YEAR_CHALLENGE);
    let first = client
        .post(server.url("/api/wallet-auth"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let replay = client
        .post(server.url("/api/wallet-auth"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 401);
    assert_eq!(error_code(replay).await, "CHALLENGE_REJECTED");
}

#[tokio::test]
async fn test_stale_and_foreign_challenges_rejected() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    login(&client, &server, "alice").await;
    let signer = signer();
    let address = address_of(&signer);

    for message in [
        "Authenticate with Littlefish Foundation: 2023-12-31T23:50:00.000Z",
        "Authenticate with Littlefish Foundation: 2024-01-01T00:05:00.000Z",
        "Authenticate with Someone Else: 2024-01-01T00:00:00.000Z",
        "hello",
    ] {
        let response = client
            .post(server.url("/api/wallet-auth"))
            .json(&signed_payload(&signer, &address, message))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401, "{message}");
        assert_eq!(error_code(response).await, "CHALLENGE_REJECTED");
    }
    assert!(server.state.users.find_by_wallet(&address).await.is_none());
}

#[tokio::test]
async fn test_invalid_signature_leaves_state_untouched() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    let login_cookie = session_cookie(&login(&client, &server, "alice").await).unwrap();

    let owner = signer();
    let address = address_of(&owner);
    let intruder = Ed25519Signer::from_secret_key(&[2u8; 32]);

    // Someone else's key claiming the address
    let forged = client
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&intruder, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), 401);
    assert_eq!(error_code(forged).await, "INVALID_SIGNATURE");

    // Right key, different text
    let mut mismatched = signed_payload(&owner, &address, "Sign up for our newsletter");
    mismatched["message"] = json!(NEW_YEAR_CHALLENGE);
    let response = client
        .post(server.url("/api/wallet-auth"))
        .json(&mismatched)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(error_code(response).await, "INVALID_SIGNATURE");

    assert!(server.state.users.find_by_wallet(&address).await.is_none());
    let session = server.state.sessions.get(&login_cookie).await.unwrap();
    assert!(session.wallet.is_none());

    // A failed attempt does not burn the challenge
    let genuine = client
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&owner, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();
    assert_eq!(genuine.status(), 200);
}

#[tokio::test]
async fn test_wallet_in_use_by_other_user() {
    let server = TestServer::start(test_config()).await;
    let signer = signer();
    let address = address_of(&signer);

    let alice = browser();
    login(&alice, &server, "alice").await;
    let linked = alice
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();
    assert_eq!(linked.status(), 200);

    let bob = browser();
    login(&bob, &server, "bob").await;
    let challenge: Value = bob
        .get(server.url("/api/wallet-auth/challenge"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let message = challenge["message"].as_str().unwrap();

    let response = bob
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, message))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    assert_eq!(error_code(response).await, "WALLET_IN_USE");

    let bob_user = server.state.users.find_by_username("bob").await.unwrap();
    assert!(bob_user.wallet_address.is_none());
    assert_eq!(server.state.challenges.consumed_count().await, 1);
}

#[tokio::test]
async fn test_server_issued_challenge() {
    let server = TestServer::start(test_config()).await;
    let client = browser();

    let anonymous = client
        .get(server.url("/api/wallet-auth/challenge"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);

    login(&client, &server, "alice").await;
    let challenge: Value = client
        .get(server.url("/api/wallet-auth/challenge"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        challenge["message"],
        "Authenticate with Littlefish Foundation: 2024-01-01T00:00:30.000Z"
    );
    assert_eq!(challenge["issuedAt"], "2024-01-01T00:00:30Z");
    assert_eq!(challenge["expiresAt"], "2024-01-01T00:05:30Z");
}

#[tokio::test]
async fn test_disconnect_wallet_keeps_login() {
    let server = TestServer::start(test_config()).await;
    let client = browser();
    login(&client, &server, "alice").await;

    let signer = signer();
    let address = address_of(&signer);
    client
        .post(server.url("/api/wallet-auth"))
        .json(&signed_payload(&signer, &address, NEW_YEAR_CHALLENGE))
        .send()
        .await
        .unwrap();

    let response = client
        .delete(server.url("/api/wallet-auth"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let session: Value = client
        .get(server.url("/api/wallet-auth"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(session.is_null());

    let user = client.get(server.url("/api/user")).send().await.unwrap();
    assert_eq!(user.status(), 200);
}
