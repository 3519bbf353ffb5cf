/*
[INPUT]:  Wallet providers, challenges, CIP-8 signatures
[OUTPUT]: Wallet connections, signed challenges, verified signer identities
[POS]:    Auth layer - wallet connection and authentication
[UPDATE]: When auth flow or signature methods change
*/

pub mod address;
pub mod challenge;
pub mod connector;
pub mod context;
pub mod cose;
pub mod signer;
pub mod state_machine;
pub mod verify;
pub mod wallet;

pub use address::{AddressKind, Credential, ShelleyAddress, key_hash};
pub use challenge::{Challenge, ChallengeGenerator, DEFAULT_SERVICE_NAME};
pub use connector::{DEFAULT_PROMPT_TIMEOUT, WalletConnector};
pub use context::WalletContext;
pub use cose::{CoseKey, CoseSign1};
pub use signer::Ed25519Signer;
pub use state_machine::{ConnectionEvent, ConnectionState, ConnectionStateMachine};
pub use verify::{VerifiedSignature, VerifyError, verify_data_signature};
pub use wallet::{
    KeyWallet, MockWallet, WalletApi, WalletConfig, WalletKind, WalletProvider, WalletRegistry,
};
