/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Littlefish wallet adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    Challenge,
    ChallengeGenerator,
    ConnectionState,
    Ed25519Signer,
    KeyWallet,
    MockWallet,
    ShelleyAddress,
    WalletApi,
    WalletConfig,
    WalletConnector,
    WalletContext,
    WalletProvider,
    WalletRegistry,
    verify_data_signature,
};

// Re-export commonly used types from http
pub use http::{
    BlockfrostClient,
    ClientConfig,
    FieldError,
    LittlefishClient,
    Result,
    WalletError,
};

// Re-export all types
pub use types::*;
