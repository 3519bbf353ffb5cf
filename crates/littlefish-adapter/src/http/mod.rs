/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - Littlefish API and indexer communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod api;
pub mod blockfrost;
pub mod client;
pub mod error;

pub use error::{FieldError, Result, WalletError};

pub use blockfrost::{AssetDetails, AssetHolder, BlockfrostClient};
pub use client::{ClientConfig, LittlefishClient};
