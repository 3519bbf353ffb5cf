/*
[INPUT]:  Public API exports for littlefish-server crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod challenge;
pub mod config;
pub mod http;
pub mod indexer;
pub mod state;

// Re-export main types for convenience
pub use challenge::{ChallengeRegistry, Clock};
pub use config::ServerConfig;
pub use http::{AppState, router, serve};
pub use indexer::IndexerResolver;
