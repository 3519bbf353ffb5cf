/*
[INPUT]:  Server configuration and shared stores
[OUTPUT]: Axum router, shared application state, serve loop
[POS]:    HTTP layer - routing and server lifecycle
[UPDATE]: When adding endpoints or middleware
*/

pub mod auth;
pub mod error;
pub mod indexer;
pub mod session;
pub mod wallet_auth;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::challenge::{ChallengeRegistry, Clock};
use crate::config::ServerConfig;
use crate::indexer::IndexerResolver;
use crate::state::{SessionStore, UserStore};

pub use error::{ApiError, ApiResult};
pub use session::SESSION_COOKIE;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub users: Arc<UserStore>,
    pub sessions: Arc<SessionStore>,
    pub challenges: Arc<ChallengeRegistry>,
    pub resolver: Arc<IndexerResolver>,
}

impl AppState {
    /// Open the user store, seed users and build the indexer resolver
    pub async fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let users = match &config.storage.users_path {
            Some(path) => UserStore::open(path)
                .await
                .with_context(|| format!("open user store at {}", path.display()))?,
            None => UserStore::in_memory(),
        };
        let seeded = users.seed(&config.users).await.context("seed users")?;
        if seeded > 0 {
            info!(count = seeded, "Seed users created");
        }

        let resolver =
            IndexerResolver::from_config(&config.indexer).context("configure indexer")?;
        if resolver.is_demo() {
            warn!("No indexer key configured; serving demo balances");
        }
        let challenges = ChallengeRegistry::new(&config.server.service_name, &config.challenge);

        Ok(Self {
            config: Arc::new(config),
            users: Arc::new(users),
            sessions: Arc::new(SessionStore::new()),
            challenges: Arc::new(challenges),
            resolver: Arc::new(resolver),
        })
    }

    /// Replace the clock used to issue and judge challenges
    pub fn with_clock(mut self, clock: Clock) -> Self {
        let registry =
            ChallengeRegistry::new(&self.config.server.service_name, &self.config.challenge)
                .with_clock(clock);
        self.challenges = Arc::new(registry);
        self
    }

    pub fn with_resolver(mut self, resolver: IndexerResolver) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/user", get(auth::current_user))
        .route("/api/wallet-auth/challenge", get(wallet_auth::challenge))
        .route(
            "/api/wallet-auth",
            post(wallet_auth::link_wallet)
                .get(wallet_auth::wallet_session)
                .delete(wallet_auth::disconnect_wallet),
        )
        .route("/api/blockfrost/address/{address}", get(indexer::address_balance))
        .route("/api/handle/{address}", get(indexer::handle))
        .route("/api/handle-lookup/{handle_name}", get(indexer::handle_lookup))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.config.server.service_name.clone(),
    })
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("read listener address")?;
    info!(%addr, "Littlefish server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("axum server failed")
}
