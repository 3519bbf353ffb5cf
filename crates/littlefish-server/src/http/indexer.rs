/*
[INPUT]:  Address and handle path parameters
[OUTPUT]: Balance and handle lookups proxied through the indexer resolver
[POS]:    HTTP layer - public indexer proxy endpoints
[UPDATE]: When indexer endpoints or their status codes change
*/

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use littlefish_adapter::{BalanceLookup, HandleLookup, HandleResolution};

use super::{ApiResult, AppState};

/// GET /api/blockfrost/address/{address}
pub async fn address_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<BalanceLookup>> {
    Ok(Json(state.resolver.resolve_balance(&address).await?))
}

/// GET /api/handle/{address}
pub async fn handle(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<HandleResolution>> {
    Ok(Json(state.resolver.resolve_handle(&address).await?))
}

/// GET /api/handle-lookup/{handle_name}
pub async fn handle_lookup(
    State(state): State<AppState>,
    Path(handle_name): Path<String>,
) -> ApiResult<(StatusCode, Json<HandleLookup>)> {
    let lookup = state.resolver.lookup(&handle_name).await?;
    let status = if lookup.found {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(lookup)))
}
