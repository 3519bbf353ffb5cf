/*
[INPUT]:  Session cookie, wallet-auth payloads (address, challenge, COSE signature)
[OUTPUT]: Server challenges, verified wallet links, rotated sessions
[POS]:    HTTP layer - wallet authentication endpoints
[UPDATE]: When the wallet linking flow or its checks change
*/

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use littlefish_adapter::{
    ChallengeResponse, FieldError, MessageResponse, ShelleyAddress, WALLET_LINKED_MESSAGE,
    WalletAuthRequest, WalletAuthResponse, WalletSession, verify_data_signature,
};
use tracing::{info, warn};

use super::session::{require_user, session_cookie};
use super::{ApiError, ApiResult, AppState};

/// GET /api/wallet-auth/challenge
pub async fn challenge(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<ChallengeResponse>> {
    require_user(&state, &jar).await?;
    let challenge = state.challenges.issue();
    Ok(Json(ChallengeResponse {
        expires_at: challenge.issued_at + state.challenges.ttl(),
        issued_at: challenge.issued_at,
        message: challenge.message,
    }))
}

/// POST /api/wallet-auth
///
/// Nothing is written until every check has passed.
pub async fn link_wallet(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<WalletAuthRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<WalletAuthResponse>)> {
    let current = require_user(&state, &jar).await?;

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Err(ApiError::validation(
                "Invalid wallet authentication payload",
                vec![FieldError::new("body", rejection.body_text())],
            ));
        }
    };
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(ApiError::validation(
            "Invalid wallet authentication payload",
            errors,
        ));
    }
    ShelleyAddress::parse(&request.address)?;
    if let Err(e) = state.challenges.check(&request.message) {
        warn!(user_id = current.user.id, reason = %e, "Challenge rejected");
        return Err(e.into());
    }

    let verified = verify_data_signature(
        request.address.trim(),
        &request.message,
        request.signature.trim(),
        request.key.as_deref().map(str::trim),
    )
    .map_err(|e| {
        warn!(user_id = current.user.id, reason = %e, "Wallet signature rejected");
        ApiError::from(e)
    })?;
    // Bind the canonical bech32 form
    let address = verified.address.to_bech32()?;

    if let Some(owner) = state.users.find_by_wallet(&address).await {
        if owner.id != current.user.id {
            warn!(user_id = current.user.id, "Wallet already linked to another user");
            return Err(ApiError::wallet_in_use());
        }
    }

    let wallet = WalletSession {
        user_id: current.user.id,
        wallet_address: address.clone(),
        network: verified.network,
        connected_at: Utc::now(),
    };
    let (state_ref, address_ref, message, user_id) =
        (&state, address.as_str(), request.message.as_str(), current.user.id);
    let linked = state
        .sessions
        .link_wallet(&current.session.id, wallet, move || async move {
            if let Err(e) = state_ref.challenges.consume(address_ref, message).await {
                warn!(user_id, reason = %e, "Challenge rejected");
                return Err(ApiError::from(e));
            }
            match state_ref
                .users
                .set_wallet_address(user_id, Some(address_ref))
                .await
            {
                Ok(user) => Ok(user),
                Err(e) => {
                    state_ref.challenges.release(address_ref, message).await;
                    Err(ApiError::from(e))
                }
            }
        })
        .await?;
    let Some((session, user)) = linked else {
        return Err(ApiError::unauthorized());
    };

    info!(user_id = user.id, address = %address, "Wallet linked");
    let jar = jar.add(session_cookie(
        &session.id,
        state.config.server.cookie_secure,
    ));
    Ok((
        jar,
        Json(WalletAuthResponse {
            message: WALLET_LINKED_MESSAGE.to_string(),
            user,
        }),
    ))
}

/// GET /api/wallet-auth
pub async fn wallet_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<Option<WalletSession>>> {
    let current = require_user(&state, &jar).await?;
    Ok(Json(current.session.wallet))
}

/// DELETE /api/wallet-auth
pub async fn disconnect_wallet(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<MessageResponse>> {
    let current = require_user(&state, &jar).await?;
    if state.sessions.clear_wallet(&current.session.id).await.is_some() {
        info!(user_id = current.user.id, "Wallet session ended");
    }
    Ok(Json(MessageResponse {
        message: "Wallet disconnected".to_string(),
    }))
}
