/*
[INPUT]:  Registration and login payloads, session cookie
[OUTPUT]: Users, login sessions and session cookies
[POS]:    HTTP layer - credential authentication endpoints
[UPDATE]: When account fields or login rules change
*/

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use littlefish_adapter::{FieldError, LoginRequest, MessageResponse, RegisterRequest, User};
use tracing::info;

use super::session::{clear_session_cookie, require_user, session_cookie, session_id};
use super::{ApiError, ApiResult, AppState};

const MIN_PASSWORD_LEN: usize = 6;

fn validate_registration(request: &RegisterRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let username = request.username.trim();
    if username.len() < 3 {
        errors.push(FieldError::new(
            "username",
            "Username must be at least 3 characters",
        ));
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        errors.push(FieldError::new(
            "username",
            "Username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    let email = request.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        errors.push(FieldError::new("email", "Email address is invalid"));
    }
    errors
}

fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError::validation(
        "Invalid request body",
        vec![FieldError::new("body", rejection.body_text())],
    )
}

/// Start a fresh session for `user`, dropping any session the caller held
async fn start_session(state: &AppState, jar: CookieJar, user: &User) -> CookieJar {
    if let Some(previous) = session_id(&jar) {
        state.sessions.destroy(&previous).await;
    }
    let session = state.sessions.create(user.id).await;
    jar.add(session_cookie(&session.id, state.config.server.cookie_secure))
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, CookieJar, Json<User>)> {
    let Json(request) = payload.map_err(body_error)?;
    let errors = validate_registration(&request);
    if !errors.is_empty() {
        return Err(ApiError::validation("Invalid registration", errors));
    }

    let user = state.users.create(&request).await?;
    info!(user_id = user.id, username = %user.username, "User registered");
    let jar = start_session(&state, jar, &user).await;
    Ok((StatusCode::CREATED, jar, Json(user)))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<User>)> {
    let Json(request) = payload.map_err(body_error)?;
    let user = state
        .users
        .authenticate(&request.username, &request.password)
        .await
        .ok_or_else(ApiError::invalid_credentials)?;

    info!(user_id = user.id, "User logged in");
    let jar = start_session(&state, jar, &user).await;
    Ok((jar, Json(user)))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Some(id) = session_id(&jar) {
        if let Some(session) = state.sessions.destroy(&id).await {
            info!(user_id = session.user_id, "User logged out");
        }
    }
    (
        clear_session_cookie(jar),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// GET /api/user
pub async fn current_user(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<User>> {
    let current = require_user(&state, &jar).await?;
    Ok(Json(current.user))
}
