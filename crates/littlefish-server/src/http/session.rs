/*
[INPUT]:  Request cookie jar, session store
[OUTPUT]: Session cookies and the authenticated caller
[POS]:    HTTP layer - session cookie handling
[UPDATE]: When cookie attributes or session lookup change
*/

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use littlefish_adapter::User;

use super::{ApiError, ApiResult, AppState};
use crate::state::Session;

pub const SESSION_COOKIE: &str = "littlefish.sid";

pub fn session_cookie(id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .build()
}

pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string())
}

/// The logged-in caller
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session: Session,
    pub user: User,
}

/// Resolve the caller's session, or fail with 401
pub async fn require_user(state: &AppState, jar: &CookieJar) -> ApiResult<CurrentUser> {
    let id = session_id(jar).ok_or_else(ApiError::unauthorized)?;
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(ApiError::unauthorized)?;
    match state.users.get(session.user_id).await {
        Some(user) => Ok(CurrentUser { session, user }),
        None => {
            state.sessions.destroy(&id).await;
            Err(ApiError::unauthorized())
        }
    }
}
