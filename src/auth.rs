use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    gate,
    session::{Credentials, Session, SessionState},
};

/// AuthUser
///
/// The identity of an authenticated request. Handlers take it as an argument and use
/// `id` as the owner key of every data store call.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// The caller's own access token, forwarded when acting on their behalf
    /// (password update, sign-out).
    pub access_token: String,
}

impl From<Session> for AuthUser {
    fn from(session: Session) -> Self {
        Self {
            id: session.user_id,
            email: session.email,
            access_token: session.access_token,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Reuses the `Session` the access gate already resolved for this request. Outside
/// the gate (handler tests, routers mounted without it) the session is resolved from
/// the request credentials with the same fail-closed rule.
///
/// Rejection: `AppError::Unauthorized` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone().into());
        }

        let sessions = SessionState::from_ref(state);
        let credentials = Credentials::from_headers(&parts.headers);
        gate::resolve_session(sessions.as_ref(), &credentials)
            .await
            .map(AuthUser::from)
            .ok_or(AppError::Unauthorized)
    }
}
