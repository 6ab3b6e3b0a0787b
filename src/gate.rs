use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::session::{Credentials, Session, SessionState, SessionStore};

/// Login form for anonymous users; authenticated users are bounced away from it.
pub const ENTRY_POINT: &str = "/";
/// Landing page for authenticated users.
pub const AUTHENTICATED_HOME: &str = "/home";

// Static assets and framework endpoints never reach the decision table.
// Matched on the first path segment: the segment itself, or anything below it.
const EXCLUDED_SEGMENTS: [&str; 6] = [
    "images",
    "fonts",
    "favicon.ico",
    "health",
    "swagger-ui",
    "api-docs",
];

// Logo files sit at the root with an extension (`/logo.svg`, `/logo.png`).
const LOGO_FILE_PREFIX: &str = "logo.";

/// PublicRoute
///
/// The closed set of paths reachable without a session. Membership is an exact,
/// case-sensitive comparison against `path()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicRoute {
    Entry,
    ResetPassword,
    Register,
    AuthCallback,
    /// Must stay public: the reset link lands here before the user has signed in.
    UpdatePassword,
}

impl PublicRoute {
    pub const ALL: [PublicRoute; 5] = [
        PublicRoute::Entry,
        PublicRoute::ResetPassword,
        PublicRoute::Register,
        PublicRoute::AuthCallback,
        PublicRoute::UpdatePassword,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            PublicRoute::Entry => ENTRY_POINT,
            PublicRoute::ResetPassword => "/reset-password",
            PublicRoute::Register => "/register",
            PublicRoute::AuthCallback => "/auth/callback",
            PublicRoute::UpdatePassword => "/reset-password/update",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

/// Action
///
/// What the request pipeline does with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    RedirectTo(&'static str),
}

/// RouteDecision
///
/// The facts one request is judged on. Built fresh per request and consumed by
/// `action()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision<'a> {
    pub path: &'a str,
    pub has_session: bool,
    pub is_public: bool,
    pub is_entry_point: bool,
}

impl<'a> RouteDecision<'a> {
    pub fn new(path: &'a str, has_session: bool) -> Self {
        let route = PublicRoute::from_path(path);
        Self {
            path,
            has_session,
            is_public: route.is_some(),
            is_entry_point: route == Some(PublicRoute::Entry),
        }
    }

    /// First matching rule wins.
    pub fn action(&self) -> Action {
        if !self.has_session && !self.is_public {
            Action::RedirectTo(ENTRY_POINT)
        } else if self.has_session && self.is_entry_point {
            Action::RedirectTo(AUTHENTICATED_HOME)
        } else {
            Action::Allow
        }
    }
}

/// evaluate
///
/// Pure function of `(path, has_session)`.
pub fn evaluate(path: &str, has_session: bool) -> Action {
    RouteDecision::new(path, has_session).action()
}

/// True for asset and framework paths the gate lets through unevaluated.
pub fn is_excluded(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    if rest.starts_with(LOGO_FILE_PREFIX) {
        return true;
    }
    // `/logout` or `/healthy` share a prefix with an asset name but are pages.
    let segment = rest.split('/').next().unwrap_or_default();
    EXCLUDED_SEGMENTS.contains(&segment)
}

/// resolve_session
///
/// Asks the session store about the request credentials. A failed lookup counts
/// as no session: the request is judged anonymous and is never let through on error.
pub async fn resolve_session(store: &dyn SessionStore, credentials: &Credentials) -> Option<Session> {
    match store.get_session(credentials).await {
        Ok(session) => session,
        Err(error) => {
            tracing::warn!(%error, "session lookup failed; treating request as anonymous");
            None
        }
    }
}

/// access_gate
///
/// Middleware wrapping every route. Resolves session presence once, applies the
/// decision table, and on `Allow` hands the resolved `Session` to downstream
/// extractors through the request extensions.
pub async fn access_gate(
    State(sessions): State<SessionState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if is_excluded(&path) {
        return next.run(request).await;
    }

    let credentials = Credentials::from_headers(request.headers());
    let session = resolve_session(sessions.as_ref(), &credentials).await;

    match evaluate(&path, session.is_some()) {
        Action::Allow => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        Action::RedirectTo(target) => {
            tracing::info!(path = %path, target, "access gate redirect");
            Redirect::temporary(target).into_response()
        }
    }
}
