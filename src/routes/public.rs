use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Every path here (health aside) is on the access gate's allow-list, so anonymous
/// visitors reach it. A signed-in user asking for `/` is sent to `/home` by the gate
/// before any of these handlers run.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer. Excluded from the gate.
        .route("/health", get(|| async { "ok" }))
        // GET / renders the login page, POST / signs in.
        .route("/", get(handlers::entry).post(handlers::login))
        .route("/register", post(handlers::register))
        // POST /reset-password
        // Mails the reset link and stores the PKCE verifier cookie.
        .route("/reset-password", post(handlers::request_password_reset))
        // GET /auth/callback?code=...
        // Where the reset link lands. Exchanges the code for a session.
        .route("/auth/callback", get(handlers::auth_callback))
        // POST /reset-password/update
        // Allow-listed for the reset flow; the handler still requires the session
        // the callback just created.
        .route("/reset-password/update", post(handlers::update_password))
}
