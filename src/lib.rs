use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request pipeline and identity.
pub mod auth;
pub mod auth_events;
pub mod gate;
pub mod pkce;
pub mod session;

// Pages, persistence and the view logic between them.
pub mod checklist;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth_events::{AuthEvent, AuthEvents, Subscription};
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{MockSessionStore, SessionState, SupabaseAuthClient};

/// ApiDoc
///
/// OpenAPI document for every page and action, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::entry, handlers::login, handlers::register, handlers::request_password_reset,
        handlers::auth_callback, handlers::update_password, handlers::logout,
        handlers::home, handlers::history, handlers::create_list, handlers::rename_list,
        handlers::delete_list, handlers::inventory_page, handlers::add_inventory_items,
        handlers::delete_inventory_item, handlers::delete_category, handlers::checklist_page,
        handlers::add_checklist_items, handlers::toggle_checklist_item,
        handlers::delete_checklist_item, handlers::reset_checklist
    ),
    components(
        schemas(
            models::PackingList, models::ListItem, models::InventoryItem,
            models::LoginRequest, models::RegisterRequest, models::ResetPasswordRequest,
            models::UpdatePasswordRequest, models::ListNameRequest, models::AddInventoryRequest,
            models::AddFromInventoryRequest, models::EntryView, models::HomeView,
            models::InventoryGroup, models::InventoryView, models::ChecklistGroup,
            models::ChecklistView, models::MessageResponse, models::ErrorResponse,
        )
    ),
    tags(
        (name = "packing-list", description = "Packing checklists for outings with a baby")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence of lists, checklist items and the inventory.
    pub repo: RepositoryState,
    /// Hosted session capability, also consulted by the access gate.
    pub sessions: SessionState,
    pub config: AppConfig,
    /// Where handlers publish session-state transitions.
    pub auth_events: AuthEvents,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for AuthEvents {
    fn from_ref(app_state: &AppState) -> AuthEvents {
        app_state.auth_events.clone()
    }
}

/// create_router
///
/// Assembles the routes, puts the access gate in front of all of them (static files
/// included), then adds the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        // images/, fonts/, logo* and favicon.ico. Unknown paths end up here too and
        // answer 404 once the gate has let them through.
        .fallback_service(ServeDir::new(&state.config.static_dir))
        // Every request, matched or not, is judged by the gate first.
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span so every log line of one request carries its
/// `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = %request.uri().path(),
        req_id = %request_id,
    )
}
