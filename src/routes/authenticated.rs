use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

/// Authenticated Router Module
///
/// The packing-list pages. The access gate redirects anonymous requests to `/`
/// before they get here, and every handler takes an `AuthUser` whose `id` scopes
/// each data store call to the caller's own rows.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/home", get(handlers::home))
        .route("/history", get(handlers::history))
        .route("/logout", post(handlers::logout))
        // --- Lists ---
        .route("/lists", post(handlers::create_list))
        .route(
            "/lists/{id}",
            put(handlers::rename_list).delete(handlers::delete_list),
        )
        // --- Inventory ---
        .route(
            "/inventory",
            get(handlers::inventory_page).post(handlers::add_inventory_items),
        )
        .route("/inventory/items/{id}", delete(handlers::delete_inventory_item))
        // DELETE /inventory/categories/{category}
        // Bulk delete of one category in a single statement.
        .route(
            "/inventory/categories/{category}",
            delete(handlers::delete_category),
        )
        // --- Checklist ---
        .route("/checklist/{id}", get(handlers::checklist_page))
        .route("/checklist/{id}/items", post(handlers::add_checklist_items))
        .route(
            "/checklist/{id}/items/{item_id}",
            patch(handlers::toggle_checklist_item).delete(handlers::delete_checklist_item),
        )
        // POST /checklist/{id}/reset
        // Unchecks everything for the next outing.
        .route("/checklist/{id}/reset", post(handlers::reset_checklist))
}
