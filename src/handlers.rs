use crate::{
    AppState,
    auth::AuthUser,
    auth_events::AuthEvent,
    checklist,
    error::AppError,
    extract::{AppJson, AppPath},
    gate::{AUTHENTICATED_HOME, ENTRY_POINT, PublicRoute},
    models::{
        AddFromInventoryRequest, AddInventoryRequest, ChecklistView, EntryQuery, EntryView,
        ErrorResponse, HomeView, InventoryItem, InventoryView, ListItem, ListNameRequest,
        LoginRequest, MessageResponse, PackingList, RegisterRequest, ResetPasswordRequest,
        UpdatePasswordRequest,
    },
    pkce,
    session::{
        AuthError, Credentials, clear_code_verifier_cookie, clear_session_cookies,
        code_verifier_cookie, session_cookies,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

/// CallbackQuery
///
/// The one-time code the auth service appends to the link in the reset email.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

fn with_cookies<I>(cookies: I, response: impl IntoResponse) -> Response
where
    I: IntoIterator<Item = String>,
{
    let headers = AppendHeaders(
        cookies
            .into_iter()
            .map(|cookie| (header::SET_COOKIE, cookie))
            .collect::<Vec<_>>(),
    );
    (headers, response).into_response()
}

/// Sends the browser back to the entry point with the error the login page displays.
fn entry_with_error(message: &str, source: &str) -> Response {
    let target = format!(
        "{ENTRY_POINT}?error_message={}&error_source={source}",
        urlencoding::encode(message)
    );
    Redirect::temporary(&target).into_response()
}

fn site_link(state: &AppState, route: PublicRoute) -> String {
    format!("{}{}", state.config.site_url.trim_end_matches('/'), route.path())
}

// --- Entry & Account Handlers (allow-listed paths) ---

/// entry
///
/// [Public Route] The login page. Echoes the error a failed reset callback left in the
/// query string. Users who already have a session never get here: the gate sends them
/// to `/home`.
#[utoipa::path(
    get,
    path = "/",
    params(EntryQuery),
    responses((status = 200, description = "Login page", body = EntryView))
)]
pub async fn entry(Query(query): Query<EntryQuery>) -> Json<EntryView> {
    Json(EntryView {
        error_message: query.error_message,
        error_source: query.error_source,
    })
}

/// login
///
/// [Public Route] Password sign-in. On success the session lands in HttpOnly cookies
/// and the browser is sent to the authenticated home.
#[utoipa::path(
    post,
    path = "/",
    request_body = LoginRequest,
    responses(
        (status = 303, description = "Signed in, redirected to /home"),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Wrong email or password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Please fill in all fields."));
    }

    let tokens = state
        .sessions
        .sign_in_with_password(email, &payload.password)
        .await
        .map_err(|error| match error {
            // Never reveal which of the two was wrong.
            AuthError::Rejected { .. } => AppError::Auth(AuthError::Rejected {
                status: 401,
                message: "Wrong email or password.".to_string(),
            }),
            other => other.into(),
        })?;

    tracing::info!(user_id = %tokens.user.id, "user signed in");
    state.auth_events.emit(AuthEvent::SignedIn {
        user_id: tokens.user.id,
    });

    let cookies = session_cookies(&tokens, state.config.secure_cookies());
    Ok(with_cookies(cookies, Redirect::to(AUTHENTICATED_HOME)))
}

/// register
///
/// [Public Route] Creates an account with the auth service. The user must confirm
/// their email before they can sign in, so no session is created and no redirect
/// happens.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Confirmation email sent", body = MessageResponse),
        (status = 400, description = "Rejected by the auth service", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Please fill in all fields."));
    }

    let redirect_to = site_link(&state, PublicRoute::Entry);
    state
        .sessions
        .sign_up(email, &payload.password, &redirect_to)
        .await?;

    tracing::info!("registration accepted, awaiting email confirmation");
    Ok(Json(MessageResponse {
        message: "Registered! Please check your email to confirm your account.".to_string(),
    }))
}

/// request_password_reset
///
/// [Public Route] Mails a reset link that comes back through `/auth/callback`. The PKCE
/// verifier is kept in a cookie on this browser; only its challenge leaves the server.
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 400, description = "Missing email or rejected", body = ErrorResponse)
    )
)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::validation("Please enter your email address."));
    }

    let verifier = pkce::generate_code_verifier();
    let challenge = pkce::code_challenge(&verifier);
    let redirect_to = site_link(&state, PublicRoute::AuthCallback);

    state
        .sessions
        .reset_password_for_email(email, &challenge, &redirect_to)
        .await?;

    tracing::info!("password reset email requested");
    let cookie = code_verifier_cookie(&verifier, state.config.secure_cookies());
    Ok(with_cookies(
        [cookie],
        Json(MessageResponse {
            message: "A password reset link was sent to your email.".to_string(),
        }),
    ))
}

/// auth_callback
///
/// [Public Route] Landing point of the reset link. Exchanges the one-time code for a
/// session and continues to the password update page. Every failure goes back to the
/// entry point with `error_message` and `error_source` set.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 307, description = "Redirect to /reset-password/update on success, to / with an error otherwise")
    )
)]
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        tracing::warn!("auth callback reached without a code parameter");
        return entry_with_error("No_auth_code_in_link", "no_code_param");
    };

    let exchange = match Credentials::from_headers(&headers).code_verifier {
        Some(verifier) => state.sessions.exchange_code_for_session(&code, &verifier).await,
        None => Err(AuthError::MissingVerifier),
    };

    match exchange {
        Ok(tokens) => {
            tracing::info!(user_id = %tokens.user.id, "code exchange succeeded");
            state.auth_events.emit(AuthEvent::PasswordRecovery {
                user_id: tokens.user.id,
            });

            let mut cookies = session_cookies(&tokens, state.config.secure_cookies()).to_vec();
            cookies.push(clear_code_verifier_cookie());
            with_cookies(
                cookies,
                Redirect::temporary(PublicRoute::UpdatePassword.path()),
            )
        }
        Err(error) => {
            tracing::error!(%error, "code exchange failed");
            entry_with_error(&error.to_string(), "exchange_code_failed")
        }
    }
}

/// Maps the auth service's password complaints to something a user can act on.
pub fn describe_password_update_error(message: &str) -> &'static str {
    let message = message.to_lowercase();
    if message.contains("different from the old password") || message.contains("same as the old") {
        "The new password must be different from the old one."
    } else if message.contains("user not found") {
        "The reset link may have expired or the user no longer exists. Please request a new link."
    } else if message.contains("characters") {
        "The password must be at least 6 characters long."
    } else {
        "The password could not be updated. Please try again."
    }
}

/// update_password
///
/// [Public Route, session required] Sets a new password for the session established by
/// the reset callback. The path is allow-listed so the gate lets the reset link through;
/// the handler itself still demands a session.
#[utoipa::path(
    post,
    path = "/reset-password/update",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Rejected", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse)
    )
)]
pub async fn update_password(
    user: Result<AuthUser, AppError>,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = user.map_err(|_| {
        AppError::Auth(AuthError::Rejected {
            status: 401,
            message: "No signed-in user found. Please restart the password reset.".to_string(),
        })
    })?;

    if payload.password.is_empty() {
        return Err(AppError::validation("Please enter a new password."));
    }

    state
        .sessions
        .update_password(&user.access_token, &payload.password)
        .await
        .map_err(|error| match error {
            AuthError::Rejected { status, message } => AppError::Auth(AuthError::Rejected {
                status,
                message: describe_password_update_error(&message).to_string(),
            }),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "password updated");
    state
        .auth_events
        .emit(AuthEvent::PasswordUpdated { user_id: user.id });

    Ok(Json(MessageResponse {
        message: "Your password was updated. You can sign in now.".to_string(),
    }))
}

/// logout
///
/// [Authenticated Route] Ends the session with the auth service, then clears the
/// cookies. If the service refuses, the error is shown and the cookies stay.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Signed out, redirected to /"),
        (status = 502, description = "Sign-out failed", body = ErrorResponse)
    )
)]
pub async fn logout(user: AuthUser, State(state): State<AppState>) -> Result<Response, AppError> {
    state.sessions.sign_out(&user.access_token).await?;

    tracing::info!(user_id = %user.id, "user signed out");
    state
        .auth_events
        .emit(AuthEvent::SignedOut { user_id: user.id });

    Ok(with_cookies(clear_session_cookies(), Redirect::to(ENTRY_POINT)))
}

// --- Lists ---

/// home
///
/// [Authenticated Route] Preset outing cards plus the user's own lists.
#[utoipa::path(
    get,
    path = "/home",
    responses((status = 200, description = "Home", body = HomeView))
)]
pub async fn home(user: AuthUser, State(state): State<AppState>) -> Result<Json<HomeView>, AppError> {
    let lists = state.repo.get_lists(user.id).await?;
    let (preset_lists, custom_lists) = checklist::partition_lists(lists);
    Ok(Json(HomeView {
        preset_lists,
        custom_lists,
    }))
}

/// history
///
/// [Authenticated Route] Every list the user created, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "Lists by creation date", body = [PackingList]))
)]
pub async fn history(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PackingList>>, AppError> {
    Ok(Json(state.repo.get_lists(user.id).await?))
}

#[utoipa::path(
    post,
    path = "/lists",
    request_body = ListNameRequest,
    responses(
        (status = 201, description = "Created", body = PackingList),
        (status = 400, description = "Empty name", body = ErrorResponse)
    )
)]
pub async fn create_list(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ListNameRequest>,
) -> Result<(StatusCode, Json<PackingList>), AppError> {
    let name = checklist::normalize_name(&payload.name)
        .ok_or_else(|| AppError::validation("Please enter a list name."))?;
    let list = state.repo.create_list(user.id, &name).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

#[utoipa::path(
    put,
    path = "/lists/{id}",
    params(("id" = Uuid, Path, description = "List ID")),
    request_body = ListNameRequest,
    responses(
        (status = 200, description = "Renamed", body = PackingList),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn rename_list(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ListNameRequest>,
) -> Result<Json<PackingList>, AppError> {
    let name = checklist::normalize_name(&payload.name)
        .ok_or_else(|| AppError::validation("Please enter a list name."))?;
    state
        .repo
        .rename_list(id, user.id, &name)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// delete_list
///
/// [Authenticated Route] Deletes a list and its checklist items. A list owned by
/// someone else answers 404, the same as a missing one.
#[utoipa::path(
    delete,
    path = "/lists/{id}",
    params(("id" = Uuid, Path, description = "List ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn delete_list(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_list(id, user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- Inventory ---

#[utoipa::path(
    get,
    path = "/inventory",
    responses((status = 200, description = "Inventory by category", body = InventoryView))
)]
pub async fn inventory_page(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<InventoryView>, AppError> {
    let items = state.repo.get_inventory(user.id).await?;
    Ok(Json(InventoryView {
        categories: checklist::unique_categories(&items),
        groups: checklist::inventory_groups(&items),
    }))
}

/// add_inventory_items
///
/// [Authenticated Route] Adds every name in the text box under one category, in a
/// single insert.
#[utoipa::path(
    post,
    path = "/inventory",
    request_body = AddInventoryRequest,
    responses(
        (status = 201, description = "Added", body = [InventoryItem]),
        (status = 400, description = "Missing category or items", body = ErrorResponse)
    )
)]
pub async fn add_inventory_items(
    user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddInventoryRequest>,
) -> Result<(StatusCode, Json<Vec<InventoryItem>>), AppError> {
    let category = checklist::normalize_name(&payload.category)
        .ok_or_else(|| AppError::validation("Please choose or enter a category."))?;
    let names = checklist::parse_item_names(&payload.items);
    if names.is_empty() {
        return Err(AppError::validation("Please enter at least one item."));
    }

    let items = state
        .repo
        .add_inventory_items(user.id, &category, &names)
        .await?;
    Ok((StatusCode::CREATED, Json(items)))
}

#[utoipa::path(
    delete,
    path = "/inventory/items/{id}",
    params(("id" = Uuid, Path, description = "Inventory item ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn delete_inventory_item(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_inventory_item(id, user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// delete_category
///
/// [Authenticated Route] Removes a whole category: one filtered bulk delete over the
/// caller's inventory rows.
#[utoipa::path(
    delete,
    path = "/inventory/categories/{category}",
    params(("category" = String, Path, description = "Category name")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No items in that category", body = ErrorResponse)
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(category): AppPath<String>,
) -> Result<StatusCode, AppError> {
    let removed = state.repo.delete_category(user.id, &category).await?;
    tracing::debug!(user_id = %user.id, %category, removed, "category deleted");
    if removed > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

// --- Checklist ---

/// checklist
///
/// [Authenticated Route] A list's items by category with packing progress, plus the
/// inventory to add from.
#[utoipa::path(
    get,
    path = "/checklist/{id}",
    params(("id" = Uuid, Path, description = "List ID")),
    responses(
        (status = 200, description = "Checklist", body = ChecklistView),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn checklist_page(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(list_id): AppPath<Uuid>,
) -> Result<Json<ChecklistView>, AppError> {
    let list = state
        .repo
        .get_list(list_id, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (items, inventory) = tokio::try_join!(
        state.repo.get_list_items(list_id, user.id),
        state.repo.get_inventory(user.id),
    )?;

    Ok(Json(ChecklistView {
        list,
        groups: checklist::checklist_groups(&items),
        packed_count: checklist::packed_count(&items),
        total_count: items.len(),
        all_packed: checklist::all_packed(&items),
        inventory: checklist::inventory_groups(&inventory),
    }))
}

#[utoipa::path(
    post,
    path = "/checklist/{id}/items",
    params(("id" = Uuid, Path, description = "List ID")),
    request_body = AddFromInventoryRequest,
    responses(
        (status = 201, description = "Added", body = [ListItem]),
        (status = 400, description = "Nothing selected", body = ErrorResponse),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn add_checklist_items(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(list_id): AppPath<Uuid>,
    AppJson(payload): AppJson<AddFromInventoryRequest>,
) -> Result<(StatusCode, Json<Vec<ListItem>>), AppError> {
    if payload.inventory_ids.is_empty() {
        return Err(AppError::validation("Please select at least one item."));
    }
    if state.repo.get_list(list_id, user.id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let items = state
        .repo
        .add_items_from_inventory(list_id, user.id, &payload.inventory_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(items)))
}

/// toggle_checklist_item
///
/// [Authenticated Route] Packs or unpacks one item. The flip happens in the data store,
/// so two tabs toggling at once cannot both write the same value.
#[utoipa::path(
    patch,
    path = "/checklist/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "List ID"),
        ("item_id" = Uuid, Path, description = "Checklist item ID")
    ),
    responses(
        (status = 200, description = "Toggled", body = ListItem),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn toggle_checklist_item(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath((list_id, item_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<ListItem>, AppError> {
    state
        .repo
        .toggle_item(item_id, list_id, user.id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/checklist/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "List ID"),
        ("item_id" = Uuid, Path, description = "Checklist item ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn delete_checklist_item(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath((list_id, item_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_list_item(item_id, list_id, user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// reset_checklist
///
/// [Authenticated Route] Unchecks every item so the list is ready for the next outing.
#[utoipa::path(
    post,
    path = "/checklist/{id}/reset",
    params(("id" = Uuid, Path, description = "List ID")),
    responses(
        (status = 200, description = "Reset", body = MessageResponse),
        (status = 404, description = "Not found or not yours", body = ErrorResponse)
    )
)]
pub async fn reset_checklist(
    user: AuthUser,
    State(state): State<AppState>,
    AppPath(list_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    if state.repo.get_list(list_id, user.id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let reset = state.repo.reset_list(list_id, user.id).await?;
    tracing::debug!(%list_id, reset, "checklist reset");
    Ok(Json(MessageResponse {
        message: "All items were reset. Ready for the next outing!".to_string(),
    }))
}
