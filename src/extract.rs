use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// AppJson
///
/// `axum::Json` whose rejection (bad syntax, wrong types, missing content type)
/// renders as the usual `{ "error": ... }` body instead of plain text.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Path` with the same error body, e.g. for an id that is not a UUID.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
