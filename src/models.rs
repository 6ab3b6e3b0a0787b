use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Data Store Rows ---

/// PackingList
///
/// A named outing ("daycare", "trip", ...) owned by one user. Row of `public.lists`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct PackingList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ListItem
///
/// One entry of a checklist, copied from the inventory when it was added.
/// Row of `public.items`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct ListItem {
    pub id: Uuid,
    // FK to lists.id; the row disappears with its list.
    pub list_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
    pub is_checked: bool,
}

/// InventoryItem
///
/// Master catalog entry, grouped by category. Row of `public.inventory`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct InventoryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub category: String,
}

// --- Request Payloads ---

/// Credentials posted by the login form on the entry point. A missing field reads
/// as empty so it gets the same "fill in all fields" answer as a blank one.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// RegisterRequest
///
/// The password is passed through to the auth service and never stored or logged here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

/// Payload for creating or renaming a list.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ListNameRequest {
    #[schema(example = "grocery run")]
    pub name: String,
}

/// AddInventoryRequest
///
/// Bulk entry of inventory items under one category.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddInventoryRequest {
    #[schema(example = "feeding")]
    pub category: String,
    /// Item names separated by commas or newlines.
    #[schema(example = "bottle, bib\nformula")]
    pub items: String,
}

/// Inventory rows the user ticked for copying onto a checklist.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddFromInventoryRequest {
    pub inventory_ids: Vec<Uuid>,
}

/// Query parameters the auth callback attaches when it sends the user back to the entry point.
#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntryQuery {
    pub error_message: Option<String>,
    pub error_source: Option<String>,
}

// --- Views (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EntryView {
    pub error_message: Option<String>,
    pub error_source: Option<String>,
}

/// HomeView
///
/// Landing page: the fixed outing cards plus the lists the user created.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HomeView {
    pub preset_lists: Vec<PackingList>,
    pub custom_lists: Vec<PackingList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct InventoryGroup {
    pub category: String,
    pub items: Vec<InventoryItem>,
}

/// InventoryView
///
/// `categories` keeps first-seen order (it feeds the category picker); `groups`
/// is sorted by category name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InventoryView {
    pub categories: Vec<String>,
    pub groups: Vec<InventoryGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ChecklistGroup {
    pub category: String,
    pub items: Vec<ListItem>,
}

/// ChecklistView
///
/// One list with its items by category, packing progress, and the inventory to
/// pick more items from.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChecklistView {
    pub list: PackingList,
    pub groups: Vec<ChecklistGroup>,
    pub packed_count: usize,
    pub total_count: usize,
    /// True only when the list has items and every one is checked.
    pub all_packed: bool,
    pub inventory: Vec<InventoryGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of every failed request; `error` is the text shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}
