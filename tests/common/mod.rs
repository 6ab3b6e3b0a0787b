#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header},
};
use chrono::{Duration, Utc};
use packing_list::{
    AppConfig, AppState, AuthEvent, AuthEvents, MockSessionStore, Subscription, create_router,
    models::{InventoryItem, ListItem, PackingList},
    repository::{RepoError, Repository},
    session::SessionState,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tower::ServiceExt;
use uuid::Uuid;

// --- In-Memory Repository ---

#[derive(Default)]
struct Tables {
    lists: Vec<PackingList>,
    items: Vec<ListItem>,
    inventory: Vec<InventoryItem>,
}

/// Repository backed by plain vectors. Applies the same `user_id` scoping as the
/// Postgres queries so ownership behaviour can be exercised without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the database were down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        if self.fail {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables.lock().unwrap())
    }

    pub fn seed_list(&self, user_id: Uuid, name: &str) -> PackingList {
        let mut tables = self.tables.lock().unwrap();
        // Strictly increasing timestamps keep "newest first" deterministic.
        let created_at = Utc::now() + Duration::seconds(tables.lists.len() as i64);
        let list = PackingList {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            created_at,
        };
        tables.lists.push(list.clone());
        list
    }

    pub fn seed_inventory(&self, user_id: Uuid, name: &str, category: &str) -> InventoryItem {
        let item = InventoryItem {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            category: category.to_string(),
        };
        self.tables.lock().unwrap().inventory.push(item.clone());
        item
    }

    pub fn seed_item(&self, list: &PackingList, name: &str, category: &str, is_checked: bool) -> ListItem {
        let item = ListItem {
            id: Uuid::new_v4(),
            list_id: list.id,
            user_id: list.user_id,
            name: name.to_string(),
            category: category.to_string(),
            is_checked,
        };
        self.tables.lock().unwrap().items.push(item.clone());
        item
    }

    pub fn lists(&self) -> Vec<PackingList> {
        self.tables.lock().unwrap().lists.clone()
    }

    pub fn items(&self) -> Vec<ListItem> {
        self.tables.lock().unwrap().items.clone()
    }

    pub fn inventory(&self) -> Vec<InventoryItem> {
        self.tables.lock().unwrap().inventory.clone()
    }
}

fn owns_list(tables: &Tables, list_id: Uuid, user_id: Uuid) -> bool {
    tables
        .lists
        .iter()
        .any(|list| list.id == list_id && list.user_id == user_id)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_lists(&self, user_id: Uuid) -> Result<Vec<PackingList>, RepoError> {
        let mut lists: Vec<PackingList> = self
            .tables()?
            .lists
            .iter()
            .filter(|list| list.user_id == user_id)
            .cloned()
            .collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lists)
    }

    async fn get_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<PackingList>, RepoError> {
        Ok(self
            .tables()?
            .lists
            .iter()
            .find(|list| list.id == id && list.user_id == user_id)
            .cloned())
    }

    async fn create_list(&self, user_id: Uuid, name: &str) -> Result<PackingList, RepoError> {
        drop(self.tables()?);
        Ok(self.seed_list(user_id, name))
    }

    async fn rename_list(&self, id: Uuid, user_id: Uuid, name: &str) -> Result<Option<PackingList>, RepoError> {
        let mut tables = self.tables()?;
        let list = tables
            .lists
            .iter_mut()
            .find(|list| list.id == id && list.user_id == user_id);
        Ok(list.map(|list| {
            list.name = name.to_string();
            list.clone()
        }))
    }

    async fn delete_list(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables()?;
        if !owns_list(&tables, id, user_id) {
            return Ok(false);
        }
        tables.lists.retain(|list| list.id != id);
        tables.items.retain(|item| item.list_id != id);
        Ok(true)
    }

    async fn get_list_items(&self, list_id: Uuid, user_id: Uuid) -> Result<Vec<ListItem>, RepoError> {
        Ok(self
            .tables()?
            .items
            .iter()
            .filter(|item| item.list_id == list_id && item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_items_from_inventory(
        &self,
        list_id: Uuid,
        user_id: Uuid,
        inventory_ids: &[Uuid],
    ) -> Result<Vec<ListItem>, RepoError> {
        let mut tables = self.tables()?;
        if !owns_list(&tables, list_id, user_id) {
            return Ok(vec![]);
        }
        let added: Vec<ListItem> = tables
            .inventory
            .iter()
            .filter(|entry| entry.user_id == user_id && inventory_ids.contains(&entry.id))
            .map(|entry| ListItem {
                id: Uuid::new_v4(),
                list_id,
                user_id,
                name: entry.name.clone(),
                category: entry.category.clone(),
                is_checked: false,
            })
            .collect();
        tables.items.extend(added.iter().cloned());
        Ok(added)
    }

    async fn toggle_item(&self, item_id: Uuid, list_id: Uuid, user_id: Uuid) -> Result<Option<ListItem>, RepoError> {
        let mut tables = self.tables()?;
        let item = tables
            .items
            .iter_mut()
            .find(|item| item.id == item_id && item.list_id == list_id && item.user_id == user_id);
        Ok(item.map(|item| {
            item.is_checked = !item.is_checked;
            item.clone()
        }))
    }

    async fn delete_list_item(&self, item_id: Uuid, list_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables()?;
        let before = tables.items.len();
        tables
            .items
            .retain(|item| !(item.id == item_id && item.list_id == list_id && item.user_id == user_id));
        Ok(tables.items.len() < before)
    }

    async fn reset_list(&self, list_id: Uuid, user_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.tables()?;
        let mut touched = 0;
        for item in tables
            .items
            .iter_mut()
            .filter(|item| item.list_id == list_id && item.user_id == user_id)
        {
            item.is_checked = false;
            touched += 1;
        }
        Ok(touched)
    }

    async fn get_inventory(&self, user_id: Uuid) -> Result<Vec<InventoryItem>, RepoError> {
        Ok(self
            .tables()?
            .inventory
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_inventory_items(
        &self,
        user_id: Uuid,
        category: &str,
        names: &[String],
    ) -> Result<Vec<InventoryItem>, RepoError> {
        drop(self.tables()?);
        Ok(names
            .iter()
            .map(|name| self.seed_inventory(user_id, name, category))
            .collect())
    }

    async fn delete_inventory_item(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables()?;
        let before = tables.inventory.len();
        tables
            .inventory
            .retain(|item| !(item.id == id && item.user_id == user_id));
        Ok(tables.inventory.len() < before)
    }

    async fn delete_category(&self, user_id: Uuid, category: &str) -> Result<u64, RepoError> {
        let mut tables = self.tables()?;
        let before = tables.inventory.len();
        tables
            .inventory
            .retain(|item| !(item.user_id == user_id && item.category == category));
        Ok((before - tables.inventory.len()) as u64)
    }
}

// --- Application Harness ---

pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";
pub const ALICE: Uuid = Uuid::from_u128(0xA11CE);
pub const BOB: Uuid = Uuid::from_u128(0xB0B);

/// The full router wired to in-memory collaborators, with handles kept for
/// assertions.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub sessions: Arc<MockSessionStore>,
    recorded: Arc<Mutex<Vec<AuthEvent>>>,
    _subscription: Subscription,
}

impl TestApp {
    pub fn new(repo: InMemoryRepository, sessions: MockSessionStore) -> Self {
        let repo = Arc::new(repo);
        let sessions = Arc::new(sessions);

        let auth_events = AuthEvents::new();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let subscription = auth_events.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let state = AppState {
            repo: repo.clone(),
            sessions: sessions.clone() as SessionState,
            config: AppConfig::default(),
            auth_events,
        };

        Self {
            router: create_router(state),
            repo,
            sessions,
            recorded,
            _subscription: subscription,
        }
    }

    /// Alice and Bob both signed in, empty data store.
    pub fn with_users() -> Self {
        Self::new(InMemoryRepository::new(), signed_in_users())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn events(&self) -> Vec<AuthEvent> {
        self.recorded.lock().unwrap().clone()
    }
}

pub fn signed_in_users() -> MockSessionStore {
    MockSessionStore::new()
        .with_session(ALICE_TOKEN, ALICE)
        .with_session(BOB_TOKEN, BOB)
}

// --- Request / Response Helpers ---

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("sb-access-token={token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, token, None)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// Value of the cookie `name` as set by the response.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
}
