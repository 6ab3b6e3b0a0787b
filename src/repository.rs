use crate::models::{InventoryItem, ListItem, PackingList};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepoError
///
/// A data store round-trip failed. Nothing was applied: every write below is a single
/// statement.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Persistence contract for lists, checklist items and the inventory.
///
/// Every method takes the caller's `user_id` and filters on it, so a row owned by
/// someone else behaves exactly like a missing row. The access gate does not stand
/// in for these predicates.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Lists ---
    /// All of the user's lists, newest first.
    async fn get_lists(&self, user_id: Uuid) -> Result<Vec<PackingList>, RepoError>;
    async fn get_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<PackingList>, RepoError>;
    async fn create_list(&self, user_id: Uuid, name: &str) -> Result<PackingList, RepoError>;
    async fn rename_list(&self, id: Uuid, user_id: Uuid, name: &str) -> Result<Option<PackingList>, RepoError>;
    /// Removes the list together with its checklist items. False when nothing matched.
    async fn delete_list(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;

    // --- Checklist Items ---
    async fn get_list_items(&self, list_id: Uuid, user_id: Uuid) -> Result<Vec<ListItem>, RepoError>;
    /// Copies the selected inventory rows onto the list, unchecked. Ids the user does
    /// not own are skipped.
    async fn add_items_from_inventory(
        &self,
        list_id: Uuid,
        user_id: Uuid,
        inventory_ids: &[Uuid],
    ) -> Result<Vec<ListItem>, RepoError>;
    /// Flips `is_checked` and returns the updated row.
    async fn toggle_item(&self, item_id: Uuid, list_id: Uuid, user_id: Uuid) -> Result<Option<ListItem>, RepoError>;
    async fn delete_list_item(&self, item_id: Uuid, list_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;
    /// Clears every checked flag on the list; returns the number of rows touched.
    async fn reset_list(&self, list_id: Uuid, user_id: Uuid) -> Result<u64, RepoError>;

    // --- Inventory ---
    async fn get_inventory(&self, user_id: Uuid) -> Result<Vec<InventoryItem>, RepoError>;
    async fn add_inventory_items(
        &self,
        user_id: Uuid,
        category: &str,
        names: &[String],
    ) -> Result<Vec<InventoryItem>, RepoError>;
    async fn delete_inventory_item(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;
    /// Bulk delete of every inventory row in `category`; returns the number removed.
    async fn delete_category(&self, user_id: Uuid, category: &str) -> Result<u64, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the hosted Postgres instance.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_lists(&self, user_id: Uuid) -> Result<Vec<PackingList>, RepoError> {
        let lists = sqlx::query_as::<_, PackingList>(
            "SELECT id, user_id, name, created_at FROM lists WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lists)
    }

    async fn get_list(&self, id: Uuid, user_id: Uuid) -> Result<Option<PackingList>, RepoError> {
        let list = sqlx::query_as::<_, PackingList>(
            "SELECT id, user_id, name, created_at FROM lists WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(list)
    }

    async fn create_list(&self, user_id: Uuid, name: &str) -> Result<PackingList, RepoError> {
        let list = sqlx::query_as::<_, PackingList>(
            "INSERT INTO lists (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name, created_at",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(list)
    }

    async fn rename_list(&self, id: Uuid, user_id: Uuid, name: &str) -> Result<Option<PackingList>, RepoError> {
        let list = sqlx::query_as::<_, PackingList>(
            r#"
            UPDATE lists SET name = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(list)
    }

    /// Items go with the list through `ON DELETE CASCADE`.
    async fn delete_list(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM lists WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_list_items(&self, list_id: Uuid, user_id: Uuid) -> Result<Vec<ListItem>, RepoError> {
        let items = sqlx::query_as::<_, ListItem>(
            r#"
            SELECT id, list_id, user_id, name, category, is_checked
            FROM items
            WHERE list_id = $1 AND user_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(list_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// INSERT ... SELECT: the copy happens in one statement and only from rows the
    /// caller owns, onto a list the caller owns.
    async fn add_items_from_inventory(
        &self,
        list_id: Uuid,
        user_id: Uuid,
        inventory_ids: &[Uuid],
    ) -> Result<Vec<ListItem>, RepoError> {
        let items = sqlx::query_as::<_, ListItem>(
            r#"
            INSERT INTO items (list_id, user_id, name, category, is_checked)
            SELECT l.id, l.user_id, i.name, i.category, false
            FROM inventory i
            JOIN lists l ON l.id = $1 AND l.user_id = $2
            WHERE i.user_id = $2 AND i.id = ANY($3)
            RETURNING id, list_id, user_id, name, category, is_checked
            "#,
        )
        .bind(list_id)
        .bind(user_id)
        .bind(inventory_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn toggle_item(&self, item_id: Uuid, list_id: Uuid, user_id: Uuid) -> Result<Option<ListItem>, RepoError> {
        let item = sqlx::query_as::<_, ListItem>(
            r#"
            UPDATE items SET is_checked = NOT is_checked
            WHERE id = $1 AND list_id = $2 AND user_id = $3
            RETURNING id, list_id, user_id, name, category, is_checked
            "#,
        )
        .bind(item_id)
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete_list_item(&self, item_id: Uuid, list_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND list_id = $2 AND user_id = $3")
            .bind(item_id)
            .bind(list_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_list(&self, list_id: Uuid, user_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("UPDATE items SET is_checked = false WHERE list_id = $1 AND user_id = $2")
            .bind(list_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_inventory(&self, user_id: Uuid) -> Result<Vec<InventoryItem>, RepoError> {
        let items = sqlx::query_as::<_, InventoryItem>(
            "SELECT id, user_id, name, category FROM inventory WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// One multi-row INSERT built with QueryBuilder, so a failure leaves no partial batch.
    async fn add_inventory_items(
        &self,
        user_id: Uuid,
        category: &str,
        names: &[String],
    ) -> Result<Vec<InventoryItem>, RepoError> {
        if names.is_empty() {
            return Ok(vec![]);
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO inventory (user_id, name, category) ");
        builder.push_values(names, |mut row, name| {
            row.push_bind(user_id)
                .push_bind(name.clone())
                .push_bind(category.to_string());
        });
        builder.push(" RETURNING id, user_id, name, category");

        let items = builder
            .build_query_as::<InventoryItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn delete_inventory_item(&self, id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM inventory WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_category(&self, user_id: Uuid, category: &str) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM inventory WHERE user_id = $1 AND category = $2")
            .bind(user_id)
            .bind(category)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
