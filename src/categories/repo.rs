use async_trait::async_trait;
use uuid::Uuid;

use crate::categories::repo_types::{Category, CategoryChanges, NewCategory};
use crate::db::{PgStore, StoreResult};
use crate::guard::Owner;

/// Owner-scoped category persistence. A category belonging to someone else
/// is reported exactly like a missing one.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Ordered by name.
    async fn list_categories(&self, owner: Owner) -> StoreResult<Vec<Category>>;

    async fn find_category(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Category>>;

    async fn find_category_by_name(&self, owner: Owner, name: &str)
        -> StoreResult<Option<Category>>;

    /// Fails with `StoreError::Conflict` when the owner already has the name.
    async fn create_category(&self, owner: Owner, category: NewCategory) -> StoreResult<Category>;

    async fn update_category(
        &self,
        owner: Owner,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>>;

    /// Fails with `StoreError::Conflict` while purchases still reference it.
    async fn delete_category(&self, owner: Owner, id: Uuid) -> StoreResult<bool>;

    async fn count_purchases_in_category(&self, owner: Owner, id: Uuid) -> StoreResult<i64>;
}

const CATEGORY_COLUMNS: &str =
    "id, user_id, name, description, color, icon, created_at, updated_at";

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self, owner: Owner) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = $1 ORDER BY name ASC"
        ))
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_category(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_category_by_name(
        &self,
        owner: Owner,
        name: &str,
    ) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = $1 AND name = $2"
        ))
        .bind(owner.id())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_category(&self, owner: Owner, category: NewCategory) -> StoreResult<Category> {
        let row = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (user_id, name, description, color, icon)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(owner.id())
        .bind(category.name)
        .bind(category.description)
        .bind(category.color)
        .bind(category.icon)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_category(
        &self,
        owner: Owner,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
               SET name        = COALESCE($3, name),
                   description = COALESCE($4, description),
                   color       = COALESCE($5, color),
                   icon        = COALESCE($6, icon),
                   updated_at  = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner.id())
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.color)
        .bind(changes.icon)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_category(&self, owner: Owner, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_purchases_in_category(&self, owner: Owner, id: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchases WHERE category_id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner.id())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
