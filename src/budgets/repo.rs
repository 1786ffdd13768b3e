use async_trait::async_trait;
use uuid::Uuid;

use crate::budgets::repo_types::{Budget, BudgetChanges, BudgetFilter, NewBudget};
use crate::db::{PgStore, StoreResult};
use crate::guard::Owner;
use crate::pagination::Page;

#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// One page ordered by month, latest first, plus the total match count.
    async fn list_budgets(
        &self,
        owner: Owner,
        filter: &BudgetFilter,
        page: Page,
    ) -> StoreResult<(Vec<Budget>, i64)>;

    async fn find_budget(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Budget>>;

    /// The budget for a category and month, if one exists.
    async fn find_budget_for(
        &self,
        owner: Owner,
        category_id: Uuid,
        month: &str,
    ) -> StoreResult<Option<Budget>>;

    /// Fails with `StoreError::Conflict` when the category already has a
    /// budget for the month.
    async fn create_budget(&self, owner: Owner, budget: NewBudget) -> StoreResult<Budget>;

    async fn update_budget(
        &self,
        owner: Owner,
        id: Uuid,
        changes: BudgetChanges,
    ) -> StoreResult<Option<Budget>>;

    async fn delete_budget(&self, owner: Owner, id: Uuid) -> StoreResult<bool>;
}

const BUDGET_COLUMNS: &str =
    "id, user_id, category_id, month, limit_amount, created_at, updated_at";

// $1 owner, $2 month, $3 category
const BUDGET_FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::text IS NULL OR month = $2)
      AND ($3::uuid IS NULL OR category_id = $3)
"#;

#[async_trait]
impl BudgetStore for PgStore {
    async fn list_budgets(
        &self,
        owner: Owner,
        filter: &BudgetFilter,
        page: Page,
    ) -> StoreResult<(Vec<Budget>, i64)> {
        let rows = sqlx::query_as::<_, Budget>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets {BUDGET_FILTER} \
             ORDER BY month DESC, created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(owner.id())
        .bind(filter.month.as_deref())
        .bind(filter.category_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM budgets {BUDGET_FILTER}"))
                .bind(owner.id())
                .bind(filter.month.as_deref())
                .bind(filter.category_id)
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    async fn find_budget(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Budget>> {
        let row = sqlx::query_as::<_, Budget>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_budget_for(
        &self,
        owner: Owner,
        category_id: Uuid,
        month: &str,
    ) -> StoreResult<Option<Budget>> {
        let row = sqlx::query_as::<_, Budget>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets \
             WHERE user_id = $1 AND category_id = $2 AND month = $3"
        ))
        .bind(owner.id())
        .bind(category_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_budget(&self, owner: Owner, budget: NewBudget) -> StoreResult<Budget> {
        let row = sqlx::query_as::<_, Budget>(&format!(
            r#"
            INSERT INTO budgets (user_id, category_id, month, limit_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING {BUDGET_COLUMNS}
            "#
        ))
        .bind(owner.id())
        .bind(budget.category_id)
        .bind(budget.month)
        .bind(budget.limit_amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_budget(
        &self,
        owner: Owner,
        id: Uuid,
        changes: BudgetChanges,
    ) -> StoreResult<Option<Budget>> {
        let row = sqlx::query_as::<_, Budget>(&format!(
            r#"
            UPDATE budgets
               SET category_id  = COALESCE($3, category_id),
                   month        = COALESCE($4, month),
                   limit_amount = COALESCE($5, limit_amount),
                   updated_at   = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {BUDGET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner.id())
        .bind(changes.category_id)
        .bind(changes.month)
        .bind(changes.limit_amount)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_budget(&self, owner: Owner, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
