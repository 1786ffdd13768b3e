use async_trait::async_trait;

use crate::dashboard::repo_types::{CategoryTotal, EstablishmentCount, MonthWindow};
use crate::db::{PgStore, StoreResult};
use crate::guard::Owner;

/// Read-only aggregates over the owner's purchases in a month.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn monthly_total(&self, owner: Owner, window: MonthWindow) -> StoreResult<f64>;

    /// Ordered by total, largest first.
    async fn expenses_by_category(
        &self,
        owner: Owner,
        window: MonthWindow,
    ) -> StoreResult<Vec<CategoryTotal>>;

    /// Most frequent establishments, ties broken by name.
    async fn top_establishments(
        &self,
        owner: Owner,
        window: MonthWindow,
        limit: i64,
    ) -> StoreResult<Vec<EstablishmentCount>>;
}

#[async_trait]
impl StatsStore for PgStore {
    async fn monthly_total(&self, owner: Owner, window: MonthWindow) -> StoreResult<f64> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)::float8
              FROM purchases
             WHERE user_id = $1 AND date >= $2 AND date < $3
            "#,
        )
        .bind(owner.id())
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn expenses_by_category(
        &self,
        owner: Owner,
        window: MonthWindow,
    ) -> StoreResult<Vec<CategoryTotal>> {
        let rows = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT p.category_id,
                   c.name                 AS category_name,
                   SUM(p.amount)::float8  AS total,
                   COUNT(*)               AS count
              FROM purchases p
              JOIN categories c ON c.id = p.category_id AND c.user_id = p.user_id
             WHERE p.user_id = $1 AND p.date >= $2 AND p.date < $3
             GROUP BY p.category_id, c.name
             ORDER BY total DESC, c.name ASC
            "#,
        )
        .bind(owner.id())
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn top_establishments(
        &self,
        owner: Owner,
        window: MonthWindow,
        limit: i64,
    ) -> StoreResult<Vec<EstablishmentCount>> {
        let rows = sqlx::query_as::<_, EstablishmentCount>(
            r#"
            SELECT establishment AS name, COUNT(*) AS count
              FROM purchases
             WHERE user_id = $1 AND date >= $2 AND date < $3
             GROUP BY establishment
             ORDER BY count DESC, establishment ASC
             LIMIT $4
            "#,
        )
        .bind(owner.id())
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
