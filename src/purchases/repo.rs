use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{PgStore, StoreResult};
use crate::guard::Owner;
use crate::pagination::Page;
use crate::purchases::repo_types::{NewPurchase, Purchase, PurchaseChanges, PurchaseFilter};

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// One page ordered by date, newest first, plus the total match count.
    async fn list_purchases(
        &self,
        owner: Owner,
        filter: &PurchaseFilter,
        page: Page,
    ) -> StoreResult<(Vec<Purchase>, i64)>;

    async fn find_purchase(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Purchase>>;

    async fn create_purchase(&self, owner: Owner, purchase: NewPurchase) -> StoreResult<Purchase>;

    async fn update_purchase(
        &self,
        owner: Owner,
        id: Uuid,
        changes: PurchaseChanges,
    ) -> StoreResult<Option<Purchase>>;

    async fn delete_purchase(&self, owner: Owner, id: Uuid) -> StoreResult<bool>;
}

const PURCHASE_COLUMNS: &str = "id, user_id, category_id, date, amount, establishment, \
     description, items, payment_method, created_at, updated_at";

// $1 owner, $2 from, $3 to, $4 category, $5 establishment pattern
const PURCHASE_FILTER: &str = r#"
    WHERE user_id = $1
      AND ($2::timestamptz IS NULL OR date >= $2)
      AND ($3::timestamptz IS NULL OR date <= $3)
      AND ($4::uuid IS NULL OR category_id = $4)
      AND ($5::text IS NULL OR establishment ILIKE $5)
"#;

/// `%needle%` with LIKE metacharacters escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn list_purchases(
        &self,
        owner: Owner,
        filter: &PurchaseFilter,
        page: Page,
    ) -> StoreResult<(Vec<Purchase>, i64)> {
        let pattern = filter.establishment.as_deref().map(contains_pattern);

        let rows = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases {PURCHASE_FILTER} \
             ORDER BY date DESC, created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(owner.id())
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.category_id)
        .bind(pattern.as_deref())
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM purchases {PURCHASE_FILTER}"))
                .bind(owner.id())
                .bind(filter.from)
                .bind(filter.to)
                .bind(filter.category_id)
                .bind(pattern.as_deref())
                .fetch_one(&self.pool)
                .await?;

        Ok((rows, total))
    }

    async fn find_purchase(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Purchase>> {
        let row = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_purchase(&self, owner: Owner, purchase: NewPurchase) -> StoreResult<Purchase> {
        let row = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            INSERT INTO purchases
                (user_id, category_id, date, amount, establishment, description, items, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(owner.id())
        .bind(purchase.category_id)
        .bind(purchase.date)
        .bind(purchase.amount)
        .bind(purchase.establishment)
        .bind(purchase.description)
        .bind(purchase.items)
        .bind(purchase.payment_method.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_purchase(
        &self,
        owner: Owner,
        id: Uuid,
        changes: PurchaseChanges,
    ) -> StoreResult<Option<Purchase>> {
        let row = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            UPDATE purchases
               SET category_id    = COALESCE($3, category_id),
                   date           = COALESCE($4, date),
                   amount         = COALESCE($5, amount),
                   establishment  = COALESCE($6, establishment),
                   description    = COALESCE($7, description),
                   items          = COALESCE($8, items),
                   payment_method = COALESCE($9, payment_method),
                   updated_at     = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {PURCHASE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner.id())
        .bind(changes.category_id)
        .bind(changes.date)
        .bind(changes.amount)
        .bind(changes.establishment)
        .bind(changes.description)
        .bind(changes.items)
        .bind(changes.payment_method.map(|m| m.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_purchase(&self, owner: Owner, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner.id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
