use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A spending limit for one category in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    /// `YYYY-MM`
    pub month: String,
    pub limit_amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub category_id: Uuid,
    pub month: String,
    pub limit_amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetChanges {
    pub category_id: Option<Uuid>,
    pub month: Option<String>,
    pub limit_amount: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub month: Option<String>,
    pub category_id: Option<Uuid>,
}

impl BudgetFilter {
    pub fn matches(&self, b: &Budget) -> bool {
        self.month.as_ref().map_or(true, |m| &b.month == m)
            && self.category_id.map_or(true, |c| b.category_id == c)
    }
}
