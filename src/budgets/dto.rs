use serde::{Deserialize, Serialize};

use super::repo_types::Budget;
use crate::pagination::PageQuery;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateBudgetRequest {
    pub category_id: String,
    pub month: String,
    pub limit_amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateBudgetRequest {
    pub category_id: Option<String>,
    pub month: Option<String>,
    pub limit_amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListBudgetsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub month: Option<String>,
    pub category_id: Option<String>,
}

impl ListBudgetsQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub budget: Budget,
}
