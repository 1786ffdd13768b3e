use serde::{Deserialize, Serialize};

use super::repo_types::Purchase;
use crate::pagination::PageQuery;

/// Request body for recording a purchase. Fields stay loosely typed so that
/// every bad one is reported, not just the first serde trips over.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePurchaseRequest {
    pub category_id: String,
    pub date: String,
    pub amount: Option<f64>,
    pub establishment: String,
    pub description: Option<String>,
    pub items: Option<String>,
    pub payment_method: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePurchaseRequest {
    pub category_id: Option<String>,
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub establishment: Option<String>,
    pub description: Option<String>,
    pub items: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListPurchasesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub category_id: Option<String>,
    pub establishment: Option<String>,
}

impl ListPurchasesQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub purchase: Purchase,
}
