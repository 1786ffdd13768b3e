use std::{fmt, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" => Ok(PaymentMethod::Transfer),
            _ => Err(()),
        }
    }
}

/// Stored row; `payment_method` holds [`PaymentMethod::as_str`].
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub amount: f64,
    pub establishment: String,
    pub description: Option<String>,
    pub items: Option<String>,
    pub payment_method: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub category_id: Uuid,
    pub date: OffsetDateTime,
    pub amount: f64,
    pub establishment: String,
    pub description: Option<String>,
    pub items: Option<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseChanges {
    pub category_id: Option<Uuid>,
    pub date: Option<OffsetDateTime>,
    pub amount: Option<f64>,
    pub establishment: Option<String>,
    pub description: Option<String>,
    pub items: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// List filters; every bound is inclusive and `None` means unbounded.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFilter {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring.
    pub establishment: Option<String>,
}

impl PurchaseFilter {
    pub fn matches(&self, p: &Purchase) -> bool {
        self.from.map_or(true, |from| p.date >= from)
            && self.to.map_or(true, |to| p.date <= to)
            && self.category_id.map_or(true, |c| p.category_id == c)
            && self.establishment.as_ref().map_or(true, |needle| {
                p.establishment
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}
