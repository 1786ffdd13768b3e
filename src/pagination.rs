use serde::{Deserialize, Serialize};

use crate::validation::Checks;
use crate::error::AppResult;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits an `i64` at any allowed limit.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// `?page=&limit=` as sent by the client.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl PageQuery {
    pub fn validate(self) -> AppResult<Page> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        Checks::new()
            .require(
                (1..=MAX_PAGE).contains(&page),
                "page",
                &format!("must be between 1 and {MAX_PAGE}"),
            )
            .require(
                (1..=MAX_LIMIT).contains(&limit),
                "limit",
                &format!("must be between 1 and {MAX_LIMIT}"),
            )
            .finish()?;
        Ok(Page { page, limit })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
        }
    }
}

/// One page of results plus the totals needed to page through the rest.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        Self {
            items,
            pagination: Pagination::new(page, total),
        }
    }
}
