use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    budgets::{
        dto::{CreateBudgetRequest, ListBudgetsQuery, UpdateBudgetRequest},
        repo::BudgetStore,
        repo_types::{Budget, BudgetChanges, BudgetFilter, NewBudget},
    },
    categories::{self, repo::CategoryStore},
    db::StoreError,
    error::{AppError, AppResult},
    guard::{found, Owner},
    pagination::{Page, Paged},
    validation::{is_valid_month, parse_id, Checks},
};

const BAD_ID: &str = "must be a category id";
const BAD_MONTH: &str = "must be YYYY-MM";

fn duplicate_budget() -> AppError {
    AppError::Conflict("a budget for this category and month already exists".into())
}

fn parse_month(value: &str) -> Option<String> {
    let value = value.trim();
    is_valid_month(value).then(|| value.to_string())
}

pub fn parse_list_query(query: ListBudgetsQuery) -> AppResult<(BudgetFilter, Page)> {
    let page = query.page_query().validate()?;

    let mut checks = Checks::new();
    let month = query
        .month
        .as_deref()
        .map(|v| checks.some(parse_month(v), "month", BAD_MONTH));
    let category_id = query
        .category_id
        .as_deref()
        .map(|v| checks.some(parse_id(v), "categoryId", BAD_ID));
    checks.finish()?;

    let filter = BudgetFilter {
        month: month.flatten(),
        category_id: category_id.flatten(),
    };
    Ok((filter, page))
}

pub async fn list(
    store: &dyn BudgetStore,
    owner: Owner,
    query: ListBudgetsQuery,
) -> AppResult<Paged<Budget>> {
    let (filter, page) = parse_list_query(query)?;
    let (items, total) = store.list_budgets(owner, &filter, page).await?;
    Ok(Paged::new(items, page, total))
}

pub async fn get(store: &dyn BudgetStore, owner: Owner, id: Uuid) -> AppResult<Budget> {
    found("budget", store.find_budget(owner, id).await?)
}

#[instrument(skip(store, categories, req))]
pub async fn create(
    store: &dyn BudgetStore,
    categories: &dyn CategoryStore,
    owner: Owner,
    req: CreateBudgetRequest,
) -> AppResult<Budget> {
    let mut checks = Checks::new();
    let category_id = checks.some(parse_id(&req.category_id), "categoryId", BAD_ID);
    let month = checks.some(parse_month(&req.month), "month", BAD_MONTH);
    let limit_amount = checks.positive("limitAmount", req.limit_amount);
    let (Some(category_id), Some(month), Some(limit_amount)) = (category_id, month, limit_amount)
    else {
        return Err(checks.into_error());
    };

    categories::services::ensure_owned(categories, owner, category_id).await?;
    if store
        .find_budget_for(owner, category_id, &month)
        .await?
        .is_some()
    {
        return Err(duplicate_budget());
    }

    let new = NewBudget {
        category_id,
        month,
        limit_amount,
    };
    let budget = match store.create_budget(owner, new).await {
        Ok(b) => b,
        Err(StoreError::Conflict(_)) => return Err(duplicate_budget()),
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %owner.id(), budget_id = %budget.id, month = %budget.month, "budget created");
    Ok(budget)
}

/// Moving a budget to another month or category re-checks uniqueness,
/// ignoring the budget being moved.
#[instrument(skip(store, categories, req))]
pub async fn update(
    store: &dyn BudgetStore,
    categories: &dyn CategoryStore,
    owner: Owner,
    id: Uuid,
    req: UpdateBudgetRequest,
) -> AppResult<Budget> {
    let mut checks = Checks::new();
    let category_id = req
        .category_id
        .as_deref()
        .map(|v| checks.some(parse_id(v), "categoryId", BAD_ID));
    let month = req
        .month
        .as_deref()
        .map(|v| checks.some(parse_month(v), "month", BAD_MONTH));
    let limit_amount = req
        .limit_amount
        .map(|v| checks.positive("limitAmount", Some(v)));
    checks.finish()?;

    let (category_id, month) = (category_id.flatten(), month.flatten());
    let existing = get(store, owner, id).await?;

    if let Some(category_id) = category_id {
        categories::services::ensure_owned(categories, owner, category_id).await?;
    }
    if category_id.is_some() || month.is_some() {
        let target_category = category_id.unwrap_or(existing.category_id);
        let target_month = month.as_deref().unwrap_or(&existing.month);
        if let Some(other) = store
            .find_budget_for(owner, target_category, target_month)
            .await?
        {
            if other.id != id {
                return Err(duplicate_budget());
            }
        }
    }

    let changes = BudgetChanges {
        category_id,
        month,
        limit_amount: limit_amount.flatten(),
    };
    let budget = match store.update_budget(owner, id, changes).await {
        Ok(row) => found("budget", row)?,
        Err(StoreError::Conflict(_)) => return Err(duplicate_budget()),
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %owner.id(), budget_id = %id, "budget updated");
    Ok(budget)
}

#[instrument(skip(store))]
pub async fn delete(store: &dyn BudgetStore, owner: Owner, id: Uuid) -> AppResult<()> {
    if !store.delete_budget(owner, id).await? {
        return Err(AppError::NotFound("budget"));
    }
    info!(user_id = %owner.id(), budget_id = %id, "budget deleted");
    Ok(())
}
