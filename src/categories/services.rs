use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    categories::{
        dto::{CreateCategoryRequest, UpdateCategoryRequest},
        repo::CategoryStore,
        repo_types::{Category, CategoryChanges, NewCategory, DEFAULT_COLOR},
    },
    db::StoreError,
    error::{AppError, AppResult},
    guard::{found, Owner},
    validation::{clean_optional, Checks},
};

fn duplicate_name() -> AppError {
    AppError::Conflict("a category with this name already exists".into())
}

pub async fn list(store: &dyn CategoryStore, owner: Owner) -> AppResult<Vec<Category>> {
    Ok(store.list_categories(owner).await?)
}

pub async fn get(store: &dyn CategoryStore, owner: Owner, id: Uuid) -> AppResult<Category> {
    found("category", store.find_category(owner, id).await?)
}

/// Resolves a `categoryId` reference from another record. A foreign id is
/// reported like a missing one, as a field error rather than `NotFound`.
pub async fn ensure_owned(store: &dyn CategoryStore, owner: Owner, id: Uuid) -> AppResult<Uuid> {
    match store.find_category(owner, id).await? {
        Some(_) => Ok(id),
        None => Err(AppError::field("categoryId", "category not found")),
    }
}

#[instrument(skip(store, req))]
pub async fn create(
    store: &dyn CategoryStore,
    owner: Owner,
    req: CreateCategoryRequest,
) -> AppResult<Category> {
    let name = req.name.trim().to_string();
    Checks::new().not_blank("name", &name).finish()?;

    if store.find_category_by_name(owner, &name).await?.is_some() {
        return Err(duplicate_name());
    }

    let new = NewCategory {
        name,
        description: clean_optional(req.description),
        color: clean_optional(req.color).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        icon: clean_optional(req.icon),
    };
    let category = match store.create_category(owner, new).await {
        Ok(c) => c,
        Err(StoreError::Conflict(_)) => return Err(duplicate_name()),
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %owner.id(), category_id = %category.id, "category created");
    Ok(category)
}

#[instrument(skip(store, req))]
pub async fn update(
    store: &dyn CategoryStore,
    owner: Owner,
    id: Uuid,
    req: UpdateCategoryRequest,
) -> AppResult<Category> {
    let name = req.name.map(|n| n.trim().to_string());
    if let Some(name) = &name {
        Checks::new().not_blank("name", name).finish()?;
    }

    let existing = get(store, owner, id).await?;
    if let Some(name) = &name {
        if *name != existing.name && store.find_category_by_name(owner, name).await?.is_some() {
            return Err(duplicate_name());
        }
    }

    let changes = CategoryChanges {
        name,
        description: clean_optional(req.description),
        color: clean_optional(req.color),
        icon: clean_optional(req.icon),
    };
    let category = match store.update_category(owner, id, changes).await {
        Ok(row) => found("category", row)?,
        Err(StoreError::Conflict(_)) => return Err(duplicate_name()),
        Err(e) => return Err(e.into()),
    };
    info!(user_id = %owner.id(), category_id = %id, "category updated");
    Ok(category)
}

/// Refused while any purchase still points at the category. Budgets for
/// it go with it.
#[instrument(skip(store))]
pub async fn delete(store: &dyn CategoryStore, owner: Owner, id: Uuid) -> AppResult<()> {
    get(store, owner, id).await?;

    let in_use = AppError::Conflict("category has purchases and cannot be deleted".into());
    if store.count_purchases_in_category(owner, id).await? > 0 {
        return Err(in_use);
    }
    match store.delete_category(owner, id).await {
        Ok(true) => {}
        Ok(false) => return Err(AppError::NotFound("category")),
        Err(StoreError::Conflict(_)) => return Err(in_use),
        Err(e) => return Err(e.into()),
    }
    info!(user_id = %owner.id(), category_id = %id, "category deleted");
    Ok(())
}
