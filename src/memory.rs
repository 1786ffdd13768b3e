//! In-process implementation of every store trait, used as the test double
//! behind `AppState::fake()`. It honours the same contracts as `PgStore`:
//! unique keys surface as `StoreError::Conflict`, deletes report whether a
//! row went away, and every owned-record query is filtered by owner.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{
        repo::CredentialStore,
        repo_types::{NewRefreshToken, NewUser, RefreshToken, User, UserChanges},
    },
    budgets::{
        repo::BudgetStore,
        repo_types::{Budget, BudgetChanges, BudgetFilter, NewBudget},
    },
    categories::{
        repo::CategoryStore,
        repo_types::{Category, CategoryChanges, NewCategory},
    },
    dashboard::{
        repo::StatsStore,
        repo_types::{CategoryTotal, EstablishmentCount, MonthWindow},
    },
    db::{StoreError, StoreResult},
    guard::Owner,
    pagination::Page,
    purchases::{
        repo::PurchaseStore,
        repo_types::{NewPurchase, Purchase, PurchaseChanges, PurchaseFilter},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    categories: Vec<Category>,
    purchases: Vec<Purchase>,
    budgets: Vec<Budget>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict(constraint.to_string())
}

fn page_of<T: Clone>(rows: Vec<T>, page: Page) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

impl MemoryStore {
    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.tables.lock().await.refresh_tokens.len()
    }

    /// Backdates a stored refresh token so it reads as expired.
    pub async fn expire_refresh_token(&self, token: &str) {
        if let Some(row) = self.tables.lock().await.refresh_tokens.get_mut(token) {
            row.expires_at = OffsetDateTime::now_utc() - time::Duration::seconds(1);
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(conflict("users_email_key"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            display_name: user.display_name,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut t = self.tables.lock().await;
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(conflict("users_email_key"));
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(display_name) = changes.display_name {
            user.display_name = display_name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        let t = self.tables.lock().await;
        Ok(t.refresh_tokens.get(token).cloned())
    }

    async fn create_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut t = self.tables.lock().await;
        if t.refresh_tokens.contains_key(&token.token) {
            return Err(conflict("refresh_tokens_pkey"));
        }
        let row = RefreshToken {
            token: token.token,
            user_id: token.user_id,
            expires_at: token.expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        t.refresh_tokens.insert(row.token.clone(), row.clone());
        Ok(row)
    }

    async fn delete_refresh_token(&self, token: &str) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        Ok(t.refresh_tokens.remove(token).is_some())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self, owner: Owner) -> StoreResult<Vec<Category>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<_> = t
            .categories
            .iter()
            .filter(|c| c.user_id == owner.id())
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find_category(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Category>> {
        let t = self.tables.lock().await;
        Ok(t.categories
            .iter()
            .find(|c| c.id == id && c.user_id == owner.id())
            .cloned())
    }

    async fn find_category_by_name(
        &self,
        owner: Owner,
        name: &str,
    ) -> StoreResult<Option<Category>> {
        let t = self.tables.lock().await;
        Ok(t.categories
            .iter()
            .find(|c| c.name == name && c.user_id == owner.id())
            .cloned())
    }

    async fn create_category(&self, owner: Owner, category: NewCategory) -> StoreResult<Category> {
        let mut t = self.tables.lock().await;
        if t
            .categories
            .iter()
            .any(|c| c.user_id == owner.id() && c.name == category.name)
        {
            return Err(conflict("categories_user_id_name_key"));
        }
        let now = OffsetDateTime::now_utc();
        let row = Category {
            id: Uuid::new_v4(),
            user_id: owner.id(),
            name: category.name,
            description: category.description,
            color: category.color,
            icon: category.icon,
            created_at: now,
            updated_at: now,
        };
        t.categories.push(row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        owner: Owner,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let mut t = self.tables.lock().await;
        if let Some(name) = &changes.name {
            if t
                .categories
                .iter()
                .any(|c| c.user_id == owner.id() && c.id != id && &c.name == name)
            {
                return Err(conflict("categories_user_id_name_key"));
            }
        }
        let Some(row) = t
            .categories
            .iter_mut()
            .find(|c| c.id == id && c.user_id == owner.id())
        else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = Some(description);
        }
        if let Some(color) = changes.color {
            row.color = color;
        }
        if let Some(icon) = changes.icon {
            row.icon = Some(icon);
        }
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn delete_category(&self, owner: Owner, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if !t
            .categories
            .iter()
            .any(|c| c.id == id && c.user_id == owner.id())
        {
            return Ok(false);
        }
        if t.purchases.iter().any(|p| p.category_id == id) {
            return Err(conflict("purchases_category_id_fkey"));
        }
        t.categories.retain(|c| c.id != id);
        t.budgets.retain(|b| b.category_id != id);
        Ok(true)
    }

    async fn count_purchases_in_category(&self, owner: Owner, id: Uuid) -> StoreResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.purchases
            .iter()
            .filter(|p| p.category_id == id && p.user_id == owner.id())
            .count() as i64)
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn list_purchases(
        &self,
        owner: Owner,
        filter: &PurchaseFilter,
        page: Page,
    ) -> StoreResult<(Vec<Purchase>, i64)> {
        let t = self.tables.lock().await;
        let mut rows: Vec<_> = t
            .purchases
            .iter()
            .filter(|p| p.user_id == owner.id() && filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(page_of(rows, page))
    }

    async fn find_purchase(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Purchase>> {
        let t = self.tables.lock().await;
        Ok(t.purchases
            .iter()
            .find(|p| p.id == id && p.user_id == owner.id())
            .cloned())
    }

    async fn create_purchase(&self, owner: Owner, purchase: NewPurchase) -> StoreResult<Purchase> {
        let mut t = self.tables.lock().await;
        let now = OffsetDateTime::now_utc();
        let row = Purchase {
            id: Uuid::new_v4(),
            user_id: owner.id(),
            category_id: purchase.category_id,
            date: purchase.date,
            amount: purchase.amount,
            establishment: purchase.establishment,
            description: purchase.description,
            items: purchase.items,
            payment_method: purchase.payment_method.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        t.purchases.push(row.clone());
        Ok(row)
    }

    async fn update_purchase(
        &self,
        owner: Owner,
        id: Uuid,
        changes: PurchaseChanges,
    ) -> StoreResult<Option<Purchase>> {
        let mut t = self.tables.lock().await;
        let Some(row) = t
            .purchases
            .iter_mut()
            .find(|p| p.id == id && p.user_id == owner.id())
        else {
            return Ok(None);
        };
        if let Some(category_id) = changes.category_id {
            row.category_id = category_id;
        }
        if let Some(date) = changes.date {
            row.date = date;
        }
        if let Some(amount) = changes.amount {
            row.amount = amount;
        }
        if let Some(establishment) = changes.establishment {
            row.establishment = establishment;
        }
        if let Some(description) = changes.description {
            row.description = Some(description);
        }
        if let Some(items) = changes.items {
            row.items = Some(items);
        }
        if let Some(method) = changes.payment_method {
            row.payment_method = method.as_str().to_string();
        }
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn delete_purchase(&self, owner: Owner, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.purchases.len();
        t.purchases
            .retain(|p| !(p.id == id && p.user_id == owner.id()));
        Ok(t.purchases.len() < before)
    }
}

#[async_trait]
impl BudgetStore for MemoryStore {
    async fn list_budgets(
        &self,
        owner: Owner,
        filter: &BudgetFilter,
        page: Page,
    ) -> StoreResult<(Vec<Budget>, i64)> {
        let t = self.tables.lock().await;
        let mut rows: Vec<_> = t
            .budgets
            .iter()
            .filter(|b| b.user_id == owner.id() && filter.matches(b))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.month.cmp(&a.month));
        Ok(page_of(rows, page))
    }

    async fn find_budget(&self, owner: Owner, id: Uuid) -> StoreResult<Option<Budget>> {
        let t = self.tables.lock().await;
        Ok(t.budgets
            .iter()
            .find(|b| b.id == id && b.user_id == owner.id())
            .cloned())
    }

    async fn find_budget_for(
        &self,
        owner: Owner,
        category_id: Uuid,
        month: &str,
    ) -> StoreResult<Option<Budget>> {
        let t = self.tables.lock().await;
        Ok(t.budgets
            .iter()
            .find(|b| b.user_id == owner.id() && b.category_id == category_id && b.month == month)
            .cloned())
    }

    async fn create_budget(&self, owner: Owner, budget: NewBudget) -> StoreResult<Budget> {
        let mut t = self.tables.lock().await;
        if t.budgets.iter().any(|b| {
            b.user_id == owner.id() && b.category_id == budget.category_id && b.month == budget.month
        }) {
            return Err(conflict("budgets_user_id_category_id_month_key"));
        }
        let now = OffsetDateTime::now_utc();
        let row = Budget {
            id: Uuid::new_v4(),
            user_id: owner.id(),
            category_id: budget.category_id,
            month: budget.month,
            limit_amount: budget.limit_amount,
            created_at: now,
            updated_at: now,
        };
        t.budgets.push(row.clone());
        Ok(row)
    }

    async fn update_budget(
        &self,
        owner: Owner,
        id: Uuid,
        changes: BudgetChanges,
    ) -> StoreResult<Option<Budget>> {
        let mut t = self.tables.lock().await;
        let Some(current) = t
            .budgets
            .iter()
            .find(|b| b.id == id && b.user_id == owner.id())
            .cloned()
        else {
            return Ok(None);
        };
        let category_id = changes.category_id.unwrap_or(current.category_id);
        let month = changes.month.unwrap_or(current.month);
        if t.budgets.iter().any(|b| {
            b.id != id && b.user_id == owner.id() && b.category_id == category_id && b.month == month
        }) {
            return Err(conflict("budgets_user_id_category_id_month_key"));
        }
        let Some(row) = t.budgets.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        row.category_id = category_id;
        row.month = month;
        if let Some(limit_amount) = changes.limit_amount {
            row.limit_amount = limit_amount;
        }
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn delete_budget(&self, owner: Owner, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.budgets.len();
        t.budgets.retain(|b| !(b.id == id && b.user_id == owner.id()));
        Ok(t.budgets.len() < before)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn monthly_total(&self, owner: Owner, window: MonthWindow) -> StoreResult<f64> {
        let t = self.tables.lock().await;
        Ok(t.purchases
            .iter()
            .filter(|p| p.user_id == owner.id() && window.contains(p.date))
            .map(|p| p.amount)
            .sum())
    }

    async fn expenses_by_category(
        &self,
        owner: Owner,
        window: MonthWindow,
    ) -> StoreResult<Vec<CategoryTotal>> {
        let t = self.tables.lock().await;
        let mut totals: HashMap<Uuid, (f64, i64)> = HashMap::new();
        for p in t
            .purchases
            .iter()
            .filter(|p| p.user_id == owner.id() && window.contains(p.date))
        {
            let entry = totals.entry(p.category_id).or_default();
            entry.0 += p.amount;
            entry.1 += 1;
        }
        let mut rows: Vec<_> = totals
            .into_iter()
            .filter_map(|(category_id, (total, count))| {
                let category = t
                    .categories
                    .iter()
                    .find(|c| c.id == category_id && c.user_id == owner.id())?;
                Some(CategoryTotal {
                    category_id,
                    category_name: category.name.clone(),
                    total,
                    count,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });
        Ok(rows)
    }

    async fn top_establishments(
        &self,
        owner: Owner,
        window: MonthWindow,
        limit: i64,
    ) -> StoreResult<Vec<EstablishmentCount>> {
        let t = self.tables.lock().await;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for p in t
            .purchases
            .iter()
            .filter(|p| p.user_id == owner.id() && window.contains(p.date))
        {
            *counts.entry(p.establishment.as_str()).or_default() += 1;
        }
        let mut rows: Vec<_> = counts
            .into_iter()
            .map(|(name, count)| EstablishmentCount {
                name: name.to_string(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}
