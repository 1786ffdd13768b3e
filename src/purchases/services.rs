use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    categories::{self, repo::CategoryStore},
    error::{AppError, AppResult},
    guard::{found, Owner},
    pagination::{Page, Paged},
    purchases::{
        dto::{CreatePurchaseRequest, ListPurchasesQuery, UpdatePurchaseRequest},
        repo::PurchaseStore,
        repo_types::{NewPurchase, PaymentMethod, Purchase, PurchaseChanges, PurchaseFilter},
    },
    validation::{clean_optional, parse_id, parse_timestamp, parse_upper_bound, Checks},
};

const BAD_ID: &str = "must be a category id";
const BAD_DATE: &str = "must be an RFC 3339 timestamp or YYYY-MM-DD";
const BAD_METHOD: &str = "must be one of cash, card, transfer";

pub fn parse_list_query(query: ListPurchasesQuery) -> AppResult<(PurchaseFilter, Page)> {
    let page = query.page_query().validate()?;

    let mut checks = Checks::new();
    let from = query
        .from
        .as_deref()
        .map(|v| checks.some(parse_timestamp(v), "from", BAD_DATE));
    let to = query
        .to
        .as_deref()
        .map(|v| checks.some(parse_upper_bound(v), "to", BAD_DATE));
    let category_id = query
        .category_id
        .as_deref()
        .map(|v| checks.some(parse_id(v), "categoryId", BAD_ID));
    checks.finish()?;

    let filter = PurchaseFilter {
        from: from.flatten(),
        to: to.flatten(),
        category_id: category_id.flatten(),
        establishment: clean_optional(query.establishment),
    };
    Ok((filter, page))
}

pub async fn list(
    store: &dyn PurchaseStore,
    owner: Owner,
    query: ListPurchasesQuery,
) -> AppResult<Paged<Purchase>> {
    let (filter, page) = parse_list_query(query)?;
    let (items, total) = store.list_purchases(owner, &filter, page).await?;
    Ok(Paged::new(items, page, total))
}

pub async fn get(store: &dyn PurchaseStore, owner: Owner, id: Uuid) -> AppResult<Purchase> {
    found("purchase", store.find_purchase(owner, id).await?)
}

#[instrument(skip(store, categories, req))]
pub async fn create(
    store: &dyn PurchaseStore,
    categories: &dyn CategoryStore,
    owner: Owner,
    req: CreatePurchaseRequest,
) -> AppResult<Purchase> {
    let mut checks = Checks::new();
    let category_id = checks.some(parse_id(&req.category_id), "categoryId", BAD_ID);
    let date = checks.some(parse_timestamp(&req.date), "date", BAD_DATE);
    let amount = checks.positive("amount", req.amount);
    let establishment = req.establishment.trim().to_string();
    checks.not_blank("establishment", &establishment);
    let payment_method = checks.some(
        req.payment_method.parse::<PaymentMethod>().ok(),
        "paymentMethod",
        BAD_METHOD,
    );

    let (Some(category_id), Some(date), Some(amount), Some(payment_method)) =
        (category_id, date, amount, payment_method)
    else {
        return Err(checks.into_error());
    };
    checks.finish()?;

    categories::services::ensure_owned(categories, owner, category_id).await?;

    let purchase = store
        .create_purchase(
            owner,
            NewPurchase {
                category_id,
                date,
                amount,
                establishment,
                description: clean_optional(req.description),
                items: clean_optional(req.items),
                payment_method,
            },
        )
        .await?;
    info!(user_id = %owner.id(), purchase_id = %purchase.id, amount, "purchase created");
    Ok(purchase)
}

#[instrument(skip(store, categories, req))]
pub async fn update(
    store: &dyn PurchaseStore,
    categories: &dyn CategoryStore,
    owner: Owner,
    id: Uuid,
    req: UpdatePurchaseRequest,
) -> AppResult<Purchase> {
    let mut checks = Checks::new();
    let category_id = req
        .category_id
        .as_deref()
        .map(|v| checks.some(parse_id(v), "categoryId", BAD_ID));
    let date = req
        .date
        .as_deref()
        .map(|v| checks.some(parse_timestamp(v), "date", BAD_DATE));
    let amount = req
        .amount
        .map(|v| checks.positive("amount", Some(v)));
    let establishment = req.establishment.map(|v| v.trim().to_string());
    if let Some(establishment) = &establishment {
        checks.not_blank("establishment", establishment);
    }
    let payment_method = req
        .payment_method
        .as_deref()
        .map(|v| checks.some(v.parse::<PaymentMethod>().ok(), "paymentMethod", BAD_METHOD));
    checks.finish()?;

    get(store, owner, id).await?;
    let category_id = category_id.flatten();
    if let Some(category_id) = category_id {
        categories::services::ensure_owned(categories, owner, category_id).await?;
    }

    let changes = PurchaseChanges {
        category_id,
        date: date.flatten(),
        amount: amount.flatten(),
        establishment,
        description: clean_optional(req.description),
        items: clean_optional(req.items),
        payment_method: payment_method.flatten(),
    };
    let purchase = found("purchase", store.update_purchase(owner, id, changes).await?)?;
    info!(user_id = %owner.id(), purchase_id = %id, "purchase updated");
    Ok(purchase)
}

#[instrument(skip(store))]
pub async fn delete(store: &dyn PurchaseStore, owner: Owner, id: Uuid) -> AppResult<()> {
    if !store.delete_purchase(owner, id).await? {
        return Err(AppError::NotFound("purchase"));
    }
    info!(user_id = %owner.id(), purchase_id = %id, "purchase deleted");
    Ok(())
}
