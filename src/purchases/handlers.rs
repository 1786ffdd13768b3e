use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthContext,
    error::AppResult,
    pagination::Paged,
    purchases::{
        dto::{CreatePurchaseRequest, ListPurchasesQuery, PurchaseResponse, UpdatePurchaseRequest},
        repo_types::Purchase,
        services,
    },
    response::{self, ApiJson},
    state::AppState,
};

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", get(list_purchases).post(create_purchase))
        .route(
            "/purchases/:id",
            get(get_purchase).put(update_purchase).delete(delete_purchase),
        )
}

#[instrument(skip(state))]
pub async fn list_purchases(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<ListPurchasesQuery>, QueryRejection>,
) -> AppResult<ApiJson<Paged<Purchase>>> {
    let Query(query) = query?;
    let page = services::list(state.purchases.as_ref(), auth.owner(), query).await?;
    Ok(response::data(page))
}

#[instrument(skip(state, payload))]
pub async fn create_purchase(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CreatePurchaseRequest>, JsonRejection>,
) -> AppResult<(StatusCode, ApiJson<PurchaseResponse>)> {
    let Json(req) = payload?;
    let purchase = services::create(
        state.purchases.as_ref(),
        state.categories.as_ref(),
        auth.owner(),
        req,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        response::with_message("purchase created", PurchaseResponse { purchase }),
    ))
}

#[instrument(skip(state))]
pub async fn get_purchase(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiJson<PurchaseResponse>> {
    let Path(id) = id?;
    let purchase = services::get(state.purchases.as_ref(), auth.owner(), id).await?;
    Ok(response::data(PurchaseResponse { purchase }))
}

#[instrument(skip(state, payload))]
pub async fn update_purchase(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePurchaseRequest>, JsonRejection>,
) -> AppResult<ApiJson<PurchaseResponse>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let purchase = services::update(
        state.purchases.as_ref(),
        state.categories.as_ref(),
        auth.owner(),
        id,
        req,
    )
    .await?;
    Ok(response::with_message(
        "purchase updated",
        PurchaseResponse { purchase },
    ))
}

#[instrument(skip(state))]
pub async fn delete_purchase(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiJson<()>> {
    let Path(id) = id?;
    services::delete(state.purchases.as_ref(), auth.owner(), id).await?;
    Ok(response::message("purchase deleted"))
}
