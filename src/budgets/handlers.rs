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
    budgets::{
        dto::{BudgetResponse, CreateBudgetRequest, ListBudgetsQuery, UpdateBudgetRequest},
        repo_types::Budget,
        services,
    },
    error::AppResult,
    pagination::Paged,
    response::{self, ApiJson},
    state::AppState,
};

pub fn budget_routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(list_budgets).post(create_budget))
        .route(
            "/budgets/:id",
            get(get_budget).put(update_budget).delete(delete_budget),
        )
}

#[instrument(skip(state))]
pub async fn list_budgets(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<ListBudgetsQuery>, QueryRejection>,
) -> AppResult<ApiJson<Paged<Budget>>> {
    let Query(query) = query?;
    let page = services::list(state.budgets.as_ref(), auth.owner(), query).await?;
    Ok(response::data(page))
}

#[instrument(skip(state, payload))]
pub async fn create_budget(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CreateBudgetRequest>, JsonRejection>,
) -> AppResult<(StatusCode, ApiJson<BudgetResponse>)> {
    let Json(req) = payload?;
    let budget = services::create(
        state.budgets.as_ref(),
        state.categories.as_ref(),
        auth.owner(),
        req,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        response::with_message("budget created", BudgetResponse { budget }),
    ))
}

#[instrument(skip(state))]
pub async fn get_budget(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiJson<BudgetResponse>> {
    let Path(id) = id?;
    let budget = services::get(state.budgets.as_ref(), auth.owner(), id).await?;
    Ok(response::data(BudgetResponse { budget }))
}

#[instrument(skip(state, payload))]
pub async fn update_budget(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateBudgetRequest>, JsonRejection>,
) -> AppResult<ApiJson<BudgetResponse>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let budget = services::update(
        state.budgets.as_ref(),
        state.categories.as_ref(),
        auth.owner(),
        id,
        req,
    )
    .await?;
    Ok(response::with_message("budget updated", BudgetResponse { budget }))
}

#[instrument(skip(state))]
pub async fn delete_budget(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiJson<()>> {
    let Path(id) = id?;
    services::delete(state.budgets.as_ref(), auth.owner(), id).await?;
    Ok(response::message("budget deleted"))
}
