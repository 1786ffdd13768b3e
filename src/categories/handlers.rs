use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthContext,
    categories::{
        dto::{CategoriesResponse, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest},
        services,
    },
    error::AppResult,
    response::{self, ApiJson},
    state::AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    auth: AuthContext,
) -> AppResult<ApiJson<CategoriesResponse>> {
    let categories = services::list(state.categories.as_ref(), auth.owner()).await?;
    Ok(response::data(CategoriesResponse { categories }))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> AppResult<(StatusCode, ApiJson<CategoryResponse>)> {
    let Json(req) = payload?;
    let category = services::create(state.categories.as_ref(), auth.owner(), req).await?;
    Ok((
        StatusCode::CREATED,
        response::with_message("category created", CategoryResponse { category }),
    ))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiJson<CategoryResponse>> {
    let Path(id) = id?;
    let category = services::get(state.categories.as_ref(), auth.owner(), id).await?;
    Ok(response::data(CategoryResponse { category }))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> AppResult<ApiJson<CategoryResponse>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let category = services::update(state.categories.as_ref(), auth.owner(), id, req).await?;
    Ok(response::with_message(
        "category updated",
        CategoryResponse { category },
    ))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<ApiJson<()>> {
    let Path(id) = id?;
    services::delete(state.categories.as_ref(), auth.owner(), id).await?;
    Ok(response::message("category deleted"))
}
