use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, RefreshRequest,
            RegisterRequest, TokensResponse, UpdateProfileRequest, UserResponse,
        },
        extractors::AuthContext,
    },
    error::AppResult,
    response::{self, ApiJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/profile", put(update_profile))
        .route("/auth/change-password", post(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, ApiJson<AuthResponse>)> {
    let Json(req) = payload?;
    let auth = state.sessions.register(req).await?;
    Ok((
        StatusCode::CREATED,
        response::with_message("user registered", auth),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<ApiJson<AuthResponse>> {
    let Json(req) = payload?;
    let auth = state.sessions.login(req).await?;
    Ok(response::with_message("login successful", auth))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<ApiJson<TokensResponse>> {
    let Json(req) = payload?;
    let tokens = state.sessions.refresh(&req.refresh_token).await?;
    Ok(response::data(tokens))
}

/// Acknowledges whatever arrives, including no body at all.
#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> ApiJson<()> {
    let req = payload.map(|Json(b)| b).unwrap_or_default();
    state.sessions.logout(req.refresh_token.as_deref()).await;
    response::message("logged out")
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> AppResult<ApiJson<UserResponse>> {
    let user = state.sessions.profile(auth.user_id).await?;
    Ok(response::data(UserResponse { user }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<ApiJson<UserResponse>> {
    let Json(req) = payload?;
    let user = state.sessions.update_profile(auth.user_id, req).await?;
    Ok(response::with_message("profile updated", UserResponse { user }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<ApiJson<()>> {
    let Json(req) = payload?;
    state.sessions.change_password(auth.user_id, req).await?;
    Ok(response::message("password changed"))
}
