use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::extractors::AuthContext,
    dashboard::{repo_types::DashboardStats, services},
    error::AppResult,
    response::{self, ApiJson},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    pub month: Option<String>,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(get_stats))
}

#[instrument(skip(state))]
pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> AppResult<ApiJson<DashboardStats>> {
    let Query(query) = query?;
    let stats = services::stats(
        state.stats.as_ref(),
        auth.owner(),
        query.month.as_deref(),
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(response::data(stats))
}
