use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    dashboard::{
        repo::StatsStore,
        repo_types::{DashboardStats, MonthWindow},
    },
    error::{AppError, AppResult},
    guard::Owner,
};

pub const TOP_ESTABLISHMENTS: i64 = 5;

/// Stats for `month` (`YYYY-MM`), or for the month containing `now`.
#[instrument(skip(store))]
pub async fn stats(
    store: &dyn StatsStore,
    owner: Owner,
    month: Option<&str>,
    now: OffsetDateTime,
) -> AppResult<DashboardStats> {
    let window = match month {
        Some(m) => MonthWindow::parse(m).ok_or_else(|| AppError::field("month", "must be YYYY-MM"))?,
        None => MonthWindow::containing(now)
            .ok_or_else(|| anyhow::anyhow!("no calendar month contains {now}"))?,
    };

    let monthly_total = store.monthly_total(owner, window).await?;
    let expenses_by_category = store.expenses_by_category(owner, window).await?;
    let top_establishments = store
        .top_establishments(owner, window, TOP_ESTABLISHMENTS)
        .await?;

    Ok(DashboardStats {
        month: window.label(),
        monthly_total,
        expenses_by_category,
        top_establishments,
    })
}
