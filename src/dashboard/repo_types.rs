use serde::Serialize;
use sqlx::FromRow;
use time::{Date, Month, OffsetDateTime};
use uuid::Uuid;

/// Half-open `[start, end)` range covering one calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl MonthWindow {
    pub fn new(year: i32, month: Month) -> Option<Self> {
        let start = Date::from_calendar_date(year, month, 1).ok()?;
        let (next_year, next_month) = match month {
            Month::December => (year + 1, Month::January),
            m => (year, m.next()),
        };
        let end = Date::from_calendar_date(next_year, next_month, 1).ok()?;
        Some(Self {
            start: start.midnight().assume_utc(),
            end: end.midnight().assume_utc(),
        })
    }

    /// The month containing `now`.
    pub fn containing(now: OffsetDateTime) -> Option<Self> {
        let now = now.to_offset(time::UtcOffset::UTC);
        Self::new(now.year(), now.month())
    }

    /// Parses `YYYY-MM`.
    pub fn parse(value: &str) -> Option<Self> {
        let (year, month) = value.trim().split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
        Self::new(year.parse().ok()?, month)
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), self.start.month() as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub category_name: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct EstablishmentCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub month: String,
    pub monthly_total: f64,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub top_establishments: Vec<EstablishmentCount>,
}
