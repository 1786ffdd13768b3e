use lazy_static::lazy_static;
use regex::Regex;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    Time,
};
use uuid::Uuid;

use crate::error::{AppError, FieldError};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref MONTH_RE: Regex = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// `YYYY-MM` with a real month.
pub fn is_valid_month(month: &str) -> bool {
    MONTH_RE.is_match(month)
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts);
    }
    parse_date(value).map(|d| d.midnight().assume_utc())
}

/// Like [`parse_timestamp`], but a bare date covers the whole day, for use as
/// an inclusive upper bound.
pub fn parse_upper_bound(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts);
    }
    let end_of_day = Time::from_hms_micro(23, 59, 59, 999_999).ok()?;
    parse_date(value).map(|d| d.with_time(end_of_day).assume_utc())
}

fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).ok()
}

/// Collects every failing field before reporting, so the client can fix
/// them all in one round trip.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, ok: bool, field: &'static str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn email(&mut self, field: &'static str, value: &str) -> &mut Self {
        self.require(is_valid_email(value), field, "invalid email")
    }

    pub fn not_blank(&mut self, field: &'static str, value: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), field, "must not be empty")
    }

    pub fn min_len(&mut self, field: &'static str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.errors
                .push(FieldError::new(field, format!("must be at least {min} characters")));
        }
        self
    }

    /// A finite amount above zero, or `None` with the failure recorded.
    pub fn positive(&mut self, field: &'static str, value: Option<f64>) -> Option<f64> {
        self.some(
            value.filter(|v| v.is_finite() && *v > 0.0),
            field,
            "must be positive",
        )
    }

    /// Passes `value` through, recording `message` against `field` when it
    /// is `None`.
    pub fn some<T>(&mut self, value: Option<T>, field: &'static str, message: &str) -> Option<T> {
        self.require(value.is_some(), field, message);
        value
    }

    /// The collected failures as an error, whether or not there are any.
    pub fn into_error(self) -> AppError {
        AppError::Validation(self.errors)
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

pub fn parse_id(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

/// Trims and drops empty optional text.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
