use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::jwt::TokenError;
use crate::db::StoreError;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input")]
    Validation(Vec<FieldError>),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("refresh token invalid or expired")]
    InvalidOrExpiredToken,

    #[error("refresh token invalid")]
    InvalidToken,

    #[error("current password is incorrect")]
    InvalidCurrentPassword,

    #[error("missing access token")]
    MissingToken,

    /// Rendered identically for every cause; the inner kind is for logs and tests.
    #[error("invalid or expired token")]
    Unauthorized(#[source] TokenError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    /// Machine-checkable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::DuplicateEmail => "DuplicateEmail",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::InvalidOrExpiredToken => "InvalidOrExpiredToken",
            AppError::InvalidToken => "InvalidToken",
            AppError::InvalidCurrentPassword => "InvalidCurrentPassword",
            AppError::MissingToken => "MissingToken",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Internal(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCurrentPassword => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::InvalidOrExpiredToken
            | AppError::InvalidToken
            | AppError::MissingToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                warn!(constraint = %constraint, "store constraint violated");
                AppError::Conflict("conflicts with an existing record".into())
            }
            StoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::field("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::field("id", rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match &self {
            AppError::Validation(fields) => {
                body["fields"] = json!(fields);
            }
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
            }
            _ => {}
        }
        (status, Json(json!({ "success": false, "error": body }))).into_response()
    }
}
