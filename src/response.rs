use axum::Json;
use serde::Serialize;

/// `{"success": true, "message"?, "data"?}`; the error side lives in
/// [`crate::error::AppError`].
#[derive(Debug, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiJson<T> = Json<ApiSuccess<T>>;

pub fn data<T>(data: T) -> ApiJson<T> {
    Json(ApiSuccess {
        success: true,
        message: None,
        data: Some(data),
    })
}

pub fn with_message<T>(message: &'static str, data: T) -> ApiJson<T> {
    Json(ApiSuccess {
        success: true,
        message: Some(message),
        data: Some(data),
    })
}

pub fn message(message: &'static str) -> ApiJson<()> {
    Json(ApiSuccess {
        success: true,
        message: Some(message),
        data: None,
    })
}
