use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// 统一响应包装 `{code, message, data?, error?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn with_status(status: StatusCode, message: &str, data: Option<T>) -> Self {
        Self {
            status,
            code: status.as_u16(),
            message: message.to_string(),
            data,
            error: None,
        }
    }

    /// 200
    pub fn success(data: T) -> Self {
        Self::with_status(StatusCode::OK, "Success", Some(data))
    }

    /// 201
    pub fn created(data: T) -> Self {
        Self::with_status(StatusCode::CREATED, "Created", Some(data))
    }
}

impl ApiResponse<()> {
    /// 没有数据的 200 响应
    pub fn empty() -> Self {
        Self::with_status(StatusCode::OK, "Success", None)
    }

    /// 错误响应，`message` 同时写入 `error` 字段
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            code: status.as_u16(),
            error: Some(message.clone()),
            message,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
