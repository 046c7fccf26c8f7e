use axum::{http::StatusCode, response::IntoResponse};
use axum_extra::extract::QueryRejection;

use crate::api::ApiResponse;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 请求参数缺失或格式错误
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Unauthorized(&'static str),

    /// 唯一约束冲突，例如重名的标签
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("password hash error: {0}")]
    PasswordHash(argon2::password_hash::Error),

    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl From<validator::ValidationErrors> for Error {
    fn from(e: validator::ValidationErrors) -> Self {
        Error::Validation(e.to_string())
    }
}

impl From<QueryRejection> for Error {
    fn from(e: QueryRejection) -> Self {
        Error::Validation(e.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for Error {
    fn from(e: axum::extract::rejection::JsonRejection) -> Self {
        Error::Validation(e.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for Error {
    fn from(e: axum::extract::rejection::PathRejection) -> Self {
        Error::Validation(e.body_text())
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Conflict(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidCredentials | Error::InvalidToken | Error::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Error::Sqlx(_)
            | Error::Jwt(_)
            | Error::PasswordHash(_)
            | Error::Bcrypt(_)
            | Error::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        let message = match &self {
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                "Internal Server Error".to_string()
            }
            Error::Jwt(e) => {
                tracing::error!(%e, "token signing error");
                "Internal Server Error".to_string()
            }
            Error::PasswordHash(e) => {
                tracing::error!(%e, "password hash error");
                "Internal Server Error".to_string()
            }
            Error::Bcrypt(e) => {
                tracing::error!(%e, "bcrypt error");
                "Internal Server Error".to_string()
            }
            Error::Join(e) => {
                tracing::error!(%e, "blocking task failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        ApiResponse::error(status, message).into_response()
    }
}
