use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::ApiResponse;
use crate::{
    auth::AdminSummary,
    error::{Error, Result},
    state::{AppState, Auth},
};

/// 配置认证相关路由
///
/// - `POST /auth/login`：登录
/// - `GET /auth/me`：当前管理员
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

/// 已认证的管理员
///
/// 从 `Authorization: Bearer <token>` 中解析令牌，并确认管理员仍处于启用状态。
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin: AdminSummary,
}

fn bearer_token(parts: &Parts) -> Result<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(Error::Unauthorized("Authorization header required"))?;

    header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::Unauthorized("Invalid authorization header format"))
}

impl<S> FromRequestParts<S> for AdminSession
where
    Auth: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let token = bearer_token(parts)?;
        let auth = Auth::from_ref(state);

        let admin_id = auth.validate_token(token)?;
        let admin = auth.get_admin_by_id(admin_id).await.map_err(|e| match e {
            Error::NotFound(_) => Error::Unauthorized("Admin not found"),
            other => other,
        })?;

        Ok(Self { admin })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// unix 秒
    pub expires_at: i64,
    pub user: AdminResponse,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<AdminSummary> for AdminResponse {
    fn from(admin: AdminSummary) -> Self {
        Self {
            id: admin.id,
            username: admin.username,
            email: admin.email,
        }
    }
}

async fn login(
    State(auth): State<Auth>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, Error>,
) -> Result<ApiResponse<LoginResponse>> {
    req.validate()?;

    let login = auth.login(&req.username, &req.password).await?;

    Ok(ApiResponse::success(LoginResponse {
        token: login.token,
        expires_at: login.expires_at.timestamp(),
        user: login.admin.into(),
    }))
}

async fn me(session: AdminSession) -> ApiResponse<AdminResponse> {
    ApiResponse::success(session.admin.into())
}
