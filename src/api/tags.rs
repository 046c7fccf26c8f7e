use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ApiResponse, auth::AdminSession};
use crate::{
    content::TagRegistry,
    error::{Error, Result},
    state::AppState,
    storage::{DBPool, Tag},
};

/// 配置标签相关路由
///
/// - `GET /tags`：全部标签
/// - `POST /tags`：创建标签
/// - `DELETE /tags/{id}`：删除标签
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/tags", get(tag_list).post(create_tag))
        .route("/tags/{id}", delete(delete_tag))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub use_count: i32,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
            use_count: tag.use_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

async fn tag_list(State(pool): State<DBPool>) -> Result<ApiResponse<TagListResponse>> {
    let tags = TagRegistry::new(pool).list_all().await?;
    Ok(ApiResponse::success(TagListResponse {
        tags: tags.into_iter().map(Into::into).collect(),
    }))
}

async fn create_tag(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Json(req), _): WithRejection<Json<CreateTagRequest>, Error>,
) -> Result<ApiResponse<TagResponse>> {
    req.validate()?;

    let tag = TagRegistry::new(pool).create(&req.name).await?;
    tracing::info!(id = %tag.id, slug = %tag.slug, "tag created");
    Ok(ApiResponse::created(tag.into()))
}

async fn delete_tag(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse<()>> {
    TagRegistry::new(pool).delete(id).await?;
    Ok(ApiResponse::empty())
}
