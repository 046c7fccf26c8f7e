use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_extra::extract::{Query, WithRejection};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ApiResponse, auth::AdminSession};
use crate::{
    content::{PostChanges, PostFields, PostStore},
    error::{Error, Result},
    pagination::{PageRequest, Paged},
    state::AppState,
    storage::{DBPool, Post, PostFilter, PostStatus},
};

/// 配置文章相关路由
///
/// - `GET /posts`：文章列表，默认只含已发布
/// - `GET /posts/{id}`：单篇文章
/// - `POST /posts`、`PUT /posts/{id}`、`DELETE /posts/{id}`：管理员维护
/// - `GET /admin/posts`：管理后台列表，默认包含草稿
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/admin/posts", get(admin_list_posts))
}

/// 文章列表查询参数
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PostListQuery {
    page: u32,
    page_size: u32,
    tag: Option<String>,
    search: Option<String>,
    status: Option<PostStatus>,
}

impl Default for PostListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            tag: None,
            search: None,
            status: None,
        }
    }
}

impl PostListQuery {
    fn into_parts(self, default_status: PostStatus) -> Result<(PostFilter, PageRequest)> {
        let page = PageRequest::new(self.page, self.page_size)?;
        let filter = PostFilter {
            status: self.status.unwrap_or(default_status),
            tag: self.tag.filter(|t| !t.trim().is_empty()),
            search: self.search.filter(|s| !s.trim().is_empty()),
        };
        Ok((filter, page))
    }
}

/// 列表中的文章
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListItem {
    pub id: Uuid,
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub tags: Vec<String>,
    pub excerpt: String,
    pub read_time: String,
    pub view_count: i64,
    pub is_published: bool,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// 完整文章，包括列表字段和正文
#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    meta: PostListItem,

    content: String,
}

impl From<Post> for PostListItem {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            date: post.published_date.format("%Y-%m-%d").to_string(),
            tags: post.tags.into_iter().map(|t| t.name).collect(),
            excerpt: post.excerpt,
            read_time: post.read_time,
            view_count: post.view_count,
            is_published: post.is_published,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<Post> for PostDetail {
    fn from(mut post: Post) -> Self {
        let content = std::mem::take(&mut post.content);
        Self {
            meta: post.into(),
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListResponse {
    pub posts: Vec<PostListItem>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl From<Paged<Post>> for PostListResponse {
    fn from(paged: Paged<Post>) -> Self {
        Self {
            total_pages: paged.total_pages(),
            total: paged.total,
            page: paged.page.page(),
            page_size: paged.page.page_size(),
            posts: paged.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1))]
    pub excerpt: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(min = 1, message = "at least one tag is required"))]
    pub tags: Vec<String>,
    pub read_time: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub read_time: Option<String>,
    #[serde(alias = "is_published")]
    pub is_published: Option<bool>,
}

async fn list(
    pool: DBPool,
    query: PostListQuery,
    default_status: PostStatus,
) -> Result<ApiResponse<PostListResponse>> {
    let (filter, page) = query.into_parts(default_status)?;
    let paged = PostStore::new(pool).list(&filter, page).await?;
    Ok(ApiResponse::success(paged.into()))
}

async fn list_posts(
    State(pool): State<DBPool>,
    WithRejection(Query(query), _): WithRejection<Query<PostListQuery>, Error>,
) -> Result<ApiResponse<PostListResponse>> {
    list(pool, query, PostStatus::Published).await
}

async fn admin_list_posts(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Query(query), _): WithRejection<Query<PostListQuery>, Error>,
) -> Result<ApiResponse<PostListResponse>> {
    list(pool, query, PostStatus::All).await
}

async fn get_post(
    State(pool): State<DBPool>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse<PostDetail>> {
    let post = PostStore::new(pool).get_by_id(id).await?;
    Ok(ApiResponse::success(post.into()))
}

async fn create_post(
    session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Json(req), _): WithRejection<Json<CreatePostRequest>, Error>,
) -> Result<ApiResponse<PostDetail>> {
    req.validate()?;

    let fields = PostFields {
        title: req.title,
        excerpt: req.excerpt,
        content: req.content,
        tags: req.tags,
        read_time: req.read_time,
    };
    let post = PostStore::new(pool)
        .create(fields, Some(session.admin.id))
        .await?;

    Ok(ApiResponse::created(post.into()))
}

async fn update_post(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<UpdatePostRequest>, Error>,
) -> Result<ApiResponse<PostDetail>> {
    req.validate()?;

    let changes = PostChanges {
        title: req.title,
        excerpt: req.excerpt,
        content: req.content,
        tags: req.tags,
        read_time: req.read_time,
        is_published: req.is_published,
    };
    let post = PostStore::new(pool).update(id, changes).await?;

    Ok(ApiResponse::success(post.into()))
}

async fn delete_post(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse<()>> {
    PostStore::new(pool).delete(id).await?;
    Ok(ApiResponse::empty())
}
