use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use axum_extra::extract::{Query, WithRejection};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ApiResponse, auth::AdminSession};
use crate::{
    content::{Actor, CommentThread, Thread, relative_timestamp},
    error::{Error, Result},
    pagination::{PageRequest, Paged},
    state::AppState,
    storage::{Comment, CommentRole, DBPool},
};

/// 配置评论相关路由
///
/// - `GET /posts/{id}/comments`、`POST /posts/{id}/comments`：文章评论
/// - `POST /comments/{id}/reply`：管理员回复
/// - `POST /comments/{id}/guest-reply`：访客回复
/// - `DELETE /comments/{id}`：软删除
/// - `GET /admin/comments`：管理后台评论列表
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", get(post_comments).post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/comments/{id}/reply", post(admin_reply))
        .route("/comments/{id}/guest-reply", post(guest_reply))
        .route("/admin/comments", get(admin_comments))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CommentListQuery {
    page: u32,
    page_size: u32,
}

impl Default for CommentListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl TryFrom<CommentListQuery> for PageRequest {
    type Error = Error;

    fn try_from(query: CommentListQuery) -> Result<Self> {
        PageRequest::new(query.page, query.page_size)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub author: String,
    pub content: String,
    /// 相对时间，例如 `5 minutes ago`
    pub timestamp: String,
    pub role: CommentRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
    pub created_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<CommentResponse>,
}

impl CommentResponse {
    fn new(comment: Comment, now: DateTime<Local>) -> Self {
        Self {
            id: comment.id,
            timestamp: relative_timestamp(comment.created_at, now),
            author: comment.author,
            content: comment.content,
            role: comment.role,
            post_id: comment.post_id,
            created_at: comment.created_at,
            replies: Vec::new(),
        }
    }

    fn from_thread(thread: Thread, now: DateTime<Local>) -> Self {
        let mut resp = Self::new(thread.comment, now);
        resp.replies = thread
            .replies
            .into_iter()
            .map(|reply| Self::new(reply, now))
            .collect();
        resp
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl CommentListResponse {
    fn new<T>(paged: Paged<T>, f: impl FnMut(T) -> CommentResponse) -> Self {
        Self {
            total_pages: paged.total_pages(),
            total: paged.total,
            page: paged.page.page(),
            page_size: paged.page.page_size(),
            comments: paged.items.into_iter().map(f).collect(),
        }
    }
}

/// 访客评论或访客回复
#[derive(Debug, Deserialize, Validate)]
pub struct GuestCommentRequest {
    #[validate(length(min = 1, max = 100))]
    pub author: String,
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1))]
    pub content: String,
}

async fn post_comments(
    State(pool): State<DBPool>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Query(query), _): WithRejection<Query<CommentListQuery>, Error>,
) -> Result<ApiResponse<CommentListResponse>> {
    let paged = CommentThread::new(pool)
        .list_by_post(post_id, query.try_into()?)
        .await?;

    let now = Local::now();
    Ok(ApiResponse::success(CommentListResponse::new(paged, |t| {
        CommentResponse::from_thread(t, now)
    })))
}

async fn create_comment(
    State(pool): State<DBPool>,
    WithRejection(Path(post_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<GuestCommentRequest>, Error>,
) -> Result<ApiResponse<CommentResponse>> {
    req.validate()?;

    let comment = CommentThread::new(pool)
        .create(post_id, req.author, req.content)
        .await?;
    Ok(ApiResponse::created(CommentResponse::new(comment, Local::now())))
}

async fn admin_reply(
    session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Path(parent_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<ReplyRequest>, Error>,
) -> Result<ApiResponse<CommentResponse>> {
    req.validate()?;

    let actor = Actor::Admin {
        username: session.admin.username,
    };
    let reply = CommentThread::new(pool)
        .reply(parent_id, req.content, actor)
        .await?;
    Ok(ApiResponse::created(CommentResponse::new(reply, Local::now())))
}

async fn guest_reply(
    State(pool): State<DBPool>,
    WithRejection(Path(parent_id), _): WithRejection<Path<Uuid>, Error>,
    WithRejection(Json(req), _): WithRejection<Json<GuestCommentRequest>, Error>,
) -> Result<ApiResponse<CommentResponse>> {
    req.validate()?;

    let actor = Actor::Guest { author: req.author };
    let reply = CommentThread::new(pool)
        .reply(parent_id, req.content, actor)
        .await?;
    Ok(ApiResponse::created(CommentResponse::new(reply, Local::now())))
}

async fn delete_comment(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, Error>,
) -> Result<ApiResponse<()>> {
    CommentThread::new(pool).soft_delete(id).await?;
    Ok(ApiResponse::empty())
}

async fn admin_comments(
    _session: AdminSession,
    State(pool): State<DBPool>,
    WithRejection(Query(query), _): WithRejection<Query<CommentListQuery>, Error>,
) -> Result<ApiResponse<CommentListResponse>> {
    let paged = CommentThread::new(pool)
        .list_all_for_admin(query.try_into()?)
        .await?;

    let now = Local::now();
    Ok(ApiResponse::success(CommentListResponse::new(paged, |c| {
        CommentResponse::new(c, now)
    })))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn comment(parent_id: Option<Uuid>, minutes_ago: i64) -> Comment {
        let created_at = Local::now() - Duration::minutes(minutes_ago);
        Comment {
            id: Uuid::new_v4(),
            post_id: Some(Uuid::new_v4()),
            parent_id,
            author: "guest".into(),
            content: "hi".into(),
            role: CommentRole::Guest,
            is_deleted: false,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_thread_shape() {
        let parent = comment(None, 5);
        let reply = comment(Some(parent.id), 0);
        let now = Local::now();

        let value = serde_json::to_value(CommentResponse::from_thread(
            Thread {
                comment: parent,
                replies: vec![reply],
            },
            now,
        ))
        .unwrap();

        assert_eq!(value["timestamp"], "5 minutes ago");
        assert_eq!(value["role"], "guest");
        assert!(value.get("postId").is_some());
        assert_eq!(value["replies"][0]["timestamp"], "Just now");
        assert!(value["replies"][0].get("replies").is_none());
    }

    #[test]
    fn test_list_query_defaults() {
        let query: CommentListQuery = serde_json::from_value(json!({})).unwrap();
        let page = PageRequest::try_from(query).unwrap();
        assert_eq!((page.page(), page.page_size()), (1, 20));

        let query: CommentListQuery = serde_json::from_value(json!({"page": 0})).unwrap();
        assert!(PageRequest::try_from(query).is_err());
    }

    #[test]
    fn test_guest_request_validation() {
        let long: GuestCommentRequest =
            serde_json::from_value(json!({"author": "a".repeat(101), "content": "x"})).unwrap();
        assert!(long.validate().is_err());

        let blank: GuestCommentRequest =
            serde_json::from_value(json!({"author": "a", "content": ""})).unwrap();
        assert!(blank.validate().is_err());
    }
}
