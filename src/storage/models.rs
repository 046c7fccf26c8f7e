use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 管理员
///
/// 由运维在库中直接创建，本服务只在登录时更新 `last_login`。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub username: String,
    /// Argon2 PHC 格式的密码哈希
    pub password_hash: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Local>,
    pub last_login: Option<DateTime<Local>>,
}

/// 标签
///
/// `slug` 由名称确定性生成，且全局唯一。
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// 关联文章数
    pub use_count: i32,
    pub created_at: DateTime<Local>,
}

/// 文章，连同其关联的全部标签
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    /// 形如 `3 min` 的阅读时长
    pub read_time: String,
    pub published_date: NaiveDate,
    pub is_published: bool,
    pub view_count: i64,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,

    /// 由 `jsonb_agg` 聚合的标签列表
    #[sqlx(json)]
    pub tags: Vec<Tag>,
}

/// 待插入的文章
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub read_time: String,
    pub published_date: NaiveDate,
    pub is_published: bool,
    pub author_id: Option<Uuid>,
}

/// 评论者身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentRole {
    Guest,
    Admin,
}

impl CommentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentRole::Guest => "guest",
            CommentRole::Admin => "admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown comment role: {0}")]
pub struct UnknownRole(String);

impl TryFrom<String> for CommentRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "guest" => Ok(CommentRole::Guest),
            "admin" => Ok(CommentRole::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// 评论
///
/// 邻接表结构：`parent_id` 为空即顶级评论，否则为回复。只允许一层回复。
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub role: CommentRole,
    pub is_deleted: bool,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// 待插入的评论
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub author: String,
    pub content: String,
    pub role: CommentRole,
}
