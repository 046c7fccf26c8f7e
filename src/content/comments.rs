use std::collections::HashMap;

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    pagination::{PageRequest, Paged},
    storage::{Comment, CommentRepository, CommentRole, NewComment, PostRepository},
};

/// 回复者身份
#[derive(Debug, Clone)]
pub enum Actor {
    /// 访客，自报昵称
    Guest { author: String },
    /// 已登录的管理员，以用户名署名
    Admin { username: String },
}

impl Actor {
    fn into_parts(self) -> (String, CommentRole) {
        match self {
            Actor::Guest { author } => (author, CommentRole::Guest),
            Actor::Admin { username } => (username, CommentRole::Admin),
        }
    }
}

/// 顶级评论及其未删除的回复
#[derive(Debug, Clone)]
pub struct Thread {
    pub comment: Comment,
    /// 按创建时间升序
    pub replies: Vec<Comment>,
}

/// 相对时间描述，在响应时计算
///
/// 不足 1 分钟为 `Just now`，不足 1 小时为 `N minute(s) ago`，
/// 不足 24 小时为 `N hour(s) ago`，否则为 `YYYY-MM-DD HH:MM`。
pub fn relative_timestamp(created_at: DateTime<Local>, now: DateTime<Local>) -> String {
    let diff = now.signed_duration_since(created_at);

    if diff.num_minutes() < 1 {
        "Just now".to_string()
    } else if diff.num_hours() < 1 {
        match diff.num_minutes() {
            1 => "1 minute ago".to_string(),
            n => format!("{n} minutes ago"),
        }
    } else if diff.num_hours() < 24 {
        match diff.num_hours() {
            1 => "1 hour ago".to_string(),
            n => format!("{n} hours ago"),
        }
    } else {
        created_at.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// 评论串
///
/// 只允许一层回复：回复的父评论本身不能是回复。
#[derive(Clone)]
pub struct CommentThread<R> {
    repo: R,
}

impl<R> CommentThread<R>
where
    R: CommentRepository + PostRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// 文章下的顶级评论分页，每条附带其未删除的回复
    ///
    /// 只有未删除的顶级评论计入分页总数。
    pub async fn list_by_post(&self, post_id: Uuid, page: PageRequest) -> Result<Paged<Thread>> {
        let (comments, total) = self.repo.top_level_comments(post_id, page).await?;

        let ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
        let mut replies: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for reply in self.repo.replies_of(&ids).await? {
            if let Some(parent_id) = reply.parent_id {
                replies.entry(parent_id).or_default().push(reply);
            }
        }

        let items = comments
            .into_iter()
            .map(|comment| Thread {
                replies: replies.remove(&comment.id).unwrap_or_default(),
                comment,
            })
            .collect();

        Ok(Paged { items, total, page })
    }

    /// 访客在文章下发表顶级评论
    pub async fn create(&self, post_id: Uuid, author: String, content: String) -> Result<Comment> {
        if !self.repo.post_exists(post_id).await? {
            return Err(Error::NotFound("post"));
        }

        self.repo
            .insert_comment(&NewComment {
                post_id: Some(post_id),
                parent_id: None,
                author,
                content,
                role: CommentRole::Guest,
            })
            .await
    }

    /// 回复评论，回复继承父评论所属的文章
    ///
    /// 父评论不存在或已删除时返回 [`Error::NotFound`]，父评论本身是回复时拒绝。
    pub async fn reply(&self, parent_id: Uuid, content: String, actor: Actor) -> Result<Comment> {
        let parent = self
            .repo
            .find_comment(parent_id)
            .await?
            .ok_or(Error::NotFound("comment"))?;

        if parent.parent_id.is_some() {
            return Err(Error::Validation("cannot reply to a reply".into()));
        }

        let (author, role) = actor.into_parts();
        let reply = self
            .repo
            .insert_comment(&NewComment {
                post_id: parent.post_id,
                parent_id: Some(parent.id),
                author,
                content,
                role,
            })
            .await?;

        tracing::debug!(id = %reply.id, parent = %parent.id, role = role.as_str(), "reply created");
        Ok(reply)
    }

    /// 软删除评论
    ///
    /// 重复删除视为成功，id 不存在时返回 [`Error::NotFound`]。已有的回复不受影响。
    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        if self.repo.soft_delete_comment(id).await? {
            tracing::info!(%id, "comment deleted");
            Ok(())
        } else {
            Err(Error::NotFound("comment"))
        }
    }

    /// 管理后台的平铺评论列表，按创建时间降序
    pub async fn list_all_for_admin(&self, page: PageRequest) -> Result<Paged<Comment>> {
        let (items, total) = self.repo.list_comments(page).await?;
        Ok(Paged { items, total, page })
    }
}
