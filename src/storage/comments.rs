use uuid::Uuid;

use super::{Comment, DBPool, NewComment};
use crate::{error::Result, pagination::PageRequest};

/// 评论表读写
///
/// 所有查询都排除已软删除的行。
pub trait CommentRepository: Send + Sync {
    /// 某篇文章下的顶级评论，按创建时间降序分页
    fn top_level_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Comment>, i64)>> + Send;

    /// 给定父评论的直接回复，按创建时间升序
    fn replies_of(&self, parent_ids: &[Uuid]) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    fn find_comment(&self, id: Uuid) -> impl Future<Output = Result<Option<Comment>>> + Send;

    fn insert_comment(&self, comment: &NewComment) -> impl Future<Output = Result<Comment>> + Send;

    /// 标记为已删除，返回是否存在该行
    ///
    /// 对已删除的评论再次调用同样返回 `true`。
    fn soft_delete_comment(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// 全部评论平铺，按创建时间降序分页
    fn list_comments(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Comment>, i64)>> + Send;
}

const COMMENT_COLUMNS: &str =
    "id, post_id, parent_id, author, content, role, is_deleted, created_at, updated_at";

impl CommentRepository for DBPool {
    async fn top_level_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<Comment>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM comments
            WHERE post_id = $1 AND parent_id IS NULL AND is_deleted = FALSE
            "#,
        )
        .bind(post_id)
        .fetch_one(self)
        .await?;

        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE post_id = $1 AND parent_id IS NULL AND is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(post_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self)
        .await?;

        Ok((comments, total))
    }

    async fn replies_of(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let replies = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE parent_id = ANY($1) AND is_deleted = FALSE
            ORDER BY created_at ASC
            "#
        ))
        .bind(parent_ids)
        .fetch_all(self)
        .await?;
        Ok(replies)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(self)
        .await?;
        Ok(comment)
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let created = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comments (post_id, parent_id, author, content, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(&comment.author)
        .bind(&comment.content)
        .bind(comment.role.as_str())
        .fetch_one(self)
        .await?;
        Ok(created)
    }

    async fn soft_delete_comment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE comments SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_comments(&self, page: PageRequest) -> Result<(Vec<Comment>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE is_deleted = FALSE")
                .fetch_one(self)
                .await?;

        let comments = sqlx::query_as::<_, Comment>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE is_deleted = FALSE
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self)
        .await?;

        Ok((comments, total))
    }
}
