use uuid::Uuid;

use super::{DBPool, Tag};
use crate::error::Result;

/// 标签表读写
pub trait TagRepository: Send + Sync {
    /// 全部标签，按 `use_count` 降序、名称升序
    fn list_tags(&self) -> impl Future<Output = Result<Vec<Tag>>> + Send;

    fn find_tag_by_slug(&self, slug: &str) -> impl Future<Output = Result<Option<Tag>>> + Send;

    fn find_tag_by_name(&self, name: &str) -> impl Future<Output = Result<Option<Tag>>> + Send;

    /// 插入新标签
    ///
    /// 名称或 slug 已被占用时返回 `None`，由调用方回查已存在的行。
    fn insert_tag(
        &self,
        name: &str,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Tag>>> + Send;

    /// 删除标签，返回是否存在该行
    fn delete_tag(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;
}

impl TagRepository for DBPool {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
                SELECT id, name, slug, use_count, created_at
                FROM tags
                ORDER BY use_count DESC, name ASC
                "#,
        )
        .fetch_all(self)
        .await?;
        Ok(tags)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, use_count, created_at FROM tags WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self)
        .await?;
        Ok(tag)
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            "SELECT id, name, slug, use_count, created_at FROM tags WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self)
        .await?;
        Ok(tag)
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Option<Tag>> {
        // 并发插入同一 slug 时只有一行落库，落空的一方拿到空结果而不是错误
        let tag = sqlx::query_as::<_, Tag>(
            r#"
                INSERT INTO tags (name, slug)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                RETURNING id, name, slug, use_count, created_at
                "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_optional(self)
        .await;

        match tag {
            Ok(tag) => Ok(tag),
            Err(e) if super::postgres::is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
