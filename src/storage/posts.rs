use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{DBPool, NewPost, Post};
use crate::{error::Result, pagination::PageRequest};

/// 按发布状态筛选
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Published,
    Draft,
    #[default]
    All,
}

/// 文章列表筛选条件
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub status: PostStatus,
    /// 精确匹配标签的 slug 或名称
    pub tag: Option<String>,
    /// 标题或摘要中的子串，不区分大小写
    pub search: Option<String>,
}

/// 文章表及文章-标签关联表的读写
pub trait PostRepository: Send + Sync {
    /// 分页查询，返回本页文章及符合条件的总数
    ///
    /// 排序：`published_date DESC, created_at DESC`
    fn list_posts(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<Post>, i64)>> + Send;

    fn find_post(&self, id: Uuid) -> impl Future<Output = Result<Option<Post>>> + Send;

    fn post_exists(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// 插入文章并建立标签关联
    fn insert_post(
        &self,
        post: &NewPost,
        tag_ids: &[Uuid],
    ) -> impl Future<Output = Result<Post>> + Send;

    /// 保存文章的可编辑字段，`tag_ids` 不为空时整体替换标签关联
    ///
    /// 不写 `view_count`。文章已不存在时返回 `None`。
    fn update_post(
        &self,
        post: &Post,
        tag_ids: Option<&[Uuid]>,
    ) -> impl Future<Output = Result<Option<Post>>> + Send;

    /// 删除文章，返回是否存在该行
    fn delete_post(&self, id: Uuid) -> impl Future<Output = Result<bool>> + Send;

    /// 原子地将浏览量加一
    fn increment_view_count(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send;
}

const POST_COLUMNS: &str = r#"
    p.id, p.title, p.excerpt, p.content, p.read_time, p.published_date, p.is_published,
    p.view_count, p.author_id, p.created_at, p.updated_at,
    COALESCE(
        (
            SELECT jsonb_agg(to_jsonb(t) ORDER BY t.name)
            FROM post_tags pt
            INNER JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = p.id
        ),
        '[]'::jsonb
    ) AS tags
"#;

/// 转义 LIKE 通配符，使搜索词按字面子串匹配
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    builder.push(" WHERE TRUE");

    match filter.status {
        PostStatus::Published => {
            builder.push(" AND p.is_published = TRUE");
        }
        PostStatus::Draft => {
            builder.push(" AND p.is_published = FALSE");
        }
        PostStatus::All => {}
    }

    if let Some(tag) = &filter.tag {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND (t.slug = ",
            )
            .push_bind(tag.clone())
            .push(" OR t.name = ")
            .push_bind(tag.clone())
            .push("))");
    }

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.excerpt ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

async fn fetch_post<'e, E: sqlx::PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts p WHERE p.id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(post)
}

/// 按 id 顺序锁定标签行，修改关联前调用
///
/// 并发修改同一标签的事务在此排队，之后的计数才能看到对方已提交的关联。
async fn lock_tags(tx: &mut sqlx::PgTransaction<'_>, tag_ids: &[Uuid]) -> Result<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query("SELECT id FROM tags WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(tag_ids)
        .fetch_all(tx.as_mut())
        .await?;
    Ok(())
}

/// 重算给定标签的 `use_count`
async fn refresh_use_count(
    tx: &mut sqlx::PgTransaction<'_>,
    tag_ids: &[Uuid],
) -> Result<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
            UPDATE tags t
            SET use_count = (SELECT COUNT(*) FROM post_tags pt WHERE pt.tag_id = t.id)
            WHERE t.id = ANY($1)
            "#,
    )
    .bind(tag_ids)
    .execute(tx.as_mut())
    .await?;
    Ok(())
}

/// 整体替换文章的标签关联
async fn replace_post_tags(
    tx: &mut sqlx::PgTransaction<'_>,
    post_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<()> {
    let mut touched: Vec<Uuid> =
        sqlx::query_scalar("SELECT tag_id FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .fetch_all(tx.as_mut())
            .await?;
    touched.extend_from_slice(tag_ids);
    touched.sort_unstable();
    touched.dedup();
    lock_tags(tx, &touched).await?;

    sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
        .bind(post_id)
        .execute(tx.as_mut())
        .await?;

    sqlx::query(
        r#"
            INSERT INTO post_tags (post_id, tag_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
    )
    .bind(post_id)
    .bind(tag_ids)
    .execute(tx.as_mut())
    .await?;

    refresh_use_count(tx, &touched).await
}

impl PostRepository for DBPool {
    async fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> Result<(Vec<Post>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM blog_posts p");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(self).await?;

        let mut builder = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM blog_posts p"));
        push_filters(&mut builder, filter);
        builder.push(" ORDER BY p.published_date DESC, p.created_at DESC");
        builder.push(" LIMIT ").push_bind(page.limit());
        builder.push(" OFFSET ").push_bind(page.offset());

        let posts = builder.build_query_as::<Post>().fetch_all(self).await?;
        Ok((posts, total))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        fetch_post(self, id).await
    }

    async fn post_exists(&self, id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blog_posts WHERE id = $1)")
            .bind(id)
            .fetch_one(self)
            .await?;
        Ok(exists)
    }

    async fn insert_post(&self, post: &NewPost, tag_ids: &[Uuid]) -> Result<Post> {
        let mut tx = self.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO blog_posts
                (title, excerpt, content, read_time, published_date, is_published, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.read_time)
        .bind(post.published_date)
        .bind(post.is_published)
        .bind(post.author_id)
        .fetch_one(tx.as_mut())
        .await?;

        replace_post_tags(&mut tx, id, tag_ids).await?;

        let created = fetch_post(tx.as_mut(), id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_post(&self, post: &Post, tag_ids: Option<&[Uuid]>) -> Result<Option<Post>> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE blog_posts
            SET
                title = $2,
                excerpt = $3,
                content = $4,
                read_time = $5,
                is_published = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.read_time)
        .bind(post.is_published)
        .execute(tx.as_mut())
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(tag_ids) = tag_ids {
            replace_post_tags(&mut tx, post.id, tag_ids).await?;
        }

        let saved = fetch_post(tx.as_mut(), post.id).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.begin().await?;

        let mut tag_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT tag_id FROM post_tags WHERE post_id = $1")
                .bind(id)
                .fetch_all(tx.as_mut())
                .await?;
        tag_ids.sort_unstable();
        lock_tags(&mut tx, &tag_ids).await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await?;

        let deleted = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await?;

        refresh_use_count(&mut tx, &tag_ids).await?;
        tx.commit().await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self)
            .await?;
        Ok(())
    }
}
