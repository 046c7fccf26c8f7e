use chrono::Local;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::TagRegistry;
use crate::{
    error::{Error, Result},
    pagination::{PageRequest, Paged},
    storage::{NewPost, Post, PostFilter, PostRepository, TagRepository},
};

/// 每分钟阅读字数
const WORDS_PER_MINUTE: usize = 200;

/// 根据字数估算阅读时长，至少 1 分钟
///
/// ```
/// assert_eq!(devlog::content::read_time("hello world"), "1 min");
/// ```
pub fn read_time(content: &str) -> String {
    let words = content.split_whitespace().count();
    format!("{} min", (words / WORDS_PER_MINUTE).max(1))
}

/// 新建文章所需字段
#[derive(Debug, Clone, Default)]
pub struct PostFields {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    /// 为空时按正文字数计算
    pub read_time: Option<String>,
}

/// 文章的部分更新，`None` 表示保持原值
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    /// 提供时整体替换标签
    pub tags: Option<Vec<String>>,
    pub read_time: Option<String>,
    pub is_published: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn tag_ids(tags: &[crate::storage::Tag]) -> Vec<Uuid> {
    tags.iter().map(|t| t.id).collect()
}

/// 文章存储
///
/// 负责文章增删改查、标签关联替换以及浏览量计数。
#[derive(Clone)]
pub struct PostStore<R> {
    repo: R,
    tags: TagRegistry<R>,
}

impl<R> PostStore<R>
where
    R: PostRepository + TagRepository + Clone + 'static,
{
    pub fn new(repo: R) -> Self {
        Self {
            tags: TagRegistry::new(repo.clone()),
            repo,
        }
    }

    /// 分页查询文章列表
    pub async fn list(&self, filter: &PostFilter, page: PageRequest) -> Result<Paged<Post>> {
        let (items, total) = self.repo.list_posts(filter, page).await?;
        Ok(Paged { items, total, page })
    }

    /// 获取单篇文章，并在后台为其浏览量加一
    ///
    /// 返回的文章不包含这次浏览。
    pub async fn get_by_id(&self, id: Uuid) -> Result<Post> {
        let post = self.repo.find_post(id).await?.ok_or(Error::NotFound("post"))?;
        self.schedule_view_increment(id);
        Ok(post)
    }

    /// 派发一个独立的后台任务累加浏览量
    ///
    /// 任务失败只记录日志；进程退出时尚未完成的任务会丢失。
    pub fn schedule_view_increment(&self, id: Uuid) -> JoinHandle<()> {
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.increment_view_count(id).await {
                tracing::warn!(%id, error = %e, "failed to increment view count");
            }
        })
    }

    /// 创建文章，新文章默认未发布
    pub async fn create(&self, fields: PostFields, author_id: Option<Uuid>) -> Result<Post> {
        let tags = self.tags.resolve(&fields.tags).await?;
        let read_time = non_blank(fields.read_time).unwrap_or_else(|| read_time(&fields.content));

        let post = NewPost {
            title: fields.title,
            excerpt: fields.excerpt,
            content: fields.content,
            read_time,
            published_date: Local::now().date_naive(),
            is_published: false,
            author_id,
        };

        let created = self.repo.insert_post(&post, &tag_ids(&tags)).await?;
        tracing::info!(id = %created.id, title = %created.title, "post created");
        Ok(created)
    }

    /// 部分更新文章
    ///
    /// 正文变化且未显式给出阅读时长时重新计算；给出标签时整体替换。
    pub async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Post> {
        let mut post = self.repo.find_post(id).await?.ok_or(Error::NotFound("post"))?;
        let read_time = non_blank(changes.read_time);

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(excerpt) = changes.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(content) = changes.content {
            if read_time.is_none() {
                post.read_time = self::read_time(&content);
            }
            post.content = content;
        }
        if let Some(read_time) = read_time {
            post.read_time = read_time;
        }
        if let Some(is_published) = changes.is_published {
            post.is_published = is_published;
        }

        let tags = match changes.tags {
            Some(names) => Some(tag_ids(&self.tags.resolve(&names).await?)),
            None => None,
        };

        self.repo
            .update_post(&post, tags.as_deref())
            .await?
            .ok_or(Error::NotFound("post"))
    }

    /// 删除文章
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.repo.delete_post(id).await? {
            tracing::info!(%id, "post deleted");
            Ok(())
        } else {
            Err(Error::NotFound("post"))
        }
    }
}
