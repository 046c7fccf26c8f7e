use uuid::Uuid;

use crate::{
    error::{Error, Result},
    storage::{Tag, TagRepository},
};

/// 标签名称的最大长度，与表结构一致
pub const MAX_TAG_NAME_LEN: usize = 50;

/// 将名称转换为 slug
///
/// 转小写，连续的非字母数字字符替换为单个 `-`，并去掉首尾的 `-`。
///
/// ```
/// assert_eq!(devlog::content::slugify("Web Dev!"), "web-dev");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn normalize_name(name: &str) -> Result<(&str, String)> {
    let name = name.trim();
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(Error::Validation(format!(
            "tag name must be at most {MAX_TAG_NAME_LEN} characters"
        )));
    }

    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::Validation(format!(
            "tag name `{name}` must contain letters or digits"
        )));
    }
    Ok((name, slug))
}

/// 标签注册表
///
/// 以 slug 去重，保证同一 slug 只对应一行。
#[derive(Clone)]
pub struct TagRegistry<R> {
    repo: R,
}

impl<R: TagRepository> TagRegistry<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// 全部标签，按使用次数降序、名称升序
    pub async fn list_all(&self) -> Result<Vec<Tag>> {
        self.repo.list_tags().await
    }

    /// 返回 slug 对应的标签，不存在时创建
    ///
    /// 并发创建同一 slug 时插入会因唯一约束落空，此时回查并返回已存在的行。
    pub async fn get_or_create_by_slug(&self, name: &str) -> Result<Tag> {
        let (name, slug) = normalize_name(name)?;

        if let Some(tag) = self.repo.find_tag_by_slug(&slug).await? {
            return Ok(tag);
        }

        if let Some(tag) = self.repo.insert_tag(name, &slug).await? {
            tracing::debug!(%slug, "tag created");
            return Ok(tag);
        }

        if let Some(tag) = self.repo.find_tag_by_slug(&slug).await? {
            return Ok(tag);
        }

        // 名称被另一个 slug 的旧数据占用
        self.repo
            .find_tag_by_name(name)
            .await?
            .ok_or_else(|| Error::Conflict(format!("tag `{name}` conflicts with an existing tag")))
    }

    /// 依次解析标签名称，结果按 id 去重并保持首次出现的顺序
    pub async fn resolve(&self, names: &[String]) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = Vec::with_capacity(names.len());
        for name in names {
            let tag = self.get_or_create_by_slug(name).await?;
            if !tags.iter().any(|t| t.id == tag.id) {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    /// 显式创建标签
    ///
    /// 名称或 slug 已存在时返回 [`Error::Conflict`]。
    pub async fn create(&self, name: &str) -> Result<Tag> {
        let (name, slug) = normalize_name(name)?;

        if self.repo.find_tag_by_name(name).await?.is_some() {
            return Err(Error::Conflict("tag already exists".into()));
        }

        self.repo
            .insert_tag(name, &slug)
            .await?
            .ok_or_else(|| Error::Conflict("tag already exists".into()))
    }

    /// 删除标签，文章关联由外键级联清除
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.repo.delete_tag(id).await? {
            Ok(())
        } else {
            Err(Error::NotFound("tag"))
        }
    }
}
