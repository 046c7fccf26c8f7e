//! 内存仓储，仅用于单元测试

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local};
use uuid::Uuid;

use super::{
    Admin, AdminRepository, Comment, CommentRepository, NewComment, NewPost, Post, PostFilter,
    PostRepository, PostStatus, Tag, TagRepository,
};
use crate::{error::Result, pagination::PageRequest};

#[derive(Default)]
struct Data {
    admins: Vec<Admin>,
    tags: Vec<Tag>,
    posts: Vec<Post>,
    /// (post_id, tag_id)
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    ticks: i64,
}

impl Data {
    /// 单调递增的时钟，保证同一测试内创建时间可排序
    fn now(&mut self) -> DateTime<Local> {
        self.ticks += 1;
        Local::now() + Duration::milliseconds(self.ticks)
    }

    fn tags_of(&self, post_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, t)| self.tags.iter().find(|tag| tag.id == *t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn with_tags(&self, post: &Post) -> Post {
        Post {
            tags: self.tags_of(post.id),
            ..post.clone()
        }
    }

    fn replace_post_tags(&mut self, post_id: Uuid, tag_ids: &[Uuid]) {
        let mut touched: Vec<Uuid> = self
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .map(|(_, t)| *t)
            .collect();
        self.post_tags.retain(|(p, _)| *p != post_id);
        for tag_id in tag_ids {
            if !self.post_tags.contains(&(post_id, *tag_id)) {
                self.post_tags.push((post_id, *tag_id));
            }
        }
        touched.extend_from_slice(tag_ids);
        self.refresh_use_count(&touched);
    }

    fn refresh_use_count(&mut self, tag_ids: &[Uuid]) {
        for tag in self.tags.iter_mut().filter(|t| tag_ids.contains(&t.id)) {
            tag.use_count = self.post_tags.iter().filter(|(_, t)| *t == tag.id).count() as i32;
        }
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect()
}

/// 线程安全的内存仓储，克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Data>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Data> {
        self.data.lock().expect("memory store poisoned")
    }

    pub fn add_admin(&self, username: &str, password_hash: &str, is_active: bool) -> Admin {
        let mut data = self.lock();
        let admin = Admin {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            email: Some(format!("{username}@example.com")),
            is_active,
            created_at: data.now(),
            last_login: None,
        };
        data.admins.push(admin.clone());
        admin
    }

    pub fn admin(&self, id: Uuid) -> Option<Admin> {
        self.lock().admins.iter().find(|a| a.id == id).cloned()
    }

    pub fn view_count(&self, id: Uuid) -> Option<i64> {
        self.lock()
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.view_count)
    }

    pub fn tag_count(&self) -> usize {
        self.lock().tags.len()
    }
}

impl AdminRepository for MemoryStore {
    async fn find_active_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        Ok(self
            .lock()
            .admins
            .iter()
            .find(|a| a.username == username && a.is_active)
            .cloned())
    }

    async fn find_active_admin(&self, id: Uuid) -> Result<Option<Admin>> {
        Ok(self
            .lock()
            .admins
            .iter()
            .find(|a| a.id == id && a.is_active)
            .cloned())
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        let mut data = self.lock();
        let now = data.now();
        if let Some(admin) = data.admins.iter_mut().find(|a| a.id == id) {
            admin.last_login = Some(now);
        }
        Ok(())
    }
}

impl TagRepository for MemoryStore {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.lock().tags.clone();
        tags.sort_by(|a, b| b.use_count.cmp(&a.use_count).then(a.name.cmp(&b.name)));
        Ok(tags)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        Ok(self.lock().tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self.lock().tags.iter().find(|t| t.name == name).cloned())
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Option<Tag>> {
        let mut data = self.lock();
        if data.tags.iter().any(|t| t.slug == slug || t.name == name) {
            return Ok(None);
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            use_count: 0,
            created_at: data.now(),
        };
        data.tags.push(tag.clone());
        Ok(Some(tag))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let mut data = self.lock();
        let before = data.tags.len();
        data.tags.retain(|t| t.id != id);
        data.post_tags.retain(|(_, t)| *t != id);
        Ok(data.tags.len() != before)
    }
}

impl PostRepository for MemoryStore {
    async fn list_posts(&self, filter: &PostFilter, page: PageRequest) -> Result<(Vec<Post>, i64)> {
        let data = self.lock();
        let search = filter.search.as_deref().map(str::to_lowercase);

        let mut posts: Vec<Post> = data
            .posts
            .iter()
            .filter(|p| match filter.status {
                PostStatus::Published => p.is_published,
                PostStatus::Draft => !p.is_published,
                PostStatus::All => true,
            })
            .map(|p| data.with_tags(p))
            .filter(|p| match &filter.tag {
                Some(tag) => p.tags.iter().any(|t| &t.slug == tag || &t.name == tag),
                None => true,
            })
            .filter(|p| match &search {
                Some(s) => p.title.to_lowercase().contains(s) || p.excerpt.to_lowercase().contains(s),
                None => true,
            })
            .collect();

        posts.sort_by(|a, b| {
            b.published_date
                .cmp(&a.published_date)
                .then(b.created_at.cmp(&a.created_at))
        });

        Ok((paginate(&posts, page), posts.len() as i64))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        let data = self.lock();
        Ok(data.posts.iter().find(|p| p.id == id).map(|p| data.with_tags(p)))
    }

    async fn post_exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock().posts.iter().any(|p| p.id == id))
    }

    async fn insert_post(&self, post: &NewPost, tag_ids: &[Uuid]) -> Result<Post> {
        let mut data = self.lock();
        let now = data.now();
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            read_time: post.read_time.clone(),
            published_date: post.published_date,
            is_published: post.is_published,
            view_count: 0,
            author_id: post.author_id,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        };
        data.posts.push(created.clone());
        data.replace_post_tags(created.id, tag_ids);
        Ok(data.with_tags(&created))
    }

    async fn update_post(&self, post: &Post, tag_ids: Option<&[Uuid]>) -> Result<Option<Post>> {
        let mut data = self.lock();
        let now = data.now();
        let Some(stored) = data.posts.iter_mut().find(|p| p.id == post.id) else {
            return Ok(None);
        };

        stored.title = post.title.clone();
        stored.excerpt = post.excerpt.clone();
        stored.content = post.content.clone();
        stored.read_time = post.read_time.clone();
        stored.is_published = post.is_published;
        stored.updated_at = now;
        let saved = stored.clone();

        if let Some(tag_ids) = tag_ids {
            data.replace_post_tags(post.id, tag_ids);
        }
        Ok(Some(data.with_tags(&saved)))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut data = self.lock();
        let before = data.posts.len();
        data.posts.retain(|p| p.id != id);
        let removed = data.posts.len() != before;
        if removed {
            data.replace_post_tags(id, &[]);
            data.comments.retain(|c| c.post_id != Some(id));
        }
        Ok(removed)
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<()> {
        if let Some(post) = self.lock().posts.iter_mut().find(|p| p.id == id) {
            post.view_count += 1;
        }
        Ok(())
    }
}

impl CommentRepository for MemoryStore {
    async fn top_level_comments(
        &self,
        post_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<Comment>, i64)> {
        let mut comments: Vec<Comment> = self
            .lock()
            .comments
            .iter()
            .filter(|c| c.post_id == Some(post_id) && c.parent_id.is_none() && !c.is_deleted)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok((paginate(&comments, page), comments.len() as i64))
    }

    async fn replies_of(&self, parent_ids: &[Uuid]) -> Result<Vec<Comment>> {
        let mut replies: Vec<Comment> = self
            .lock()
            .comments
            .iter()
            .filter(|c| !c.is_deleted)
            .filter(|c| c.parent_id.is_some_and(|p| parent_ids.contains(&p)))
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(replies)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self
            .lock()
            .comments
            .iter()
            .find(|c| c.id == id && !c.is_deleted)
            .cloned())
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<Comment> {
        let mut data = self.lock();
        let now = data.now();
        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author: comment.author.clone(),
            content: comment.content.clone(),
            role: comment.role,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        data.comments.push(created.clone());
        Ok(created)
    }

    async fn soft_delete_comment(&self, id: Uuid) -> Result<bool> {
        let mut data = self.lock();
        match data.comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_comments(&self, page: PageRequest) -> Result<(Vec<Comment>, i64)> {
        let mut comments: Vec<Comment> = self
            .lock()
            .comments
            .iter()
            .filter(|c| !c.is_deleted)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok((paginate(&comments, page), comments.len() as i64))
    }
}
