mod admins;
mod comments;
#[cfg(test)]
pub(crate) mod memory;
mod models;
mod postgres;
mod posts;
mod tags;

pub use self::{
    admins::AdminRepository,
    comments::CommentRepository,
    models::{Admin, Comment, CommentRole, NewComment, NewPost, Post, Tag},
    postgres::{DBPool, migrate, new_db_pool},
    posts::{PostFilter, PostRepository, PostStatus},
    tags::TagRepository,
};
