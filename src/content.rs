mod comments;
mod posts;
mod tags;

pub use self::{
    comments::{Actor, CommentThread, Thread, relative_timestamp},
    posts::{PostChanges, PostFields, PostStore, read_time},
    tags::{MAX_TAG_NAME_LEN, TagRegistry, slugify},
};
