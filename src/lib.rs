// Library exports for socialdb
// The binary and integration tests use these modules

pub mod config;
pub mod db;
pub mod error;
pub mod password;
pub mod schema;

pub use db::models::{
    Comment, DeletedPost, Follower, Media, NewComment, NewMedia, NewPost, NewUser, Post, User,
};
pub use db::Store;
pub use error::{ConstraintKind, DbError, DbResult};
pub use schema::Schema;
