use rusqlite::Row;
use serde::Serialize;

use crate::password;

/// A persisted user.
///
/// `password` is stored but never serialized, whoever asks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub lastname: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl User {
    pub(crate) const COLUMNS: &'static str = "id, username, lastname, email, password";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            lastname: row.get(2)?,
            email: row.get(3)?,
            password: row.get(4)?,
        })
    }

    /// Check a plaintext password against the stored bcrypt hash.
    pub fn verify_password(&self, plain: &str) -> bool {
        password::verify(plain, &self.password)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub lastname: Option<String>,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Build a user whose password is bcrypt-hashed before it is stored.
    pub fn with_plain_password(
        username: impl Into<String>,
        lastname: Option<String>,
        email: impl Into<String>,
        plain: &str,
    ) -> Result<Self, bcrypt::BcryptError> {
        Ok(Self {
            username: username.into(),
            lastname,
            email: email.into(),
            password: password::hash(plain)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
}

impl Post {
    pub(crate) const COLUMNS: &'static str = "id, user_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewPost {
    pub user_id: i64,
}

/// Rows removed along with a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletedPost {
    pub comments: usize,
    pub media: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub author_id: i64,
    pub post_id: i64,
    pub comment_text: Option<String>,
}

impl Comment {
    pub(crate) const COLUMNS: &'static str = "id, author_id, post_id, comment_text";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            post_id: row.get(2)?,
            comment_text: row.get(3)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub author_id: i64,
    pub post_id: i64,
    pub comment_text: Option<String>,
}

/// Directed edge: `user_from_id` follows `user_to_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Follower {
    pub id: i64,
    pub user_from_id: i64,
    pub user_to_id: i64,
}

impl Follower {
    pub(crate) const COLUMNS: &'static str = "id, user_from_id, user_to_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_from_id: row.get(1)?,
            user_to_id: row.get(2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub id: i64,
    pub url: String,
    pub post_id: i64,
}

impl Media {
    pub(crate) const COLUMNS: &'static str = "id, url, post_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            post_id: row.get(2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedia {
    pub url: String,
    pub post_id: i64,
}
