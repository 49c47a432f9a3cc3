use rusqlite::{params, OptionalExtension};

use crate::db::models::{DeletedPost, NewPost, Post};
use crate::db::{begin_write, ensure_exists, Store};
use crate::error::{DbError, DbResult};
use crate::schema::{POST, USER};

impl Store {
    pub fn create_post(&self, new_post: &NewPost) -> DbResult<Post> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, USER, POST, "user_id", new_post.user_id)?;
        tx.execute(
            "INSERT INTO post (user_id) VALUES (?1)",
            params![new_post.user_id],
        )
        .map_err(|e| DbError::from_write(POST, e))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(post_id = id, user_id = new_post.user_id, "Created post");
        Ok(Post {
            id,
            user_id: new_post.user_id,
        })
    }

    pub fn get_post(&self, id: i64) -> DbResult<Post> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM post WHERE id = ?1", Post::COLUMNS),
            params![id],
            Post::from_row,
        )
        .optional()?
        .ok_or_else(|| DbError::not_found(POST, id))
    }

    /// Posts written by a user, oldest first.
    pub fn posts_by_user(&self, user_id: i64) -> DbResult<Vec<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM post WHERE user_id = ?1 ORDER BY id",
            Post::COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![user_id], Post::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Reassign a post to another user.
    pub fn update_post(&self, post: &Post) -> DbResult<()> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, USER, POST, "user_id", post.user_id)?;
        let rows = tx
            .execute(
                "UPDATE post SET user_id = ?1 WHERE id = ?2",
                params![post.user_id, post.id],
            )
            .map_err(|e| DbError::from_write(POST, e))?;
        if rows == 0 {
            return Err(DbError::not_found(POST, post.id));
        }
        tx.commit()?;

        tracing::debug!(post_id = post.id, user_id = post.user_id, "Updated post");
        Ok(())
    }

    /// Delete a post together with its comments and media.
    pub fn delete_post(&self, id: i64) -> DbResult<DeletedPost> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        let count_children = |table: &str| -> rusqlite::Result<usize> {
            let count: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM \"{}\" WHERE post_id = ?1", table),
                params![id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        };
        let deleted = DeletedPost {
            comments: count_children("comment")?,
            media: count_children("media")?,
        };

        // Children go through ON DELETE CASCADE
        let rows = tx.execute("DELETE FROM post WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(DbError::not_found(POST, id));
        }
        tx.commit()?;

        tracing::debug!(
            post_id = id,
            comments = deleted.comments,
            media = deleted.media,
            "Deleted post"
        );
        Ok(deleted)
    }
}
