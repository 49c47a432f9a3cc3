use rusqlite::{params, OptionalExtension};

use crate::db::models::{Comment, NewComment};
use crate::db::{begin_write, ensure_exists, Store};
use crate::error::{DbError, DbResult};
use crate::schema::{COMMENT, POST, USER};

impl Store {
    pub fn create_comment(&self, new_comment: &NewComment) -> DbResult<Comment> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, USER, COMMENT, "author_id", new_comment.author_id)?;
        ensure_exists(&tx, POST, COMMENT, "post_id", new_comment.post_id)?;
        tx.execute(
            "INSERT INTO comment (author_id, post_id, comment_text) VALUES (?1, ?2, ?3)",
            params![
                new_comment.author_id,
                new_comment.post_id,
                new_comment.comment_text
            ],
        )
        .map_err(|e| DbError::from_write(COMMENT, e))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(
            comment_id = id,
            post_id = new_comment.post_id,
            author_id = new_comment.author_id,
            "Created comment"
        );
        Ok(Comment {
            id,
            author_id: new_comment.author_id,
            post_id: new_comment.post_id,
            comment_text: new_comment.comment_text.clone(),
        })
    }

    pub fn get_comment(&self, id: i64) -> DbResult<Comment> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM comment WHERE id = ?1", Comment::COLUMNS),
            params![id],
            Comment::from_row,
        )
        .optional()?
        .ok_or_else(|| DbError::not_found(COMMENT, id))
    }

    pub fn comments_for_post(&self, post_id: i64) -> DbResult<Vec<Comment>> {
        self.comments_where("post_id", post_id)
    }

    pub fn comments_by_author(&self, author_id: i64) -> DbResult<Vec<Comment>> {
        self.comments_where("author_id", author_id)
    }

    fn comments_where(&self, column: &str, id: i64) -> DbResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM comment WHERE {} = ?1 ORDER BY id",
            Comment::COLUMNS,
            column
        ))?;
        let comments = stmt
            .query_map(params![id], Comment::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn update_comment(&self, comment: &Comment) -> DbResult<()> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, USER, COMMENT, "author_id", comment.author_id)?;
        ensure_exists(&tx, POST, COMMENT, "post_id", comment.post_id)?;
        let rows = tx
            .execute(
                "UPDATE comment SET author_id = ?1, post_id = ?2, comment_text = ?3 WHERE id = ?4",
                params![
                    comment.author_id,
                    comment.post_id,
                    comment.comment_text,
                    comment.id
                ],
            )
            .map_err(|e| DbError::from_write(COMMENT, e))?;
        if rows == 0 {
            return Err(DbError::not_found(COMMENT, comment.id));
        }
        tx.commit()?;

        tracing::debug!(comment_id = comment.id, "Updated comment");
        Ok(())
    }

    pub fn delete_comment(&self, id: i64) -> DbResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM comment WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(DbError::not_found(COMMENT, id));
        }
        tracing::debug!(comment_id = id, "Deleted comment");
        Ok(())
    }
}
