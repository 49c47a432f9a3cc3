use rusqlite::{params, OptionalExtension};

use crate::db::models::Follower;
use crate::db::{begin_write, ensure_exists, Store};
use crate::error::{DbError, DbResult};
use crate::schema::{FOLLOWER, USER};

impl Store {
    /// Record that `user_from_id` follows `user_to_id`.
    ///
    /// A second edge for the same pair fails with a unique violation.
    pub fn follow(&self, user_from_id: i64, user_to_id: i64) -> DbResult<Follower> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, USER, FOLLOWER, "user_from_id", user_from_id)?;
        ensure_exists(&tx, USER, FOLLOWER, "user_to_id", user_to_id)?;
        tx.execute(
            "INSERT INTO follower (user_from_id, user_to_id) VALUES (?1, ?2)",
            params![user_from_id, user_to_id],
        )
        .map_err(|e| DbError::from_write(FOLLOWER, e))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(user_from_id, user_to_id, "Created follower edge");
        Ok(Follower {
            id,
            user_from_id,
            user_to_id,
        })
    }

    pub fn get_follower(&self, id: i64) -> DbResult<Follower> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM follower WHERE id = ?1", Follower::COLUMNS),
            params![id],
            Follower::from_row,
        )
        .optional()?
        .ok_or_else(|| DbError::not_found(FOLLOWER, id))
    }

    /// Edges pointing at `user_id`: who follows them.
    pub fn followers_of(&self, user_id: i64) -> DbResult<Vec<Follower>> {
        self.edges_where("user_to_id", user_id)
    }

    /// Edges leaving `user_id`: who they follow.
    pub fn following_of(&self, user_id: i64) -> DbResult<Vec<Follower>> {
        self.edges_where("user_from_id", user_id)
    }

    fn edges_where(&self, column: &str, user_id: i64) -> DbResult<Vec<Follower>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM follower WHERE {} = ?1 ORDER BY id",
            Follower::COLUMNS,
            column
        ))?;
        let edges = stmt
            .query_map(params![user_id], Follower::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    pub fn is_following(&self, user_from_id: i64, user_to_id: i64) -> DbResult<bool> {
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM follower WHERE user_from_id = ?1 AND user_to_id = ?2",
                params![user_from_id, user_to_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Remove the edge for this pair.
    pub fn unfollow(&self, user_from_id: i64, user_to_id: i64) -> DbResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM follower WHERE user_from_id = ?1 AND user_to_id = ?2",
            params![user_from_id, user_to_id],
        )?;
        if rows == 0 {
            return Err(DbError::not_found(
                FOLLOWER,
                format!("{} -> {}", user_from_id, user_to_id),
            ));
        }
        tracing::debug!(user_from_id, user_to_id, "Removed follower edge");
        Ok(())
    }

    pub fn delete_follower(&self, id: i64) -> DbResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM follower WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(DbError::not_found(FOLLOWER, id));
        }
        tracing::debug!(follower_id = id, "Deleted follower edge");
        Ok(())
    }
}
