use rusqlite::{params, OptionalExtension};

use crate::db::models::{NewUser, User};
use crate::db::{begin_write, Store};
use crate::error::{DbError, DbResult};
use crate::schema::USER;

impl Store {
    fn check_user_fields(
        &self,
        username: &str,
        lastname: Option<&str>,
        email: &str,
        password: &str,
    ) -> DbResult<()> {
        self.check_text(USER, "username", Some(username))?;
        self.check_text(USER, "lastname", lastname)?;
        self.check_text(USER, "email", Some(email))?;
        self.check_text(USER, "password", Some(password))
    }

    pub fn create_user(&self, new_user: &NewUser) -> DbResult<User> {
        self.check_user_fields(
            &new_user.username,
            new_user.lastname.as_deref(),
            &new_user.email,
            &new_user.password,
        )?;

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO \"user\" (username, lastname, email, password) VALUES (?1, ?2, ?3, ?4)",
            params![
                new_user.username,
                new_user.lastname,
                new_user.email,
                new_user.password
            ],
        )
        .map_err(|e| DbError::from_write(USER, e))?;

        let id = conn.last_insert_rowid();
        tracing::debug!(user_id = id, username = %new_user.username, "Created user");

        Ok(User {
            id,
            username: new_user.username.clone(),
            lastname: new_user.lastname.clone(),
            email: new_user.email.clone(),
            password: new_user.password.clone(),
        })
    }

    pub fn get_user(&self, id: i64) -> DbResult<User> {
        self.find_user_where("id", &id)?
            .ok_or_else(|| DbError::not_found(USER, id))
    }

    pub fn find_user_by_username(&self, username: &str) -> DbResult<User> {
        self.find_user_where("username", &username)?
            .ok_or_else(|| DbError::not_found(USER, username))
    }

    pub fn find_user_by_email(&self, email: &str) -> DbResult<User> {
        self.find_user_where("email", &email)?
            .ok_or_else(|| DbError::not_found(USER, email))
    }

    fn find_user_where(
        &self,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> DbResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM \"user\" WHERE {} = ?1",
                    User::COLUMNS,
                    column
                ),
                params![value],
                User::from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM \"user\" ORDER BY id",
            User::COLUMNS
        ))?;
        let users = stmt
            .query_map([], User::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Persist every field of `user` onto the row with its id.
    pub fn update_user(&self, user: &User) -> DbResult<()> {
        self.check_user_fields(
            &user.username,
            user.lastname.as_deref(),
            &user.email,
            &user.password,
        )?;

        let conn = self.pool.get()?;
        let rows = conn
            .execute(
                "UPDATE \"user\" SET username = ?1, lastname = ?2, email = ?3, password = ?4
                 WHERE id = ?5",
                params![
                    user.username,
                    user.lastname,
                    user.email,
                    user.password,
                    user.id
                ],
            )
            .map_err(|e| DbError::from_write(USER, e))?;

        if rows == 0 {
            return Err(DbError::not_found(USER, user.id));
        }
        tracing::debug!(user_id = user.id, "Updated user");
        Ok(())
    }

    /// Delete a user that nothing references.
    ///
    /// Refused with `Restricted` while the user still has posts, comments or
    /// follower edges in either direction.
    pub fn delete_user(&self, id: i64) -> DbResult<()> {
        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        let exists = tx
            .query_row("SELECT 1 FROM \"user\" WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        if exists.is_none() {
            return Err(DbError::not_found(USER, id));
        }

        for (table, column, _) in self.schema.referencing(USER) {
            let in_use = tx
                .query_row(
                    &format!(
                        "SELECT 1 FROM \"{}\" WHERE {} = ?1 LIMIT 1",
                        table.name, column.name
                    ),
                    params![id],
                    |_| Ok(()),
                )
                .optional()?;
            if in_use.is_some() {
                return Err(DbError::Restricted {
                    table: USER,
                    id,
                    referenced_by: table.name,
                });
            }
        }

        tx.execute("DELETE FROM \"user\" WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::debug!(user_id = id, "Deleted user");
        Ok(())
    }
}
