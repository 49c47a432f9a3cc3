use std::fmt;

use rusqlite::ffi;

/// Which rule a rejected write broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Value already taken by another row.
    Unique,
    /// Required column left empty.
    Required,
    /// String longer than the column allows (in characters).
    TooLong { max: usize },
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Unique => write!(f, "value must be unique"),
            ConstraintKind::Required => write!(f, "value is required"),
            ConstraintKind::TooLong { max } => write!(f, "value exceeds {} characters", max),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Constraint violation on {table}.{column}: {kind}")]
    ConstraintViolation {
        table: &'static str,
        column: String,
        kind: ConstraintKind,
    },

    #[error("Referential integrity violation: {table}.{column} = {id} has no matching row")]
    ReferentialIntegrity {
        table: &'static str,
        column: &'static str,
        id: i64,
    },

    #[error("Cannot delete {table} {id}: still referenced by {referenced_by}")]
    Restricted {
        table: &'static str,
        id: i64,
        referenced_by: &'static str,
    },

    #[error("{table} not found: {key}")]
    NotFound { table: &'static str, key: String },

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(table: &'static str, key: impl fmt::Display) -> Self {
        DbError::NotFound {
            table,
            key: key.to_string(),
        }
    }

    /// Classify a failed write on `table`. Constraint failures reported by
    /// SQLite itself become typed errors; anything else passes through.
    pub fn from_write(table: &'static str, err: rusqlite::Error) -> Self {
        let (extended_code, message) = match &err {
            rusqlite::Error::SqliteFailure(code, message) => {
                (code.extended_code, message.clone().unwrap_or_default())
            }
            _ => (0, String::new()),
        };

        match extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                DbError::ConstraintViolation {
                    table,
                    column: failed_columns(&message),
                    kind: ConstraintKind::Unique,
                }
            }
            ffi::SQLITE_CONSTRAINT_NOTNULL => DbError::ConstraintViolation {
                table,
                column: failed_columns(&message),
                kind: ConstraintKind::Required,
            },
            // SQLite does not say which column or id failed
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => DbError::ReferentialIntegrity {
                table,
                column: "?",
                id: 0,
            },
            ffi::SQLITE_CONSTRAINT_CHECK => match failed_length_check(&message) {
                Some((column, max)) => DbError::ConstraintViolation {
                    table,
                    column,
                    kind: ConstraintKind::TooLong { max },
                },
                None => DbError::Sql(err),
            },
            _ => DbError::Sql(err),
        }
    }
}

/// Parse `CHECK constraint failed: length(username) <= 100` into
/// `("username", 100)`.
fn failed_length_check(message: &str) -> Option<(String, usize)> {
    let (_, expr) = message.split_once("length(")?;
    let (column, rest) = expr.split_once(')')?;
    let max = rest.trim().strip_prefix("<=")?.trim().parse().ok()?;
    Some((column.trim().to_string(), max))
}

/// Pull the column list out of messages like
/// `UNIQUE constraint failed: user.username` or
/// `UNIQUE constraint failed: follower.user_from_id, follower.user_to_id`.
fn failed_columns(message: &str) -> String {
    let Some((_, targets)) = message.split_once(": ") else {
        return message.to_string();
    };
    targets
        .split(", ")
        .map(|target| target.rsplit('.').next().unwrap_or(target))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(extended_code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(extended_code), Some(message.to_string()))
    }

    #[test]
    fn unique_failure_names_the_column() {
        let err = DbError::from_write(
            "user",
            sqlite_failure(
                ffi::SQLITE_CONSTRAINT_UNIQUE,
                "UNIQUE constraint failed: user.username",
            ),
        );
        match err {
            DbError::ConstraintViolation {
                table,
                column,
                kind,
            } => {
                assert_eq!(table, "user");
                assert_eq!(column, "username");
                assert_eq!(kind, ConstraintKind::Unique);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn composite_unique_failure_lists_all_columns() {
        let err = DbError::from_write(
            "follower",
            sqlite_failure(
                ffi::SQLITE_CONSTRAINT_UNIQUE,
                "UNIQUE constraint failed: follower.user_from_id, follower.user_to_id",
            ),
        );
        assert!(matches!(
            err,
            DbError::ConstraintViolation { ref column, .. } if column == "user_from_id, user_to_id"
        ));
    }

    #[test]
    fn not_null_failure_is_required() {
        let err = DbError::from_write(
            "media",
            sqlite_failure(
                ffi::SQLITE_CONSTRAINT_NOTNULL,
                "NOT NULL constraint failed: media.url",
            ),
        );
        assert!(matches!(
            err,
            DbError::ConstraintViolation {
                kind: ConstraintKind::Required,
                ..
            }
        ));
    }

    #[test]
    fn foreign_key_failure_is_referential_integrity() {
        let err = DbError::from_write(
            "comment",
            sqlite_failure(
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                "FOREIGN KEY constraint failed",
            ),
        );
        assert!(matches!(
            err,
            DbError::ReferentialIntegrity {
                table: "comment",
                column: "?",
                ..
            }
        ));
    }

    #[test]
    fn length_check_failure_is_too_long() {
        let err = DbError::from_write(
            "media",
            sqlite_failure(
                ffi::SQLITE_CONSTRAINT_CHECK,
                "CHECK constraint failed: length(url) <= 255",
            ),
        );
        assert!(matches!(
            err,
            DbError::ConstraintViolation { ref column, kind: ConstraintKind::TooLong { max: 255 }, .. }
                if column == "url"
        ));
    }

    #[test]
    fn unrecognised_check_failure_passes_through() {
        let err = DbError::from_write(
            "user",
            sqlite_failure(ffi::SQLITE_CONSTRAINT_CHECK, "CHECK constraint failed: named"),
        );
        assert!(matches!(err, DbError::Sql(_)));
    }

    #[test]
    fn other_errors_pass_through() {
        let err = DbError::from_write("post", rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, DbError::Sql(_)));
    }

    #[test]
    fn display_is_readable() {
        let err = DbError::ConstraintViolation {
            table: "user",
            column: "email".into(),
            kind: ConstraintKind::TooLong { max: 120 },
        };
        assert_eq!(
            err.to_string(),
            "Constraint violation on user.email: value exceeds 120 characters"
        );
        assert_eq!(
            DbError::not_found("post", 7).to_string(),
            "post not found: 7"
        );
    }
}
