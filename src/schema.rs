//! Immutable description of the social schema.
//!
//! A [`Schema`] is built once at startup with [`Schema::social`] and handed to
//! the store; migrations render their DDL from it and writes validate string
//! columns against it.

use serde::Serialize;

use crate::error::{ConstraintKind, DbError, DbResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "max")]
pub enum ColumnType {
    /// Surrogate key assigned by the engine.
    Id,
    Integer,
    Varchar(usize),
    Text,
}

impl ColumnType {
    fn sql(&self) -> String {
        match self {
            ColumnType::Id => "INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Varchar(n) => format!("VARCHAR({})", n),
            ColumnType::Text => "TEXT".to_string(),
        }
    }
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    Restrict,
}

impl OnDelete {
    fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKey>,
}

impl Column {
    fn id() -> Self {
        Self {
            name: "id",
            kind: ColumnType::Id,
            nullable: false,
            unique: false,
            references: None,
        }
    }

    fn varchar(name: &'static str, max: usize) -> Self {
        Self {
            name,
            kind: ColumnType::Varchar(max),
            nullable: true,
            unique: false,
            references: None,
        }
    }

    fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Text,
            nullable: true,
            unique: false,
            references: None,
        }
    }

    fn foreign_key(name: &'static str, table: &'static str, on_delete: OnDelete) -> Self {
        Self {
            name,
            kind: ColumnType::Integer,
            nullable: false,
            unique: false,
            references: Some(ForeignKey {
                table,
                column: "id",
                on_delete,
            }),
        }
    }

    fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Maximum length in characters, for bounded string columns.
    pub fn max_len(&self) -> Option<usize> {
        match self.kind {
            ColumnType::Varchar(n) => Some(n),
            _ => None,
        }
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.kind.sql());
        if !self.nullable && self.kind != ColumnType::Id {
            def.push_str(" NOT NULL");
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(max) = self.max_len() {
            def.push_str(&format!(" CHECK (length({}) <= {})", self.name, max));
        }
        if let Some(fk) = &self.references {
            def.push_str(&format!(
                " REFERENCES \"{}\"({}) ON DELETE {}",
                fk.table,
                fk.column,
                fk.on_delete.sql()
            ));
        }
        def
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
    pub unique: bool,
}

impl Index {
    fn on(name: &'static str, columns: &[&'static str]) -> Self {
        Self {
            name,
            columns: columns.to_vec(),
            unique: false,
        }
    }

    fn unique_on(name: &'static str, columns: &[&'static str]) -> Self {
        Self {
            unique: true,
            ..Self::on(name, columns)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Foreign keys declared on this table, as `(column, target)`.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Column, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|fk| (c, fk)))
    }

    /// Check a string value against the column's required and length rules.
    ///
    /// Uniqueness is left to the engine since it depends on other rows.
    pub fn check_text(&self, column: &str, value: Option<&str>) -> DbResult<()> {
        let Some(col) = self.column(column) else {
            return Ok(());
        };
        let violation = |kind| DbError::ConstraintViolation {
            table: self.name,
            column: col.name.to_string(),
            kind,
        };

        match value {
            None if !col.nullable => Err(violation(ConstraintKind::Required)),
            None => Ok(()),
            Some(v) => match col.max_len() {
                Some(max) if v.chars().count() > max => {
                    Err(violation(ConstraintKind::TooLong { max }))
                }
                _ => Ok(()),
            },
        }
    }

    pub fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.definition()))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);",
            self.name, columns
        )
    }

    pub fn index_statements(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|idx| {
                format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON \"{}\" ({});",
                    if idx.unique { "UNIQUE " } else { "" },
                    idx.name,
                    self.name,
                    idx.columns.join(", ")
                )
            })
            .collect()
    }
}

/// The full set of tables, in dependency order (referenced tables first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

pub const USER: &str = "user";
pub const POST: &str = "post";
pub const COMMENT: &str = "comment";
pub const FOLLOWER: &str = "follower";
pub const MEDIA: &str = "media";

impl Schema {
    pub fn social() -> Self {
        let user = Table {
            name: USER,
            columns: vec![
                Column::id(),
                Column::varchar("username", 100).required().unique(),
                Column::varchar("lastname", 100),
                Column::varchar("email", 120).required().unique(),
                Column::varchar("password", 120).required(),
            ],
            indexes: vec![],
        };

        let post = Table {
            name: POST,
            columns: vec![
                Column::id(),
                Column::foreign_key("user_id", USER, OnDelete::Restrict),
            ],
            indexes: vec![Index::on("idx_post_user_id", &["user_id"])],
        };

        let comment = Table {
            name: COMMENT,
            columns: vec![
                Column::id(),
                Column::foreign_key("author_id", USER, OnDelete::Restrict),
                Column::foreign_key("post_id", POST, OnDelete::Cascade),
                Column::text("comment_text"),
            ],
            indexes: vec![
                Index::on("idx_comment_author_id", &["author_id"]),
                Index::on("idx_comment_post_id", &["post_id"]),
            ],
        };

        let follower = Table {
            name: FOLLOWER,
            columns: vec![
                Column::id(),
                Column::foreign_key("user_from_id", USER, OnDelete::Restrict),
                Column::foreign_key("user_to_id", USER, OnDelete::Restrict),
            ],
            indexes: vec![
                Index::unique_on("idx_follower_edge", &["user_from_id", "user_to_id"]),
                Index::on("idx_follower_user_to_id", &["user_to_id"]),
            ],
        };

        let media = Table {
            name: MEDIA,
            columns: vec![
                Column::id(),
                Column::varchar("url", 255).required(),
                Column::foreign_key("post_id", POST, OnDelete::Cascade),
            ],
            indexes: vec![Index::on("idx_media_post_id", &["post_id"])],
        };

        Self {
            tables: vec![user, post, comment, follower, media],
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables holding a foreign key to `table`, as `(referencing table, column, policy)`.
    pub fn referencing(&self, table: &str) -> Vec<(&Table, &Column, OnDelete)> {
        self.tables
            .iter()
            .flat_map(|t| {
                t.foreign_keys()
                    .filter(move |(_, fk)| fk.table == table)
                    .map(move |(c, fk)| (t, c, fk.on_delete))
            })
            .collect()
    }

    pub fn create_statements(&self) -> Vec<String> {
        self.tables.iter().map(Table::create_statement).collect()
    }

    pub fn index_statements(&self) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(Table::index_statements)
            .collect()
    }

    /// Complete DDL script: tables first, then indexes.
    pub fn to_sql(&self) -> String {
        let mut statements = self.create_statements();
        statements.extend(self.index_statements());
        statements.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_in_dependency_order() {
        let schema = Schema::social();
        for (pos, table) in schema.tables.iter().enumerate() {
            for (_, fk) in table.foreign_keys() {
                let target = schema
                    .tables
                    .iter()
                    .position(|t| t.name == fk.table)
                    .unwrap();
                assert!(target < pos, "{} references later table {}", table.name, fk.table);
            }
        }
    }

    #[test]
    fn user_columns_match_limits() {
        let schema = Schema::social();
        let user = schema.table(USER).unwrap();
        assert_eq!(user.column("username").unwrap().max_len(), Some(100));
        assert!(user.column("username").unwrap().unique);
        assert!(user.column("lastname").unwrap().nullable);
        assert_eq!(user.column("email").unwrap().max_len(), Some(120));
        assert!(!user.column("password").unwrap().nullable);
    }

    #[test]
    fn only_post_children_cascade() {
        let schema = Schema::social();

        let post_children: Vec<_> = schema
            .referencing(POST)
            .into_iter()
            .map(|(t, _, policy)| (t.name, policy))
            .collect();
        assert_eq!(
            post_children,
            vec![(COMMENT, OnDelete::Cascade), (MEDIA, OnDelete::Cascade)]
        );

        assert!(schema
            .referencing(USER)
            .iter()
            .all(|(_, _, policy)| *policy == OnDelete::Restrict));
        assert_eq!(schema.referencing(USER).len(), 4);
    }

    #[test]
    fn check_text_enforces_length_in_characters() {
        let schema = Schema::social();
        let user = schema.table(USER).unwrap();

        assert!(user.check_text("username", Some(&"a".repeat(100))).is_ok());
        // 100 multibyte chars is still within the limit
        assert!(user.check_text("username", Some(&"é".repeat(100))).is_ok());

        let err = user
            .check_text("username", Some(&"a".repeat(101)))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::ConstraintViolation {
                kind: ConstraintKind::TooLong { max: 100 },
                ..
            }
        ));
    }

    #[test]
    fn check_text_enforces_required() {
        let schema = Schema::social();
        let user = schema.table(USER).unwrap();
        assert!(user.check_text("lastname", None).is_ok());
        let err = user.check_text("email", None).unwrap_err();
        assert!(matches!(
            err,
            DbError::ConstraintViolation { ref column, kind: ConstraintKind::Required, .. }
                if column == "email"
        ));
    }

    #[test]
    fn ddl_carries_constraints() {
        let sql = Schema::social().to_sql();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"user\""));
        assert!(sql.contains("username VARCHAR(100) NOT NULL UNIQUE CHECK (length(username) <= 100)"));
        assert!(sql.contains("post_id INTEGER NOT NULL REFERENCES \"post\"(id) ON DELETE CASCADE"));
        assert!(sql.contains("user_id INTEGER NOT NULL REFERENCES \"user\"(id) ON DELETE RESTRICT"));
        assert!(sql.contains(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_follower_edge ON \"follower\" (user_from_id, user_to_id);"
        ));
    }

    #[test]
    fn ddl_executes_on_sqlite() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&Schema::social().to_sql()).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('user', 'post', 'comment', 'follower', 'media')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(Schema::social()).unwrap();
        let media = &json["tables"][4];
        assert_eq!(media["name"], "media");
        assert_eq!(media["columns"][1]["type"]["type"], "varchar");
        assert_eq!(media["columns"][1]["type"]["max"], 255);
        assert_eq!(media["columns"][2]["references"]["on_delete"], "cascade");
    }
}
