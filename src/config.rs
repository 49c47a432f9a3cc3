use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "socialdb", about = "Manage the social network database")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the database and apply pending migrations
    Migrate,
    /// Print the schema description
    Schema {
        /// Print DDL instead of JSON
        #[arg(long)]
        sql: bool,
    },
    /// Print row counts per table
    Stats,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 8,
            busy_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref db) = cli.db {
            config.database.path = Some(db.clone());
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("social.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".socialdb"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("social.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: Option<PathBuf>, config: Option<PathBuf>, db: Option<PathBuf>) -> Cli {
        Cli {
            config,
            data_dir,
            db,
            command: Command::Migrate,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert!(config.database.path.is_none());
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(Some(PathBuf::from("/tmp/test-socialdb")), None, None);
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-socialdb")
        );
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()), None, None)).unwrap();
        assert_eq!(config.db_path(), tmp.path().join("social.db"));
        assert_eq!(config.database.max_connections, 8);
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[database]
path = "/var/lib/social/main.db"
max_connections = 2
"#,
        )
        .unwrap();

        let config = Config::load(&cli(
            Some(tmp.path().to_path_buf()),
            Some(config_path),
            None,
        ))
        .unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/social/main.db"));
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn cli_db_beats_toml_value() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[database]\npath = \"/elsewhere.db\"\n",
        )
        .unwrap();

        let config = Config::load(&cli(
            Some(tmp.path().to_path_buf()),
            None,
            Some(PathBuf::from("/override.db")),
        ))
        .unwrap();
        assert_eq!(config.db_path(), PathBuf::from("/override.db"));
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["socialdb", "--db", "x.db", "schema", "--sql"]);
        assert_eq!(cli.command, Command::Schema { sql: true });
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
    }
}
