use clap::Parser;
use tracing_subscriber::EnvFilter;

use socialdb::config::{Cli, Command, Config};
use socialdb::db;
use socialdb::{Schema, Store};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let schema = Schema::social();

    // Printing the schema needs no database
    if let Command::Schema { sql } = cli.command {
        if sql {
            println!("{}", schema.to_sql());
        } else {
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        return Ok(());
    }

    let config = Config::load(&cli)?;
    let db_path = config.db_path();
    tracing::info!("Database: {}", db_path.display());

    let pool = db::create_pool(&db_path, &config.database)?;
    db::run_migrations(&pool, &schema)?;
    let store = Store::new(pool, schema);

    if cli.command == Command::Stats {
        let counts: serde_json::Map<String, serde_json::Value> = store
            .row_counts()?
            .into_iter()
            .map(|(table, count)| (table.to_string(), count.into()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&counts)?);
    }

    Ok(())
}
