//! Administrative commands against the production database.
//!
//! Every mutation goes through the same idempotent, logged functions the API
//! uses; nothing here issues free-form SQL.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use cellar_api::config::require_env;
use cellar_api::db::{create_pool, run_migrations};
use cellar_api::events::seed::{load_seed_file, seed_events};
use cellar_api::flags::set_user_flag;
use cellar_api::store::PgStore;

#[derive(Debug, Parser)]
#[command(name = "cellar-admin", version, about = "Cellar administrative commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Set one feature flag for one user.
    SetFlag {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        flag: String,
        #[arg(long, action = clap::ArgAction::Set)]
        value: bool,
        /// Recorded in the audit trail.
        #[arg(long, env = "CELLAR_ADMIN_ACTOR", default_value = "cellar-admin")]
        actor: String,
    },
    /// Upsert wine events from a JSON file.
    SeedEvents {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let pool = create_pool(&require_env("DATABASE_URL")?, 2).await?;
    run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    match cli.command {
        Command::SetFlag {
            user,
            flag,
            value,
            actor,
        } => {
            let update = set_user_flag(&store, user, &flag, value, &actor).await?;
            if update.changed {
                println!(
                    "{flag} for {user}: {} -> {value} (version {})",
                    update.previous, update.version
                );
            } else {
                println!("{flag} for {user} already {value} (version {})", update.version);
            }
        }
        Command::SeedEvents { file } => {
            let events = load_seed_file(&file)?;
            let written = seed_events(&store, &events).await?;
            info!("Seeded {written} event(s) from {}", file.display());
            println!("seeded {written} event(s)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_flag() {
        let user = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "cellar-admin",
            "set-flag",
            "--user",
            &user,
            "--flag",
            "photo_import_beta",
            "--value",
            "true",
        ])
        .unwrap();
        match cli.command {
            Command::SetFlag { flag, value, .. } => {
                assert_eq!(flag, "photo_import_beta");
                assert!(value);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
