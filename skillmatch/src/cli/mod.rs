//! Command-line interface: web server and operator commands

pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::config::repository::sessions;

#[derive(Parser)]
#[command(name = "skillmatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Service marketplace matching requests to verified providers")]
pub struct Cli {
    /// Path to a config file (defaults to the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web application
    Serve {
        /// Address to bind, overrides the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Manage provider verification and ratings
    #[command(subcommand)]
    Provider(commands::provider::ProviderCommands),
    /// Inspect requests and run bulk matching
    #[command(subcommand)]
    Requests(commands::requests::RequestsCommands),
    /// Inspect and enable or disable accounts
    #[command(subcommand)]
    Users(commands::users::UsersCommands),
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Commands::Serve { bind: Some(bind) } = &cli.command {
        config.bind = bind.clone();
    }

    let pool = config::connect(&config).await?;

    match cli.command {
        Commands::Serve { .. } => crate::web::serve(config, pool).await,
        Commands::Migrate => {
            // connect() already applied pending migrations
            println!("Database at {} is up to date", config.database_url);
            let purged =
                sessions::delete_expired_sessions(&pool, config.session_max_age_secs).await?;
            if purged > 0 {
                println!("Removed {} expired session(s)", purged);
            }
            Ok(())
        }
        Commands::Provider(args) => commands::provider::handle_provider_command(&pool, args).await,
        Commands::Requests(args) => commands::requests::handle_requests_command(&pool, args).await,
        Commands::Users(args) => commands::users::handle_users_command(&pool, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_match_ids() {
        let cli = Cli::try_parse_from(["skillmatch", "requests", "match", "--id", "3", "--id", "7"])
            .unwrap();
        match cli.command {
            Commands::Requests(commands::requests::RequestsCommands::Match { id }) => {
                assert_eq!(id, vec![3, 7]);
            }
            _ => panic!("expected requests match"),
        }
    }

    #[test]
    fn test_parse_verify_revoke() {
        let cli = Cli::try_parse_from(["skillmatch", "provider", "verify", "acme", "--revoke"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Provider(commands::provider::ProviderCommands::Verify { revoke: true, .. })
        ));
    }
}
