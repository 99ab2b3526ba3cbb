use anyhow::Result;
use clap::Subcommand;
use colored::*;
use sqlx::SqlitePool;

use super::flag;
use crate::config::repository::users;
use crate::services::accounts;

#[derive(Subcommand)]
pub enum UsersCommands {
    /// List accounts
    List,
    /// Allow an account to log in again
    Activate { username: String },
    /// Block an account from logging in
    Deactivate { username: String },
}

pub async fn handle_users_command(pool: &SqlitePool, args: UsersCommands) -> Result<()> {
    match args {
        UsersCommands::List => {
            let accounts = users::list_users(pool).await?;
            if accounts.is_empty() {
                println!("{}", "No accounts registered".dimmed());
                return Ok(());
            }
            println!(
                "{:<5} {:<16} {:<28} {:<10} {:<20} {:<7} {:<16}",
                "ID".bold(),
                "USERNAME".bold(),
                "EMAIL".bold(),
                "ROLE".bold(),
                "LOCATION".bold(),
                "ACTIVE".bold(),
                "JOINED".bold()
            );
            for user in &accounts {
                println!(
                    "{:<5} {:<16} {:<28} {:<10} {:<20} {:<7} {:<16}",
                    user.id,
                    user.username,
                    user.email,
                    user.role.label(),
                    user.location,
                    flag(user.is_active),
                    user.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
        UsersCommands::Activate { username } => {
            let user = accounts::set_active(pool, &username, true).await?;
            println!("{} {}", user.username.bold(), "activated".bright_green());
            Ok(())
        }
        UsersCommands::Deactivate { username } => {
            let user = accounts::set_active(pool, &username, false).await?;
            println!("{} {}", user.username.bold(), "deactivated".yellow());
            Ok(())
        }
    }
}
