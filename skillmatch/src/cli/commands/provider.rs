//! Provider administration: listing, verification, rating

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use sqlx::SqlitePool;

use super::flag;
use crate::config::repository::{providers, users};
use crate::services::onboarding;

#[derive(Subcommand)]
pub enum ProviderCommands {
    /// List company profiles
    List,
    /// Mark a provider verified so it becomes eligible for matching
    Verify {
        /// Username of the provider account
        username: String,
        /// Revoke verification instead
        #[arg(long)]
        revoke: bool,
    },
    /// Set a provider's rating score
    Rate {
        username: String,
        #[arg(allow_negative_numbers = true)]
        rating: f64,
    },
}

pub async fn handle_provider_command(pool: &SqlitePool, args: ProviderCommands) -> Result<()> {
    match args {
        ProviderCommands::List => list(pool).await,
        ProviderCommands::Verify { username, revoke } => {
            let provider = onboarding::verify_provider(pool, &username, !revoke).await?;
            let state = if provider.verified {
                "verified".bright_green()
            } else {
                "unverified".yellow()
            };
            println!("{} is now {}", provider.company_name.bold(), state);
            Ok(())
        }
        ProviderCommands::Rate { username, rating } => {
            let provider = onboarding::set_rating(pool, &username, rating).await?;
            println!(
                "{} rating set to {}",
                provider.company_name.bold(),
                format!("{:.1}", provider.rating).cyan()
            );
            Ok(())
        }
    }
}

async fn list(pool: &SqlitePool) -> Result<()> {
    let profiles = providers::list_providers(pool).await?;
    if profiles.is_empty() {
        println!("{}", "No providers registered".dimmed());
        return Ok(());
    }

    println!(
        "{:<5} {:<16} {:<28} {:<20} {:<20} {:<9} {:>6} {:<9}",
        "ID".bold(),
        "USER".bold(),
        "COMPANY".bold(),
        "CATEGORY".bold(),
        "LOCATION".bold(),
        "VERIFIED".bold(),
        "RATING".bold(),
        "COMPLETE".bold()
    );
    for provider in &profiles {
        let username = users::get_user(pool, provider.user_id)
            .await?
            .map(|u| u.username)
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<5} {:<16} {:<28} {:<20} {:<20} {:<9} {:>6.1} {:<9}",
            provider.id,
            username,
            provider.company_name,
            provider.service_category,
            provider.location,
            flag(provider.verified),
            provider.rating,
            flag(provider.profile_completed)
        );
    }
    Ok(())
}
