//! Request inspection and the bulk matching action

use anyhow::{Result, anyhow};
use clap::Subcommand;
use colored::*;
use sqlx::SqlitePool;

use crate::config::repository::requests as request_store;
use crate::models::RequestStatus;
use crate::services::matching::{self, MatchCriteria};
use crate::services::requests;

#[derive(Subcommand)]
pub enum RequestsCommands {
    /// List service requests
    List {
        /// Only show requests with this status (pending, matched, completed)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Run matching over pending requests
    Match {
        /// Restrict to these request ids (default: every pending request)
        #[arg(long)]
        id: Vec<i64>,
    },
    /// Show why each provider would or would not be matched to a request
    Explain {
        /// Request id
        id: i64,
    },
}

pub async fn handle_requests_command(pool: &SqlitePool, args: RequestsCommands) -> Result<()> {
    match args {
        RequestsCommands::List { status } => {
            let status = status
                .map(|s| RequestStatus::from_db(&s).ok_or_else(|| anyhow!("Unknown status '{}'", s)))
                .transpose()?;
            list(pool, status).await
        }
        RequestsCommands::Match { id } => {
            let ids = (!id.is_empty()).then_some(id.as_slice());
            let report = requests::run_matching(pool, ids).await?;
            for (request_id, provider_id) in &report.matched {
                println!(
                    "  request {} {} provider {}",
                    request_id.to_string().cyan(),
                    "->".dimmed(),
                    provider_id.to_string().cyan()
                );
            }
            let summary = report.summary();
            if report.matched_count() > 0 {
                println!("{}", summary.bright_green());
            } else {
                println!("{}", summary.yellow());
            }
            Ok(())
        }
        RequestsCommands::Explain { id } => explain(pool, id).await,
    }
}

async fn explain(pool: &SqlitePool, id: i64) -> Result<()> {
    let request = request_store::get_request(pool, id)
        .await?
        .ok_or_else(|| anyhow!("No service request with id {}", id))?;
    let criteria = MatchCriteria::from(&request);
    println!(
        "Request {}: '{}' in '{}' ({})",
        request.id.to_string().cyan(),
        criteria.service_type,
        criteria.location,
        request.status.label()
    );

    let verdicts = matching::explain(pool, &criteria).await?;
    if verdicts.is_empty() {
        println!("{}", "No providers registered".dimmed());
        return Ok(());
    }
    for (provider, verdict) in &verdicts {
        let outcome = match verdict {
            Ok(()) => "eligible".bright_green(),
            Err(rejection) => rejection.label().yellow(),
        };
        println!(
            "  {:<5} {:<28} {:>4.1}  {}",
            provider.id, provider.company_name, provider.rating, outcome
        );
    }

    match matching::find_best_provider(pool, &criteria).await? {
        Some(best) => println!("Best match: {}", best.company_name.bold()),
        None => println!("{}", "No eligible provider".yellow()),
    }
    Ok(())
}

async fn list(pool: &SqlitePool, status: Option<RequestStatus>) -> Result<()> {
    let summaries = requests::list_all(pool, status).await?;
    if summaries.is_empty() {
        println!("{}", "No requests found".dimmed());
        return Ok(());
    }

    println!(
        "{:<5} {:<16} {:<20} {:<20} {:<10} {:<28} {:<16}",
        "ID".bold(),
        "USER".bold(),
        "SERVICE".bold(),
        "LOCATION".bold(),
        "STATUS".bold(),
        "PROVIDER".bold(),
        "REQUESTED".bold()
    );
    for summary in &summaries {
        let request = &summary.request;
        let status = match request.status {
            RequestStatus::Pending => request.status.label().yellow(),
            RequestStatus::Matched => request.status.label().bright_green(),
            RequestStatus::Completed => request.status.label().dimmed(),
        };
        println!(
            "{:<5} {:<16} {:<20} {:<20} {:<10} {:<28} {:<16}",
            request.id,
            summary.username,
            request.service_type,
            request.location,
            status,
            summary.matched_company.as_deref().unwrap_or("-"),
            request.date_requested.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
