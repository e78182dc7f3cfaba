//! Command-line surface: argument definitions and command dispatch.

use clap::{Parser, Subcommand};

use crate::entities::trial::{self, DEFAULT_MONTHS_BACK, TrialSearchConfig};
use crate::error::TrialWatchError;
use crate::sources::ctgov::CtGovClient;

#[derive(Debug, Parser)]
#[command(
    name = "trialwatch",
    version,
    about = "Track recently updated clinical trials on ClinicalTrials.gov"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Apply the recency cutoff inside the registry query as well
        #[arg(long)]
        server_side_date_filter: bool,
    },
    /// Search for recently updated trials and print them as JSON
    Search {
        /// Condition terms; comma-separated values are split
        #[arg(required = true)]
        terms: Vec<String>,
        /// Look-back window in 30-day months
        #[arg(long, default_value_t = DEFAULT_MONTHS_BACK)]
        months_back: i64,
        /// Apply the recency cutoff inside the registry query as well
        #[arg(long)]
        server_side_date_filter: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            server_side_date_filter,
        } => {
            crate::server::run_http(&host, port, server_side_date_filter).await?;
            Ok(String::new())
        }
        Commands::Search {
            terms,
            months_back,
            server_side_date_filter,
        } => search(terms, months_back, server_side_date_filter).await,
    }
}

async fn search(
    terms: Vec<String>,
    months_back: i64,
    server_side_date_filter: bool,
) -> anyhow::Result<String> {
    let terms = trial::normalize_terms(terms);
    if terms.is_empty() {
        return Err(TrialWatchError::InvalidArgument(
            "At least one condition term is required. Example: trialwatch search diabetes".into(),
        )
        .into());
    }

    let client = CtGovClient::new()?;
    let config = TrialSearchConfig {
        server_side_date_filter,
        ..TrialSearchConfig::default()
    };
    let results = trial::search_many(&client, &config, &terms, months_back).await;
    Ok(crate::render::json::to_pretty(&results)?)
}
