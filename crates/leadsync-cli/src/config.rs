use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use leadsync_core::DEFAULT_CRM_BASE_URL;
use std::path::PathBuf;
use uuid::Uuid;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "leadsync")]
#[command(
    author,
    version,
    about = "Validate, deduplicate and batch-upsert contacts into HubSpot"
)]
#[command(after_help = "Examples:
  leadsync batch leads.json
  cat leads.json | leadsync batch - --batch-size 50
  leadsync sync lead.json
  leadsync logs --limit 5")]
pub struct Config {
    /// PostgreSQL database connection URL (needed by batch, log and logs)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// HubSpot private app access token (needed by batch, sync and contacts)
    #[arg(long, env = "HUBSPOT_ACCESS_TOKEN", hide_env_values = true)]
    pub hubspot_access_token: Option<String>,

    /// HubSpot API base URL
    #[arg(long, env = "HUBSPOT_BASE_URL", default_value = DEFAULT_CRM_BASE_URL)]
    pub hubspot_base_url: String,

    /// Custom path to a config.toml settings file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate, dedupe and upsert a JSON array of contacts, then log the summary
    #[command(after_help = "Input is a JSON array of objects with an \"email\" field and
optional \"firstname\", \"lastname\", \"phone\" and \"company\" fields.

Examples:
  leadsync batch leads.json
  leadsync batch leads.json --batch-size 50 --concurrency 2
  leadsync batch - --case-insensitive-emails < leads.json")]
    Batch {
        /// JSON file with the contacts, or - for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Maximum contacts per upstream call
        #[arg(short, long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        batch_size: Option<usize>,

        /// Maximum upstream calls in flight
        #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        concurrency: Option<usize>,

        /// Treat emails differing only in case as duplicates
        #[arg(long)]
        case_insensitive_emails: bool,
    },
    /// Create a single contact without validation or deduplication
    Sync {
        /// JSON file with one contact object, or - for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Show one import log
    Log {
        /// Import log ID
        id: Uuid,
    },
    /// List recent import logs
    Logs {
        /// Maximum number of logs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// List contacts stored in HubSpot
    Contacts {
        /// Maximum number of contacts to fetch
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}
