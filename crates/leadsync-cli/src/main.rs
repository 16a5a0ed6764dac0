use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use leadsync::input::{parse_record, parse_records, read_source};
use leadsync::{Command, Config};
use leadsync_client::HubSpotClient;
use leadsync_core::{
    load_settings, AppError, CrmConfig, DbConfig, EmailMatching, HttpConfig, SyncService,
};
use leadsync_db::ImportLogRepository;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv().ok();

    // Setup logging (stderr to keep stdout clean for JSON output)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::parse();

    if let Err(e) = run(config).await {
        match e.downcast_ref::<AppError>() {
            Some(app_error) => eprintln!("Error: {}", app_error.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let settings = load_settings(config.config.as_deref())?;

    match config.command {
        Command::Batch {
            ref input,
            batch_size,
            concurrency,
            case_insensitive_emails,
        } => {
            let mut sync_config = settings.sync_config();
            if let Some(size) = batch_size {
                sync_config.batch_size = size;
            }
            if let Some(limit) = concurrency {
                sync_config.concurrency = limit;
            }
            if case_insensitive_emails {
                sync_config.email_matching = EmailMatching::CaseInsensitive;
            }

            let records = parse_records(&read_source(input)?)?;
            let client = hubspot_client(&config, &settings.http_config())?;
            let repo = connect_repository(&config, &settings.db_config()).await?;

            let service = SyncService::new(client, sync_config)?;
            info!(
                "Starting batch sync of {} contacts (batch size {}, concurrency {})",
                records.len(),
                sync_config.batch_size,
                sync_config.concurrency
            );
            let recorded = service.sync_and_record(records, &repo).await?;

            println!("{}", serde_json::to_string_pretty(&recorded.summary)?);
            eprintln!("Import log ID: {}", recorded.log_id);
        }
        Command::Sync { ref input } => {
            let record = parse_record(&read_source(input)?)?;
            let client = hubspot_client(&config, &settings.http_config())?;

            info!("Creating single contact");
            let response = client.create_contact(&record).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Log { id } => {
            let repo = connect_repository(&config, &settings.db_config()).await?;
            show_log(&repo, id).await?;
        }
        Command::Logs { limit } => {
            let repo = connect_repository(&config, &settings.db_config()).await?;
            let logs = repo.list_recent(limit).await?;
            if logs.is_empty() {
                eprintln!("No import logs found.");
            }
            for log in &logs {
                println!("{}", serde_json::to_string(log)?);
            }
        }
        Command::Contacts { limit } => {
            let client = hubspot_client(&config, &settings.http_config())?;
            let contacts = client.list_contacts(limit).await?;
            println!("{}", serde_json::to_string_pretty(&contacts)?);
        }
    }

    Ok(())
}

/// Builds the HubSpot client from CLI/env credentials and file settings.
fn hubspot_client(config: &Config, http: &HttpConfig) -> anyhow::Result<HubSpotClient> {
    let token = config
        .hubspot_access_token
        .as_deref()
        .context("HUBSPOT_ACCESS_TOKEN is not set (use --hubspot-access-token or the env var)")?;

    let crm = CrmConfig::new(config.hubspot_base_url.as_str(), token);
    Ok(HubSpotClient::new(&crm, http)?)
}

/// Connects to PostgreSQL and makes sure the schema exists.
async fn connect_repository(config: &Config, db: &DbConfig) -> anyhow::Result<ImportLogRepository> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is not set (use --database-url or the env var)")?;

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    let repo = ImportLogRepository::new(pool);
    repo.migrate().await?;
    Ok(repo)
}

async fn show_log(repo: &ImportLogRepository, id: Uuid) -> anyhow::Result<()> {
    let log = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::LogNotFound(id.to_string()))?;

    println!("{}", serde_json::to_string_pretty(&log)?);
    Ok(())
}
