//! # callboard-cli
//!
//! Operator commands that run directly against the callboard database:
//! bootstrapping an admin, changing roles, importing lead lists and
//! normalizing stored specialties.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use core_access::Role;
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Commands,
}

/// Where the data lives. Read from the same variables the server uses.
#[derive(Args, Debug)]
struct StoreArgs {
    /// Path to the local database file
    #[arg(long, env = "DB_URL", default_value = "db/callboard.db", global = true)]
    db_url: String,
    /// Managed database REST URL; replaces the local database when set
    #[arg(long, env = "MANAGED_DB_URL", global = true)]
    managed_db_url: Option<String>,
    #[arg(long, env = "MANAGED_DB_KEY", global = true, hide_env_values = true)]
    managed_db_key: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create (or promote) an admin account
    CreateAdmin(CreateAdminArgs),
    /// Change the role of an existing user
    SetRole(SetRoleArgs),
    /// Import leads from a CSV file with full_name,specialty[,assigned_caller_id] columns
    ImportLeads(ImportLeadsArgs),
    /// Rewrite stored specialties to their canonical name for a region
    NormalizeSpecialties(NormalizeArgs),
}

#[derive(Args, Debug)]
struct CreateAdminArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    name: Option<String>,
    /// Identity provider admin API base URL
    #[arg(long, env = "AUTH_API_URL")]
    auth_api_url: Option<String>,
    #[arg(long, env = "AUTH_SERVICE_KEY", hide_env_values = true)]
    auth_service_key: Option<String>,
}

#[derive(Args, Debug)]
struct SetRoleArgs {
    #[arg(long)]
    email: String,
    /// admin or caller
    #[arg(long)]
    role: Role,
}

#[derive(Args, Debug)]
struct ImportLeadsArgs {
    #[arg(long)]
    file: std::path::PathBuf,
    /// Caller for rows without their own assigned_caller_id
    #[arg(long)]
    caller_id: Option<String>,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    /// Region appended to every specialty
    #[arg(long, default_value = callboard::specialty::DEFAULT_REGION)]
    region: String,
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let repo = commands::open_repository(
        &cli.store.db_url,
        cli.store.managed_db_url.as_deref(),
        cli.store.managed_db_key.as_deref(),
    )
    .await?;

    let output = match cli.command {
        Commands::CreateAdmin(args) => {
            commands::create_admin(
                repo.as_ref(),
                args.auth_api_url,
                args.auth_service_key,
                &args.email,
                &args.password,
                args.name.as_deref(),
            )
            .await?
        }
        Commands::SetRole(args) => commands::set_role(repo.as_ref(), &args.email, args.role).await?,
        Commands::ImportLeads(args) => {
            commands::import_leads(repo.as_ref(), &args.file, args.caller_id.as_deref()).await?
        }
        Commands::NormalizeSpecialties(args) => {
            commands::normalize_specialties(repo.as_ref(), &args.region).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
