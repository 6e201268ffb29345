//! AuthGate CLI - administration against the PostgreSQL credential store
//!
//! Usage:
//!   authgate init-schema
//!   authgate create-user --email <email> --password <password> [--admin]
//!   authgate tokens list [--page <n>]
//!   authgate tokens revoke <id>
//!   authgate tokens purge-expired

use anyhow::Context;
use authgate_api::{
    audit::{audit_log, AuditEvent},
    auth::CredentialHasher,
    store::{CredentialStore, PgStore},
};
use authgate_core::{models::validate_email, AppConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "AuthGate administration CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the users and refresh_token tables if they are missing
    InitSchema,
    /// Create an account, optionally with the admin flag
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },
    /// Inspect and revoke refresh tokens
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// List stored refresh tokens, all of them or one page
    List {
        #[arg(long)]
        page: Option<u64>,
    },
    /// Revoke a refresh token by its identifier
    Revoke { id: String },
    /// Delete every refresh token whose expiry has passed
    PurgeExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;

    match cli.command {
        Commands::InitSchema => {
            store.init_schema().await?;
            println!("Schema ready");
        }
        Commands::CreateUser {
            email,
            password,
            admin,
        } => {
            validate_email(&email)?;
            let hasher = CredentialHasher::new(&config.password)?;
            let hash = hasher.hash(&password)?;
            let user = store
                .users()
                .insert(&email, &hash, admin, chrono::Utc::now())
                .await?;
            println!("Created user {} ({}, admin: {})", user.id, user.email, user.admin);
        }
        Commands::Tokens { action } => match action {
            TokenAction::List { page } => {
                let tokens = match page {
                    Some(page) => store.refresh_tokens().get_page(page).await?,
                    None => store.refresh_tokens().get_all().await?,
                };
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            }
            TokenAction::Revoke { id } => {
                store.refresh_tokens().delete(&id).await?;
                audit_log(&AuditEvent::RefreshTokenRevoked {
                    refresh_uuid: id.clone(),
                    revoked_by: None,
                });
                println!("Revoked refresh token {}", id);
            }
            TokenAction::PurgeExpired => {
                let removed = store
                    .refresh_tokens()
                    .delete_expired(chrono::Utc::now().timestamp())
                    .await?;
                tracing::info!(removed, "Purged expired refresh tokens");
                println!("Removed {} expired refresh tokens", removed);
            }
        },
    }

    Ok(())
}
