use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use serde::Serialize;

use onboard_callbacks::config::ClientConfig;
use onboard_callbacks::lifetime::PageLifetime;
use onboard_callbacks::navigation::RecordingHost;
use onboard_callbacks::orchestrator::{
    ConnectionCallbackHandler, ExchangeDeps, ExchangeOutcome, PaymentOutcome, PaymentPoller,
    SessionExchange,
};
use onboard_callbacks::redirect::{OAuthPayload, PaymentPayload};
use onboard_callbacks::remote::{HttpBackend, HttpIdentityProvider};
use onboard_callbacks::store::{InMemorySessionStore, LibSqlTokenStore, TokenStore};

#[derive(Parser)]
#[command(name = "onboard-callbacks")]
#[command(version, about = "Process sign-in, connection and payment redirects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange an identity-provider redirect (`...#session_id=...`) for a local session
    Session { url: String },
    /// Complete an OAuth connection callback (`...?code=...&state=...`)
    Connect { url: String },
    /// Verify a payment gateway return (`...?session_id=...`)
    Payment { url: String },
    /// Show the signed-in user
    Me,
    /// Sign out and forget the stored session token
    Logout,
    /// List subscription plans
    Plans,
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("Invalid configuration")?;

    let tokens: Arc<dyn TokenStore> = Arc::new(
        LibSqlTokenStore::new_local(&config.db_path)
            .await
            .with_context(|| {
                format!("Failed to open token store at {}", config.db_path.display())
            })?,
    );
    let backend = Arc::new(HttpBackend::new(&config, Arc::clone(&tokens))?);

    match cli.command {
        Commands::Session { url } => {
            let location = parse_location(&url)?;
            let host = Arc::new(RecordingHost::new());
            let exchange = SessionExchange::new(
                ExchangeDeps {
                    identity: Arc::new(HttpIdentityProvider::new(&config)?),
                    backend,
                    tokens,
                    sessions: Arc::new(InMemorySessionStore::new()),
                    host: host.clone(),
                },
                PageLifetime::new(),
            );

            let outcome = exchange.run(&location).await;
            print_events(&host)?;
            if let ExchangeOutcome::Failed(e) = outcome {
                tracing::warn!("Sign-in failed: {e}");
            }
        }
        Commands::Connect { url } => {
            let location = parse_location(&url)?;
            let host = Arc::new(RecordingHost::new());
            let handler = ConnectionCallbackHandler::new(
                backend,
                host.clone(),
                config.connection.clone(),
                PageLifetime::new(),
            );

            handler.handle(OAuthPayload::from_location(&location)).await;
            handler.redirect_settled().await;
            print_events(&host)?;
        }
        Commands::Payment { url } => {
            let location = parse_location(&url)?;
            let host = Arc::new(RecordingHost::new());
            let poller = PaymentPoller::new(
                backend,
                host.clone(),
                config.poll.clone(),
                PageLifetime::new(),
            );

            let outcome = poller.run(&PaymentPayload::from_location(&location)).await;
            print_json(&poller.view())?;
            if let PaymentOutcome::Finished(_) = outcome {
                poller.continue_to_sign_in();
            }
            print_events(&host)?;
        }
        Commands::Me => {
            let user = backend.current_user().await?;
            print_json(&user)?;
        }
        Commands::Logout => {
            backend.logout().await?;
            eprintln!("Signed out");
        }
        Commands::Plans => {
            for plan in backend.plans().await? {
                print_json(&plan)?;
            }
        }
        Commands::Health => {
            let health = backend.health().await?;
            print_json(&health)?;
            if !health.is_ok() {
                anyhow::bail!("Backend reported status {:?}", health.status);
            }
        }
    }

    Ok(())
}

fn parse_location(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("Not a valid redirect URL: {raw}"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_events(host: &RecordingHost) -> Result<()> {
    for event in host.take_events() {
        print_json(&event)?;
    }
    Ok(())
}
