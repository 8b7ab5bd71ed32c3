//! SmartMemory Admin - command-line superadmin console.
//!
//! Signs in against the SmartMemory backend, keeps the session in the
//! configured credential store, and runs superadmin queries, printing the
//! results as JSON.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use smartmemory_admin_core::models::PageParams;
use smartmemory_admin_core::{AdminContext, Config, RequestDescriptor, SessionState};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable consulted for the password before prompting
const ENV_PASSWORD: &str = "SMARTMEMORY_PASSWORD";

/// smartmemory-admin - SmartMemory superadmin console
#[derive(Parser, Debug)]
#[command(name = "smartmemory-admin")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Override the API base URL for this invocation
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the session
    Login {
        /// Account email (defaults to the last one used)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Sign out and forget stored tokens
    Logout,

    /// Show the signed-in identity
    Whoami,

    /// GET an arbitrary API path, e.g. /superadmin/stats
    Get {
        path: String,
    },

    /// System-wide statistics
    Stats,

    /// Backend health
    Health,

    /// List users
    Users {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        search: Option<String>,
    },

    /// List tenants
    Tenants {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        search: Option<String>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    let mut ctx = AdminContext::new(config)?;

    match cli.command {
        Commands::Login { email } => login(&mut ctx, email).await,
        Commands::Logout => {
            ctx.session.logout().await;
            eprintln!("Logged out.");
            Ok(())
        }
        command => {
            require_session(&mut ctx).await?;
            run(&ctx, command).await
        }
    }
}

async fn login(ctx: &mut AdminContext, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| ctx.config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let identity = ctx
        .session
        .login(&email, &password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

    ctx.config.last_email = Some(email);
    if let Err(e) = ctx.config.save() {
        warn!(error = %e, "Failed to save config");
    }

    info!(user = %identity.email, "Login successful");
    eprintln!("Signed in as {}", identity.display_name());
    Ok(())
}

/// Restore the stored session, failing when there is no privileged one.
async fn require_session(ctx: &mut AdminContext) -> Result<()> {
    match ctx.session.bootstrap().await {
        SessionState::Authenticated(_) => Ok(()),
        SessionState::Error(reason) => Err(anyhow::anyhow!("Session rejected: {}", reason)),
        _ => Err(anyhow::anyhow!(
            "Not signed in. Run `smartmemory-admin login` first."
        )),
    }
}

async fn run(ctx: &AdminContext, command: Commands) -> Result<()> {
    let result = match command {
        Commands::Whoami => {
            let identity = ctx
                .session
                .identity()
                .ok_or_else(|| anyhow::anyhow!("No active session"))?;
            Some(serde_json::to_value(identity)?)
        }
        Commands::Get { path } => ctx.api.request(&RequestDescriptor::get(path)).await?,
        Commands::Stats => ctx.api.system_stats().await?,
        Commands::Health => ctx.api.system_health().await?,
        Commands::Users {
            limit,
            offset,
            search,
        } => ctx.api.list_users(&page(limit, offset, search)).await?,
        Commands::Tenants {
            limit,
            offset,
            search,
        } => ctx.api.list_tenants(&page(limit, offset, search)).await?,
        Commands::Login { .. } | Commands::Logout => {
            anyhow::bail!("login and logout do not run against a restored session")
        }
    };

    print_json(result.as_ref())
}

fn page(limit: u32, offset: u32, search: Option<String>) -> PageParams {
    PageParams {
        limit,
        offset,
        search,
    }
}

fn print_json(value: Option<&Value>) -> Result<()> {
    match value {
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => eprintln!("(no content)"),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("No input given");
    }
    Ok(input.to_string())
}
