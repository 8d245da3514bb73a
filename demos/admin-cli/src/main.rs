use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rentalps_auth::prelude::*;
use tracing_subscriber::EnvFilter;

/// Session directory used when neither the flag nor the config sets one,
/// so the session survives between invocations.
const DEFAULT_SESSION_DIR: &str = ".rentalps";

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Command-line client for the RentalPS admin API.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<String>,

    /// Server origin, e.g. `http://localhost:3000`.
    #[arg(long)]
    api_url: Option<String>,

    /// Directory holding the persisted session.
    #[arg(long)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENTALPS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show who is signed in.
    Whoami,
    /// Rotate the session tokens now.
    Refresh,
    /// Sign out. Always clears the local session.
    Logout,
    /// GET a path below `/api` and print the JSON body.
    Get { path: String },
}

impl Args {
    /// Applies flag overrides on top of the loaded configuration.
    fn client_config(&self) -> Result<ClientConfig, AuthClientError> {
        let mut config = ClientConfig::load(self.config.as_deref())?;
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(dir) = &self.session_dir {
            config.session_dir = Some(dir.clone());
        }
        if config.session_dir.is_none() {
            config.session_dir = Some(PathBuf::from(DEFAULT_SESSION_DIR));
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One-screen description of the session, as a route guard would see it.
fn summary(state: &AuthState) -> String {
    match state.access() {
        Access::Pending => "session not initialized".to_string(),
        Access::Denied => match &state.error {
            Some(error) => format!("not signed in (last error: {error})"),
            None => "not signed in".to_string(),
        },
        Access::Granted => {
            let session = &state.session;
            let user = session
                .user
                .as_ref()
                .and_then(|u| u.get("email").or_else(|| u.get("name")))
                .and_then(|v| v.as_str())
                .unwrap_or("<unknown user>");
            let expires = session
                .expires_at
                .map(|at| at.to_string())
                .unwrap_or_else(|| "never".to_string());
            format!("signed in as {user} (status {}, expires {expires})", state.status)
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

async fn run(args: Args) -> Result<(), AuthClientError> {
    let client = AuthClient::from_config(&args.client_config()?)?;

    match args.command {
        Command::Login { email, password } => {
            client.login(email, password).await?;
            println!("{}", summary(&client.session().state()));
        }
        Command::Whoami => println!("{}", summary(&client.session().state())),
        Command::Refresh => {
            client.refresh().await?;
            println!("{}", summary(&client.session().state()));
        }
        Command::Logout => {
            client.logout().await;
            println!("signed out");
        }
        Command::Get { path } => {
            let body: serde_json::Value = client.get(&path).await?;
            println!("{body:#}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {}", e.user_message());
            std::process::ExitCode::FAILURE
        }
    }
}
