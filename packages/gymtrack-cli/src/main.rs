//! GymTrack CLI - command-line client for the GymTrack API
//!
//! This binary can:
//! - Sign in, sign up and sign out, keeping the session between runs
//! - Show and update the signed-in user's profile
//! - Browse muscle groups and their exercises

mod context;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gymtrack_core::auth::{
    PROFILE_UPDATE_FALLBACK, SIGN_IN_FALLBACK, SIGN_UP_FALLBACK, SessionError,
};
use gymtrack_core::{ApiError, ProfileUpdate, config};

/// Fallback for catalogue requests without a server message
const CATALOGUE_FALLBACK: &str = "Unable to load exercises. Please try again later.";

/// Environment variable read when `--password` is omitted
const ENV_PASSWORD: &str = "GYMTRACK_PASSWORD";

#[derive(Parser)]
#[command(name = "gymtrack")]
#[command(author = "GymTrack Team")]
#[command(version)]
#[command(about = "Command-line client for GymTrack")]
#[command(long_about = "
GymTrack CLI signs you in to a GymTrack server and keeps the session
between runs, so later commands are authenticated automatically.

Quick start:
  1. Sign in:          gymtrack login --email you@example.com
  2. List groups:      gymtrack groups
  3. Browse a group:   gymtrack exercises costas
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with e-mail and password
    #[command(alias = "signin")]
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and sign in to it
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    #[command(alias = "signout")]
    Logout,

    /// Show session status
    Status,

    /// Show or update the signed-in user's profile
    Profile {
        /// New display name
        #[arg(short, long)]
        name: Option<String>,

        /// Change the password (prompts for old and new password)
        #[arg(long)]
        change_password: bool,
    },

    /// List muscle groups
    Groups,

    /// List the exercises of a muscle group
    Exercises {
        /// Group name as returned by `gymtrack groups`
        group: String,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gymtrack={},gymtrack_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Login { email, password } => cmd_login(&cli, email, password.clone()).await,
        Commands::Signup {
            name,
            email,
            password,
        } => cmd_signup(&cli, name, email, password.clone()).await,
        Commands::Logout => cmd_logout(&cli).await,
        Commands::Status => cmd_status(&cli).await,
        Commands::Profile {
            name,
            change_password,
        } => cmd_profile(&cli, name.clone(), *change_password).await,
        Commands::Groups => cmd_groups(&cli).await,
        Commands::Exercises { group } => cmd_exercises(&cli, group).await,
        Commands::Config => cmd_config(&cli).await,
    }
}

/// Print the user-facing message for a failed operation and exit.
fn fail(cli: &Cli, message: String) -> ! {
    match cli.format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "status": "error", "message": message }));
        }
    }
    std::process::exit(1);
}

fn session_failure(cli: &Cli, err: SessionError, fallback: &str) -> ! {
    tracing::debug!("Operation failed: {}", err);
    fail(cli, err.user_message(fallback))
}

fn api_failure(cli: &Cli, err: ApiError, fallback: &str) -> ! {
    tracing::debug!("Request failed: {}", err);
    fail(cli, err.user_message(fallback))
}

fn read_password(given: Option<String>, prompt: &str) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        return Ok(password);
    }
    Ok(rpassword::prompt_password(prompt)?)
}

async fn cmd_login(cli: &Cli, email: &str, password: Option<String>) -> Result<()> {
    let ctx = context::open().await?;

    if let Some(user) = ctx.session.current_user() {
        match cli.format {
            OutputFormat::Text => {
                println!("Already signed in as {}", user.email);
                println!("Use 'gymtrack logout' to sign out first.");
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({
                    "status": "already_signed_in",
                    "user": user,
                }));
            }
        }
        return Ok(());
    }

    let password = read_password(password, "Password: ")?;
    let user = match ctx.session.sign_in(email, &password).await {
        Ok(user) => user,
        Err(e) => session_failure(cli, e, SIGN_IN_FALLBACK),
    };

    match cli.format {
        OutputFormat::Text => println!("Signed in as {} <{}>", user.name, user.email),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "signed_in",
                "user": user,
            }));
        }
    }

    Ok(())
}

async fn cmd_signup(cli: &Cli, name: &str, email: &str, password: Option<String>) -> Result<()> {
    let ctx = context::open().await?;

    if let Some(user) = ctx.session.current_user() {
        fail(cli, format!("Signed in as {}. Sign out before creating an account.", user.email));
    }

    let password = read_password(password, "Choose a password: ")?;
    let user = match ctx.session.sign_up(name, email, &password).await {
        Ok(user) => user,
        Err(e) => session_failure(cli, e, SIGN_UP_FALLBACK),
    };

    match cli.format {
        OutputFormat::Text => println!("Account created. Signed in as {} <{}>", user.name, user.email),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "signed_up",
                "user": user,
            }));
        }
    }

    Ok(())
}

async fn cmd_logout(cli: &Cli) -> Result<()> {
    let ctx = context::open().await?;
    let previous = ctx.session.current_user();

    // Storage cleanup failures do not keep the session alive
    let cleanup = ctx.session.sign_out().await;
    if let Err(e) = &cleanup {
        tracing::debug!("Sign-out cleanup failed: {}", e);
    }

    match cli.format {
        OutputFormat::Text => {
            match &previous {
                Some(user) => println!("Signed out {}", user.email),
                None => println!("Not signed in."),
            }
            if cleanup.is_err() {
                eprintln!("Warning: stored credentials could not be removed from {}",
                    ctx.session.storage_info());
            }
        }
        OutputFormat::Json => {
            let status = if previous.is_some() { "signed_out" } else { "not_signed_in" };
            println!("{}", serde_json::json!({
                "status": status,
                "storage_cleared": cleanup.is_ok(),
            }));
        }
    }

    Ok(())
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let ctx = context::open().await?;
    let state = ctx.session.state();

    match cli.format {
        OutputFormat::Text => {
            match &state.user {
                Some(user) => {
                    println!("Status: Signed in");
                    println!("Name:   {}", user.name);
                    println!("Email:  {}", user.email);
                }
                None => {
                    println!("Status: Not signed in");
                    println!();
                    println!("Run 'gymtrack login --email <email>' to sign in.");
                }
            }
            println!();
            println!("Server:  {} (from {})", ctx.session.api().base_url(), ctx.config.source);
            println!("Storage: {}", ctx.session.storage_info());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "authenticated": state.user.is_some(),
                "user": state.user,
                "api_url": ctx.session.api().base_url(),
                "api_source": ctx.config.source.to_string(),
                "storage_info": ctx.session.storage_info(),
            }));
        }
    }

    Ok(())
}

async fn cmd_profile(cli: &Cli, name: Option<String>, change_password: bool) -> Result<()> {
    let ctx = context::open().await?;
    let Some(current) = ctx.session.current_user() else {
        fail(cli, "Sign in first.".to_string());
    };

    let user = if name.is_none() && !change_password {
        current
    } else {
        let mut update = ProfileUpdate::rename(name.unwrap_or_else(|| current.name.clone()));
        if change_password {
            let old = rpassword::prompt_password("Current password: ")?;
            let new = rpassword::prompt_password("New password: ")?;
            let confirm = rpassword::prompt_password("Confirm new password: ")?;
            update = update.with_password(old, new, confirm);
        }

        match ctx.session.save_profile(update).await {
            Ok(user) => {
                if let OutputFormat::Text = cli.format {
                    println!("Profile updated.");
                }
                user
            }
            Err(e) => session_failure(cli, e, PROFILE_UPDATE_FALLBACK),
        }
    };

    let avatar_url = ctx.session.api().avatar_url(&user);
    match cli.format {
        OutputFormat::Text => {
            println!("Name:   {}", user.name);
            println!("Email:  {}", user.email);
            println!("Avatar: {}", avatar_url.as_deref().unwrap_or("-"));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "user": user,
                "avatar_url": avatar_url,
            }));
        }
    }

    Ok(())
}

async fn cmd_groups(cli: &Cli) -> Result<()> {
    let ctx = context::open().await?;
    if ctx.session.current_user().is_none() {
        fail(cli, "Sign in first.".to_string());
    }

    let groups = match ctx.session.api().groups().await {
        Ok(groups) => groups,
        Err(e) => api_failure(cli, e, CATALOGUE_FALLBACK),
    };

    match cli.format {
        OutputFormat::Text => {
            println!("{} muscle groups:", groups.len());
            for group in &groups {
                println!("  {}", group);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::json!({ "groups": groups })),
    }

    Ok(())
}

async fn cmd_exercises(cli: &Cli, group: &str) -> Result<()> {
    let ctx = context::open().await?;
    if ctx.session.current_user().is_none() {
        fail(cli, "Sign in first.".to_string());
    }

    let exercises = match ctx.session.api().exercises_by_group(group).await {
        Ok(exercises) => exercises,
        Err(e) => api_failure(cli, e, CATALOGUE_FALLBACK),
    };

    match cli.format {
        OutputFormat::Text => {
            println!("{} exercises in '{}':", exercises.len(), group);
            println!();
            for exercise in &exercises {
                println!("  {:30} {} x {}", exercise.name, exercise.series, exercise.repetitions);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "group": group,
                "exercises": exercises,
            }));
        }
    }

    Ok(())
}

async fn cmd_config(cli: &Cli) -> Result<()> {
    let client_config = config::load_client_config();
    let config_path = config::get_config_file_path_string();
    let storage_info = gymtrack_core::store::open_store(&client_config)
        .map(|store| store.describe())
        .unwrap_or_else(|e| format!("unavailable ({})", e));

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            println!("API endpoint:     {} (from {})", client_config.api_url, client_config.source);
            println!("Request timeout:  {}s", client_config.timeout.as_secs());
            println!("Storage backend:  {}", client_config.storage);
            println!("Credential store: {}", storage_info);
            println!();
            println!("Environment variables:");
            println!("  {} - Override API endpoint", config::ENV_API_URL);
            println!("  {} - Override storage backend", config::ENV_STORAGE);
            println!("  {} - Password for login/signup", ENV_PASSWORD);
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", config::generate_example_config());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "config_file": config_path,
                "api_url": client_config.api_url,
                "api_source": format!("{}", client_config.source),
                "timeout_secs": client_config.timeout.as_secs(),
                "storage_backend": client_config.storage.to_string(),
                "credential_storage": storage_info,
            }));
        }
    }

    Ok(())
}
