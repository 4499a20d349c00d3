use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repocache::users::{email_unique_key, User, UserRepository, UserSummary};
use repocache::config::ttl_from_minutes;
use repocache::{AppState, Config};
use repocache_core::cache::Cache;
use repocache_core::storage::{classify, status_code_hint, FailureClass, Repository};
use repocache_core::{Identity, Specification, UserId};

/// repocache - Cached repositories with event-driven invalidation
#[derive(Parser, Debug)]
#[command(name = "repocache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base cache TTL in minutes
    #[arg(long, env = "CACHE_TTL_MINUTES")]
    ttl_minutes: Option<u64>,

    /// Path to the SQLite database (only used with the `sqlite` feature)
    #[arg(long, env = "SQLITE_PATH")]
    sqlite_path: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a user who signs up on their own
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// List every user
    ListUsers {
        /// Load refresh tokens too
        #[arg(long)]
        with_tokens: bool,
    },
    /// Check whether an email is still free
    CheckEmail { email: String },
    /// Delete a user by identity
    DeleteUser { id: String },
    /// Run the email-uniqueness scenario against a fresh user, logging each step
    Walkthrough {
        #[arg(long, default_value = "a@x.com")]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repocache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(minutes) = cli.ttl_minutes {
        config.cache.base_ttl = ttl_from_minutes(minutes);
    }
    if let Some(path) = cli.sqlite_path {
        config.sqlite_path = path;
    }

    let state = AppState::new(&config).await?;
    tracing::info!(ttl = ?state.users.cache_ttl(), "Repositories ready");

    match cli.command.unwrap_or(Command::Walkthrough {
        email: "a@x.com".to_string(),
    }) {
        Command::AddUser { name, email } => add_user(&state, name, &email).await,
        Command::ListUsers { with_tokens } => list_users(&state, with_tokens).await,
        Command::CheckEmail { email } => {
            let unique = state.users.is_email_unique(&email).await?;
            println!("{email}: {}", if unique { "available" } else { "taken" });
            Ok(())
        }
        Command::DeleteUser { id } => delete_user(&state, &id).await,
        Command::Walkthrough { email } => walkthrough(&state, &email).await,
    }
}

async fn add_user(state: &AppState, name: String, email: &str) -> Result<()> {
    match state.users.add_user(User::new(name, email)).await {
        Ok(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
        Err(err) if classify(&err) == FailureClass::Conflict => {
            println!("{email} is already registered");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn list_users(state: &AppState, with_tokens: bool) -> Result<()> {
    let users = if with_tokens {
        let spec = Specification::<User>::all().include(User::REFRESH_TOKENS);
        state.users.list(Some(&spec)).await?
    } else {
        state.users.list(None).await?
    };
    println!("{}", serde_json::to_string_pretty(&users)?);
    Ok(())
}

async fn delete_user(state: &AppState, id: &str) -> Result<()> {
    let id = UserId::parse(id)?;
    match state.users.delete(&id).await {
        Ok(_) => {
            println!("deleted {id}");
            Ok(())
        }
        Err(err) if classify(&err) == FailureClass::NotFound => {
            println!("no user {id}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn walkthrough(state: &AppState, email: &str) -> Result<()> {
    let unique_key = email_unique_key(email);
    let cached = |key: String| {
        let cache = state.cache.clone();
        async move { cache.get(&key).await.ok().flatten().is_some() }
    };

    let user = state.users.add_user(User::new("Walkthrough", email)).await?;
    tracing::info!(id = %user.id, email = %user.email, "1. Created user");

    let unique = state.users.is_email_unique(email).await?;
    tracing::info!(
        unique,
        cached = cached(unique_key.clone()).await,
        "2. Checked email uniqueness"
    );

    let found = state.users.get_by_email(email).await?;
    tracing::info!(found = found.is_some(), "3. Looked up user by email");

    let mut renamed = user.clone();
    renamed.name = "Walkthrough (renamed)".to_string();
    let renamed = state.users.update(renamed, UserId::create_unique()).await?;
    tracing::info!(
        created_at = ?renamed.audit.created_at(),
        updated_at = ?renamed.audit.updated_at(),
        "4. Renamed user"
    );

    let summary = state.users.get_dto_by_id::<UserSummary>(&user.id).await?;
    tracing::info!(summary = ?summary, "5. Read summary projection");

    state.users.delete(&user.id).await?;
    tracing::info!(cached = cached(unique_key).await, "6. Deleted user");

    let unique = state.users.is_email_unique(email).await?;
    tracing::info!(unique, "7. Checked email uniqueness again");

    if let Err(err) = state.users.delete(&user.id).await {
        tracing::info!(
            error = %err,
            status = status_code_hint(&err),
            "8. Deleting twice fails"
        );
    }

    Ok(())
}
