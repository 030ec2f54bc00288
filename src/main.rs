//! blog-api - Minimal blog-post REST API over SQLite

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_api::api::{self, AppState};
use blog_api::config::Config;
use blog_api::store::BlogDb;

#[derive(Parser)]
#[command(name = "blog-api")]
#[command(about = "Minimal blog-post REST API: posts, drafts, publishing and a searchable feed")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to SQLite database (overrides config and BLOG_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and write a default config file
    Init,

    /// Start the HTTP server
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Add a user who can author posts
    AddUser {
        /// Unique email address
        email: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List all users
    Users,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("blog_api={},tower_http=debug", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    let _ = dotenvy::dotenv();

    // Load config
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    match cli.command {
        Commands::Init => {
            BlogDb::open(&config.database_path)?;
            println!("✓ Database ready at {}", config.database_path.display());

            if !config_path.exists() {
                config.save_to(&config_path)?;
                println!("✓ Config written to {}", config_path.display());
            }

            println!("\nNext steps:");
            println!("  1. Run `blog-api add-user <email>` to create an author");
            println!("  2. Run `blog-api serve` to start the API server");
        }

        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.http_port = port;
            }

            let db = BlogDb::open(&config.database_path)?;
            tracing::info!("Opened database at {}", config.database_path.display());

            let router = api::create_router(AppState::new(db));
            let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
            tracing::info!("Starting HTTP server on {}", config.bind_addr());

            println!("🚀 Server ready at: http://localhost:{}", config.http_port);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("Server shutdown complete");
        }

        Commands::AddUser { email, name } => {
            let db = BlogDb::open(&config.database_path)?;
            let user = db.create_user(&email, name.as_deref())?;
            println!("✓ Created user {} <{}>", user.id, user.email);
        }

        Commands::Users => {
            let db = BlogDb::open(&config.database_path)?;
            let users = db.list_users()?;

            if users.is_empty() {
                println!("No users found");
            } else {
                for user in users {
                    match user.name {
                        Some(name) => println!("• {} {} <{}>", user.id, name, user.email),
                        None => println!("• {} <{}>", user.id, user.email),
                    }
                }
            }
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
