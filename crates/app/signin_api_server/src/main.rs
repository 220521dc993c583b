//! Signin API server binary.
//!
//! Loads the signing key, prepares the credential store (PostgreSQL, or
//! in-memory with `--ephemeral`), guarantees an admin account and serves the
//! HTTP API.

mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use signin_api::config::ApiConfig;
use signin_core::auth::bootstrap::{AdminSeed, ensure_admin};
use signin_core::auth::jwt::TokenService;
use signin_core::auth::memory::MemoryStore;
use signin_core::auth::queries::PgStore;
use signin_core::auth::secret::{SigningKey, default_secret_path};
use signin_core::auth::store::CredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::error::Result;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "signin_api_server", about = "Signin API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind_host: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/signin"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all accounts in memory instead of PostgreSQL. Nothing survives a restart.
    #[arg(long, default_value_t = false)]
    ephemeral: bool,

    /// File holding the token signing key; created on first start.
    /// `JWT_SECRET` takes precedence when set.
    #[arg(long, env = "SIGNIN_SECRET_FILE")]
    secret_file: Option<PathBuf>,

    /// Username of the admin account created when none exists.
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    admin_username: String,

    /// Email of the admin account created when none exists.
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@localhost")]
    admin_email: String,

    /// Password of the admin account created when none exists.
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Return the plaintext reset token from `/forgot-password`. Development only.
    #[arg(long, env = "SIGNIN_EXPOSE_RESET_TOKEN", default_value_t = false)]
    expose_reset_token: bool,

    /// Accept passwords stored before hashing and re-hash them on login.
    #[arg(long, default_value_t = false)]
    upgrade_legacy_passwords: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,signin_api=debug,signin_core=debug,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let secret_path = args.secret_file.clone().unwrap_or_else(default_secret_path);
    let tokens = TokenService::new(SigningKey::resolve(&secret_path)?);

    let store: Arc<dyn CredentialStore> = if args.ephemeral {
        warn!("ephemeral mode: accounts are kept in memory only");
        Arc::new(MemoryStore::new())
    } else {
        info!(max_connections = args.max_connections, "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&args.database_url)
            .await?;

        info!("running database migrations");
        signin_api::migrate(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    ensure_admin(
        store.as_ref(),
        &AdminSeed {
            username: args.admin_username,
            email: args.admin_email,
            password: args.admin_password,
        },
    )
    .await?;

    if args.expose_reset_token {
        warn!("reset tokens are returned in API responses; do not use in production");
    }

    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.bind_host, args.port),
        expose_reset_token: args.expose_reset_token,
        upgrade_legacy_passwords: args.upgrade_legacy_passwords,
    };

    let state = signin_api::AppState {
        store,
        tokens,
        config: config.clone(),
    };

    let app = signin_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
