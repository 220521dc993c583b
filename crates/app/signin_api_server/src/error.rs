use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Startup failures. Each one aborts the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("Database::{}", .0)]
    Database(#[from] sqlx::Error),

    #[error("Migrate::{}", .0)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Secret::{}", .0)]
    Secret(#[from] signin_core::auth::secret::SecretError),

    #[error("Auth::{}", .0)]
    Auth(#[from] signin_core::auth::AuthError),
}
