//! Credential store contract.
//!
//! Implemented by [`PgStore`](super::queries::PgStore) for PostgreSQL and by
//! [`MemoryStore`](super::memory::MemoryStore) for ephemeral runs and tests.
//! Each method is a single atomic operation on the underlying store.

use async_trait::async_trait;

use super::AuthError;
use crate::models::auth::{Account, NewAccount, ResetRecord};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether an account holds either `username` or `email`.
    async fn exists(&self, username: &str, email: &str) -> Result<bool, AuthError>;

    /// Whether an account is registered under `email`.
    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Insert an account, returning its id.
    ///
    /// Fails with [`AuthError::Conflict`] if the username or email is taken.
    async fn create_account(&self, account: NewAccount<'_>) -> Result<i64, AuthError>;

    /// Find an account by username or email, preferring a username match.
    ///
    /// Fails with [`AuthError::NotFound`] if neither matches.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Account, AuthError>;

    /// Find an account by username. Fails with [`AuthError::NotFound`].
    async fn find_by_username(&self, username: &str) -> Result<Account, AuthError>;

    /// Fetch the email of `username`. Fails with [`AuthError::NotFound`].
    async fn find_email_by_username(&self, username: &str) -> Result<String, AuthError>;

    /// Replace the password hash of the account registered under `email`.
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), AuthError>;

    /// Delete the account `username`. Fails with [`AuthError::NotFound`] if
    /// nothing was deleted. Outstanding reset requests go with it.
    async fn delete_by_username(&self, username: &str) -> Result<(), AuthError>;

    /// Whether any admin account exists.
    async fn admin_exists(&self) -> Result<bool, AuthError>;

    /// All accounts, ordered by id.
    async fn list_accounts(&self) -> Result<Vec<Account>, AuthError>;

    /// Delete every reset request for `record.email`, then insert `record`.
    async fn replace_reset(&self, record: &ResetRecord) -> Result<(), AuthError>;

    /// Look up a reset request by its selector.
    async fn find_reset(&self, selector: &str) -> Result<Option<ResetRecord>, AuthError>;

    /// Delete the reset request `selector`. Returns `true` only for the
    /// caller whose delete removed the row.
    async fn claim_reset(&self, selector: &str) -> Result<bool, AuthError>;

    /// Claim the reset request `selector` and set `password_hash` on its
    /// account in one atomic step, dropping every other request for that
    /// account. Returns `false` if the request was already gone. On error
    /// nothing changes and the request stays usable.
    async fn consume_reset(&self, selector: &str, password_hash: &str) -> Result<bool, AuthError>;
}
