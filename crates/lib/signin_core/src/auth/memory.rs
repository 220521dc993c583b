//! In-process credential store.
//!
//! Same semantics as the PostgreSQL store (unique username/email, reset
//! requests removed with their account) without a database. Backs
//! `--ephemeral` runs and the test suites.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::auth::{Account, NewAccount, ResetRecord, Role};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    accounts: Vec<Account>,
    resets: HashMap<String, ResetRecord>,
}

/// [`CredentialStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding reset requests.
    pub async fn reset_count(&self) -> usize {
        self.state.read().await.resets.len()
    }

    /// Overwrite the stored password value of `username` without hashing.
    ///
    /// Simulates accounts written before passwords were hashed.
    pub async fn set_raw_password(&self, username: &str, stored: &str) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.username == username)
            .ok_or_else(not_found)?;
        account.password_hash = stored.to_string();
        Ok(())
    }
}

fn not_found() -> AuthError {
    AuthError::NotFound("account".into())
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn exists(&self, username: &str, email: &str) -> Result<bool, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .any(|a| a.username == username || a.email == email))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().any(|a| a.email == email))
    }

    async fn create_account(&self, account: NewAccount<'_>) -> Result<i64, AuthError> {
        let mut state = self.state.write().await;
        if state
            .accounts
            .iter()
            .any(|a| a.username == account.username || a.email == account.email)
        {
            return Err(AuthError::Conflict(
                "username or email already registered".into(),
            ));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.accounts.push(Account {
            id,
            email: account.email.to_string(),
            username: account.username.to_string(),
            password_hash: account.password_hash.to_string(),
            role: account.role,
        });
        Ok(id)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Account, AuthError> {
        let state = self.state.read().await;
        state
            .accounts
            .iter()
            .find(|a| a.username == identifier)
            .or_else(|| state.accounts.iter().find(|a| a.email == identifier))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn find_by_username(&self, username: &str) -> Result<Account, AuthError> {
        let state = self.state.read().await;
        state
            .accounts
            .iter()
            .find(|a| a.username == username)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn find_email_by_username(&self, username: &str) -> Result<String, AuthError> {
        self.find_by_username(username).await.map(|a| a.email)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.email == email)
            .ok_or_else(not_found)?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_by_username(&self, username: &str) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        let idx = state
            .accounts
            .iter()
            .position(|a| a.username == username)
            .ok_or_else(not_found)?;
        let removed = state.accounts.remove(idx);
        state.resets.retain(|_, r| r.email != removed.email);
        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, AuthError> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().any(|a| a.role == Role::Admin))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AuthError> {
        let state = self.state.read().await;
        Ok(state.accounts.clone())
    }

    async fn replace_reset(&self, record: &ResetRecord) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if !state.accounts.iter().any(|a| a.email == record.email) {
            return Err(not_found());
        }
        state.resets.retain(|_, r| r.email != record.email);
        state.resets.insert(record.selector.clone(), record.clone());
        Ok(())
    }

    async fn find_reset(&self, selector: &str) -> Result<Option<ResetRecord>, AuthError> {
        let state = self.state.read().await;
        Ok(state.resets.get(selector).cloned())
    }

    async fn claim_reset(&self, selector: &str) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        Ok(state.resets.remove(selector).is_some())
    }

    async fn consume_reset(&self, selector: &str, password_hash: &str) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        let Some(email) = state.resets.get(selector).map(|r| r.email.clone()) else {
            return Ok(false);
        };
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.email == email)
            .ok_or_else(not_found)?;
        account.password_hash = password_hash.to_string();
        state.resets.retain(|_, r| r.email != email);
        Ok(true)
    }
}
