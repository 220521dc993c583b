//! Startup guarantee that an admin account exists.

use tracing::info;

use super::AuthError;
use super::password::hash_password_blocking;
use super::store::CredentialStore;
use crate::models::auth::{NewAccount, Role};

/// Admin account created on first start.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    /// Supplied out-of-band (e.g. `ADMIN_PASSWORD`). Only needed when no admin exists.
    pub password: Option<String>,
}

/// Create the seed admin unless an admin account already exists.
///
/// Returns `true` when an account was created.
pub async fn ensure_admin(store: &dyn CredentialStore, seed: &AdminSeed) -> Result<bool, AuthError> {
    if store.admin_exists().await? {
        return Ok(false);
    }

    let password = seed
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AuthError::ValidationError("ADMIN_PASSWORD must be set to create the admin account".into())
        })?;

    let hash = hash_password_blocking(password.to_string()).await?;
    store
        .create_account(NewAccount {
            email: &seed.email,
            username: &seed.username,
            password_hash: &hash,
            role: Role::Admin,
        })
        .await?;

    info!(username = %seed.username, "default admin account created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryStore;

    fn seed(password: Option<&str>) -> AdminSeed {
        AdminSeed {
            username: "root".into(),
            email: "root@localhost".into(),
            password: password.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let store = MemoryStore::new();
        assert!(ensure_admin(&store, &seed(Some("pw"))).await.unwrap());
        assert!(!ensure_admin(&store, &seed(Some("pw"))).await.unwrap());

        let admin = store.find_by_username("root").await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_ne!(admin.password_hash, "pw");
    }

    #[tokio::test]
    async fn missing_password_is_an_error_only_without_admin() {
        let store = MemoryStore::new();
        assert!(matches!(
            ensure_admin(&store, &seed(None)).await,
            Err(AuthError::ValidationError(_))
        ));

        ensure_admin(&store, &seed(Some("pw"))).await.unwrap();
        assert!(!ensure_admin(&store, &seed(None)).await.unwrap());
    }
}
