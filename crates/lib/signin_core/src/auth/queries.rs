//! Auth-related database queries over PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::auth::{Account, NewAccount, ResetRecord, Role};

/// Row shape shared by the account lookups.
type AccountRow = (i64, String, String, String, String);

const ACCOUNT_COLUMNS: &str = "id, email, username, password_hash, role";

/// [`CredentialStore`] backed by a PostgreSQL pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: AccountRow) -> Result<Account, AuthError> {
    let (id, email, username, password_hash, role) = row;
    let role = role.parse::<Role>().map_err(AuthError::Internal)?;
    Ok(Account {
        id,
        email,
        username,
        password_hash,
        role,
    })
}

/// Map a unique-constraint violation to [`AuthError::Conflict`].
fn conflict_or_db(e: sqlx::Error) -> AuthError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            AuthError::Conflict("username or email already registered".into())
        }
        _ => AuthError::DbError(e),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn exists(&self, username: &str, email: &str) -> Result<bool, AuthError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_account(&self, account: NewAccount<'_>) -> Result<i64, AuthError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (email, username, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(account.email)
        .bind(account.username)
        .bind(account.password_hash)
        .bind(account.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_or_db)?;
        Ok(id)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Account, AuthError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users \
             WHERE username = $1 OR email = $1 \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await?;
        row.map(account_from_row)
            .transpose()?
            .ok_or_else(|| AuthError::NotFound("account".into()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Account, AuthError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(account_from_row)
            .transpose()?
            .ok_or_else(|| AuthError::NotFound("account".into()))
    }

    async fn find_email_by_username(&self, username: &str) -> Result<String, AuthError> {
        sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AuthError::NotFound("account".into()))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), AuthError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("account".into()));
        }
        Ok(())
    }

    async fn delete_by_username(&self, username: &str) -> Result<(), AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("account".into()));
        }
        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, AuthError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users ORDER BY id");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(account_from_row).collect()
    }

    async fn replace_reset(&self, record: &ResetRecord) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM password_resets WHERE email = $1")
            .bind(&record.email)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO password_resets (selector, email, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.selector)
        .bind(&record.email)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_reset(&self, selector: &str) -> Result<Option<ResetRecord>, AuthError> {
        let row = sqlx::query_as::<_, (String, String, String, i64)>(
            "SELECT selector, email, token_hash, expires_at \
             FROM password_resets WHERE selector = $1",
        )
        .bind(selector)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(selector, email, token_hash, expires_at)| ResetRecord {
            selector,
            email,
            token_hash,
            expires_at,
        }))
    }

    async fn claim_reset(&self, selector: &str) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM password_resets WHERE selector = $1")
            .bind(selector)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn consume_reset(&self, selector: &str, password_hash: &str) -> Result<bool, AuthError> {
        let mut tx = self.pool.begin().await?;
        let email = sqlx::query_scalar::<_, String>(
            "DELETE FROM password_resets WHERE selector = $1 RETURNING email",
        )
        .bind(selector)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(email) = email else {
            return Ok(false);
        };

        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(&email)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("account".into()));
        }
        sqlx::query("DELETE FROM password_resets WHERE email = $1")
            .bind(&email)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}
