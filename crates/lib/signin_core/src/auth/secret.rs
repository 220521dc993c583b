//! Server-wide signing key: load from disk, or generate and persist.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;
use thiserror::Error;
use tracing::info;

/// Number of random bytes in a generated key (512 bits).
const KEY_BYTES: usize = 64;

/// Minimum accepted key length in bytes (256 bits).
pub const MIN_KEY_BYTES: usize = 32;

/// Signing-key errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read signing key {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to persist signing key {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("signing key must be at least {min} bytes, got {0}", min = MIN_KEY_BYTES)]
    TooShort(usize),
}

/// Immutable symmetric key used to sign and verify bearer tokens.
///
/// Cheap to clone. The key bytes never appear in `Debug` output.
#[derive(Clone)]
pub struct SigningKey(Arc<[u8]>);

impl SigningKey {
    /// Wrap raw key material, rejecting keys shorter than 256 bits.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, SecretError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_BYTES {
            return Err(SecretError::TooShort(bytes.len()));
        }
        Ok(Self(bytes.into()))
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; KEY_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes).into_bytes().into())
    }

    /// Load the key persisted at `path`, or generate one and persist it there.
    ///
    /// An existing file that is empty after trimming is treated as absent.
    pub fn load_or_create(path: &Path) -> Result<Self, SecretError> {
        match std::fs::read_to_string(path) {
            Ok(existing) => {
                let trimmed = existing.trim();
                if !trimmed.is_empty() {
                    info!(path = %path.display(), "loaded signing key");
                    return Self::from_bytes(trimmed.as_bytes());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SecretError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        let key = Self::generate();
        write_key_file(path, &key.0).map_err(|source| SecretError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "generated new signing key");
        Ok(key)
    }

    /// Resolve the key: env var `JWT_SECRET` if set and non-empty, otherwise
    /// the persisted file at `path`.
    pub fn resolve(path: &Path) -> Result<Self, SecretError> {
        if let Ok(secret) = std::env::var("JWT_SECRET")
            && !secret.is_empty()
        {
            info!("using signing key from JWT_SECRET");
            return Self::from_bytes(secret.into_bytes());
        }
        Self::load_or_create(path)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// Default path of the persisted key file.
pub fn default_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signin")
        .join("jwt-secret")
}

fn write_key_file(path: &Path, key: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, key)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_then_reloads_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("jwt-secret");

        let first = SigningKey::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert!(first.as_bytes().len() >= MIN_KEY_BYTES);

        let second = SigningKey::load_or_create(&path).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn empty_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwt-secret");
        std::fs::write(&path, "  \n").unwrap();

        let key = SigningKey::load_or_create(&path).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(key.as_bytes(), on_disk.as_slice());
    }

    #[test]
    fn unreadable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as a key.
        let err = SigningKey::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, SecretError::Read { .. }));
    }

    #[test]
    fn short_keys_are_rejected() {
        let err = SigningKey::from_bytes(b"short".to_vec()).unwrap_err();
        assert!(matches!(err, SecretError::TooShort(5)));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let key = SigningKey::from_bytes(vec![b'k'; 40]).unwrap();
        assert!(!format!("{key:?}").contains("kkkk"));
    }
}
