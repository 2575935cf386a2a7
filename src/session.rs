//! Client-side session persistence.
//!
//! The session lives in a flat key/value [`Storage`]. Keys default to
//! the names the public web pages have always used, so a store written
//! by one consumer can be read by another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::ClientConfig;
use crate::error::Error;

/// Lifetime assumed when the login response omits `expiresIn`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 86_400;

/// Token type assumed when the login response omits `tokenType`.
pub const DEFAULT_TOKEN_TYPE: &str = "bearer";

/// Flat string key/value persistence.
///
/// Implementations must be usable from any thread. Each call is
/// independent; [`SessionStore`] orders its writes so that a reader never
/// sees a half-written session.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }
}

/// Process-local storage. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, Error> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object on disk.
///
/// Every write replaces the file through a sibling temp file and a
/// rename, so the file on disk is always a complete JSON document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, Error> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(Error::Storage(format!("{}: {e}", self.path.display()))),
        }
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)
            .and_then(|()| std::fs::rename(&tmp, &self.path))
            .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display())))
    }

    fn update(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> Result<(), Error> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("file storage lock poisoned".into()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Storage key names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub access_token: String,
    pub refresh_token: String,
    pub user: String,
    pub token_type: String,
    pub expires_at: String,
    pub pending_email: String,
    /// Older key some pages used for the cached user. Only ever removed.
    pub legacy_user: Option<String>,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            access_token: "daana_access_token".into(),
            refresh_token: "daana_refresh_token".into(),
            user: "daana_user".into(),
            token_type: "daana_token_type".into(),
            expires_at: "daana_expires_in".into(),
            pending_email: "pendingVerificationEmail".into(),
            legacy_user: Some("daana_user_data".into()),
        }
    }
}

/// Profile fields cached from the login response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Cached authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Absolute expiry, seconds since the Unix epoch.
    pub expires_at: Option<i64>,
    pub user: Option<UserProfile>,
}

impl Session {
    /// Builds a session from token fields received at `now`.
    #[must_use]
    pub fn issued(
        access_token: String,
        refresh_token: Option<String>,
        token_type: Option<String>,
        expires_in: Option<i64>,
        user: UserProfile,
        now: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: token_type.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expires_at: Some(now.saturating_add(expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))),
            user: Some(user),
        }
    }

    /// Valid iff a token is present and `now` is strictly before expiry.
    #[must_use]
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.access_token.is_empty() && self.expires_at.is_some_and(|exp| now < exp)
    }
}

/// Current time in whole seconds since the Unix epoch.
#[must_use]
pub fn now_epoch_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Session persistence over a [`Storage`].
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    storage: S,
    keys: StorageKeys,
}

impl<S: Storage> SessionStore<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self::with_keys(storage, StorageKeys::default())
    }

    #[must_use]
    pub fn with_keys(storage: S, keys: StorageKeys) -> Self {
        Self { storage, keys }
    }

    /// Store using the key names configured on `config`.
    #[must_use]
    pub fn from_config(storage: S, config: &ClientConfig) -> Self {
        Self::with_keys(storage, config.storage_keys().clone())
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Persists every session field.
    ///
    /// The user record is the commit marker: it is removed first and
    /// written last, and [`load`](Self::load) ignores a session without it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing storage fails.
    pub fn save(&self, session: &Session) -> Result<(), Error> {
        let user = serde_json::to_string(&session.user.clone().unwrap_or_default())
            .map_err(|e| Error::Storage(e.to_string()))?;

        self.storage.remove(&self.keys.user)?;
        self.storage
            .set(&self.keys.access_token, &session.access_token)?;
        match &session.refresh_token {
            Some(token) => self.storage.set(&self.keys.refresh_token, token)?,
            None => self.storage.remove(&self.keys.refresh_token)?,
        }
        self.storage.set(&self.keys.token_type, &session.token_type)?;
        match session.expires_at {
            Some(exp) => self.storage.set(&self.keys.expires_at, &exp.to_string())?,
            None => self.storage.remove(&self.keys.expires_at)?,
        }
        self.storage.set(&self.keys.user, &user)
    }

    /// Reads the stored session.
    ///
    /// Returns `None` when the access token or user record is missing. A
    /// user record that fails to parse clears the whole store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing storage fails.
    pub fn load(&self) -> Result<Option<Session>, Error> {
        let Some(access_token) = self.storage.get(&self.keys.access_token)? else {
            return Ok(None);
        };
        let Some(user_json) = self.storage.get(&self.keys.user)? else {
            return Ok(None);
        };
        let user: UserProfile = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Stored user record is corrupt, clearing session");
                self.clear()?;
                return Ok(None);
            }
        };

        let expires_at = self
            .storage
            .get(&self.keys.expires_at)?
            .and_then(|s| s.trim().parse::<i64>().ok());

        Ok(Some(Session {
            access_token,
            refresh_token: self.storage.get(&self.keys.refresh_token)?,
            token_type: self
                .storage
                .get(&self.keys.token_type)?
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expires_at,
            user: Some(user),
        }))
    }

    /// Whether a valid session is stored right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_epoch_seconds())
    }

    /// Whether a valid session is stored at `now` (epoch seconds).
    ///
    /// Storage failures count as "no session".
    #[must_use]
    pub fn is_valid_at(&self, now: i64) -> bool {
        match self.load() {
            Ok(Some(session)) => session.is_valid_at(now),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Session storage unreadable");
                false
            }
        }
    }

    /// Removes every session key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing storage fails.
    pub fn clear(&self) -> Result<(), Error> {
        self.storage.remove(&self.keys.user)?;
        if let Some(legacy) = &self.keys.legacy_user {
            self.storage.remove(legacy)?;
        }
        self.storage.remove(&self.keys.access_token)?;
        self.storage.remove(&self.keys.refresh_token)?;
        self.storage.remove(&self.keys.token_type)?;
        self.storage.remove(&self.keys.expires_at)
    }

    /// Remembers the email awaiting OTP verification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing storage fails.
    pub fn set_pending_email(&self, email: &str) -> Result<(), Error> {
        self.storage.set(&self.keys.pending_email, email)
    }

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing storage fails.
    pub fn pending_email(&self) -> Result<Option<String>, Error> {
        self.storage.get(&self.keys.pending_email)
    }

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing storage fails.
    pub fn clear_pending_email(&self) -> Result<(), Error> {
        self.storage.remove(&self.keys.pending_email)
    }
}
