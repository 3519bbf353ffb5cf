/*
[INPUT]:  Registrations, credentials, wallet links, optional JSON file path
[OUTPUT]: Persisted user records with argon2 password hashes
[POS]:    State layer - user datastore
[UPDATE]: When the user record or wallet binding rules change
*/

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use littlefish_adapter::{RegisterRequest, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::SeedUser;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Wallet is already linked to another account")]
    WalletInUse,

    #[error("User {0} not found")]
    NotFound(u64),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage format error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// User record as persisted; the password hash never leaves this module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: u64,
    username: String,
    password_hash: String,
    name: String,
    email: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    wallet_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredUser {
    fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            wallet_address: self.wallet_address.clone(),
            created_at: self.created_at,
        }
    }
}

fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// User datastore, optionally backed by a JSON file
#[derive(Debug)]
pub struct UserStore {
    path: Option<PathBuf>,
    users: Mutex<HashMap<u64, StoredUser>>,
}

impl UserStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Open the store at `path`, creating parent directories as needed
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let users = Self::load_users(&path).await?;
        info!(path = %path.display(), count = users.len(), "User store loaded");
        Ok(Self {
            path: Some(path),
            users: Mutex::new(users),
        })
    }

    async fn load_users(path: &Path) -> StoreResult<HashMap<u64, StoredUser>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(path).await?;
        let users: Vec<StoredUser> = serde_json::from_str(&content)?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Create each seed user whose username is still free
    pub async fn seed(&self, seeds: &[SeedUser]) -> StoreResult<usize> {
        let mut created = 0;
        for seed in seeds {
            if self.find_by_username(&seed.username).await.is_some() {
                continue;
            }
            self.create(&RegisterRequest {
                username: seed.username.clone(),
                password: seed.password.clone(),
                name: seed.name.clone(),
                email: seed.email.clone(),
                avatar: seed.avatar.clone(),
            })
            .await?;
            created += 1;
        }
        Ok(created)
    }

    pub async fn create(&self, request: &RegisterRequest) -> StoreResult<User> {
        let password_hash = hash_password(&request.password)?;
        let username = request.username.trim().to_string();

        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&username))
        {
            return Err(StoreError::UsernameTaken(username));
        }

        let id = users.keys().max().map_or(1, |max| max + 1);
        let now = Utc::now();
        let stored = StoredUser {
            id,
            username,
            password_hash,
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            avatar: request.avatar.clone(),
            wallet_address: None,
            created_at: now,
            updated_at: now,
        };
        let user = stored.to_user();
        self.commit(&mut users, stored).await?;
        Ok(user)
    }

    /// Check credentials; `None` for unknown users and wrong passwords alike
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        let stored = {
            let users = self.users.lock().await;
            users
                .values()
                .find(|u| u.username.eq_ignore_ascii_case(username.trim()))
                .cloned()?
        };
        verify_password(password, &stored.password_hash).then(|| stored.to_user())
    }

    pub async fn get(&self, id: u64) -> Option<User> {
        self.users.lock().await.get(&id).map(StoredUser::to_user)
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        let users = self.users.lock().await;
        users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username.trim()))
            .map(StoredUser::to_user)
    }

    pub async fn find_by_wallet(&self, address: &str) -> Option<User> {
        let users = self.users.lock().await;
        users
            .values()
            .find(|u| u.wallet_address.as_deref() == Some(address))
            .map(StoredUser::to_user)
    }

    /// Bind `address` to user `id`, refusing addresses held by anyone else
    pub async fn set_wallet_address(&self, id: u64, address: Option<&str>) -> StoreResult<User> {
        let mut users = self.users.lock().await;
        if let Some(address) = address {
            if users
                .values()
                .any(|u| u.id != id && u.wallet_address.as_deref() == Some(address))
            {
                return Err(StoreError::WalletInUse);
            }
        }

        let mut updated = users.get(&id).cloned().ok_or(StoreError::NotFound(id))?;
        updated.wallet_address = address.map(str::to_string);
        updated.updated_at = Utc::now();
        let user = updated.to_user();
        self.commit(&mut users, updated).await?;
        Ok(user)
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Persist the table with `record` in place, then apply it in memory.
    ///
    /// A failed write leaves `users` exactly as it was.
    async fn commit(
        &self,
        users: &mut HashMap<u64, StoredUser>,
        record: StoredUser,
    ) -> StoreResult<()> {
        if self.path.is_some() {
            let mut snapshot: Vec<_> = users
                .values()
                .filter(|u| u.id != record.id)
                .chain(std::iter::once(&record))
                .cloned()
                .collect();
            snapshot.sort_by_key(|u| u.id);
            self.save_users(&snapshot).await?;
        }
        users.insert(record.id, record);
        Ok(())
    }

    async fn save_users(&self, users: &[StoredUser]) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(users)?;

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, path).await?;
        Ok(())
    }
}
