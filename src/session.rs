//! Session Store - Persisted authentication state per backend
//!
//! Each login produces a named session for one backend type. Non-secret
//! metadata (URL, user, expiry) lives in a JSON file under the data directory;
//! the secret token is stored using:
//! 1. OS keyring (preferred) - macOS Keychain, Windows Credential Manager, Linux Secret Service
//! 2. AES-256-GCM encrypted file (fallback) - for headless systems without keyring support

use std::fmt;
use std::fs;
use std::path::PathBuf;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "astctl";
const ENCRYPTION_KEY_FILE: &str = "key.bin";

/// Backend type a session authenticates against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    /// On-premise SSC server
    Ssc,
    /// FoD cloud service
    Fod,
    /// SC-SAST scan controller
    ScSast,
}

impl SessionType {
    /// Directory name used for this session type
    pub fn dir_name(&self) -> &'static str {
        match self {
            SessionType::Ssc => "ssc",
            SessionType::Fod => "fod",
            SessionType::ScSast => "sc-sast",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Non-secret session metadata persisted as JSON
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub session_type: SessionType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl SessionInfo {
    /// Human-readable expiry state
    pub fn expiry_state(&self) -> ExpiryState {
        match self.expires {
            None => ExpiryState::Unknown,
            Some(at) if at <= Utc::now() => ExpiryState::Expired,
            Some(_) => ExpiryState::Active,
        }
    }
}

/// Whether a session token is still usable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryState {
    Active,
    Expired,
    Unknown,
}

impl fmt::Display for ExpiryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExpiryState::Active => "ACTIVE",
            ExpiryState::Expired => "EXPIRED",
            ExpiryState::Unknown => "UNKNOWN",
        };
        f.write_str(text)
    }
}

/// Encrypted token file format
#[derive(Serialize, Deserialize)]
struct EncryptedToken {
    /// Nonce used for encryption (12 bytes, base64 encoded)
    nonce: String,
    /// Encrypted data (base64 encoded)
    data: String,
}

/// Manages persisted sessions for all backend types
pub struct SessionStore {
    /// Root directory for session metadata and the encrypted file fallback
    data_dir: PathBuf,

    /// Whether OS keyring is available
    keyring_available: bool,
}

impl SessionStore {
    /// Create a new session store rooted in the user data directory
    pub fn new() -> Result<Self> {
        let data_dir = crate::config::data_dir()?.join("sessions");

        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create session directory: {:?}", data_dir))?;

        let keyring_available = Self::check_keyring_available();

        Ok(Self {
            data_dir,
            keyring_available,
        })
    }

    /// Construct a store over an explicit directory without keyring access.
    /// Used by tests to force the encrypted-file fallback.
    #[cfg(test)]
    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            keyring_available: false,
        }
    }

    /// Check if OS keyring is available
    fn check_keyring_available() -> bool {
        let entry = keyring::Entry::new(SERVICE_NAME, "test");
        match entry {
            Ok(e) => match e.get_password() {
                Ok(_) | Err(keyring::Error::NoEntry) => true,
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    /// Get the storage method being used for secrets
    pub fn storage_method(&self) -> &'static str {
        if self.keyring_available {
            "OS Keyring"
        } else {
            "Encrypted File"
        }
    }

    fn metadata_path(&self, session_type: SessionType, name: &str) -> PathBuf {
        self.data_dir
            .join(session_type.dir_name())
            .join(format!("{}.json", name))
    }

    fn keyring_user(session_type: SessionType, name: &str) -> String {
        format!("{}/{}", session_type.dir_name(), name)
    }

    fn token_file_path(&self, session_type: SessionType, name: &str) -> PathBuf {
        self.data_dir
            .join(session_type.dir_name())
            .join(format!("{}.token.enc", name))
    }

    /// Persist a session: metadata to JSON, token to keyring or encrypted file
    pub fn store(&self, info: &SessionInfo, token: &str) -> Result<()> {
        let path = self.metadata_path(info.session_type, &info.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(info).context("Failed to serialize session")?;
        write_restricted(&path, json.as_bytes())?;

        if self.keyring_available {
            self.store_in_keyring(info.session_type, &info.name, token)
        } else {
            self.store_in_file(info.session_type, &info.name, token)
        }
    }

    /// Look up session metadata; `Ok(None)` when no such session exists
    pub fn get(&self, session_type: SessionType, name: &str) -> Result<Option<SessionInfo>> {
        let path = self.metadata_path(session_type, name);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session from {:?}", path))?;
        let info: SessionInfo = match serde_json::from_str(&json) {
            Ok(info) => info,
            Err(_) => {
                tracing::warn!("Session file corrupted, removing: {:?}", path);
                let _ = fs::remove_file(&path);
                return Ok(None);
            }
        };
        Ok(Some(info))
    }

    /// Retrieve the secret token for a session
    pub fn token(&self, session_type: SessionType, name: &str) -> Result<Option<String>> {
        if self.keyring_available {
            self.get_from_keyring(session_type, name)
        } else {
            self.get_from_file(session_type, name)
        }
    }

    /// Delete a session and its stored token
    pub fn delete(&self, session_type: SessionType, name: &str) -> Result<()> {
        let path = self.metadata_path(session_type, name);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete session file: {:?}", path))?;
        }

        if self.keyring_available {
            self.delete_from_keyring(session_type, name)
        } else {
            self.delete_from_file(session_type, name)
        }
    }

    /// Whether a session with this name exists
    pub fn exists(&self, session_type: SessionType, name: &str) -> bool {
        self.metadata_path(session_type, name).exists()
    }

    /// List persisted sessions of one type, sorted by name
    pub fn list(&self, session_type: SessionType) -> Result<Vec<SessionInfo>> {
        let dir = self.data_dir.join(session_type.dir_name());
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in
            fs::read_dir(&dir).with_context(|| format!("Failed to list sessions in {:?}", dir))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(json) = fs::read_to_string(&path) {
                if let Ok(info) = serde_json::from_str::<SessionInfo>(&json) {
                    sessions.push(info);
                }
            }
        }

        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    // ========================
    // Keyring implementation
    // ========================

    fn store_in_keyring(&self, session_type: SessionType, name: &str, token: &str) -> Result<()> {
        let entry = keyring::Entry::new(SERVICE_NAME, &Self::keyring_user(session_type, name))
            .context("Failed to create keyring entry")?;

        entry
            .set_password(token)
            .context("Failed to store session token in keyring")?;

        Ok(())
    }

    fn get_from_keyring(&self, session_type: SessionType, name: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(SERVICE_NAME, &Self::keyring_user(session_type, name))
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to retrieve session token: {}", e)),
        }
    }

    fn delete_from_keyring(&self, session_type: SessionType, name: &str) -> Result<()> {
        let entry = keyring::Entry::new(SERVICE_NAME, &Self::keyring_user(session_type, name))
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(anyhow::anyhow!("Failed to delete session token: {}", e)),
        }
    }

    // ========================
    // Encrypted file implementation
    // ========================

    fn get_encryption_key(&self) -> Result<[u8; 32]> {
        let key_path = self.data_dir.join(ENCRYPTION_KEY_FILE);

        if key_path.exists() {
            let key_bytes = fs::read(&key_path)
                .with_context(|| format!("Failed to read encryption key from {:?}", key_path))?;

            if key_bytes.len() != 32 {
                tracing::warn!("Encryption key corrupted, regenerating...");
                return self.generate_encryption_key();
            }

            let mut key = [0u8; 32];
            key.copy_from_slice(&key_bytes);
            Ok(key)
        } else {
            self.generate_encryption_key()
        }
    }

    fn generate_encryption_key(&self) -> Result<[u8; 32]> {
        use aes_gcm::aead::rand_core::RngCore;

        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);

        let key_path = self.data_dir.join(ENCRYPTION_KEY_FILE);
        write_restricted(&key_path, &key)?;

        Ok(key)
    }

    fn store_in_file(&self, session_type: SessionType, name: &str, token: &str) -> Result<()> {
        let key = self.get_encryption_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key).context("Failed to create cipher")?;

        use aes_gcm::aead::rand_core::RngCore;
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, token.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let encrypted = EncryptedToken {
            nonce: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, nonce_bytes),
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &ciphertext),
        };

        let file_path = self.token_file_path(session_type, name);
        let json = serde_json::to_string_pretty(&encrypted)
            .context("Failed to serialize encrypted token")?;
        write_restricted(&file_path, json.as_bytes())?;

        Ok(())
    }

    fn get_from_file(&self, session_type: SessionType, name: &str) -> Result<Option<String>> {
        let file_path = self.token_file_path(session_type, name);

        if !file_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read token from {:?}", file_path))?;

        let encrypted: EncryptedToken = match serde_json::from_str(&json) {
            Ok(e) => e,
            Err(_) => {
                tracing::warn!("Token file corrupted, resetting...");
                self.delete_from_file(session_type, name)?;
                return Ok(None);
            }
        };

        let key = self.get_encryption_key()?;
        let cipher = Aes256Gcm::new_from_slice(&key).context("Failed to create cipher")?;

        let nonce_bytes =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &encrypted.nonce)
                .context("Failed to decode nonce")?;

        let ciphertext =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &encrypted.data)
                .context("Failed to decode ciphertext")?;

        if nonce_bytes.len() != 12 {
            tracing::warn!("Invalid nonce length, resetting token...");
            self.delete_from_file(session_type, name)?;
            return Ok(None);
        }

        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = cipher.decrypt(nonce, ciphertext.as_ref()).map_err(|_| {
            tracing::warn!("Failed to decrypt session token, resetting...");
            anyhow::anyhow!("Decryption failed")
        })?;

        let token = String::from_utf8(plaintext).context("Token is not valid UTF-8")?;
        Ok(Some(token))
    }

    fn delete_from_file(&self, session_type: SessionType, name: &str) -> Result<()> {
        let file_path = self.token_file_path(session_type, name);

        if file_path.exists() {
            fs::remove_file(&file_path)
                .with_context(|| format!("Failed to delete token file: {:?}", file_path))?;
        }

        Ok(())
    }
}

/// Write a file with 0600 permissions on Unix
fn write_restricted(path: &std::path::Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        file.write_all(contents)?;
    }

    #[cfg(not(unix))]
    fs::write(path, contents).with_context(|| format!("Failed to write file: {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_store() -> (SessionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    fn info(name: &str, session_type: SessionType, expires: Option<DateTime<Utc>>) -> SessionInfo {
        SessionInfo {
            name: name.to_string(),
            session_type,
            url: "https://ast.example.com".to_string(),
            user: Some("admin".to_string()),
            created: Utc::now(),
            expires,
        }
    }

    #[test]
    fn test_store_and_retrieve() {
        let (store, _temp) = test_store();

        store
            .store(&info("default", SessionType::Ssc, None), "token-12345")
            .unwrap();

        let loaded = store.get(SessionType::Ssc, "default").unwrap().unwrap();
        assert_eq!(loaded.url, "https://ast.example.com");
        assert_eq!(loaded.user.as_deref(), Some("admin"));

        let token = store.token(SessionType::Ssc, "default").unwrap();
        assert_eq!(token.as_deref(), Some("token-12345"));
    }

    #[test]
    fn test_sessions_are_scoped_by_type() {
        let (store, _temp) = test_store();

        store
            .store(&info("default", SessionType::Ssc, None), "ssc-token")
            .unwrap();

        assert!(store.get(SessionType::Fod, "default").unwrap().is_none());
        assert!(store.token(SessionType::Fod, "default").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let (store, _temp) = test_store();

        store
            .store(&info("default", SessionType::Fod, None), "tok")
            .unwrap();
        assert!(store.exists(SessionType::Fod, "default"));

        store.delete(SessionType::Fod, "default").unwrap();
        assert!(!store.exists(SessionType::Fod, "default"));
        assert!(store.token(SessionType::Fod, "default").unwrap().is_none());
    }

    #[test]
    fn test_list_sorted() {
        let (store, _temp) = test_store();

        store
            .store(&info("prod", SessionType::Ssc, None), "a")
            .unwrap();
        store
            .store(&info("dev", SessionType::Ssc, None), "b")
            .unwrap();

        let sessions = store.list(SessionType::Ssc).unwrap();
        let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "prod"]);
    }

    #[test]
    fn test_expiry_state() {
        let active = info("a", SessionType::Fod, Some(Utc::now() + Duration::hours(1)));
        let expired = info("b", SessionType::Fod, Some(Utc::now() - Duration::hours(1)));
        let unknown = info("c", SessionType::ScSast, None);

        assert_eq!(active.expiry_state(), ExpiryState::Active);
        assert_eq!(expired.expiry_state(), ExpiryState::Expired);
        assert_eq!(unknown.expiry_state(), ExpiryState::Unknown);
    }
}
