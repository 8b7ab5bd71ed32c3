use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use keyring::Entry;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Keychain service name used for both token slots
pub const SERVICE_NAME: &str = "smartmemory-admin";

/// Keychain account names for each slot
const ACCESS_SLOT: &str = "admin_access_token";
const REFRESH_SLOT: &str = "admin_refresh_token";

/// Credential file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Failed to access credential file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credential file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Access and refresh token, each independently present or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Durable storage for the token pair.
///
/// Every mutation is persisted before it returns and is visible to the next
/// `get()` in the same process.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<CredentialPair, CredentialError>;

    fn set_access(&self, token: Option<&str>) -> Result<(), CredentialError>;

    fn set_refresh(&self, token: Option<&str>) -> Result<(), CredentialError>;

    fn clear(&self) -> Result<(), CredentialError> {
        self.set_access(None)?;
        self.set_refresh(None)
    }
}

/// Token storage in the OS keychain, one entry per slot.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, slot: &str) -> Result<Entry, CredentialError> {
        Ok(Entry::new(&self.service, slot)?)
    }

    fn read(&self, slot: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(slot)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, slot: &str, token: Option<&str>) -> Result<(), CredentialError> {
        let entry = self.entry(slot)?;
        match token {
            Some(token) => entry.set_password(token)?,
            None => match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Result<CredentialPair, CredentialError> {
        Ok(CredentialPair {
            access_token: self.read(ACCESS_SLOT)?,
            refresh_token: self.read(REFRESH_SLOT)?,
        })
    }

    fn set_access(&self, token: Option<&str>) -> Result<(), CredentialError> {
        self.write(ACCESS_SLOT, token)
    }

    fn set_refresh(&self, token: Option<&str>) -> Result<(), CredentialError> {
        self.write(REFRESH_SLOT, token)
    }
}

/// Token storage in a JSON file, kept in memory and written through on
/// every change.
pub struct FileCredentialStore {
    path: PathBuf,
    current: RwLock<CredentialPair>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any previously saved tokens.
    ///
    /// An unreadable token file starts the store empty; the next write
    /// replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let current = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| CredentialError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt credential file, starting signed out");
                CredentialPair::default()
            })
        } else {
            CredentialPair::default()
        };
        debug!(path = %path.display(), has_access = current.access_token.is_some(), "Credential file opened");

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    /// `<data_dir>/smartmemory-admin/credentials.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(SERVICE_NAME).join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, pair: &CredentialPair) -> Result<(), CredentialError> {
        let io_err = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };

        if pair.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).map_err(io_err)?;
            }
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;
        let contents = serde_json::to_string_pretty(pair)?;

        // Temp files are created owner-only; the rename keeps the mode.
        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(contents.as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut CredentialPair)) -> Result<(), CredentialError> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = current.clone();
        change(&mut next);
        self.persist(&next)?;
        *current = next;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<CredentialPair, CredentialError> {
        Ok(self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn set_access(&self, token: Option<&str>) -> Result<(), CredentialError> {
        self.update(|pair| pair.access_token = token.map(str::to_owned))
    }

    fn set_refresh(&self, token: Option<&str>) -> Result<(), CredentialError> {
        self.update(|pair| pair.refresh_token = token.map(str::to_owned))
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.update(|pair| *pair = CredentialPair::default())
    }
}
