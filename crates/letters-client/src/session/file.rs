//! JSON-file session store.
//!
//! The file is written with `0600` permissions on Unix. Token values are never
//! logged.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{Session, SessionStore};
use crate::error::ApiError;

/// Session store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cached: RwLock<Session>,
}

impl FileSessionStore {
    /// Open the store at `path`, loading any session already saved there.
    ///
    /// A missing file is an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let session = Self::load(&path)?;
        Ok(Self {
            path,
            cached: RwLock::new(session),
        })
    }

    fn load(path: &Path) -> Result<Session, ApiError> {
        if !path.exists() {
            return Ok(Session::empty());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ApiError::Storage(format!("failed to read {}: {}", path.display(), e))
        })?;

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => Ok(session.normalized()),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable session file"
                );
                Ok(Session::empty())
            }
        }
    }

    fn persist(&self, session: &Session) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ApiError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let contents = serde_json::to_string_pretty(session)
            .map_err(|e| ApiError::Storage(format!("failed to serialize session: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|e| {
                    ApiError::Storage(format!("failed to open {}: {}", self.path.display(), e))
                })?;
            // `mode` only applies on create; tighten a file that already existed.
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    ApiError::Storage(format!(
                        "failed to set permissions on {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
            file.write_all(contents.as_bytes()).map_err(|e| {
                ApiError::Storage(format!("failed to write {}: {}", self.path.display(), e))
            })?;
        }

        #[cfg(not(unix))]
        {
            let mut file = fs::File::create(&self.path).map_err(|e| {
                ApiError::Storage(format!("failed to open {}: {}", self.path.display(), e))
            })?;
            file.write_all(contents.as_bytes()).map_err(|e| {
                ApiError::Storage(format!("failed to write {}: {}", self.path.display(), e))
            })?;
        }

        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Session {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, session: Session) -> Result<(), ApiError> {
        let session = session.normalized();
        if !session.is_authenticated() {
            return self.clear().map(|_| ());
        }

        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&session)?;
        *cached = session;
        Ok(())
    }

    fn clear(&self) -> Result<bool, ApiError> {
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        let removed = std::mem::take(&mut *cached).is_authenticated();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(removed),
            Err(e) => Err(ApiError::Storage(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
