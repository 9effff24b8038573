use super::jar::Jar;
use super::{CookieOptions, CredentialStore};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Credential store persisted as JSON on disk
///
/// Entries written with a `max_age` are flushed to the file after every
/// mutation and reloaded by the next [`FileStore::open`] until they expire.
/// Entries without a `max_age` never reach the file.
#[derive(Debug)]
pub struct FileStore {
    file: PathBuf,
    current_path: String,
    jar: Mutex<Jar>,
}

impl FileStore {
    /// Open the store at `file`, creating it lazily on first write
    ///
    /// An unreadable or corrupt file is discarded, leaving the store signed out.
    pub fn open(file: impl Into<PathBuf>) -> CoreResult<Self> {
        let file = file.into();
        let mut jar = match std::fs::read(&file) {
            Ok(bytes) => serde_json::from_slice::<Jar>(&bytes).unwrap_or_else(|e| {
                warn!(path = %file.display(), "Discarding corrupt credential file: {e}");
                Jar::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Jar::default(),
            Err(e) => return Err(e.into()),
        };
        jar.purge_expired(Utc::now());
        debug!(path = %file.display(), "Opened credential store");

        Ok(Self {
            file,
            current_path: "/".to_string(),
            jar: Mutex::new(jar),
        })
    }

    /// Read entries as seen from `current_path`
    pub fn with_current_path(mut self, current_path: impl Into<String>) -> Self {
        self.current_path = current_path.into();
        self
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.file
    }

    fn jar(&self) -> CoreResult<std::sync::MutexGuard<'_, Jar>> {
        self.jar
            .lock()
            .map_err(|_| CoreError::store_unavailable("file store lock poisoned"))
    }

    fn flush(&self, jar: &Jar) -> CoreResult<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(&jar.persistent())?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.file.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.file)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.jar()?.get(key, &self.current_path, Utc::now()))
    }

    fn set(&self, key: &str, value: &str, options: CookieOptions) -> CoreResult<()> {
        let persistent = options.max_age.is_some();
        let mut jar = self.jar()?;
        jar.set(key, value, options, Utc::now())?;
        if persistent {
            self.flush(&jar)?;
        }
        Ok(())
    }

    fn clear(&self, key: &str) -> CoreResult<()> {
        let mut jar = self.jar()?;
        if jar.clear(key) {
            self.flush(&jar)?;
        }
        Ok(())
    }
}
