use std::fs;
use std::io;
use std::path::PathBuf;

use campus_logging::{campus_info, campus_warn};
use serde::{Deserialize, Serialize};

use crate::client::Session;
use crate::persist::{AtomicFileWriter, PersistError};

pub const SESSION_FILENAME: &str = ".campus_session.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSession {
    token: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Keeps the bearer token between command invocations.
pub struct SessionStore {
    writer: AtomicFileWriter,
}

impl SessionStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(state_dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(SESSION_FILENAME)
    }

    /// Missing or unreadable state yields an anonymous session.
    pub fn load(&self) -> Session {
        match self.read() {
            Ok(Some(persisted)) => persisted
                .token
                .map(Session::with_token)
                .unwrap_or_default(),
            Ok(None) => Session::anonymous(),
            Err(err) => {
                campus_warn!("Ignoring session state at {:?}: {}", self.path(), err);
                Session::anonymous()
            }
        }
    }

    /// Username recorded at login, if any.
    pub fn username(&self) -> Option<String> {
        self.read().ok().flatten().and_then(|persisted| persisted.username)
    }

    pub fn save(
        &self,
        access: &str,
        refresh: Option<&str>,
        username: Option<&str>,
    ) -> Result<PathBuf, PersistError> {
        let state = PersistedSession {
            token: Some(access.to_string()),
            refresh: refresh.map(ToOwned::to_owned),
            username: username.map(ToOwned::to_owned),
        };
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&state, pretty)
            .map_err(|err| PersistError::Encode(err.to_string()))?;
        let path = self.writer.write(SESSION_FILENAME, content.as_bytes())?;
        campus_info!("Saved session to {:?}", path);
        Ok(path)
    }

    pub fn clear(&self) -> Result<(), PersistError> {
        self.writer.remove(SESSION_FILENAME)
    }

    fn read(&self) -> Result<Option<PersistedSession>, PersistError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PersistError::Io(err)),
        };
        ron::from_str(&content)
            .map(Some)
            .map_err(|err| PersistError::Decode(err.to_string()))
    }
}

