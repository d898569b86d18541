//! Session state for Gator.
//!
//! The session file (`~/.gatorconfig.json` by default) holds the database
//! URL and the name of the logged-in user. It is read at start-up and
//! rewritten whenever the user changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{GatorError, Result};

/// Default session file name, relative to the home directory.
pub const SESSION_FILE_NAME: &str = ".gatorconfig.json";

/// Environment variable overriding the session file path.
pub const SESSION_PATH_ENV: &str = "GATOR_CONFIG";

/// Environment variable overriding the database URL.
pub const DB_URL_ENV: &str = "GATOR_DB_URL";

/// Database URL used when the session file does not name one.
pub const DEFAULT_DB_URL: &str = "sqlite://gator.db";

/// On-disk session contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    /// Database connection string.
    #[serde(default = "default_db_url", alias = "DB_URL")]
    pub db_url: String,
    /// Name of the logged-in user, if any.
    #[serde(default, alias = "Current_User_Name")]
    pub current_user_name: Option<String>,
}

fn default_db_url() -> String {
    DEFAULT_DB_URL.to_string()
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            db_url: default_db_url(),
            current_user_name: None,
        }
    }
}

/// Who is using the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nobody has logged in.
    Anonymous,
    /// The named user is logged in.
    Authenticated(String),
}

/// Loaded session, optionally backed by a file.
#[derive(Debug, Clone)]
pub struct Session {
    path: Option<PathBuf>,
    file: SessionFile,
    db_url_override: Option<String>,
}

impl Session {
    /// Resolve the session file path: `$GATOR_CONFIG`, else
    /// `~/.gatorconfig.json`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(SESSION_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| GatorError::Config("cannot determine home directory".to_string()))?;
        Ok(home.join(SESSION_FILE_NAME))
    }

    /// Load the session from the default path, honouring `$GATOR_DB_URL`.
    pub fn load() -> Result<Self> {
        let mut session = Self::load_from(Self::default_path()?)?;
        if let Ok(url) = std::env::var(DB_URL_ENV) {
            if !url.is_empty() {
                debug!("Database URL overridden by {}", DB_URL_ENV);
                session.db_url_override = Some(url);
            }
        }
        Ok(session)
    }

    /// Load the session from `path`. A missing file yields an anonymous
    /// session with default settings; the file is created on first save.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}, starting anonymous", path.display());
                SessionFile::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            file,
            db_url_override: None,
        })
    }

    /// A session that is never written to disk.
    pub fn in_memory(db_url: impl Into<String>) -> Self {
        Self {
            path: None,
            file: SessionFile {
                db_url: db_url.into(),
                current_user_name: None,
            },
            db_url_override: None,
        }
    }

    /// The database connection string.
    pub fn db_url(&self) -> &str {
        self.db_url_override
            .as_deref()
            .unwrap_or(&self.file.db_url)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        match self.current_user() {
            Some(name) => SessionState::Authenticated(name.to_string()),
            None => SessionState::Anonymous,
        }
    }

    /// Name of the logged-in user. An empty name counts as nobody.
    pub fn current_user(&self) -> Option<&str> {
        self.file
            .current_user_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// Log `name` in and persist the change.
    pub fn set_user(&mut self, name: impl Into<String>) -> Result<()> {
        self.file.current_user_name = Some(name.into());
        self.save()
    }

    /// Write the session file, if this session has one.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.file)?;
        fs::write(path, content)?;

        info!("Session saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_anonymous() {
        let dir = tempdir().unwrap();
        let session = Session::load_from(dir.path().join("session.json")).unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(session.db_url(), DEFAULT_DB_URL);
    }

    #[test]
    fn test_set_user_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut session = Session::load_from(&path).unwrap();
        session.set_user("alice").unwrap();
        assert_eq!(session.state(), SessionState::Authenticated("alice".into()));

        let reloaded = Session::load_from(&path).unwrap();
        assert_eq!(reloaded.current_user(), Some("alice"));
    }

    #[test]
    fn test_reads_legacy_field_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{"DB_URL": "sqlite://legacy.db", "Current_User_Name": "bob"}"#,
        )
        .unwrap();

        let session = Session::load_from(&path).unwrap();
        assert_eq!(session.db_url(), "sqlite://legacy.db");
        assert_eq!(session.current_user(), Some("bob"));
    }

    #[test]
    fn test_empty_user_is_anonymous() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"db_url": "sqlite::memory:", "current_user_name": ""}"#).unwrap();

        let session = Session::load_from(&path).unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_malformed_file_is_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let err = Session::load_from(&path).unwrap_err();
        assert!(matches!(err, GatorError::Json(_)));
    }

    #[test]
    fn test_in_memory_never_writes() {
        let mut session = Session::in_memory("sqlite::memory:");
        session.set_user("carol").unwrap();
        assert_eq!(session.current_user(), Some("carol"));
        assert_eq!(session.db_url(), "sqlite::memory:");
    }
}
