//! One JSON document per username on local disk.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use persona_core::{normalize_username, ChartAggregate, PersonaRecord, ProviderAttempt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheEntry;

const FILE_SUFFIX: &str = "_persona.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize persona for {username}: {source}")]
    Serialize {
        username: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse persona document at {path}: {source}")]
    Deserialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// The persisted form of a synthesized persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPersona {
    pub persona: PersonaRecord,
    #[serde(default)]
    pub chart_data: Vec<ChartAggregate>,
    #[serde(default)]
    pub attempts: Vec<ProviderAttempt>,
    pub saved_at: DateTime<Utc>,
}

impl From<&CacheEntry> for StoredPersona {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            persona: entry.record.clone(),
            chart_data: entry.charts.clone(),
            attempts: entry.attempts.clone(),
            saved_at: Utc::now(),
        }
    }
}

/// Writes and reads `{username}_persona.json` files under one directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, username: &str) -> PathBuf {
        self.dir
            .join(format!("{}{FILE_SUFFIX}", normalize_username(username)))
    }

    /// Persists `entry`, replacing any previous document for the same user.
    ///
    /// The document is written to a temporary file in the same directory and
    /// renamed into place, so readers never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or file cannot be written,
    /// or [`StoreError::Serialize`] if the entry cannot be encoded.
    pub async fn write(&self, entry: &CacheEntry) -> Result<PathBuf, StoreError> {
        let stored = StoredPersona::from(entry);
        let body = serde_json::to_vec_pretty(&stored).map_err(|e| StoreError::Serialize {
            username: entry.key.clone(),
            source: e,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path_for(&entry.key);
        let tmp = self.dir.join(format!(
            ".{}{FILE_SUFFIX}.tmp-{}",
            normalize_username(&entry.key),
            uuid::Uuid::new_v4()
        ));

        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            return Err(StoreError::io(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
            }
            return Err(StoreError::io(&path, e));
        }

        tracing::debug!(path = %path.display(), "persisted persona");
        Ok(path)
    }

    /// Loads the stored document for `username`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] for read failures other than a missing file,
    /// or [`StoreError::Deserialize`] if the document is malformed.
    pub async fn read(&self, username: &str) -> Result<Option<StoredPersona>, StoreError> {
        let path = self.path_for(username);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| StoreError::Deserialize {
                path: path.display().to_string(),
                source: e,
            })
    }
}
