//! Where documents come from.
//!
//! Acquisition (search, download, disambiguation) happens outside this crate.
//! A [`DocumentSource`] only hands over documents that already exist;
//! [`JsonFileSource`] reads and writes the JSON article cache format: a
//! pretty-printed array of `{title, content, url, topic, summary?}` objects.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{Document, IngestError};

/// Supplies documents to the ingestion pipeline.
pub trait DocumentSource: Send + Sync {
    fn load(&self) -> Result<Vec<Document>, IngestError>;
}

impl DocumentSource for Vec<Document> {
    fn load(&self) -> Result<Vec<Document>, IngestError> {
        Ok(self.clone())
    }
}

/// JSON article cache on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `documents`, creating parent directories.
    pub fn save(&self, documents: &[Document]) -> Result<(), IngestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| IngestError::Source(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(documents)
            .map_err(|e| IngestError::Source(format!("encode: {e}")))?;
        fs::write(&self.path, json)
            .map_err(|e| IngestError::Source(format!("{}: {e}", self.path.display())))?;
        info!(path = %self.path.display(), documents = documents.len(), "documents_saved");
        Ok(())
    }
}

impl DocumentSource for JsonFileSource {
    /// A missing file is an empty cache, not an error.
    fn load(&self) -> Result<Vec<Document>, IngestError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(IngestError::Source(format!(
                    "{}: {e}",
                    self.path.display()
                )))
            }
        };
        let documents: Vec<Document> = serde_json::from_str(&raw)
            .map_err(|e| IngestError::Source(format!("{}: {e}", self.path.display())))?;
        info!(path = %self.path.display(), documents = documents.len(), "documents_loaded");
        Ok(documents)
    }
}
