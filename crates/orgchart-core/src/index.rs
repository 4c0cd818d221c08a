//! Multi-diagram index: an ordered list of `{ id, name, file }` entries.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramEntry {
    pub id: String,
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramIndex {
    entries: Vec<DiagramEntry>,
}

impl DiagramIndex {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: Vec<DiagramEntry> = serde_json::from_str(text).map_err(|e| Error::InvalidIndex {
            message: e.to_string(),
        })?;
        Ok(Self::from_entries(raw))
    }

    /// Keeps the first entry for each id; later duplicates are dropped with a warning.
    pub fn from_entries(raw: impl IntoIterator<Item = DiagramEntry>) -> Self {
        let mut entries: Vec<DiagramEntry> = Vec::new();
        for entry in raw {
            if entries.iter().any(|e| e.id == entry.id) {
                tracing::warn!(id = %entry.id, "duplicate diagram id in index; keeping the first");
                continue;
            }
            entries.push(entry);
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[DiagramEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&DiagramEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// The diagram shown when nothing has been selected yet.
    pub fn first(&self) -> Option<&DiagramEntry> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolves every entry's `file` against `base` (the location of the index itself).
    pub fn resolve(&self, base: &Url) -> Result<Vec<ResolvedDiagram>> {
        self.entries
            .iter()
            .map(|e| {
                let location = base.join(&e.file).map_err(|err| Error::InvalidIndex {
                    message: format!("{}: cannot resolve {:?}: {err}", e.id, e.file),
                })?;
                Ok(ResolvedDiagram {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    location,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDiagram {
    pub id: String,
    pub name: String,
    pub location: Url,
}

impl ResolvedDiagram {
    /// Local path for `file://` locations.
    pub fn to_file_path(&self) -> Option<std::path::PathBuf> {
        if self.location.scheme() != "file" {
            return None;
        }
        self.location.to_file_path().ok()
    }
}

/// Converts an index file path into a base URL suitable for [`DiagramIndex::resolve`].
pub fn base_url_for_path(path: &Path) -> Result<Url> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::InvalidIndex {
                message: e.to_string(),
            })?
            .join(path)
    };
    Url::from_file_path(&abs).map_err(|_| Error::InvalidIndex {
        message: format!("not a valid file path: {}", abs.display()),
    })
}
