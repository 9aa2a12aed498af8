//! Static poster metadata: the ordered list the gallery lays out.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Configuration;
use crate::error::Error;
use crate::scan::{ScanOptions, scan_posters};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosterEntry {
    /// Opaque asset name, joined onto the thumbnail and full-size directories.
    pub filename: String,
    pub title: String,
    #[serde(default)]
    pub date: String,
}

/// Fixed-length, order-stable poster list for one session.
#[derive(Debug, Clone)]
pub struct Catalog {
    posters: Vec<PosterEntry>,
}

impl Catalog {
    /// # Errors
    /// Returns [`Error::EmptyCatalog`] if `posters` is empty.
    pub fn new(posters: Vec<PosterEntry>) -> Result<Self, Error> {
        if posters.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self { posters })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        let posters: Vec<PosterEntry> = serde_json::from_str(&raw)?;
        Self::new(posters)
    }

    /// Build a catalog from the files present in `dir`, titled by file stem.
    pub fn discover(dir: &Path) -> Result<Self, Error> {
        let posters = scan_posters(dir, &ScanOptions::default())?
            .into_iter()
            .map(|filename| PosterEntry {
                title: title_from_filename(&filename),
                filename,
                date: String::new(),
            })
            .collect();
        Self::new(posters)
    }

    /// Use the configured JSON catalog, or discover posters from the thumbnail directory.
    pub fn load(cfg: &Configuration) -> Result<Self> {
        let catalog = match &cfg.catalog {
            Some(path) => Self::from_json_file(path)
                .with_context(|| format!("failed to load poster catalog {}", path.display()))?,
            None => Self::discover(&cfg.assets.thumb_dir).with_context(|| {
                format!(
                    "failed to discover posters in {}",
                    cfg.assets.thumb_dir.display()
                )
            })?,
        };
        info!(count = catalog.len(), "poster catalog ready");
        Ok(catalog)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posters.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&PosterEntry> {
        self.posters.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PosterEntry] {
        &self.posters
    }

    /// Catalog position of the first poster stored under `filename`.
    pub fn position(&self, filename: &str) -> Option<usize> {
        self.posters.iter().position(|p| p.filename == filename)
    }
}

fn title_from_filename(filename: &str) -> String {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    stem.replace(['-', '_'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_come_from_stems() {
        assert_eq!(title_from_filename("night_city-01.jpg"), "night city 01");
        assert_eq!(title_from_filename("sub/meridian.png"), "meridian");
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(Catalog::new(Vec::new()), Err(Error::EmptyCatalog)));
    }
}
