//! Durable per-category result lists.
//!
//! Stores each category as a separate JSON array file named after the
//! category. A file is created on the first append of a session and
//! overwritten on every later one; only [`ResultStore::clear`] removes it.

use crate::error::{StoreError, StoreResult};
use crate::types::{Category, ResultSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON file-based result storage keyed by category name.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Open (and create if needed) the store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::DirectoryError(e.to_string()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the stored list for the result set's category.
    pub fn save(&self, results: &ResultSet) -> StoreResult<()> {
        let category = results.category();
        let file = self.file(category);
        let content = results.to_json()?;

        // Write to a sibling file first so a crash never leaves a torn array.
        let tmp = file.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| StoreError::SaveFailed {
            key: category.to_string(),
            reason: e.to_string(),
        })?;
        fs::rename(&tmp, &file).map_err(|e| StoreError::SaveFailed {
            key: category.to_string(),
            reason: e.to_string(),
        })?;

        debug!(%category, records = results.len(), "results persisted");
        Ok(())
    }

    /// Load the stored list, or `None` if nothing was ever saved.
    pub fn load(&self, category: Category) -> StoreResult<Option<ResultSet>> {
        let file = self.file(category);
        if !file.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file).map_err(|e| StoreError::LoadFailed {
            key: category.to_string(),
            reason: e.to_string(),
        })?;

        ResultSet::from_json(category, &content)
            .map(Some)
            .map_err(|e| StoreError::LoadFailed {
                key: category.to_string(),
                reason: e.to_string(),
            })
    }

    /// Load every stored category.
    pub fn load_all(&self) -> StoreResult<Vec<ResultSet>> {
        let mut sets = Vec::new();
        for category in Category::ALL {
            if let Some(set) = self.load(category)? {
                sets.push(set);
            }
        }
        Ok(sets)
    }

    /// Remove every stored list. Returns how many were removed.
    pub fn clear(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for category in Category::ALL {
            let file = self.file(category);
            if file.exists() {
                fs::remove_file(&file).map_err(|e| StoreError::SaveFailed {
                    key: category.to_string(),
                    reason: e.to_string(),
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn file(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.json", category.as_str()))
    }
}
