use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::Embed;
use thiserror::Error;

use crate::content::schema::{Category, Dialog, Level, Library};

#[derive(Embed)]
#[folder = "assets/library/"]
struct LibraryAssets;

const BUNDLED_LIBRARY: &str = "dialogs.json";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read library {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse library: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bundled library asset {0} is missing")]
    MissingAsset(&'static str),
    #[error("no dialog with id '{0}'")]
    DialogNotFound(String),
}

/// Where a dialog sits in the library tree.
#[derive(Clone, Copy, Debug)]
pub struct DialogEntry<'a> {
    pub level: &'a Level,
    pub category: &'a Category,
    pub dialog: &'a Dialog,
}

impl Library {
    /// Load the user library at `path` if given, falling back to the bundled
    /// one when no path is configured or the file can't be read. A file that
    /// reads but doesn't parse is still an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ContentError> {
        match path.map(Self::from_file) {
            Some(Err(err @ ContentError::Io { .. })) => {
                tracing::warn!(target: "content", "{err}; using the bundled library");
                Self::bundled()
            }
            Some(result) => result,
            None => Self::bundled(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ContentError> {
        let content = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let library = Self::from_json(&content)?;
        tracing::info!(target: "content", "loaded {} dialogs from {}", library.dialogs().count(), path.display());
        Ok(library)
    }

    pub fn bundled() -> Result<Self, ContentError> {
        let file = LibraryAssets::get(BUNDLED_LIBRARY).ok_or(ContentError::MissingAsset(BUNDLED_LIBRARY))?;
        Ok(serde_json::from_slice(file.data.as_ref())?)
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Every dialog in level, then category, then dialog order.
    pub fn dialogs(&self) -> impl Iterator<Item = DialogEntry<'_>> {
        self.levels.iter().flat_map(|level| {
            level.categories.iter().flat_map(move |category| {
                category.dialogs.iter().map(move |dialog| DialogEntry {
                    level,
                    category,
                    dialog,
                })
            })
        })
    }

    pub fn find_dialog(&self, id: &str) -> Result<DialogEntry<'_>, ContentError> {
        self.dialogs()
            .find(|entry| entry.dialog.id == id)
            .ok_or_else(|| ContentError::DialogNotFound(id.to_string()))
    }

    pub fn level(&self, id: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.id.eq_ignore_ascii_case(id))
    }

    pub fn category(&self, level_id: &str, category_id: &str) -> Option<&Category> {
        self.level(level_id)?
            .categories
            .iter()
            .find(|c| c.id == category_id)
    }

    /// A copy of the library with the dialog of the same id swapped for
    /// `dialog`. The original is left untouched.
    pub fn replace_dialog(&self, dialog: Dialog) -> Result<Self, ContentError> {
        let mut updated = self.clone();
        let slot = updated
            .levels
            .iter_mut()
            .flat_map(|l| l.categories.iter_mut())
            .flat_map(|c| c.dialogs.iter_mut())
            .find(|d| d.id == dialog.id)
            .ok_or_else(|| ContentError::DialogNotFound(dialog.id.clone()))?;
        *slot = dialog;
        Ok(updated)
    }
}
