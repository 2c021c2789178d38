//! Draft persistence with file locking.
//!
//! A draft is written when the user chooses "finish later" and read back
//! on the next start so the wizard can resume where it stopped.

use crate::{Draft, Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File-backed store holding a single draft
#[derive(Clone, Debug)]
pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    /// Create a store for the given draft file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the draft with shared locking
    ///
    /// Returns None if no draft exists.
    /// If the file is unreadable or corrupted, logs a warning and returns None.
    pub fn load(&self) -> Result<Option<Draft>> {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!("No draft found at {:?}", path);
            return Ok(None);
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open draft {:?}: {}. Starting fresh.", path, e);
                return Ok(None);
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock draft {:?}: {}. Starting fresh.", path, e);
            return Ok(None);
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read draft {:?}: {}. Starting fresh.", path, e);
            return Ok(None);
        }

        file.unlock()?;

        match serde_json::from_str::<Draft>(&contents) {
            Ok(draft) => {
                tracing::debug!("Loaded draft from {:?} (step {})", path, draft.step);
                Ok(Some(draft))
            }
            Err(e) => {
                tracing::warn!("Failed to parse draft {:?}: {}. Starting fresh.", path, e);
                Ok(None)
            }
        }
    }

    /// Save the draft with exclusive locking
    ///
    /// Atomically writes the draft by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    ///
    /// Any failure is reported as `Error::DraftWrite`.
    pub fn save(&self, draft: &Draft) -> Result<()> {
        self.write_atomic(draft).map_err(|source| {
            tracing::error!("Failed to save draft to {:?}: {}", self.path, source);
            Error::DraftWrite {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::info!("Saved draft to {:?} (step {})", self.path, draft.step);
        Ok(())
    }

    fn write_atomic(&self, draft: &Draft) -> std::io::Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "draft path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(draft)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove the draft. Returns true if a draft was deleted.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Removed draft {:?}", self.path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
