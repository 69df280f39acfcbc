//! Locally editable entries file.
//!
//! The file is a JSON array of entry objects. Writes go to a temp file in the
//! same directory and are renamed over the target, so a reader never sees a
//! half-written file.

use super::schema::{parse_entries, AddonEntry};
use crate::{AddonHubError, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// In-memory view of the entries file. Changes hit disk on [`EntriesFile::save`].
#[derive(Debug)]
pub struct EntriesFile {
    path: PathBuf,
    entries: Vec<AddonEntry>,
}

impl EntriesFile {
    /// Load `path`, creating it as an empty list if it doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("Creating empty entries file {}", path.display());
            let mut file = Self {
                path,
                entries: Vec::new(),
            };
            file.save()?;
            return Ok(file);
        }

        let content =
            fs::read_to_string(&path).map_err(|e| AddonHubError::io_with_path(e, &path))?;
        let entries = parse_entries(&content)?;
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[AddonEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace an entry with the same id in place, or append it.
    pub fn upsert(&mut self, entry: AddonEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry with `id`. Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Import entries from a `.json` file, or from every `.json` member of a
    /// `.zip` archive. All batches are validated before any is applied.
    ///
    /// Returns the number of entries imported.
    pub fn import(&mut self, source: &Path) -> Result<usize> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let batches = match extension.as_deref() {
            Some("json") => {
                let content = fs::read_to_string(source)
                    .map_err(|e| AddonHubError::io_with_path(e, source))?;
                vec![parse_entries(&content)?]
            }
            Some("zip") => read_zip_batches(source)?,
            _ => {
                return Err(AddonHubError::Config {
                    message: format!(
                        "Unknown file extension for {}. Supported extensions are .json and .zip",
                        source.display()
                    ),
                })
            }
        };

        let mut count = 0;
        for entry in batches.into_iter().flatten() {
            self.upsert(entry);
            count += 1;
        }
        info!("Imported {} entries from {}", count, source.display());
        Ok(count)
    }

    /// Write the entries back atomically.
    pub fn save(&mut self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| AddonHubError::io_with_path(e, &parent))?;

        let serialized = serde_json::to_string_pretty(&self.entries)?;
        let mut temp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| AddonHubError::io_with_path(e, &parent))?;
        temp.write_all(serialized.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| AddonHubError::io_with_path(e, temp.path()))?;
        temp.persist(&self.path)
            .map_err(|e| AddonHubError::io_with_path(e.error, &self.path))?;

        debug!(
            "Saved {} entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn read_zip_batches(source: &Path) -> Result<Vec<Vec<AddonEntry>>> {
    let file = fs::File::open(source).map_err(|e| AddonHubError::io_with_path(e, source))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| AddonHubError::Io {
        message: format!("Failed to open zip archive: {}", e),
        path: Some(source.to_path_buf()),
        source: None,
    })?;

    let mut batches = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(|e| AddonHubError::Io {
            message: format!("Failed to read zip member #{}: {}", index, e),
            path: Some(source.to_path_buf()),
            source: None,
        })?;
        if member.is_dir() || !member.name().ends_with(".json") {
            continue;
        }
        let name = member.name().to_string();
        let mut content = String::new();
        member
            .read_to_string(&mut content)
            .map_err(|e| AddonHubError::io_with_path(e, source))?;
        let batch = parse_entries(&content).map_err(|e| match e {
            AddonHubError::InvalidSchema { message } => {
                AddonHubError::schema(format!("{}: {}", name, message))
            }
            other => other,
        })?;
        batches.push(batch);
    }
    Ok(batches)
}
