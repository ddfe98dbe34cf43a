//! Durable `vacancy_name -> comment` archive.
//!
//! Holds the latest comment ever entered for a vacancy, so a comment
//! survives the vacancy dropping out of the feed for a few cycles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::Result;
use crate::utils::fs::write_atomic_with_backup;

pub struct CommentArchive {
    path: PathBuf,
    comments: Mutex<BTreeMap<String, String>>,
}

impl CommentArchive {
    /// Open the archive at `path`; a missing or malformed file starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let comments = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(comments) => {
                    info!(path = %path.display(), entries = comments.len(), "Loaded comment archive");
                    comments
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Malformed comment archive; starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No comment archive yet");
                BTreeMap::new()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Cannot read comment archive; starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path,
            comments: Mutex::new(comments),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, vacancy_name: &str) -> Option<String> {
        self.comments.lock().get(vacancy_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.comments.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.lock().is_empty()
    }

    /// Record `comment` for `vacancy_name`; an empty comment removes the entry.
    ///
    /// The file is written before the in-memory map changes. Callers
    /// serialize writes.
    pub async fn record(&self, vacancy_name: &str, comment: &str) -> Result<()> {
        let mut next = self.comments.lock().clone();
        if comment.is_empty() {
            next.remove(vacancy_name);
        } else {
            next.insert(vacancy_name.to_string(), comment.to_string());
        }

        let bytes = serde_json::to_vec_pretty(&next)?;
        write_atomic_with_backup(&self.path, &bytes).await?;
        *self.comments.lock() = next;
        Ok(())
    }
}
