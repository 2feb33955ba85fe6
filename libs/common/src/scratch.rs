//! Scratch storage for uploads and derived artifacts
//!
//! Every request works on files named `<uuid>_<suffix>` inside one shared
//! directory, so concurrent requests never collide. Nothing in here is
//! persistent: inputs are removed once processed, served outputs are removed
//! after a delay, and a periodic sweep catches anything left behind.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ScratchError, ScratchResult};

/// Handle on the shared scratch directory
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Open the scratch directory, creating it when missing
    pub fn open(root: impl Into<PathBuf>) -> ScratchResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| ScratchError::Create {
            path: root.clone(),
            source,
        })?;
        info!("Scratch directory ready at {}", root.display());
        Ok(Self { root })
    }

    /// Directory all request files live in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh request identifier
    pub fn new_id() -> Uuid {
        Uuid::new_v4()
    }

    /// Path of a request file: `<root>/<id>_<suffix>`
    ///
    /// The suffix must be a plain file name; anything that could resolve
    /// outside the scratch directory is rejected.
    pub fn path_for(&self, id: Uuid, suffix: &str) -> ScratchResult<PathBuf> {
        let mut components = Path::new(suffix).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(ScratchError::InvalidName(suffix.to_string())),
        }
        Ok(self.root.join(format!("{}_{}", id, suffix)))
    }

    /// Remove a file, ignoring the case where it is already gone
    ///
    /// Returns true when a file was actually deleted.
    pub async fn remove_quietly(path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed scratch file {}", path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Failed to remove scratch file {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Delete a file once `delay` has elapsed
    ///
    /// Used after a response has been handed to the client.
    pub fn schedule_removal(path: PathBuf, delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Self::remove_quietly(&path).await;
        })
    }

    /// Delete regular files whose last modification is older than `max_age`
    ///
    /// Returns the number of files removed.
    pub async fn sweep_stale(&self, max_age: Duration) -> ScratchResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age > max_age && Self::remove_quietly(&entry.path()).await {
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Swept {} stale file(s) from {}", removed, self.root.display());
        }
        Ok(removed)
    }
}
