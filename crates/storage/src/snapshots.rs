//! Snapshot files

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::StorageError;

/// Restrict an event kind to `[A-Za-z0-9_-]` so it is safe in a file name
pub fn sanitize_event_kind(event: &str) -> String {
    let cleaned: String = event
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "event".to_string()
    } else {
        cleaned
    }
}

/// Name collisions tried before a save gives up
const MAX_NAME_ATTEMPTS: u32 = 100;

/// `<event>_<YYYYmmdd_HHMMSS_mmm>.jpg`, or `<event>_<...>-<n>.jpg` for the
/// `n`th collision within the same millisecond
pub fn snapshot_name<Tz>(event: &str, received: &DateTime<Tz>, collision: u32) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stem = format!(
        "{}_{}",
        sanitize_event_kind(event),
        received.format("%Y%m%d_%H%M%S_%3f")
    );
    if collision == 0 {
        format!("{}.jpg", stem)
    } else {
        format!("{}-{}.jpg", stem, collision)
    }
}

/// Directory of decoded alert snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Use `dir`, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Snapshot directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new file and return its name. Existing files
    /// are never replaced.
    pub async fn save<Tz>(
        &self,
        event: &str,
        received: &DateTime<Tz>,
        bytes: &[u8],
    ) -> Result<String, StorageError>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        for collision in 0..MAX_NAME_ATTEMPTS {
            let filename = snapshot_name(event, received, collision);
            let path = self.dir.join(&filename);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying next name", filename);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }

            info!("Image saved: {}", path.display());
            return Ok(filename);
        }

        Err(StorageError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free snapshot name for '{}'", event),
        )))
    }
}
