use seedgate_core::{CoreError, StorageError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Append-only record of every torrent link ever admitted.
///
/// The in-memory set mirrors the file so membership checks never touch disk.
/// A link is written at most once; the file is never rewritten or compacted.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    links: HashSet<String>,
}

impl DedupStore {
    /// Reads every persisted link. A missing file is an empty set.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let links = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(source) => {
                return Err(StorageError::ReadFailed {
                    path: path.display().to_string(),
                    source,
                }
                .into())
            }
        };

        info!(
            "Loaded {} previously added torrent links from {}",
            links.len(),
            path.display()
        );
        Ok(Self { path, links })
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably appends `link` unless it is already present.
    ///
    /// Returns `false` without writing when the link was already recorded.
    /// The in-memory set is only updated once the line reached the disk.
    pub async fn record(&mut self, link: &str) -> Result<bool, CoreError> {
        let link = link.trim();
        if self.links.contains(link) {
            debug!("Link already recorded: {}", link);
            return Ok(false);
        }

        self.append_line(link)
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: self.path.display().to_string(),
                source,
            })?;

        self.links.insert(link.to_string());
        debug!("Recorded link {} in {}", link, self.path.display());
        Ok(true)
    }

    async fn append_line(&self, link: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", link).as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await
    }
}
