//
// catalog.rs
//
// Workspace file discovery, filtering, and TTL caching
//

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::config::IngestConfig;

/// External capability that lists candidate workspace files.
///
/// Paths may be returned relative to the workspace root; the catalog
/// absolutizes them before filtering.
#[async_trait]
pub trait FileLister: Send + Sync {
    async fn list(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Lists tracked files by shelling out to `git ls-files`.
///
/// Any non-zero exit (not a repository, git missing) is an error; the
/// catalog degrades it to an empty listing.
pub struct GitFileLister;

#[async_trait]
impl FileLister for GitFileLister {
    async fn list(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let output = Command::new("git")
            .arg("ls-files")
            .current_dir(root)
            .output()
            .await
            .map_err(|e| anyhow!("failed to spawn git ls-files: {e}"))?;

        if !output.status.success() {
            return Err(anyhow!("git ls-files exited with {}", output.status));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

#[derive(Debug, Clone)]
struct CatalogCache {
    files: Vec<PathBuf>,
    fetched_at: Instant,
}

/// Discovers workspace paths, filters them, and caches the result.
///
/// One cached listing per TTL window; order is whatever discovery returned,
/// with no deduplication.
pub struct WorkspaceFileCatalog {
    root: PathBuf,
    cache_ttl: Duration,
    allowed_extensions: HashSet<String>,
    ignore_patterns: Vec<String>,
    lister: Arc<dyn FileLister>,
    cache: Mutex<Option<CatalogCache>>,
}

impl WorkspaceFileCatalog {
    pub fn new(root: PathBuf, config: &IngestConfig, lister: Arc<dyn FileLister>) -> Self {
        Self {
            root,
            cache_ttl: config.cache_ttl,
            allowed_extensions: config.allowed_extensions.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
            lister,
            cache: Mutex::new(None),
        }
    }

    /// Returns the filtered workspace file list, from cache when fresh.
    ///
    /// Discovery failure is soft: a warning and an empty list, leaving any
    /// existing cache entry untouched.
    pub async fn get(&self, force_refresh: bool) -> Vec<PathBuf> {
        if !force_refresh {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return cached.files.clone();
                }
            }
        }

        let listed = match self.lister.list(&self.root).await {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("workspace file discovery failed: {e}");
                return Vec::new();
            }
        };

        let files: Vec<PathBuf> = listed
            .into_iter()
            .map(|p| {
                if p.is_absolute() {
                    p
                } else {
                    self.root.join(p)
                }
            })
            .filter(|p| self.retain(p))
            .collect();

        log::trace!("catalog refreshed: {} files after filtering", files.len());

        *self.cache.lock().unwrap() = Some(CatalogCache {
            files: files.clone(),
            fetched_at: Instant::now(),
        });

        files
    }

    /// Cached file count and age, if a listing is cached
    pub fn cache_status(&self) -> Option<(usize, Duration)> {
        self.cache
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| (c.files.len(), c.fetched_at.elapsed()))
    }

    /// Drop the cached listing
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap() = None;
    }

    /// A path is retained iff its extension is allowed and no ignore
    /// pattern occurs as a substring of the absolute path.
    fn retain(&self, path: &Path) -> bool {
        let Some(ext) = extension_of(path) else {
            return false;
        };
        if !self.allowed_extensions.contains(&ext) {
            return false;
        }
        let path_str = path.to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| path_str.contains(pattern.as_str()))
    }
}

/// Extension of the basename, from the final dot inclusive (".ts")
fn extension_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let idx = name.rfind('.')?;
    Some(name[idx..].to_string())
}
