//! Cache manager for persisting fetched result sets to disk
//!
//! Provides a `CacheManager` that stores serializable data as one JSON file per
//! (query, params) pair. Freshness is judged at read time against a caller
//! supplied TTL, using the file's modification time as the write time.

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// TTL applied by [`CacheManager::get`] when the caller passes `None`
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Extension of committed cache entries
const ENTRY_EXTENSION: &str = "json";

/// Extension of in-flight writes that have not been renamed into place yet
const TEMP_EXTENSION: &str = "tmp";

/// Errors surfaced by cache writes
///
/// Reads never fail: a missing, unreadable or corrupt entry is a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Creating the directory or writing the entry failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data could not be serialized
    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk layout of a cache entry
///
/// The original query and params are stored next to the data so that a
/// digest collision reads as a miss instead of returning someone else's
/// results.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    query: String,
    params: String,
    data: T,
}

/// Manages reading and writing cached result sets on disk
///
/// Entries live in an XDG-compliant cache directory (`~/.cache/xsearch/` on
/// Linux). Each entry is a plain JSON file named after the digest of its key,
/// so deleting files by hand never corrupts the store.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "xsearch")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache entries
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Derives the fixed-width key for a (query, params) pair
    ///
    /// A separator byte keeps `("ab", "c")` and `("a", "bc")` apart.
    pub fn cache_key(query: &str, params: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(params.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the path to the cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Reads a fresh entry from the cache
    ///
    /// # Arguments
    /// * `query` - Logical query the data was fetched for
    /// * `params` - Serialized fetch parameters
    /// * `ttl` - Maximum accepted age; `None` means [`DEFAULT_TTL`]
    ///
    /// # Returns
    /// * `Some(T)` if an entry exists, parses, and is no older than `ttl`
    /// * `None` otherwise, including on any I/O error
    pub fn get<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &str,
        ttl: Option<Duration>,
    ) -> Option<T> {
        let ttl = ttl.unwrap_or(DEFAULT_TTL);
        let key = Self::cache_key(query, params);
        let path = self.cache_path(&key);

        let age = entry_age(&path)?;
        if age > ttl {
            log::debug!("Cache expired for {:?} ({:?} old)", query, age);
            return None;
        }

        let content = fs::read(&path).ok()?;
        let entry: CacheEntry<T> = match serde_json::from_slice(&content) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if entry.query != query || entry.params != params {
            log::debug!("Cache key collision for {:?}, treating as miss", query);
            return None;
        }

        log::debug!("Cache hit for {:?}", query);
        Some(entry.data)
    }

    /// Writes data to the cache, replacing any previous entry for the key
    ///
    /// The entry is written to a temporary file and renamed into place, so
    /// readers observe either the old entry or the new one.
    pub fn set<T: Serialize>(&self, query: &str, params: &str, data: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir)?;

        let entry = CacheEntry {
            query: query.to_string(),
            params: params.to_string(),
            data,
        };
        let json = serde_json::to_vec(&entry)?;

        let key = Self::cache_key(query, params);
        let tmp_path = self
            .cache_dir
            .join(format!("{}.{}.{}", key, std::process::id(), TEMP_EXTENSION));

        fs::write(&tmp_path, json)?;
        if let Err(e) = fs::rename(&tmp_path, self.cache_path(&key)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        log::debug!("Stored cache entry for {:?}", query);
        Ok(())
    }

    /// Removes every entry regardless of age
    ///
    /// Returns the number of entries removed; 0 when the directory is absent.
    pub fn clear(&self) -> usize {
        let removed = self.remove_entries(|_| true);
        log::info!("Cleared {} cache entries", removed);
        removed
    }

    /// Removes entries older than `ttl`, leaving fresher ones untouched
    ///
    /// Returns the number of entries removed.
    pub fn prune(&self, ttl: Duration) -> usize {
        let removed = self.remove_entries(|age| age > ttl);
        log::info!("Pruned {} cache entries older than {:?}", removed, ttl);
        removed
    }

    /// Deletes committed entries whose age satisfies `should_remove`
    fn remove_entries(&self, should_remove: impl Fn(Duration) -> bool) -> usize {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(age) = entry_age(&path) else {
                continue;
            };
            if should_remove(age) && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

/// Age of a file based on its modification time
///
/// A modification time in the future (clock skew) counts as age zero.
fn entry_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}
