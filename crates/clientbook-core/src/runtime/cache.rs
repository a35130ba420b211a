// crates/clientbook-core/src/runtime/cache.rs
// ============================================================================
// Module: Local Caches
// Description: File-backed and in-memory implementations of LocalCache.
// Purpose: Provide the durable local key/value store used as schema fast-path.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`FileCache`] stores each key as `<key>.json` inside a directory and
//! replaces entries atomically through a temporary file and a rename.
//! [`InMemoryCache`] is a mutex-guarded map for tests and ephemeral sessions.
//! Cache contents are untrusted: keys are validated and entries are
//! size-limited on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::CacheError;
use crate::interfaces::LocalCache;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a single cache entry.
pub const MAX_CACHE_ENTRY_BYTES: u64 = 16 * 1024 * 1024;
/// Maximum length of a cache key.
const MAX_KEY_LENGTH: usize = 128;

// ============================================================================
// SECTION: File Cache
// ============================================================================

/// Directory-backed cache with one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileCache {
    /// Cache directory.
    dir: PathBuf,
}

impl FileCache {
    /// Creates a cache rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path for `key`.
    fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key)?;
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::Io(err.to_string())),
        };
        if metadata.len() > MAX_CACHE_ENTRY_BYTES {
            return Err(CacheError::Invalid(format!("cache entry {key} exceeds size limit")));
        }
        let bytes = fs::read(&path).map_err(|err| CacheError::Io(err.to_string()))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CacheError::Invalid(format!("cache entry {key} must be utf-8")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key)?;
        fs::create_dir_all(&self.dir).map_err(|err| CacheError::Io(err.to_string()))?;
        let staging = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&staging, value).map_err(|err| CacheError::Io(err.to_string()))?;
        fs::rename(&staging, &path).map_err(|err| CacheError::Io(err.to_string()))
    }
}

// ============================================================================
// SECTION: In-Memory Cache
// ============================================================================

/// Mutex-guarded in-memory cache.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    /// Stored entries.
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(key.into(), value.into());
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }
}

impl LocalCache for InMemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| CacheError::Io("in-memory cache mutex poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Io("in-memory cache mutex poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a cache key for use as a file name.
fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::Invalid("cache key length out of range".to_string()));
    }
    if key.starts_with('.') {
        return Err(CacheError::Invalid("cache key must not start with a dot".to_string()));
    }
    if !key.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')) {
        return Err(CacheError::Invalid(format!("cache key contains invalid characters: {key}")));
    }
    Ok(())
}
