//! Cached access to input content.
//!
//! The store is the single place where "read once, fetch once" is enforced.
//! Entries stay until they are explicitly invalidated, which watch mode does
//! for every changed path before the rebuild it triggers.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Error retrieving remote content.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// Transport-level failure or unreadable body
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },
    /// Server answered with a non-success status
    #[error("got HTTP {status} when trying to fetch {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },
}

/// Source of remote content.
pub trait RemoteFetcher: Send + Sync {
    /// Retrieve the text behind a URL.
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP fetcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!(url, "fetching remote content");

        let response = reqwest::blocking::get(url)
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        response.text().map_err(|source| FetchError::Request { url: url.to_string(), source })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide content cache, keyed by absolute path or URL.
pub struct ContentStore {
    files: Mutex<HashMap<String, Arc<str>>>,
    remote: Mutex<HashMap<String, Arc<str>>>,
    fetcher: Box<dyn RemoteFetcher>,
}

impl ContentStore {
    /// Create an empty store that fetches over HTTP.
    pub fn new() -> Self {
        Self::with_fetcher(HttpFetcher)
    }

    /// Create an empty store with a custom remote fetcher.
    pub fn with_fetcher(fetcher: impl RemoteFetcher + 'static) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            remote: Mutex::new(HashMap::new()),
            fetcher: Box::new(fetcher),
        }
    }

    /// Read a file, from cache when possible.
    ///
    /// A leading byte order mark is dropped.
    pub fn get_file(&self, path: &str) -> io::Result<Arc<str>> {
        if let Some(text) = lock(&self.files).get(path) {
            return Ok(Arc::clone(text));
        }

        debug!(path, "reading file");
        let raw = fs::read_to_string(path)?;
        let text: Arc<str> = Arc::from(raw.strip_prefix('\u{feff}').unwrap_or(&raw));
        lock(&self.files).insert(path.to_string(), Arc::clone(&text));
        Ok(text)
    }

    /// Fetch a URL, from cache when possible.
    ///
    /// The remote lock is held across the request, so concurrent callers
    /// never fetch the same URL twice.
    pub fn get_remote(&self, url: &str) -> Result<Arc<str>, FetchError> {
        let mut remote = lock(&self.remote);
        if let Some(text) = remote.get(url) {
            return Ok(Arc::clone(text));
        }

        let text: Arc<str> = Arc::from(self.fetcher.fetch(url)?);
        remote.insert(url.to_string(), Arc::clone(&text));
        Ok(text)
    }

    /// Drop the cached entry for a path or URL. Returns whether one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let file = lock(&self.files).remove(key).is_some();
        let remote = lock(&self.remote).remove(key).is_some();
        if file || remote {
            debug!(key, "cache entry invalidated");
        }
        file || remote
    }

    /// Whether a path or URL is cached.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.files).contains_key(key) || lock(&self.remote).contains_key(key)
    }

    /// Number of cached entries across both key spaces.
    pub fn len(&self) -> usize {
        lock(&self.files).len() + lock(&self.remote).len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("files", &lock(&self.files).len())
            .field("remote", &lock(&self.remote).len())
            .finish()
    }
}
