//! Build context shared by every target of one invocation.

use crate::build::SuppressionWindow;
use crate::content::{ContentStore, RemoteFetcher};
use crate::toolchain::{self, DEFAULT_PROCESS_TIMEOUT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// State and settings for a build operation.
///
/// Owns the content cache and the suppression window, so independent
/// contexts never share state.
#[derive(Debug)]
pub struct BuildContext {
    /// Directory relative includes and outputs resolve against
    base_dir: PathBuf,
    /// Whether builds run under the watcher
    watch: bool,
    /// Cached file and remote content
    content: ContentStore,
    /// Recently started targets
    suppression: SuppressionWindow,
    /// Directory holding `ext/` and scratch directories
    toolchain_root: PathBuf,
    /// Limit for external compiler runs
    process_timeout: Duration,
}

impl BuildContext {
    /// Create a build context.
    ///
    /// # Arguments
    /// - `base_dir` - Directory relative paths are resolved against
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            watch: false,
            content: ContentStore::new(),
            suppression: SuppressionWindow::default(),
            toolchain_root: toolchain::default_root(),
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Whether this context drives watch-mode builds.
    pub fn is_watch(&self) -> bool {
        self.watch
    }

    /// Get the content store.
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Get the suppression window.
    pub fn suppression(&self) -> &SuppressionWindow {
        &self.suppression
    }

    /// Get the toolchain root.
    pub fn toolchain_root(&self) -> &Path {
        &self.toolchain_root
    }

    /// Get the external process timeout.
    pub fn process_timeout(&self) -> Duration {
        self.process_timeout
    }

    /// Set watch mode.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Replace the remote fetcher. Clears the content cache.
    pub fn with_fetcher(mut self, fetcher: impl RemoteFetcher + 'static) -> Self {
        self.content = ContentStore::with_fetcher(fetcher);
        self
    }

    /// Set the suppression window length.
    pub fn with_suppression_window(mut self, window: Duration) -> Self {
        self.suppression = SuppressionWindow::new(window);
        self
    }

    /// Set the toolchain root.
    pub fn with_toolchain_root(mut self, root: PathBuf) -> Self {
        self.toolchain_root = root;
        self
    }

    /// Set the external process timeout.
    pub fn with_process_timeout(mut self, timeout: Duration) -> Self {
        self.process_timeout = timeout;
        self
    }
}
