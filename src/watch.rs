//! Watch mode for automatic rebuilds on file changes
//!
//! The notify backend only forwards [`ChangeEvent`]s into a channel. The
//! consuming side drops the cached content of every changed path, ignores
//! paths no target accepts, and passes the rest through a single global
//! debounce gate before rebuilding the targets whose extensions match.

use crate::build::{absolutize, is_absolute_uri, BuildError, BuildPipeline, BuildResult, Target};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default time during which further changes are ignored after one is handled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Default pause between a change and the rebuild it triggers.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(250);

/// Error during watch mode
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("failed to watch {}: {source}", path.display())]
    WatchPath {
        /// Directory that could not be watched
        path: PathBuf,
        /// Underlying error
        #[source]
        source: notify::Error,
    },
    /// Event channel closed unexpectedly
    #[error("watch channel closed")]
    ChannelClosed,
    /// Fatal build error
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Options for watch mode
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Debounce gate lifetime
    pub debounce: Duration,
    /// Delay before rebuilding, letting editors finish writing
    pub settle: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { debounce: DEFAULT_DEBOUNCE, settle: DEFAULT_SETTLE }
    }
}

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// File was created
    Created(PathBuf),
    /// File was modified
    Modified(PathBuf),
}

impl ChangeEvent {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) => p,
        }
    }

    /// Convert a notify event into one change per path. Other kinds are dropped.
    pub fn from_notify(event: Event) -> Vec<ChangeEvent> {
        match event.kind {
            EventKind::Create(_) => event.paths.into_iter().map(ChangeEvent::Created).collect(),
            EventKind::Modify(_) => event.paths.into_iter().map(ChangeEvent::Modified).collect(),
            _ => vec![],
        }
    }
}

/// Single global gate suppressing changes that arrive in a burst.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    ttl: Duration,
    opened: Option<Instant>,
}

impl DebounceGate {
    /// Create an inactive gate.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, opened: None }
    }

    /// Let a change through unless the gate is active. A change that passes
    /// activates the gate.
    pub fn try_pass(&mut self) -> bool {
        self.try_pass_at(Instant::now())
    }

    fn try_pass_at(&mut self, now: Instant) -> bool {
        if let Some(opened) = self.opened {
            if now.duration_since(opened) < self.ttl {
                return false;
            }
        }
        self.opened = Some(now);
        true
    }
}

/// What handling one change did.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// Dropped by the debounce gate
    Debounced,
    /// No watched target accepts the file's extension
    NoMatch,
    /// Affected targets were passed to the pipeline
    Built(BuildResult),
}

/// Counters for one run of the event loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    /// Change events received
    pub events: usize,
    /// Events dropped by the debounce gate
    pub debounced: usize,
    /// Events that matched no target
    pub unmatched: usize,
    /// Rebuild passes started
    pub rebuilds: usize,
}

/// Directories to observe for a set of targets.
///
/// Included directories are watched recursively. The parent directory of each
/// included file is watched non-recursively unless it is already covered.
/// Remote links and missing entries are skipped.
pub fn watch_dirs(targets: &[Target], base_dir: &Path) -> Vec<(PathBuf, RecursiveMode)> {
    let mut dirs: Vec<(PathBuf, RecursiveMode)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    let mut add = |path: PathBuf, mode: RecursiveMode| match index.get(&path) {
        Some(&i) => {
            if mode == RecursiveMode::Recursive {
                dirs[i].1 = RecursiveMode::Recursive;
            }
        }
        None => {
            index.insert(path.clone(), dirs.len());
            dirs.push((path, mode));
        }
    };

    for target in targets {
        for entry in &target.includes {
            let path = absolutize(base_dir, entry);
            if path.is_dir() {
                add(path, RecursiveMode::Recursive);
            } else if path.is_file() {
                if let Some(parent) = path.parent() {
                    add(parent.to_path_buf(), RecursiveMode::NonRecursive);
                }
            } else if !is_absolute_uri(entry) {
                debug!(entry = %entry, "include not found, not watched");
            }
        }
    }

    dirs
}

/// Targets whose formats or additional extensions accept a changed file.
pub fn affected_targets(targets: &[Target], path: &Path) -> Vec<Target> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return vec![];
    };
    targets.iter().filter(|t| t.accepts_extension(ext)).cloned().collect()
}

/// Watch session over a set of targets.
pub struct WatchEngine {
    pipeline: BuildPipeline,
    targets: Vec<Target>,
    options: WatchOptions,
    gate: DebounceGate,
}

impl WatchEngine {
    /// Create an engine. The pipeline's context should be in watch mode.
    pub fn new(pipeline: BuildPipeline, targets: Vec<Target>, options: WatchOptions) -> Self {
        let gate = DebounceGate::new(options.debounce);
        Self { pipeline, targets, options, gate }
    }

    /// Get the pipeline.
    pub fn pipeline(&self) -> &BuildPipeline {
        &self.pipeline
    }

    /// Get the watched targets.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Build every target once.
    pub fn initial_build(&self) -> Result<BuildResult, BuildError> {
        let result = self.pipeline.build_all(&self.targets, None)?;
        info!("{}", result.summary());
        Ok(result)
    }

    /// Handle one changed path.
    ///
    /// Only fatal build errors are returned; target failures are logged by
    /// the pipeline and recorded in the result.
    pub fn handle_change(&mut self, path: &Path) -> Result<ChangeOutcome, BuildError> {
        // Evicted on every event, debounced or not
        self.pipeline.context().content().invalidate(&path.to_string_lossy());

        let affected = affected_targets(&self.targets, path);
        if affected.is_empty() {
            debug!(path = %path.display(), "no target affected");
            return Ok(ChangeOutcome::NoMatch);
        }

        if !self.gate.try_pass() {
            debug!(path = %path.display(), "change debounced");
            return Ok(ChangeOutcome::Debounced);
        }

        if !self.options.settle.is_zero() {
            thread::sleep(self.options.settle);
        }

        let result = self.pipeline.build_all(&affected, None)?;
        if result.any_built() {
            let names: Vec<&str> = result.targets.iter().map(|r| r.target.as_str()).collect();
            info!(path = %path.display(), "rebuilt {}", names.join(", "));
        } else {
            info!(path = %path.display(), "nothing built");
        }
        Ok(ChangeOutcome::Built(result))
    }

    /// Consume change events until the channel closes.
    pub fn process_events(&mut self, rx: &Receiver<ChangeEvent>) -> Result<WatchStats, WatchError> {
        let mut stats = WatchStats::default();
        for event in rx.iter() {
            stats.events += 1;
            match self.handle_change(event.path())? {
                ChangeOutcome::Debounced => stats.debounced += 1,
                ChangeOutcome::NoMatch => stats.unmatched += 1,
                ChangeOutcome::Built(_) => stats.rebuilds += 1,
            }
        }
        Ok(stats)
    }

    /// Build everything, then watch for changes and rebuild.
    ///
    /// Blocks until a fatal error occurs.
    pub fn run(mut self) -> Result<(), WatchError> {
        self.initial_build()?;

        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in ChangeEvent::from_notify(event) {
                    // Receiver gone means the session is over
                    let _ = tx.send(change);
                }
            }
            Err(e) => warn!(error = %e, "watch error"),
        })
        .map_err(WatchError::WatcherInit)?;

        let dirs = watch_dirs(&self.targets, self.pipeline.context().base_dir());
        for (dir, mode) in &dirs {
            watcher
                .watch(dir, *mode)
                .map_err(|source| WatchError::WatchPath { path: dir.clone(), source })?;
            debug!(dir = %dir.display(), recursive = *mode == RecursiveMode::Recursive, "watching");
        }

        info!("Watching {} target(s) in {} directories", self.targets.len(), dirs.len());

        self.process_events(&rx)?;
        Err(WatchError::ChannelClosed)
    }
}
