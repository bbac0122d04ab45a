//! Source discovery for the build system.
//!
//! Turns a target's include and exclude entries into an ordered, deduplicated
//! list of content items. Resolution never mutates the target and keeps its
//! dedup state local to one call, so resolving twice yields the same items.

use crate::build::Target;
use glob::{glob_with, MatchOptions, Pattern};
use path_clean::PathClean;
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Error during source discovery.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// Include entry is neither an existing path nor an absolute URI
    #[error("couldn't find the specified file or directory '{0}'")]
    NotFound(String),
    /// Directory scan pattern could not be built
    #[error("invalid glob pattern '{0}': {1}")]
    InvalidPattern(String, #[source] glob::PatternError),
}

/// What a resolved include refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A concrete file on disk
    File,
    /// An unexpanded directory (for directory-mode compilers)
    Directory,
    /// An absolute URI fetched on demand
    RemoteLink,
}

/// A resolved input of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Absolute path or URL
    pub value: String,
    /// Kind of input
    pub kind: ItemKind,
}

impl ContentItem {
    /// Create a file item.
    pub fn file(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: ItemKind::File }
    }

    /// Create a directory item.
    pub fn directory(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: ItemKind::Directory }
    }

    /// Create a remote link item.
    pub fn remote(value: impl Into<String>) -> Self {
        Self { value: value.into(), kind: ItemKind::RemoteLink }
    }

    /// The value as a path.
    pub fn path(&self) -> &Path {
        Path::new(&self.value)
    }

    /// Last path or URL segment, used as the filename handed to transforms.
    pub fn file_name(&self) -> String {
        match self.kind {
            ItemKind::RemoteLink => self.value.clone(),
            _ => self
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.value.clone()),
        }
    }
}

impl std::fmt::Display for ContentItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Backslashes are separators on every host; only Windows understands them natively.
fn normalize_separators(entry: &str) -> Cow<'_, str> {
    if cfg!(windows) {
        Cow::Borrowed(entry)
    } else {
        Cow::Owned(entry.replace('\\', "/"))
    }
}

/// Resolve an include or output entry against a base directory.
///
/// Relative entries are joined to `base_dir`. Either way `.`/`..` segments
/// are collapsed lexically, without touching the filesystem, so two spellings
/// of one path give the same result.
pub fn absolutize(base_dir: &Path, entry: &str) -> PathBuf {
    let entry = normalize_separators(entry);
    let path = Path::new(entry.as_ref());
    if path.is_absolute() {
        path.clean()
    } else {
        base_dir.join(path).clean()
    }
}

/// Whether an absolute path (or URL) matches one of the target's exclusions.
///
/// Matching is a case-insensitive substring test on the forward-slash form.
pub fn is_excluded(target: &Target, path: &str) -> bool {
    if target.excludes.is_empty() {
        return false;
    }
    let haystack = path.replace('\\', "/").to_lowercase();
    target
        .excludes
        .iter()
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| haystack.contains(&pattern.replace('\\', "/").to_lowercase()))
}

/// Whether an include entry is an absolute URI.
///
/// Single-letter schemes are rejected so Windows drive paths never qualify.
pub fn is_absolute_uri(entry: &str) -> bool {
    match reqwest::Url::parse(entry) {
        Ok(url) => url.scheme().len() > 1,
        Err(_) => false,
    }
}

/// Check whether a file's extension makes it an input of the target.
fn is_target_file(target: &Target, path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => target.accepts_extension(ext),
        None => false,
    }
}

/// Recursively enumerate the target's input files under a directory.
///
/// Results are sorted so enumeration order does not depend on the filesystem.
pub fn discover_files(dir: &Path, target: &Target) -> Result<Vec<PathBuf>, ResolveError> {
    let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let paths =
        glob_with(&pattern, options).map_err(|e| ResolveError::InvalidPattern(pattern.clone(), e))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && is_target_file(target, &path) {
                    files.push(path);
                }
            }
            Err(e) => {
                // Unreadable subtrees are skipped, the rest of the scan continues
                warn!(error = %e, "error reading path during discovery");
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Resolve a target's includes into content items.
///
/// # Arguments
/// - `target` - Target whose includes and excludes are resolved
/// - `base_dir` - Directory relative entries are resolved against
/// - `expand_directories` - Expand directories into their files, or emit a
///   single [`ItemKind::Directory`] item per directory
///
/// # Returns
/// Items in order of first discovery. A file reached through several entries
/// appears once, at its first position.
pub fn resolve(
    target: &Target,
    base_dir: &Path,
    expand_directories: bool,
) -> Result<Vec<ContentItem>, ResolveError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for entry in &target.includes {
        let absolute = absolutize(base_dir, entry);
        let key = absolute.to_string_lossy().into_owned();

        if is_excluded(target, &key) {
            debug!(entry = %entry, "include excluded");
            continue;
        }
        if seen.contains(&key) {
            continue;
        }

        if absolute.is_file() {
            seen.insert(key.clone());
            items.push(ContentItem::file(key));
        } else if absolute.is_dir() {
            seen.insert(key.clone());
            if expand_directories {
                for file in discover_files(&absolute, target)? {
                    let file_key = file.to_string_lossy().into_owned();
                    if is_excluded(target, &file_key) || !seen.insert(file_key.clone()) {
                        continue;
                    }
                    items.push(ContentItem::file(file_key));
                }
            } else {
                items.push(ContentItem::directory(key));
            }
        } else if is_absolute_uri(entry) {
            if !is_excluded(target, entry) && seen.insert(entry.clone()) {
                items.push(ContentItem::remote(entry.clone()));
            }
        } else {
            return Err(ResolveError::NotFound(entry.clone()));
        }
    }

    Ok(items)
}
