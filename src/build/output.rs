//! Output path routing.
//!
//! Output entries are templates. `%n` expands to the source file name, `%x`
//! to its stem and `%e` to its extension including the dot. Substitution is
//! literal and happens in that order.

use crate::build::discovery::absolutize;
use crate::build::Target;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Expand `%n`, `%x` and `%e` in an output template against a source path.
///
/// Casing is preserved from the source. A source without an extension
/// expands `%e` to the empty string.
pub fn expand_template(template: &str, source: &str) -> String {
    let source = source.replace('\\', "/");
    let source = Path::new(&source);

    let name = source.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    template.replace("%n", &name).replace("%x", &stem).replace("%e", &ext)
}

/// Make an output path absolute and create its parent directory.
fn prepare(base_dir: &Path, entry: &str) -> io::Result<PathBuf> {
    let path = absolutize(base_dir, entry);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}

/// Resolve every output of a target verbatim.
///
/// Each returned path is absolute and its parent directory exists.
pub fn resolve_outputs(target: &Target, base_dir: &Path) -> io::Result<Vec<PathBuf>> {
    target.outputs.iter().map(|entry| prepare(base_dir, entry)).collect()
}

/// Expand one output template for a source item and resolve it.
pub fn route(template: &str, source: &str, base_dir: &Path) -> io::Result<PathBuf> {
    prepare(base_dir, &expand_template(template, source))
}
