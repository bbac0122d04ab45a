//! SCSS and Sass compilation through the bundled `sass` binary.
//!
//! Files and remote links are piped through stdin. Directories are compiled
//! into a scratch directory whose generated style sheets are concatenated;
//! the scratch directory is removed when the compile returns.

use super::TransformError;
use crate::toolchain::{self, ProcessOutput};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// Name of the bundled tool.
pub const TOOL: &str = "sass";

/// A located compiler configured for one syntax.
#[derive(Debug, Clone)]
pub struct SassCompiler {
    binary: PathBuf,
    scratch_root: PathBuf,
    indented: bool,
    timeout: Duration,
}

impl SassCompiler {
    /// Locate the compiler beneath `root`.
    ///
    /// # Arguments
    /// - `root` - Toolchain root holding `ext/` and scratch directories
    /// - `indented` - Compile the indented syntax instead of SCSS
    /// - `timeout` - Limit for each compiler run
    pub fn locate(root: &Path, indented: bool, timeout: Duration) -> Result<Self, TransformError> {
        let binary = toolchain::locate(root, TOOL)?;
        Ok(Self { binary, scratch_root: root.to_path_buf(), indented, timeout })
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--style=compressed");
        cmd.arg(if self.indented { "--indented" } else { "--no-indented" });
        cmd
    }

    fn check(output: ProcessOutput) -> Result<String, TransformError> {
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            return Err(TransformError::Compiler(stderr.to_string()));
        }
        if !output.status.success() {
            return Err(TransformError::Compiler(format!("sass exited with {}", output.status)));
        }
        Ok(output.stdout)
    }

    /// Compile source text.
    ///
    /// `load_path` is added to the import search path, normally the
    /// directory of the file the text came from.
    pub fn compile_source(
        &self,
        source: &str,
        load_path: Option<&Path>,
    ) -> Result<String, TransformError> {
        let mut cmd = self.command();
        cmd.arg("--stdin").arg("--quiet");
        if let Some(dir) = load_path {
            cmd.arg(format!("--load-path={}", dir.display()));
        }

        let output = toolchain::run_with_timeout(&mut cmd, Some(source), self.timeout)?;
        Ok(Self::check(output)?.trim().to_string())
    }

    /// Compile every entry point of a directory.
    pub fn compile_directory(&self, dir: &Path) -> Result<String, TransformError> {
        let scratch = tempfile::Builder::new()
            .prefix("scss-tmp")
            .tempdir_in(&self.scratch_root)
            .map_err(TransformError::Io)?;
        debug!(dir = %dir.display(), scratch = %scratch.path().display(), "compiling directory");

        let mut cmd = self.command();
        cmd.arg(format!("{}:{}", dir.display(), scratch.path().display()));
        cmd.arg("--no-source-map");

        let output = toolchain::run_with_timeout(&mut cmd, None, self.timeout)?;
        Self::check(output)?;

        collect_css(scratch.path())
    }
}

/// Read, trim and concatenate all `*.css` files under a directory in path order.
fn collect_css(dir: &Path) -> Result<String, TransformError> {
    let pattern = format!("{}/**/*.css", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| TransformError::Compiler(e.to_string()))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let mut combined = String::new();
    for file in files {
        combined.push_str(fs::read_to_string(&file).map_err(TransformError::Io)?.trim());
    }
    Ok(combined)
}
