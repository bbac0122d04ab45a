//! Build pipeline orchestration.
//!
//! The pipeline runs targets in declaration order, skips targets that were
//! started moments ago and decides which failures end the run.

use crate::build::{
    format_size, BuildContext, BuildResult, Format, ResolveError, Target, TargetResult,
};
use crate::builders::{Builder, TransformError};
use crate::content::FetchError;
use std::io;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

/// Error during build execution.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// An include could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// An input file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Input path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// Remote content could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// An item failed to transform
    #[error("error raised on {item} ({target}): {source}")]
    Transform {
        /// Target name
        target: String,
        /// Failing item
        item: String,
        /// Transform failure
        #[source]
        source: TransformError,
    },
    /// An output could not be written
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Output path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Fatal errors end the run in every mode.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::Fetch(_) | BuildError::Write { .. })
    }
}

/// Build pipeline for executing builds.
#[derive(Debug)]
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Build targets in order, optionally only those of one format.
    ///
    /// Outside watch mode the first failure is returned. In watch mode
    /// failures are recorded and the remaining targets still run, except for
    /// fatal errors which always end the run.
    pub fn build_all(
        &self,
        targets: &[Target],
        filter: Option<Format>,
    ) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let mut result = BuildResult::new();

        for target in targets.iter().filter(|t| filter.map_or(true, |f| t.format == f)) {
            if !self.context.suppression().try_claim(target.id()) {
                debug!(target = %target.name(), "suppressed, built moments ago");
                result.add_result(TargetResult::suppressed(target.name()));
                continue;
            }

            let target_start = Instant::now();
            match Builder::for_format(target.format).build(&self.context, target) {
                Ok(built) => {
                    let duration = target_start.elapsed();
                    info!(
                        target = %target.name(),
                        format = %target.format,
                        "built {} -> {} in {:?}",
                        format_size(built.bytes_in),
                        format_size(built.bytes_out),
                        duration
                    );
                    result.add_result(TargetResult::success(target.name(), built, duration));
                }
                Err(e) if e.is_fatal() || !self.context.is_watch() => return Err(e),
                Err(e) => {
                    error!(target = %target.name(), "{}", e);
                    result.add_result(TargetResult::failed(
                        target.name(),
                        e.to_string(),
                        target_start.elapsed(),
                    ));
                }
            }
        }

        result.total_duration = start.elapsed();
        Ok(result)
    }
}
