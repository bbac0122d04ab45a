//! Build command implementations (build, watch, run)

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use super::{EXIT_ERROR, EXIT_SUCCESS, EXIT_TARGET_FAILED};
use crate::build::{BuildContext, BuildError, BuildPipeline, Target};
use crate::config::{load_targets, resolve_config_path};
use crate::watch::{WatchEngine, WatchError, WatchOptions};

/// Relative paths resolve against the directory zbundle runs in.
fn base_dir() -> Result<PathBuf, ExitCode> {
    std::env::current_dir().map_err(|e| {
        error!("cannot determine the current directory: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn load(config: Option<&Path>, base: &Path) -> Result<Vec<Target>, ExitCode> {
    let path = resolve_config_path(config, base);
    load_targets(&path).map_err(|e| {
        error!("{}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn exit_code_for(err: &BuildError) -> ExitCode {
    if err.is_fatal() {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_TARGET_FAILED)
    }
}

/// Build targets once.
fn build_once(targets: &[Target], base: PathBuf) -> ExitCode {
    let pipeline = BuildPipeline::new(BuildContext::new(base));

    match pipeline.build_all(targets, None) {
        Ok(result) => {
            info!("{}", result.summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            error!("{}", e);
            exit_code_for(&e)
        }
    }
}

/// Run the build command
pub fn run_build(config: Option<&Path>) -> ExitCode {
    let base = match base_dir() {
        Ok(base) => base,
        Err(code) => return code,
    };
    let targets = match load(config, &base) {
        Ok(targets) => targets,
        Err(code) => return code,
    };

    build_once(&targets, base)
}

/// Run the watch command
pub fn run_watch(config: Option<&Path>, options: WatchOptions) -> ExitCode {
    let base = match base_dir() {
        Ok(base) => base,
        Err(code) => return code,
    };
    let targets = match load(config, &base) {
        Ok(targets) => targets,
        Err(code) => return code,
    };

    info!("Starting watch mode, press Ctrl+C to stop");
    let pipeline = BuildPipeline::new(BuildContext::new(base).with_watch(true));

    match WatchEngine::new(pipeline, targets, options).run() {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(WatchError::Build(e)) => {
            error!("{}", e);
            exit_code_for(&e)
        }
        Err(e) => {
            error!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the run command
pub fn run_target(target: Target) -> ExitCode {
    match base_dir() {
        Ok(base) => build_once(std::slice::from_ref(&target), base),
        Err(code) => code,
    }
}
