//! Bundled external compilers.
//!
//! External tools ship next to the executable under
//! `ext/<tool>/<os>-<arch>/<binary>`. This module detects the host platform,
//! locates a tool for it and runs it with a bounded wait.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default upper bound on one external compiler run.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Error locating or running an external tool.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToolchainError {
    /// Host operating system is not supported at all
    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),
    /// Host CPU architecture has no bundled tools
    #[error("unsupported platform: {os}-{arch}")]
    UnsupportedPlatform {
        /// Host operating system
        os: String,
        /// Host CPU architecture
        arch: String,
    },
    /// Expected tool binary is missing
    #[error("extension not found for {tool}: {}", path.display())]
    NotFound {
        /// Tool name
        tool: String,
        /// Path that was checked
        path: PathBuf,
    },
    /// Process could not be started
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        /// Program path
        program: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// Process did not exit in time and was killed
    #[error("{} did not finish within {timeout:?}", program.display())]
    TimedOut {
        /// Program path
        program: PathBuf,
        /// Time limit that was exceeded
        timeout: Duration,
    },
    /// Pipe or wait failure
    #[error("I/O error talking to external process: {0}")]
    Io(#[from] io::Error),
}

/// Host platform as named in the bundled tool layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// One of `win`, `linux`, `osx`
    pub os: &'static str,
    /// One of `x64`, `arm64`, `arm`
    pub arch: &'static str,
}

impl Platform {
    /// Detect the platform this process runs on.
    pub fn detect() -> Result<Self, ToolchainError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust's OS and architecture names to the tool layout.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self, ToolchainError> {
        let os_name = os_dir_name(os)?;
        let arch_name = match arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "arm" => "arm",
            _ => {
                return Err(ToolchainError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };

        Ok(Self { os: os_name, arch: arch_name })
    }

    /// Directory name such as `linux-x64`.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Binary name of a tool, `<tool>.bat` on Windows.
    pub fn binary_name(&self, tool: &str) -> String {
        if self.os == "win" {
            format!("{}.bat", tool)
        } else {
            tool.to_string()
        }
    }
}

/// Map Rust's OS name to the tool layout.
pub fn os_dir_name(os: &str) -> Result<&'static str, ToolchainError> {
    match os {
        "windows" => Ok("win"),
        "linux" => Ok("linux"),
        "macos" => Ok("osx"),
        _ => Err(ToolchainError::UnsupportedOs(os.to_string())),
    }
}

/// Check that zbundle can run on the host OS.
///
/// The architecture is only checked when a bundled tool is located, so
/// builds that need no external tool work on any architecture.
pub fn check_host_os() -> Result<&'static str, ToolchainError> {
    os_dir_name(std::env::consts::OS)
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Directory holding the running executable, or the current directory.
pub fn default_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Path a tool is expected at for a platform.
pub fn tool_path(root: &Path, tool: &str, platform: &Platform) -> PathBuf {
    root.join("ext").join(tool).join(platform.dir_name()).join(platform.binary_name(tool))
}

/// Locate a bundled tool for the host platform.
pub fn locate(root: &Path, tool: &str) -> Result<PathBuf, ToolchainError> {
    let platform = Platform::detect()?;
    let path = tool_path(root, tool, &platform);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ToolchainError::NotFound { tool: tool.to_string(), path })
    }
}

/// Captured result of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status
    pub status: ExitStatus,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // A broken pipe just ends the capture
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_with_deadline(
    child: &mut Child,
    program: &Path,
    timeout: Duration,
) -> Result<ExitStatus, ToolchainError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolchainError::TimedOut { program: program.to_path_buf(), timeout });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run a command, optionally feeding stdin, and capture its output.
///
/// Output pipes are drained on background threads so a chatty child cannot
/// block on a full pipe. A child still running at the deadline is killed.
pub fn run_with_timeout(
    command: &mut Command,
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<ProcessOutput, ToolchainError> {
    let program = PathBuf::from(command.get_program());
    debug!(program = %program.display(), "running external process");

    let mut child = command
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolchainError::Spawn { program: program.clone(), source })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        let input = input.to_string();
        // Dropping the handle at the end of the thread closes stdin
        thread::spawn(move || {
            let _ = pipe.write_all(input.as_bytes());
            let _ = pipe.write_all(b"\n");
        });
    }

    let status = wait_with_deadline(&mut child, &program, timeout)?;

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    Ok(ProcessOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}
