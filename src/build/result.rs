//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Build succeeded
    Success,
    /// Build skipped because the target ran moments ago
    Suppressed,
    /// Build failed with error
    Failed(String),
}

impl BuildStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Suppressed)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, BuildStatus::Failed(_))
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Suppressed => write!(f, "suppressed"),
            BuildStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Outputs and sizes of one successful target build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Files written
    pub outputs: Vec<PathBuf>,
    /// Bytes of input content consumed
    pub bytes_in: usize,
    /// Bytes written per output
    pub bytes_out: usize,
}

/// Result of building a single target.
#[derive(Debug, Clone)]
pub struct TargetResult {
    /// Name of the target
    pub target: String,
    /// Build status
    pub status: BuildStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
    /// Input size in bytes
    pub bytes_in: usize,
    /// Output size in bytes
    pub bytes_out: usize,
    /// Build duration
    pub duration: Duration,
}

impl TargetResult {
    /// Create a successful result.
    pub fn success(target: String, output: BuildOutput, duration: Duration) -> Self {
        Self {
            target,
            status: BuildStatus::Success,
            outputs: output.outputs,
            bytes_in: output.bytes_in,
            bytes_out: output.bytes_out,
            duration,
        }
    }

    /// Create a suppressed result.
    pub fn suppressed(target: String) -> Self {
        Self {
            target,
            status: BuildStatus::Suppressed,
            outputs: vec![],
            bytes_in: 0,
            bytes_out: 0,
            duration: Duration::ZERO,
        }
    }

    /// Create a failed result.
    pub fn failed(target: String, error: String, duration: Duration) -> Self {
        Self {
            target,
            status: BuildStatus::Failed(error),
            outputs: vec![],
            bytes_in: 0,
            bytes_out: 0,
            duration,
        }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each target
    pub targets: Vec<TargetResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target result.
    pub fn add_result(&mut self, result: TargetResult) {
        self.targets.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of successful targets.
    pub fn success_count(&self) -> usize {
        self.targets.iter().filter(|r| matches!(r.status, BuildStatus::Success)).count()
    }

    /// Get the number of suppressed targets.
    pub fn suppressed_count(&self) -> usize {
        self.targets.iter().filter(|r| matches!(r.status, BuildStatus::Suppressed)).count()
    }

    /// Get the number of failed targets.
    pub fn failed_count(&self) -> usize {
        self.targets.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Whether at least one target actually executed.
    pub fn any_built(&self) -> bool {
        self.targets.iter().any(|r| !matches!(r.status, BuildStatus::Suppressed))
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.targets.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get failed target results.
    pub fn failures(&self) -> Vec<&TargetResult> {
        self.targets.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let suppressed = self.suppressed_count();
        let failed = self.failed_count();
        let total = self.targets.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} suppressed, {} failed ({} total)",
                success, suppressed, failed, total
            ));
            for target in self.failures() {
                lines.push(format!("  - {}: {}", target.target, target.status));
            }
        } else if !self.any_built() {
            lines.push("Nothing built".to_string());
        } else {
            let bytes_out: usize = self.targets.iter().map(|r| r.bytes_out).sum();
            lines.push(format!(
                "Build succeeded: {} built, {} suppressed ({} total), {} written in {:?}",
                success,
                suppressed,
                total,
                format_size(bytes_out),
                self.total_duration
            ));
        }

        lines.join("\n")
    }
}

/// Human-readable byte count: `bytes`, `KB`, `MB` or `GB` with one decimal.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
