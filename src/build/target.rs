//! Build target definitions.
//!
//! A target is one declared unit of work: a format, the inputs to read, the
//! outputs to write and format-specific options. Targets are created once per
//! invocation and are read-only afterwards.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TARGET_REF: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a loaded target.
///
/// Assigned at load time and never derived from content, so two textually
/// identical targets are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetRef(u64);

impl TargetRef {
    /// Allocate a fresh reference.
    pub fn next() -> Self {
        Self(NEXT_TARGET_REF.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input format of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Plain style sheets
    Css,
    /// Scripts
    Js,
    /// SCSS (brace syntax) compiled by the external sass compiler
    Scss,
    /// Sass (indented syntax) compiled by the external sass compiler
    Sass,
    /// Markdown rendered to HTML
    Md,
}

/// How a format combines per-item results into outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Each input item produces its own output file
    OneToOne,
    /// All input items are concatenated into every output file
    ManyToOne,
}

impl Format {
    /// All known formats.
    pub const ALL: [Format; 5] = [Format::Css, Format::Js, Format::Scss, Format::Sass, Format::Md];

    /// Lowercase name used in configuration and logs.
    pub fn name(self) -> &'static str {
        match self {
            Format::Css => "css",
            Format::Js => "js",
            Format::Scss => "scss",
            Format::Sass => "sass",
            Format::Md => "md",
        }
    }

    /// File extensions recognized for this format, without the leading dot.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Format::Css => &["css"],
            Format::Js => &["js"],
            Format::Scss => &["scss"],
            Format::Sass => &["sass"],
            Format::Md => &["md"],
        }
    }

    /// Output combination mode. Fixed per format.
    pub fn build_mode(self) -> BuildMode {
        match self {
            Format::Md => BuildMode::OneToOne,
            _ => BuildMode::ManyToOne,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognized format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}' (expected one of: css, js, scss, sass, md)")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "css" => Ok(Format::Css),
            "js" | "javascript" => Ok(Format::Js),
            "scss" => Ok(Format::Scss),
            "sass" => Ok(Format::Sass),
            "md" | "markdown" => Ok(Format::Md),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A loaded build target.
#[derive(Debug, Clone)]
pub struct Target {
    id: TargetRef,
    /// Input format
    pub format: Format,
    /// Human-readable label
    pub label: Option<String>,
    /// Include entries: file paths, directory paths or absolute URLs
    pub includes: Vec<String>,
    /// Output path templates
    pub outputs: Vec<String>,
    /// Case-insensitive substrings excluding resolved paths
    pub excludes: Vec<String>,
    /// Additional extensions (lowercase, no leading dot) treated as this format's inputs
    pub extensions: Vec<String>,
    /// Format-specific options
    pub options: Map<String, Value>,
}

impl Target {
    /// Create a target with a fresh identity.
    pub fn new(format: Format, includes: Vec<String>, outputs: Vec<String>) -> Self {
        Self {
            id: TargetRef::next(),
            format,
            label: None,
            includes,
            outputs,
            excludes: vec![],
            extensions: vec![],
            options: Map::new(),
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the exclusion substrings.
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Set additional extensions. A leading dot is accepted and stripped.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Set a single option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Set all options.
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Identity token.
    pub fn id(&self) -> TargetRef {
        self.id
    }

    /// Label, or a generated name when no label is set.
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{} target {}", self.format, self.id),
        }
    }

    /// Read a boolean option. Missing or non-boolean values are `false`.
    pub fn option_bool(&self, key: &str) -> bool {
        self.options.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether a file extension (with or without dot, any case) is an input of this target.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        self.format.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext))
            || self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}
