//! Configuration schema types for `zbundle.json`
//!
//! The configuration file is a JSON5 array of target objects.

use crate::build::{Format, Target};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One target as declared in the configuration file.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Input format (case-insensitive)
    pub mode: Format,
    /// Human-readable label
    #[serde(default)]
    pub label: Option<String>,
    /// Files, directories or absolute URLs to read
    #[serde(default)]
    pub include: Vec<String>,
    /// Output path templates
    #[serde(default)]
    pub output: Vec<String>,
    /// Case-insensitive substrings excluding resolved paths
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Additional extensions treated as inputs of this format
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Format-specific options
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "[0].include")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.field, self.message)
    }
}

impl TargetConfig {
    /// Validate one target declared at `index`.
    pub fn validate(&self, index: usize) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let at = match &self.label {
            Some(label) => format!("[{}] ({})", index, label),
            None => format!("[{}]", index),
        };

        if self.include.is_empty() {
            errors.push(ConfigValidationError {
                field: format!("{}.include", at),
                message: "must contain at least one entry".to_string(),
            });
        }
        if self.output.is_empty() {
            errors.push(ConfigValidationError {
                field: format!("{}.output", at),
                message: "must contain at least one entry".to_string(),
            });
        }
        if self.include.iter().chain(&self.output).any(|e| e.trim().is_empty()) {
            errors.push(ConfigValidationError {
                field: at,
                message: "include and output entries must be non-empty strings".to_string(),
            });
        }

        errors
    }

    /// Create the target, assigning it a fresh identity.
    pub fn into_target(self) -> Target {
        let mut target = Target::new(self.mode, self.include, self.output)
            .with_excludes(self.exclude)
            .with_extensions(self.extensions)
            .with_options(self.options);
        target.label = self.label;
        target
    }
}

/// Validate every target of a configuration.
pub fn validate_all(configs: &[TargetConfig]) -> Vec<ConfigValidationError> {
    configs.iter().enumerate().flat_map(|(i, c)| c.validate(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<TargetConfig> {
        json5::from_str(src).unwrap()
    }

    #[test]
    fn test_minimal_target() {
        let configs = parse(r#"[{ mode: "css", include: ["a.css"], output: ["out.css"] }]"#);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].mode, Format::Css);
        assert!(configs[0].label.is_none());
        assert!(configs[0].exclude.is_empty());
        assert!(validate_all(&configs).is_empty());
    }

    #[test]
    fn test_full_target_with_comments() {
        let configs = parse(
            r#"[
                // site styles
                {
                    "mode": "SCSS",
                    "label": "site",
                    "include": ["scss"],
                    "output": ["dist/site.css"],
                    "exclude": ["_drafts"],
                    "extensions": [".pcss"],
                    "options": { "extended": true },
                    "unknown": 42,
                },
            ]"#,
        );
        let target = configs[0].clone().into_target();
        assert_eq!(target.format, Format::Scss);
        assert_eq!(target.name(), "site");
        assert_eq!(target.excludes, vec!["_drafts".to_string()]);
        assert_eq!(target.extensions, vec!["pcss".to_string()]);
        assert!(target.option_bool("extended"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result: Result<Vec<TargetConfig>, _> =
            json5::from_str(r#"[{ mode: "less", include: ["a"], output: ["b"] }]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_lists() {
        let configs = parse(r#"[{ mode: "js", label: "app", include: [], output: [""] }]"#);
        let errors = validate_all(&configs);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "[0] (app).include");
        assert!(errors[1].to_string().contains("non-empty strings"));
    }

    #[test]
    fn test_identical_targets_are_distinct() {
        let configs = parse(
            r#"[{ mode: "css", include: ["a.css"], output: ["o.css"] },
                { mode: "css", include: ["a.css"], output: ["o.css"] }]"#,
        );
        let targets: Vec<Target> = configs.into_iter().map(TargetConfig::into_target).collect();
        assert_ne!(targets[0].id(), targets[1].id());
    }
}
