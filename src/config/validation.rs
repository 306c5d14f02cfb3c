//! Configuration validation.

use super::types::{OutputConfig, RunConfig};
use crate::inspect::{IgnoreSet, BUILTIN_INSPECTIONS};
use crate::model::Severity;

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for RunConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.threshold == Severity::Skip {
            errors.push(ConfigError::new(
                "threshold",
                "SKIP is never reported and cannot be a threshold",
            ));
        }

        if let Some(path) = &self.security_rules {
            if !path.exists() {
                errors.push(ConfigError::new(
                    "security_rules",
                    format!("Rule file does not exist: {}", path.display()),
                ));
            }
        }

        if let Err(e) = IgnoreSet::new(&self.ignores) {
            errors.push(ConfigError::new("ignores", e.to_string()));
        }

        for (inspection, globs) in &self.inspection_ignores {
            let field = format!("inspection_ignores.{inspection}");
            if !BUILTIN_INSPECTIONS.contains(&inspection.as_str()) {
                errors.push(ConfigError::new(
                    field.clone(),
                    format!(
                        "Unknown inspection '{inspection}'. Valid options: {}",
                        BUILTIN_INSPECTIONS.join(", ")
                    ),
                ));
            }
            if let Err(e) = IgnoreSet::new(globs) {
                errors.push(ConfigError::new(field, e.to_string()));
            }
        }

        for name in &self.inspections {
            if !BUILTIN_INSPECTIONS.contains(&name.as_str()) {
                errors.push(ConfigError::new(
                    "inspections",
                    format!(
                        "Unknown inspection '{name}'. Valid options: {}",
                        BUILTIN_INSPECTIONS.join(", ")
                    ),
                ));
            }
        }

        for prefix in &self.security_path_prefixes {
            if !prefix.starts_with('/') {
                errors.push(ConfigError::new(
                    "security_path_prefixes",
                    format!("Prefix '{prefix}' must be an absolute payload path"),
                ));
            }
        }

        for (idx, info) in self.fileinfo.iter().enumerate() {
            let field = format!("fileinfo[{idx}]");
            if !info.path.starts_with('/') {
                errors.push(ConfigError::new(
                    field.clone(),
                    format!("Path '{}' must be an absolute payload path", info.path),
                ));
            }
            if info.permissions().is_none() {
                errors.push(ConfigError::new(
                    field,
                    format!("Mode '{}' is not an octal permission value", info.mode),
                ));
            }
        }

        for (idx, caps) in self.capabilities.iter().enumerate() {
            let field = format!("capabilities[{idx}]");
            if caps.package.trim().is_empty() {
                errors.push(ConfigError::new(field.clone(), "Package name is empty"));
            }
            if !caps.path.starts_with('/') {
                errors.push(ConfigError::new(
                    field,
                    format!("Path '{}' must be an absolute payload path", caps.path),
                ));
            }
        }

        errors.extend(self.output.validate());
        errors
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(parent) = self.file.as_deref().and_then(std::path::Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                errors.push(ConfigError::new(
                    "output.file",
                    format!("Parent directory does not exist: {}", parent.display()),
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CapsEntry, FileInfoEntry};

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().is_valid());
    }

    #[test]
    fn test_skip_threshold_rejected() {
        let config = RunConfig::builder().threshold(Severity::Skip).build();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "threshold");
    }

    #[test]
    fn test_unknown_inspection_and_bad_glob() {
        let config = RunConfig::builder()
            .inspections(vec!["nosuchcheck".to_string()])
            .inspection_ignore("filechanges", "/usr/[")
            .build();
        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"inspections".to_string()));
        assert!(fields.contains(&"inspection_ignores.filechanges".to_string()));
    }

    #[test]
    fn test_bad_fileinfo_and_capabilities_rejected() {
        let mut config = RunConfig::builder()
            .fileinfo(FileInfoEntry::new("/usr/bin/sudo", 0o4111, "root", "root"))
            .capabilities(CapsEntry::new("iputils", "/usr/bin/ping", "cap_net_raw=p"))
            .build();
        assert!(config.is_valid());

        config.fileinfo[0].mode = "rwsr-xr-x".to_string();
        config.capabilities[0].path = "usr/bin/ping".to_string();
        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["fileinfo[0]", "capabilities[0]"]);
    }

    #[test]
    fn test_relative_security_prefix_rejected() {
        let config = RunConfig::builder()
            .security_path_prefixes(vec!["etc/".to_string()])
            .build();
        assert!(!config.is_valid());
    }
}
