//! Configuration file loading and discovery.

use super::types::RunConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
pub const CONFIG_FILE_NAMES: &[&str] = &[".peerdiff.yaml", ".peerdiff.yml", "peerdiff.yaml"];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. User config directory (~/.config/peerdiff/)
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Some(path) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_in_dir(&cwd))
    {
        return Some(path);
    }

    dirs::config_dir().and_then(|dir| find_config_in_dir(&dir.join("peerdiff")))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Load a `RunConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<RunConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: RunConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
///
/// An explicit path that fails to load is an error; a discovered file that
/// fails to load is logged and skipped.
pub fn load_or_default(
    explicit_path: Option<&Path>,
) -> Result<(RunConfig, Option<PathBuf>), ConfigFileError> {
    if let Some(path) = explicit_path {
        return load_config_file(path).map(|config| (config, Some(path.to_path_buf())));
    }

    Ok(discover_config_file(None).map_or_else(
        || (RunConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config file");
                (config, Some(path))
            }
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (RunConfig::default(), None)
            }
        },
    ))
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl RunConfig {
    /// Merge another config into this one, with `other` taking precedence
    /// wherever it differs from the defaults.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        if other.threshold != defaults.threshold {
            self.threshold = other.threshold;
        }
        if other.favor_release != defaults.favor_release {
            self.favor_release = other.favor_release;
        }
        if other.security_rules.is_some() {
            self.security_rules.clone_from(&other.security_rules);
        }
        self.waivers.extend(other.waivers.iter().map(|(s, a)| (*s, *a)));
        self.ignores.extend(other.ignores.iter().cloned());
        for (inspection, globs) in &other.inspection_ignores {
            self.inspection_ignores
                .entry(inspection.clone())
                .or_default()
                .extend(globs.iter().cloned());
        }
        if other.security_path_prefixes != defaults.security_path_prefixes {
            self.security_path_prefixes
                .clone_from(&other.security_path_prefixes);
        }
        if other.forbidden_owners != defaults.forbidden_owners {
            self.forbidden_owners.clone_from(&other.forbidden_owners);
        }
        if other.forbidden_groups != defaults.forbidden_groups {
            self.forbidden_groups.clone_from(&other.forbidden_groups);
        }
        self.fileinfo.extend(other.fileinfo.iter().cloned());
        self.capabilities.extend(other.capabilities.iter().cloned());
        if !other.inspections.is_empty() {
            self.inspections.clone_from(&other.inspections);
        }
        if other.output.format != defaults.output.format {
            self.output.format = other.output.format;
        }
        if other.output.file.is_some() {
            self.output.file.clone_from(&other.output.file);
        }
        if other.output.no_color {
            self.output.no_color = true;
        }
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    format!(
        "# peerdiff configuration\n\
         # Place this file at .peerdiff.yaml in your project root or ~/.config/peerdiff/\n\n{}",
        serde_yaml::to_string(&RunConfig::default()).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use crate::peers::FavorRelease;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join(".peerdiff.yml"), "threshold: bad\n").expect("write");
        let found = find_config_in_dir(tmp.path()).expect("found");
        assert!(found.ends_with(".peerdiff.yml"));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(find_config_in_dir(tmp.path()).is_none());
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("peerdiff.yaml");
        std::fs::write(
            &path,
            "threshold: bad\nfavor_release: newest\nignores:\n  - /usr/share/doc/**\n",
        )
        .expect("write");

        let config = load_config_file(&path).expect("load");
        assert_eq!(config.threshold, Severity::Bad);
        assert_eq!(config.favor_release, FavorRelease::Newest);
        assert_eq!(config.ignores, vec!["/usr/share/doc/**".to_string()]);
        // Unset fields keep their defaults
        assert!(!config.security_path_prefixes.is_empty());
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/peerdiff.yaml")).expect_err("missing");
        assert!(matches!(err, ConfigFileError::NotFound(_)));
    }

    #[test]
    fn test_explicit_path_errors_propagate() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("broken.yaml");
        std::fs::write(&path, "threshold: [not, a, severity]\n").expect("write");
        assert!(matches!(
            load_or_default(Some(&path)),
            Err(ConfigFileError::Parse(_))
        ));
    }

    #[test]
    fn test_config_merge() {
        let mut base = RunConfig::builder().ignore("/a/**").build();
        let overrides = RunConfig::builder()
            .threshold(Severity::Bad)
            .ignore("/b/**")
            .build();
        base.merge(&overrides);
        assert_eq!(base.threshold, Severity::Bad);
        assert_eq!(base.ignores, vec!["/a/**".to_string(), "/b/**".to_string()]);
    }

    #[test]
    fn test_load_fileinfo_and_capabilities() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("peerdiff.yaml");
        std::fs::write(
            &path,
            "fileinfo:\n  - path: /usr/bin/sudo\n    mode: '4111'\n    owner: root\n    \
             group: root\ncapabilities:\n  - package: iputils\n    path: /usr/bin/ping\n    \
             capabilities: cap_net_raw=p\n",
        )
        .expect("write");

        let config = load_config_file(&path).expect("load");
        assert_eq!(config.fileinfo[0].permissions(), Some(0o4111));
        assert!(config
            .expected_fileinfo("/usr/bin/sudo", 0o4111, "root", "root")
            .is_some());
        assert!(config
            .expected_fileinfo("/usr/bin/sudo", 0o4755, "root", "root")
            .is_none());
        assert_eq!(
            config.allowed_capabilities("iputils", "/usr/bin/ping"),
            Some("cap_net_raw=p")
        );
        assert_eq!(config.allowed_capabilities("other", "/usr/bin/ping"), None);
    }

    #[test]
    fn test_generate_example_config_parses() {
        let example = generate_example_config();
        let parsed: RunConfig = serde_yaml::from_str(&example).expect("valid yaml");
        assert_eq!(parsed, RunConfig::default());
    }
}
