//! Configuration for inspection runs.
//!
//! - Type-safe configuration structures with a builder
//! - Validation for all configuration values
//! - YAML config file loading and discovery
//! - Command line override merging
//!
//! # Configuration File
//!
//! Place a `.peerdiff.yaml` file in the working directory or
//! `~/.config/peerdiff/`:
//!
//! ```yaml
//! threshold: bad
//! favor_release: newest
//! security_rules: /etc/peerdiff/rules.yaml
//! ignores:
//!   - /usr/share/doc/**
//! inspection_ignores:
//!   permissions:
//!     - /var/tmp/**
//! fileinfo:
//!   - path: /usr/bin/sudo
//!     mode: "4111"
//!     owner: root
//!     group: root
//! capabilities:
//!   - package: iputils
//!     path: /usr/bin/ping
//!     capabilities: cap_net_raw=p
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{
    DEFAULT_FORBIDDEN_GROUPS, DEFAULT_FORBIDDEN_OWNERS, DEFAULT_SECURITY_PATH_PREFIXES,
    DEFAULT_THRESHOLD,
};
pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError, CONFIG_FILE_NAMES,
};
pub use types::{CapsEntry, FileInfoEntry, OutputConfig, RunConfig, RunConfigBuilder};
pub use validation::{ConfigError, Validatable};

/// Generate a JSON Schema for the `RunConfig` file format.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(RunConfig);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
