//! Unified error types for peerdiff.
//!
//! Errors are isolated to the smallest unit that failed: one package's
//! metadata, one file entry, or one rule file. Only configuration and rule
//! loading errors are fatal to a run.

use crate::model::BuildSide;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for peerdiff operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum InspectError {
    /// Loading or parsing package metadata failed
    #[error("Failed to load metadata for package '{package}': {source}")]
    MetadataLoad {
        package: String,
        #[source]
        source: MetadataErrorKind,
    },

    /// A file entry could not be correlated
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// A security rule pattern could not be compiled
    #[error("Invalid rule pattern '{pattern}': {reason}")]
    RulePattern { pattern: String, reason: String },

    /// Errors while parsing input documents (manifests, rule files)
    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Specific metadata load error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MetadataErrorKind {
    #[error("loader failed: {0}")]
    Loader(String),

    #[error("loader returned metadata for '{found}'")]
    NameMismatch { found: String },
}

/// A file entry that could not be correlated between builds.
///
/// Recorded by the peer index; correlation of the remaining entries in the
/// package continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot correlate {side} entry #{position} of '{package}': {reason}")]
pub struct CorrelationError {
    pub package: String,
    pub side: BuildSide,
    /// Position of the entry in its snapshot's file list
    pub position: usize,
    /// Payload path as given, possibly empty
    pub localpath: String,
    pub reason: String,
}

/// Convenient Result type for peerdiff operations
pub type Result<T> = std::result::Result<T, InspectError>;

impl InspectError {
    /// Create a metadata load error from a failing loader
    pub fn metadata_load(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetadataLoad {
            package: package.into(),
            source: MetadataErrorKind::Loader(message.into()),
        }
    }

    /// Create a rule pattern error
    pub fn rule_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RulePattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let message = format!("{source}");
        Self::Io {
            path: Some(path.into()),
            message,
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Name of the package this error is scoped to, if any.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::MetadataLoad { package, .. } => Some(package),
            Self::Correlation(err) => Some(&err.package),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InspectError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for InspectError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("JSON document", err.to_string())
    }
}

impl From<serde_yaml::Error> for InspectError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::parse("YAML document", err.to_string())
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Context strings are chained outermost first, e.g.
/// `"loading rules: parsing YAML document: ..."`.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<InspectError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: InspectError, new_ctx: &str) -> InspectError {
    match err {
        InspectError::Parse { context, message } => InspectError::Parse {
            context: chain_context(new_ctx, &context),
            message,
        },
        InspectError::Io {
            path,
            message,
            source,
        } => InspectError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        InspectError::Config(msg) => InspectError::Config(chain_context(new_ctx, &msg)),
        InspectError::RulePattern { pattern, reason } => InspectError::RulePattern {
            pattern,
            reason: chain_context(new_ctx, &reason),
        },
        // Package-scoped errors already carry their own context
        other => other,
    }
}

/// Chain two context strings together.
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}
