//! CLI command handlers.
//!
//! Handlers hold the logic of each subcommand and are invoked by main.rs.
//! They return the process exit code; main.rs exits with it.

mod inspect;
pub mod manifest;
mod output;

pub use inspect::{inspect_builds, run_inspect, InspectOptions};
pub use manifest::{BuildManifest, LoadedBuild};
pub use output::{should_use_color, write_output, OutputTarget};

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Every inspection stayed below the threshold
    pub const SUCCESS: i32 = 0;
    /// A finding reached the failure threshold
    pub const THRESHOLD_REACHED: i32 = 1;
    /// An error occurred
    pub const ERROR: i32 = 3;
}
