//! Shared utilities.

mod hash;
mod version;

pub use hash::Fingerprint;
pub use version::{compare_evr, compare_versions};
