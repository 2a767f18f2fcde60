//! # ConfigPump Testkit
//!
//! Test utilities for ConfigPump.
//!
//! This crate provides:
//! - Sample Panorama configurations and API response bodies
//! - Property-based generators for configuration documents using proptest
//! - An in-memory Panorama that keeps locks, staged files and commit jobs
//! - File-backed settings helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use configpump_testkit::prelude::*;
//!
//! #[test]
//! fn push_converges() {
//!     let panorama = FakePanorama::new(sample_remote_config());
//!     let target = MemorySyncTarget::new("fw1", sample_rendered_config());
//!     let outcome = fast_orchestrator(&panorama).push(&target);
//!     assert!(outcome.success);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fake_panorama;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fake_panorama::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use configpump_engine::{MemorySyncTarget, Orchestrator, SyncTarget};
}

pub use fake_panorama::*;
pub use fixtures::*;
pub use generators::*;
