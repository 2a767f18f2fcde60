//! CLI command implementations.

pub mod status;
pub mod sync;
pub mod xml;

use std::path::Path;

/// Reads a file, naming it in the error.
pub fn read_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e).into())
}
