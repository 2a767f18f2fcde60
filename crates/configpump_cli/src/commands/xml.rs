//! Offline XML commands.

use super::read_file;
use configpump_xml::{deduce_xpath_entries, normalize as normalize_xml};
use serde::Serialize;
use std::path::Path;

/// Line counters as printed by `diff --format json`.
#[derive(Debug, Serialize)]
struct DiffOutput {
    added: usize,
    removed: usize,
    changed: usize,
}

/// Runs the normalize command.
pub fn normalize(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (normalized, valid) = normalize_xml(&read_file(file)?);
    if !valid {
        return Err(format!("{:?} is not well-formed XML", file).into());
    }
    print!("{}", normalized);
    Ok(())
}

/// Runs the diff command.
pub fn diff(
    current: &Path,
    new: &Path,
    ignore_whitespace: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let counters = configpump_xml::diff(&read_file(current)?, &read_file(new)?, ignore_whitespace);

    match format {
        "json" => {
            let output = DiffOutput {
                added: counters.added,
                removed: counters.removed,
                changed: counters.changed,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("Added:   {}", counters.added);
            println!("Removed: {}", counters.removed);
            println!("Changed: {}", counters.changed);
        }
    }
    Ok(())
}

/// Runs the extract command.
///
/// Explicit selectors come first, followed by the ones deduced from
/// `scope_from`.
pub fn extract(
    file: &Path,
    mut xpaths: Vec<String>,
    scope_from: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(rendered) = scope_from {
        xpaths.extend(deduce_xpath_entries(&read_file(rendered)?));
    }
    if xpaths.is_empty() {
        return Err("No selectors given; use --xpath or --scope-from".into());
    }

    let extracted = configpump_xml::extract(&read_file(file)?, &xpaths)?;
    print!("{}", extracted);
    Ok(())
}

/// Runs the scope command.
pub fn scope(rendered: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let entries = deduce_xpath_entries(&read_file(rendered)?);
    if entries.is_empty() {
        tracing::warn!(file = ?rendered, "no templates or device groups found");
    }
    for entry in entries {
        println!("{}", entry);
    }
    Ok(())
}
