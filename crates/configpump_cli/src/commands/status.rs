//! Status command implementation.

use super::read_file;
use configpump_engine::{DiffView, SyncStatus, XPathScope};
use serde::Serialize;
use std::path::Path;

/// Drift report printed by `status --format json`.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Diff counters and render health.
    #[serde(flatten)]
    pub status: SyncStatus,
    /// Whether nothing differs.
    pub in_sync: bool,
    /// Both sides as compared.
    pub view: DiffView,
}

/// Runs the status command.
pub fn run(
    remote: &Path,
    rendered: &Path,
    xpath_file: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let remote = read_file(remote)?;
    let rendered = read_file(rendered)?;
    let scope = match xpath_file {
        Some(path) => XPathScope::parse_manual(&read_file(path)?)?,
        None => XPathScope::Deduced,
    };

    let status = SyncStatus::evaluate(&remote, &rendered);
    let view = DiffView::build(&remote, &rendered, &scope.entries(&rendered))?;
    let result = StatusResult {
        status,
        in_sync: status.in_sync(),
        view,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text(&result),
    }
    Ok(())
}

fn print_text(result: &StatusResult) {
    println!(
        "Rendered configuration: {}",
        if result.status.config_render_ok {
            "valid"
        } else {
            "INVALID"
        }
    );
    println!("Lines added:   {}", result.status.lines_added);
    println!("Lines removed: {}", result.status.lines_removed);
    println!("Lines changed: {}", result.status.lines_changed);
    println!();
    if result.in_sync {
        println!("✓ In sync");
    } else {
        println!("✗ Out of sync");
    }
}
