//! Drift between the stored remote configuration and the rendered one.

use crate::error::EngineResult;
use configpump_xml::{diff, extract, normalize};
use serde::{Deserialize, Serialize};

/// Diff counters and render health of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Lines only in the rendered configuration.
    pub lines_added: usize,
    /// Lines only in the remote configuration.
    pub lines_removed: usize,
    /// Lines that differ.
    pub lines_changed: usize,
    /// Whether the rendered configuration is well-formed XML.
    pub config_render_ok: bool,
}

impl SyncStatus {
    /// Compares the last pulled remote configuration with the rendered one.
    pub fn evaluate(remote: &str, rendered: &str) -> Self {
        let counters = diff(remote, rendered, false);
        Self {
            lines_added: counters.added,
            lines_removed: counters.removed,
            lines_changed: counters.changed,
            config_render_ok: normalize(rendered).1,
        }
    }

    /// Returns true if the rendered configuration is valid and identical.
    pub fn in_sync(&self) -> bool {
        self.config_render_ok
            && self.lines_added == 0
            && self.lines_removed == 0
            && self.lines_changed == 0
    }
}

/// Both sides of a diff prepared for display.
///
/// Each side is normalized when valid and shown raw otherwise. The rendered
/// side is narrowed to the target's scope so it lines up with the exported
/// remote configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffView {
    /// Remote side.
    pub remote: String,
    /// Whether the remote side is valid XML.
    pub remote_valid: bool,
    /// Rendered side.
    pub rendered: String,
    /// Whether the rendered side is valid XML.
    pub rendered_valid: bool,
}

impl DiffView {
    /// Builds the view for a remote configuration, a rendered one and the
    /// scope selectors.
    pub fn build<S: AsRef<str>>(remote: &str, rendered: &str, scope: &[S]) -> EngineResult<Self> {
        let (remote_norm, remote_valid) = normalize(remote);
        let (rendered_norm, rendered_valid) = normalize(rendered);

        let rendered_side = if rendered_valid {
            extract(&rendered_norm, scope)?
        } else {
            rendered.to_string()
        };

        Ok(Self {
            remote: if remote_valid { remote_norm } else { remote.to_string() },
            remote_valid,
            rendered: rendered_side,
            rendered_valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_changes() {
        let remote = "<config><a>1</a><b>2</b></config>";
        let rendered = "<config><a>1</a><b>3</b><c/></config>";
        let status = SyncStatus::evaluate(remote, rendered);
        assert_eq!(status.lines_changed, 1);
        assert_eq!(status.lines_added, 1);
        assert_eq!(status.lines_removed, 0);
        assert!(status.config_render_ok);
        assert!(!status.in_sync());
    }

    #[test]
    fn identical_configs_are_in_sync() {
        let status = SyncStatus::evaluate("<config><a/></config>", "<config>\n  <a></a>\n</config>");
        assert!(status.in_sync());
    }

    #[test]
    fn nothing_pulled_yet() {
        let status = SyncStatus::evaluate("", "<config><a/><b/></config>");
        assert_eq!(status.lines_added, 4);
        assert!(!status.in_sync());
    }

    #[test]
    fn broken_render() {
        let status = SyncStatus::evaluate("<config/>", "<config>");
        assert!(!status.config_render_ok);
        assert_eq!(status.lines_removed, 1);
        assert!(!status.in_sync());
    }

    #[test]
    fn diff_view_scopes_rendered_side() {
        let view = DiffView::build(
            "<config><shared/></config>",
            "<config><shared/><devices/></config>",
            &["/config/shared"],
        )
        .unwrap();
        assert!(view.remote_valid && view.rendered_valid);
        assert_eq!(view.remote, "<config>\n  <shared/>\n</config>\n");
        assert_eq!(view.rendered, "<config>\n  <shared/>\n</config>\n");

        let view = DiffView::build("junk", "<config>", &["/config/shared"]).unwrap();
        assert!(!view.remote_valid);
        assert_eq!(view.remote, "junk");
        assert_eq!(view.rendered, "<config>");
    }
}
