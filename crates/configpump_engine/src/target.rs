//! The device whose configuration is synchronized.

use crate::error::{EngineError, EngineResult};
use configpump_protocol::CONFIG_ROOT;
use configpump_xml::{deduce_xpath_entries, XPath};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_\-.]").expect("valid file name pattern"));

/// Builds the import file name `<prefix>_<device>.xml`.
///
/// The device name is trimmed and lowercased, whitespace runs become `_`
/// and characters outside `[a-z0-9_.-]` are dropped.
pub fn deduce_file_name(prefix: &str, device_name: &str) -> String {
    let lowered = device_name.trim().to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&lowered, "_");
    let safe = UNSAFE_FILE_CHARS.replace_all(&underscored, "");
    format!("{}_{}.xml", prefix, safe)
}

/// How the XPath scope of a target is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum XPathScope {
    /// Derived from the templates and device groups in the rendered
    /// configuration.
    #[default]
    Deduced,
    /// An explicit list of selectors.
    Manual(Vec<String>),
}

impl XPathScope {
    /// Parses manual entries, one selector per line.
    ///
    /// Blank lines are skipped and `[]` means an empty list. Every entry
    /// must start with `/config/` and compile.
    pub fn parse_manual(text: &str) -> EngineResult<Self> {
        let text = text.trim();
        if text.is_empty() || text == "[]" {
            return Ok(XPathScope::Manual(Vec::new()));
        }

        let mut entries = Vec::new();
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if !line.starts_with(CONFIG_ROOT) {
                return Err(EngineError::validation(format!(
                    "XPath entry must start with '/config/': {}",
                    line
                )));
            }
            XPath::compile(line)?;
            entries.push(line.to_string());
        }
        Ok(XPathScope::Manual(entries))
    }

    /// The selectors for a rendered configuration.
    pub fn entries(&self, rendered: &str) -> Vec<String> {
        match self {
            XPathScope::Deduced => deduce_xpath_entries(rendered),
            XPathScope::Manual(entries) => entries.clone(),
        }
    }
}

/// A device configuration kept in sync with Panorama.
///
/// The orchestrator reads the desired configuration and scope from the
/// target and hands the exported remote configuration back to it.
pub trait SyncTarget: Send + Sync {
    /// Device name, used to derive the import file name.
    fn device_name(&self) -> &str;

    /// The desired configuration as XML.
    fn rendered_configuration(&self) -> EngineResult<String>;

    /// Selectors of the subtrees this target owns.
    fn xpath_entries(&self) -> EngineResult<Vec<String>>;

    /// Stores the remote configuration extracted at the end of a run.
    fn store_configuration(&self, configuration: &str) -> EngineResult<()>;
}

/// An in-memory sync target for testing.
#[derive(Debug)]
pub struct MemorySyncTarget {
    device_name: String,
    rendered: String,
    scope: XPathScope,
    stored: RwLock<Option<String>>,
    fail_store: bool,
}

impl MemorySyncTarget {
    /// Creates a target with a deduced scope.
    pub fn new(device_name: impl Into<String>, rendered: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            rendered: rendered.into(),
            scope: XPathScope::Deduced,
            stored: RwLock::new(None),
            fail_store: false,
        }
    }

    /// Sets the scope.
    pub fn with_scope(mut self, scope: XPathScope) -> Self {
        self.scope = scope;
        self
    }

    /// Makes every store fail.
    pub fn with_failing_store(mut self) -> Self {
        self.fail_store = true;
        self
    }

    /// The last stored configuration.
    pub fn stored(&self) -> Option<String> {
        self.stored.read().clone()
    }
}

impl SyncTarget for MemorySyncTarget {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn rendered_configuration(&self) -> EngineResult<String> {
        Ok(self.rendered.clone())
    }

    fn xpath_entries(&self) -> EngineResult<Vec<String>> {
        Ok(self.scope.entries(&self.rendered))
    }

    fn store_configuration(&self, configuration: &str) -> EngineResult<()> {
        if self.fail_store {
            return Err(EngineError::Persist("storage is read-only".into()));
        }
        *self.stored.write() = Some(configuration.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(deduce_file_name("configpump", "FW-01"), "configpump_fw-01.xml");
        assert_eq!(
            deduce_file_name("pfx", "  Edge  FW\tHelsinki (B) "),
            "pfx_edge_fw_helsinki_b.xml"
        );
        assert_eq!(deduce_file_name("pfx", "fw.example.com"), "pfx_fw.example.com.xml");
        assert_eq!(deduce_file_name("pfx", "äö"), "pfx_.xml");
    }

    #[test]
    fn manual_scope_parsing() {
        let scope = XPathScope::parse_manual(
            "\n /config/shared/address \n\n/config/devices/entry[@name='localhost.localdomain']/template\n",
        )
        .unwrap();
        assert_eq!(
            scope,
            XPathScope::Manual(vec![
                "/config/shared/address".into(),
                "/config/devices/entry[@name='localhost.localdomain']/template".into(),
            ])
        );

        assert_eq!(XPathScope::parse_manual("[]").unwrap(), XPathScope::Manual(vec![]));
        assert_eq!(XPathScope::parse_manual("  ").unwrap(), XPathScope::Manual(vec![]));
    }

    #[test]
    fn manual_scope_rejects_bad_entries() {
        let err = XPathScope::parse_manual("/shared/address").unwrap_err();
        assert_eq!(err.to_string(), "XPath entry must start with '/config/': /shared/address");

        let err = XPathScope::parse_manual("/config/shared[").unwrap_err();
        assert!(matches!(err, EngineError::Xml(_)));
    }

    #[test]
    fn deduced_scope_follows_rendered_config() {
        let rendered = "<config><devices><entry name=\"localhost.localdomain\"><template><entry name=\"T1\"/></template></entry></devices></config>";
        let target = MemorySyncTarget::new("fw1", rendered);
        assert_eq!(
            target.xpath_entries().unwrap(),
            vec!["/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='T1']"]
        );
    }

    #[test]
    fn memory_target_stores() {
        let target = MemorySyncTarget::new("fw1", "<config/>");
        assert_eq!(target.stored(), None);
        target.store_configuration("<config/>\n").unwrap();
        assert_eq!(target.stored().as_deref(), Some("<config/>\n"));

        let failing = MemorySyncTarget::new("fw1", "<config/>").with_failing_store();
        assert!(matches!(
            failing.store_configuration("x"),
            Err(EngineError::Persist(_))
        ));
    }
}
