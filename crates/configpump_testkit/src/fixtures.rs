//! Test fixtures.
//!
//! Sample configurations, canned API responses and helpers for running the
//! orchestrator without waiting between polls.

use configpump_engine::{Orchestrator, PanoramaTransport, PluginSettings, PollConfig};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

/// A rendered configuration with two templates and one device group.
pub fn sample_rendered_config() -> String {
    r#"<config version="10.2.0">
  <devices>
    <entry name="localhost.localdomain">
      <template>
        <entry name="Netbox">
          <config>
            <deviceconfig>
              <system>
                <hostname>fw1</hostname>
              </system>
            </deviceconfig>
          </config>
        </entry>
        <entry name="Netbox2">
          <description>managed</description>
        </entry>
      </template>
      <device-group>
        <entry name="Branches">
          <description>all branches</description>
        </entry>
      </device-group>
    </entry>
  </devices>
</config>
"#
    .to_string()
}

/// A remote configuration that differs from [`sample_rendered_config`] in
/// the `Netbox` hostname and carries an unmanaged template and shared
/// section.
pub fn sample_remote_config() -> String {
    r#"<config version="10.2.0">
  <shared>
    <address/>
  </shared>
  <devices>
    <entry name="localhost.localdomain">
      <template>
        <entry name="Netbox">
          <config>
            <deviceconfig>
              <system>
                <hostname>old-fw1</hostname>
              </system>
            </deviceconfig>
          </config>
        </entry>
        <entry name="Legacy">
          <description>not managed</description>
        </entry>
      </template>
    </entry>
  </devices>
</config>
"#
    .to_string()
}

/// Selectors deduced from [`sample_rendered_config`].
pub fn sample_xpath_entries() -> Vec<String> {
    vec![
        "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='Netbox']"
            .to_string(),
        "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='Netbox2']"
            .to_string(),
        "/config/devices/entry[@name='localhost.localdomain']/device-group/entry[@name='Branches']"
            .to_string(),
    ]
}

/// Canned Panorama API response bodies.
pub mod responses {
    /// A successful response with a plain result.
    pub fn ok() -> String {
        r#"<response status="success"><result>ok</result></response>"#.to_string()
    }

    /// A successful response carrying a message.
    pub fn ok_msg(message: &str) -> String {
        format!(
            r#"<response status="success"><msg>{}</msg></response>"#,
            message
        )
    }

    /// An error response with one message line.
    pub fn error(message: &str) -> String {
        format!(
            r#"<response status="error"><msg><line>{}</line></msg></response>"#,
            message
        )
    }

    /// Pending changes check: none.
    pub fn no_pending() -> String {
        r#"<response status="success"><result>no</result></response>"#.to_string()
    }

    /// Pending changes check: some.
    pub fn pending() -> String {
        r#"<response status="success"><result>yes</result></response>"#.to_string()
    }

    /// Lock listing with no entries. `kind` is `config` or `commit`.
    pub fn no_locks(kind: &str) -> String {
        format!(
            r#"<response status="success"><result><{k}-locks/></result></response>"#,
            k = kind
        )
    }

    /// Lock listing with one entry held by `holder`.
    pub fn locks_held(kind: &str, holder: &str) -> String {
        format!(
            r#"<response status="success"><result><{k}-locks><entry name="{h}"><comment>held</comment></entry></{k}-locks></result></response>"#,
            k = kind,
            h = holder
        )
    }

    /// Commit accepted and queued as `job_id`.
    pub fn commit_queued(job_id: &str) -> String {
        format!(
            r#"<response status="success" code="19"><result><msg><line>Commit job enqueued with jobid {j}</line></msg><job>{j}</job></result></response>"#,
            j = job_id
        )
    }

    /// Commit job finished.
    pub fn job_ok(job_id: &str) -> String {
        format!(
            r#"<response status="success"><result><job><id>{}</id><type>Commit</type><status>FIN</status><result>OK</result><progress>100</progress></job></result></response>"#,
            job_id
        )
    }

    /// Commit job still running.
    pub fn job_pending(job_id: &str, progress: u8) -> String {
        format!(
            r#"<response status="success"><result><job><id>{}</id><type>Commit</type><status>ACT</status><result>PEND</result><progress>{}</progress></job></result></response>"#,
            job_id, progress
        )
    }
}

/// Builds an orchestrator that polls `attempts` times without sleeping.
pub fn fast_orchestrator<T: PanoramaTransport>(transport: T) -> Orchestrator<T> {
    fast_orchestrator_with_attempts(transport, 5)
}

/// Like [`fast_orchestrator`] with an explicit poll budget.
pub fn fast_orchestrator_with_attempts<T: PanoramaTransport>(
    transport: T,
    attempts: u32,
) -> Orchestrator<T> {
    Orchestrator::new(transport)
        .with_poll_config(PollConfig::new(attempts).with_interval(Duration::ZERO))
}

/// Plugin settings written to a temporary file.
///
/// The file is removed when the value is dropped.
pub struct SettingsFile {
    file: NamedTempFile,
}

impl SettingsFile {
    /// Writes `json` to a new temporary file.
    pub fn new(json: &str) -> Self {
        let mut file = NamedTempFile::new().expect("Failed to create settings file");
        file.write_all(json.as_bytes())
            .expect("Failed to write settings file");
        Self { file }
    }

    /// Settings with one template `lab` pointing at `url` with token key
    /// `lab-token`.
    pub fn lab(url: &str) -> Self {
        let json = serde_json::json!({
            "default_request_timeout": 5,
            "tokens": { "lab-token": "LABSECRET" },
            "connection_templates": [{
                "name": "lab",
                "panorama_url": url,
                "token_key": "lab-token"
            }]
        });
        Self::new(&json.to_string())
    }

    /// Path of the file.
    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Loads the settings back.
    pub fn load(&self) -> PluginSettings {
        PluginSettings::from_path(self.file.path()).expect("Failed to load settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configpump_xml::{deduce_xpath_entries, is_valid};

    #[test]
    fn samples_are_valid() {
        assert!(is_valid(&sample_rendered_config()));
        assert!(is_valid(&sample_remote_config()));
    }

    #[test]
    fn sample_entries_match_deduction() {
        assert_eq!(
            deduce_xpath_entries(&sample_rendered_config()),
            sample_xpath_entries()
        );
    }

    #[test]
    fn lab_settings_resolve() {
        let file = SettingsFile::lab("https://pano.example");
        let settings = file.load();
        let template = settings.template("lab").unwrap();
        let connection = settings.resolve(template).unwrap();
        assert_eq!(connection.token, "LABSECRET");
        assert_eq!(connection.api_url(), "https://pano.example/api/");
    }
}
