//! Pull and push command implementations.

use super::read_file;
use crate::SyncArgs;
use configpump_engine::{
    EngineError, EngineResult, HttpTransport, JobReport, Orchestrator, PluginSettings, SyncKind,
    SyncTarget, XPathScope,
};
use configpump_protocol::Redactor;
use std::path::{Path, PathBuf};

/// A sync target backed by files.
///
/// The rendered configuration is re-read on every run and the pulled
/// configuration overwrites the output file.
#[derive(Debug)]
pub struct FileSyncTarget {
    device_name: String,
    rendered: PathBuf,
    output: PathBuf,
    scope: XPathScope,
}

impl FileSyncTarget {
    /// Creates a target with a deduced scope.
    pub fn new(device_name: impl Into<String>, rendered: PathBuf, output: PathBuf) -> Self {
        Self {
            device_name: device_name.into(),
            rendered,
            output,
            scope: XPathScope::Deduced,
        }
    }

    /// Sets the scope.
    pub fn with_scope(mut self, scope: XPathScope) -> Self {
        self.scope = scope;
        self
    }

    /// The stored configuration, if any has been written.
    pub fn stored(&self) -> Option<String> {
        std::fs::read_to_string(&self.output).ok()
    }

    fn read_rendered(&self) -> EngineResult<String> {
        std::fs::read_to_string(&self.rendered).map_err(|e| {
            EngineError::config(format!(
                "failed to read rendered configuration {:?}: {}",
                self.rendered, e
            ))
        })
    }
}

impl SyncTarget for FileSyncTarget {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn rendered_configuration(&self) -> EngineResult<String> {
        self.read_rendered()
    }

    fn xpath_entries(&self) -> EngineResult<Vec<String>> {
        Ok(self.scope.entries(&self.read_rendered()?))
    }

    fn store_configuration(&self, configuration: &str) -> EngineResult<()> {
        std::fs::write(&self.output, configuration)
            .map_err(|e| EngineError::Persist(format!("{:?}: {}", self.output, e)))
    }
}

/// Runs a pull, push or push-and-pull and prints the job report.
pub fn run(kind: SyncKind, args: &SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = PluginSettings::from_path(&args.settings)?;
    let template = settings.template(&args.template)?;
    let connection = settings.resolve(template)?;
    tracing::info!(
        template = %template.name,
        url = %connection.panorama_url,
        device = %args.device,
        %kind,
        "starting job"
    );

    let target = build_target(args)?;
    let orchestrator = Orchestrator::new(HttpTransport::connect(&connection)?)
        .with_poll_config(settings.poll_config())
        .with_file_name_prefix(connection.file_name_prefix.clone());

    let outcome = match kind {
        SyncKind::Pull => orchestrator.pull(&target),
        SyncKind::Push => orchestrator.push(&target),
        SyncKind::PushAndPull => orchestrator.push_and_pull(&target),
    };

    let redactor = Redactor::new(settings.secrets());
    let report = JobReport::new(&outcome, target.stored().as_deref(), &redactor);
    let json = report.to_json_pretty()?;
    match &args.report {
        Some(path) => write_report(path, &json)?,
        None => println!("{}", json),
    }

    match report.error {
        Some(error) if !report.success => Err(error.into()),
        _ => Ok(()),
    }
}

fn build_target(args: &SyncArgs) -> Result<FileSyncTarget, Box<dyn std::error::Error>> {
    let target = FileSyncTarget::new(&args.device, args.rendered.clone(), args.output.clone());
    Ok(match &args.xpath_file {
        Some(path) => target.with_scope(XPathScope::parse_manual(&read_file(path)?)?),
        None => target,
    })
}

fn write_report(path: &Path, json: &str) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, json).map_err(|e| format!("Failed to write {:?}: {}", path, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RENDERED: &str = "<config><devices><entry name=\"localhost.localdomain\"><template><entry name=\"T1\"/></template></entry></devices></config>";

    fn target(dir: &TempDir) -> FileSyncTarget {
        let rendered = dir.path().join("rendered.xml");
        std::fs::write(&rendered, RENDERED).unwrap();
        FileSyncTarget::new("fw1", rendered, dir.path().join("pulled.xml"))
    }

    #[test]
    fn deduces_scope_from_rendered_file() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir);
        assert_eq!(
            target.xpath_entries().unwrap(),
            vec!["/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='T1']"]
        );
        assert_eq!(target.rendered_configuration().unwrap(), RENDERED);
    }

    #[test]
    fn stores_to_output_file() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir);
        assert_eq!(target.stored(), None);
        target.store_configuration("<config/>\n").unwrap();
        assert_eq!(target.stored().as_deref(), Some("<config/>\n"));
    }

    #[test]
    fn manual_scope_wins() {
        let dir = TempDir::new().unwrap();
        let target = target(&dir).with_scope(XPathScope::Manual(vec!["/config/shared".into()]));
        assert_eq!(target.xpath_entries().unwrap(), vec!["/config/shared"]);
    }

    #[test]
    fn missing_rendered_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let target = FileSyncTarget::new(
            "fw1",
            dir.path().join("missing.xml"),
            dir.path().join("out.xml"),
        );
        let err = target.rendered_configuration().unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn unwritable_output_is_persist_error() {
        let dir = TempDir::new().unwrap();
        let target = FileSyncTarget::new(
            "fw1",
            dir.path().join("rendered.xml"),
            dir.path().join("no-such-dir").join("out.xml"),
        );
        let err = target.store_configuration("<config/>").unwrap_err();
        assert!(matches!(err, EngineError::Persist(_)));
    }
}
