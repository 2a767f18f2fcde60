//! API requests and operational commands.

use crate::error::{ProtocolError, ProtocolResult};
use configpump_xml::XPath;
use quick_xml::escape::partial_escape;
use std::fmt;

/// Prefix every partial-load destination must start with.
pub const CONFIG_ROOT: &str = "/config/";

/// Which lock an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    /// Exclusive right to change the candidate configuration.
    Config,
    /// Exclusive right to commit.
    Commit,
}

impl LockKind {
    /// Lowercase name as used in commands.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockKind::Config => "config",
            LockKind::Commit => "commit",
        }
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operational (`type=op`) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpCommand {
    /// Ask whether the candidate configuration has uncommitted changes.
    CheckPendingChanges,
    /// List the locks of one kind.
    ShowLocks(LockKind),
    /// Take a lock with a comment.
    AddLock {
        /// Lock to take.
        kind: LockKind,
        /// Comment stored with the lock.
        comment: String,
    },
    /// Release a lock held by this session's user.
    RemoveLock(LockKind),
    /// Query an asynchronous job.
    ShowJob {
        /// Job id returned by the commit.
        job_id: String,
    },
    /// Replace one subtree of the candidate with the same subtree of a
    /// previously imported file.
    LoadPartial {
        /// Path inside the imported file.
        from_xpath: String,
        /// Destination path in the candidate configuration.
        to_xpath: String,
        /// Name of the imported file.
        file_name: String,
    },
    /// Discard candidate changes.
    RevertConfig,
}

impl OpCommand {
    /// Builds a partial load for `to_xpath` from `file_name`.
    ///
    /// The source path is the destination with its first `/config/` removed.
    /// Destinations outside `/config/` and selectors that do not compile are
    /// rejected.
    pub fn load_partial(to_xpath: &str, file_name: &str) -> ProtocolResult<Self> {
        if !to_xpath.starts_with(CONFIG_ROOT) {
            return Err(ProtocolError::OutsideConfig(to_xpath.to_string()));
        }
        XPath::compile(to_xpath).map_err(ProtocolError::Selector)?;

        Ok(OpCommand::LoadPartial {
            from_xpath: to_xpath.replacen(CONFIG_ROOT, "", 1),
            to_xpath: to_xpath.to_string(),
            file_name: file_name.to_string(),
        })
    }

    /// Renders the `cmd` parameter.
    pub fn to_xml(&self) -> String {
        match self {
            OpCommand::CheckPendingChanges => {
                "<check><pending-changes></pending-changes></check>".to_string()
            }
            OpCommand::ShowLocks(kind) => format!("<show><{k}-locks></{k}-locks></show>", k = kind),
            OpCommand::AddLock { kind, comment } => format!(
                "<request><{k}-lock><add><comment>{c}</comment></add></{k}-lock></request>",
                k = kind,
                c = partial_escape(comment)
            ),
            OpCommand::RemoveLock(kind) => format!(
                "<request><{k}-lock><remove></remove></{k}-lock></request>",
                k = kind
            ),
            OpCommand::ShowJob { job_id } => {
                format!("<show><jobs><id>{}</id></jobs></show>", partial_escape(job_id))
            }
            OpCommand::LoadPartial {
                from_xpath,
                to_xpath,
                file_name,
            } => format!(
                "<load><config><partial><mode>replace</mode><from-xpath>{}</from-xpath><to-xpath>{}</to-xpath><from>{}</from></partial></config></load>",
                partial_escape(from_xpath),
                partial_escape(to_xpath),
                partial_escape(file_name)
            ),
            OpCommand::RevertConfig => "<revert><config></config></revert>".to_string(),
        }
    }

    /// Label recorded in the operation log.
    pub fn call_type(&self) -> String {
        match self {
            OpCommand::CheckPendingChanges => "check pending changes".to_string(),
            OpCommand::ShowLocks(kind) => format!("show {} locks", kind),
            OpCommand::AddLock { kind, .. } => format!("add {} lock", kind),
            OpCommand::RemoveLock(kind) => format!("remove {} lock", kind),
            OpCommand::ShowJob { .. } => "show jobs".to_string(),
            OpCommand::LoadPartial { .. } => "load partial configuration".to_string(),
            OpCommand::RevertConfig => "revert configuration".to_string(),
        }
    }
}

/// A request to the XML API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `GET type=op`.
    Op(OpCommand),
    /// `GET type=commit` with a description.
    Commit {
        /// Commit description.
        description: String,
    },
    /// `GET type=export&category=configuration`.
    ExportConfiguration,
    /// `POST type=import&category=configuration` with a multipart file.
    ImportConfiguration {
        /// File name the device stores the upload under.
        file_name: String,
        /// File content.
        content: String,
    },
}

impl Request {
    /// Query parameters, excluding the API key.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Request::Op(command) => vec![("type", "op".to_string()), ("cmd", command.to_xml())],
            Request::Commit { description } => vec![
                ("type", "commit".to_string()),
                (
                    "cmd",
                    format!(
                        "<commit><description>{}</description></commit>",
                        partial_escape(description)
                    ),
                ),
            ],
            Request::ExportConfiguration => vec![
                ("type", "export".to_string()),
                ("category", "configuration".to_string()),
            ],
            Request::ImportConfiguration { .. } => vec![
                ("type", "import".to_string()),
                ("category", "configuration".to_string()),
            ],
        }
    }

    /// Returns true if the request is sent as a multipart POST.
    pub fn is_upload(&self) -> bool {
        matches!(self, Request::ImportConfiguration { .. })
    }

    /// Label recorded in the operation log.
    pub fn call_type(&self) -> String {
        match self {
            Request::Op(command) => command.call_type(),
            Request::Commit { .. } => "commit".to_string(),
            Request::ExportConfiguration => "export configuration".to_string(),
            Request::ImportConfiguration { .. } => "import configuration".to_string(),
        }
    }
}

impl From<OpCommand> for Request {
    fn from(command: OpCommand) -> Self {
        Request::Op(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TO: &str =
        "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='Netbox']";

    #[test]
    fn lock_commands() {
        let add = OpCommand::AddLock {
            kind: LockKind::Config,
            comment: "ConfigPump change ID: abc".into(),
        };
        assert_eq!(
            add.to_xml(),
            "<request><config-lock><add><comment>ConfigPump change ID: abc</comment></add></config-lock></request>"
        );
        assert_eq!(add.call_type(), "add config lock");

        let remove = OpCommand::RemoveLock(LockKind::Commit);
        assert_eq!(
            remove.to_xml(),
            "<request><commit-lock><remove></remove></commit-lock></request>"
        );
        assert_eq!(remove.call_type(), "remove commit lock");

        let show = OpCommand::ShowLocks(LockKind::Commit);
        assert_eq!(show.to_xml(), "<show><commit-locks></commit-locks></show>");
        assert_eq!(show.call_type(), "show commit locks");
    }

    #[test]
    fn load_partial_derives_source_path() {
        let command = OpCommand::load_partial(TO, "configpump_fw1.xml").unwrap();
        assert_eq!(
            command.to_xml(),
            format!(
                "<load><config><partial><mode>replace</mode><from-xpath>devices/entry[@name='localhost.localdomain']/template/entry[@name='Netbox']</from-xpath><to-xpath>{}</to-xpath><from>configpump_fw1.xml</from></partial></config></load>",
                TO
            )
        );
    }

    #[test]
    fn load_partial_rejects_bad_selectors() {
        assert!(matches!(
            OpCommand::load_partial("/shared/address", "f.xml"),
            Err(ProtocolError::OutsideConfig(_))
        ));
        assert!(matches!(
            OpCommand::load_partial("/config/devices/entry[", "f.xml"),
            Err(ProtocolError::Selector(_))
        ));
    }

    #[test]
    fn comments_are_escaped() {
        let add = OpCommand::AddLock {
            kind: LockKind::Commit,
            comment: "a < b & c".into(),
        };
        assert!(add.to_xml().contains("<comment>a &lt; b &amp; c</comment>"));
    }

    #[test]
    fn request_queries() {
        assert_eq!(
            Request::ExportConfiguration.query(),
            vec![("type", "export".to_string()), ("category", "configuration".to_string())]
        );
        let commit = Request::Commit {
            description: "ConfigPump change ID: 1".into(),
        };
        assert_eq!(
            commit.query()[1].1,
            "<commit><description>ConfigPump change ID: 1</description></commit>"
        );
        let job: Request = OpCommand::ShowJob { job_id: "7".into() }.into();
        assert_eq!(job.query()[1].1, "<show><jobs><id>7</id></jobs></show>");
        assert_eq!(job.call_type(), "show jobs");

        let import = Request::ImportConfiguration {
            file_name: "f.xml".into(),
            content: "<config/>".into(),
        };
        assert!(import.is_upload());
        assert_eq!(import.call_type(), "import configuration");
    }
}
