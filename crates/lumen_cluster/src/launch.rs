//! # Node Provisioning
//!
//! Launches node processes so a root can bring up an entire cluster from
//! one configuration pass.
//!
//! ## Design
//!
//! A [`Launcher`] is the abstract spawn capability: backed locally by
//! process creation, remotely by a remote-shell invocation. Launch failures
//! are reported, never retried here - retry policy belongs to the caller.
//!
//! Remote commands come from a configured template with positional
//! substitutions: `%h` host, `%e` executable, `%d` working directory,
//! `%a` argument string.

use std::process::{Child, Command, Stdio};

use tracing::info;

use crate::config::NodeConfig;
use crate::error::ClusterError;

/// A fully resolved node launch request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Host to launch on.
    pub host: String,
    /// Node executable path.
    pub executable: String,
    /// Working directory for the node process.
    pub dir: String,
    /// Arguments passed to the node executable.
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Builds a launch command from a node's configuration.
    #[must_use]
    pub fn from_node(node: &NodeConfig) -> Self {
        Self {
            host: node.host.clone(),
            executable: node.executable.clone(),
            dir: node.dir.clone(),
            args: node.args.clone(),
        }
    }

    /// Renders the command through a template.
    ///
    /// Substitutes `%h`, `%e`, `%d`, and `%a`; everything else passes
    /// through verbatim.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        template
            .replace("%h", &self.host)
            .replace("%e", &self.executable)
            .replace("%d", &self.dir)
            .replace("%a", &self.args.join(" "))
    }
}

/// Handle to a launched node process.
#[derive(Debug)]
pub struct LaunchHandle {
    inner: HandleInner,
}

#[derive(Debug)]
enum HandleInner {
    Process(Child),
    Detached,
}

impl LaunchHandle {
    /// Wraps a spawned child process.
    #[must_use]
    pub fn from_child(child: Child) -> Self {
        Self {
            inner: HandleInner::Process(child),
        }
    }

    /// A handle with no local process, for launchers that cannot observe
    /// the spawned side (and for mocks).
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            inner: HandleInner::Detached,
        }
    }

    /// Returns the local process id, if one exists.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        match &self.inner {
            HandleInner::Process(child) => Some(child.id()),
            HandleInner::Detached => None,
        }
    }
}

/// Abstract process-launch capability.
pub trait Launcher {
    /// Spawns one node process.
    fn spawn(&mut self, command: &LaunchCommand) -> Result<LaunchHandle, ClusterError>;
}

/// Launches nodes as local child processes.
#[derive(Debug, Default)]
pub struct LocalLauncher;

impl LocalLauncher {
    /// Creates a local launcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Launcher for LocalLauncher {
    fn spawn(&mut self, command: &LaunchCommand) -> Result<LaunchHandle, ClusterError> {
        let mut process = Command::new(&command.executable);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        if !command.dir.is_empty() {
            process.current_dir(&command.dir);
        }
        let child = process.spawn().map_err(|source| ClusterError::Launch {
            command: command.executable.clone(),
            source,
        })?;
        info!(executable = %command.executable, pid = child.id(), "launched local node");
        Ok(LaunchHandle::from_child(child))
    }
}

/// Launches nodes through a remote shell.
#[derive(Debug)]
pub struct SshLauncher {
    /// Remote-shell executable, `ssh` by default.
    pub shell: String,
    /// Command template rendered per node; see [`LaunchCommand::render`].
    pub template: String,
}

impl SshLauncher {
    /// Creates a remote launcher with the given command template.
    #[must_use]
    pub fn new(template: &str) -> Self {
        Self {
            shell: "ssh".into(),
            template: template.into(),
        }
    }
}

impl Launcher for SshLauncher {
    fn spawn(&mut self, command: &LaunchCommand) -> Result<LaunchHandle, ClusterError> {
        let remote = command.render(&self.template);
        let child = Command::new(&self.shell)
            .arg(&command.host)
            .arg(&remote)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| ClusterError::Launch {
                command: format!("{} {} {remote}", self.shell, command.host),
                source,
            })?;
        info!(host = %command.host, command = %remote, "launched remote node");
        Ok(LaunchHandle::from_child(child))
    }
}

/// Mock launcher recording every spawn request, for testing.
#[derive(Debug, Default)]
pub struct MockLauncher {
    /// Commands received, in order.
    pub commands: Vec<LaunchCommand>,
    /// When set, every spawn reports this error kind.
    pub fail_with: Option<std::io::ErrorKind>,
}

impl MockLauncher {
    /// Creates a mock launcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Launcher for MockLauncher {
    fn spawn(&mut self, command: &LaunchCommand) -> Result<LaunchHandle, ClusterError> {
        self.commands.push(command.clone());
        if let Some(kind) = self.fail_with {
            return Err(ClusterError::Launch {
                command: command.executable.clone(),
                source: std::io::Error::from(kind),
            });
        }
        Ok(LaunchHandle::detached())
    }
}

/// Provisions every configured node through a launcher.
///
/// The first failure is surfaced to the caller; nodes launched before it
/// keep running.
pub fn provision_nodes(
    nodes: &[NodeConfig],
    launcher: &mut dyn Launcher,
) -> Result<Vec<LaunchHandle>, ClusterError> {
    let mut handles = Vec::with_capacity(nodes.len());
    for node in nodes {
        handles.push(launcher.spawn(&LaunchCommand::from_node(node))?);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> LaunchCommand {
        LaunchCommand {
            host: "render-07".into(),
            executable: "/opt/lumen/bin/lumen".into(),
            dir: "/opt/lumen".into(),
            args: vec!["node.toml".into(), "--quiet".into()],
        }
    }

    #[test]
    fn test_template_substitution() {
        let rendered = command().render("cd %d && %e %a # on %h");
        assert_eq!(
            rendered,
            "cd /opt/lumen && /opt/lumen/bin/lumen node.toml --quiet # on render-07"
        );
    }

    #[test]
    fn test_template_without_tokens_passes_through() {
        assert_eq!(command().render("uptime"), "uptime");
    }

    #[test]
    fn test_provision_records_each_node() {
        let nodes = vec![
            NodeConfig {
                host: "a".into(),
                executable: "lumen".into(),
                ..NodeConfig::default()
            },
            NodeConfig {
                host: "b".into(),
                executable: "lumen".into(),
                ..NodeConfig::default()
            },
        ];
        let mut launcher = MockLauncher::new();
        let handles = provision_nodes(&nodes, &mut launcher).unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(launcher.commands[0].host, "a");
        assert_eq!(launcher.commands[1].host, "b");
        assert!(handles[0].id().is_none());
    }

    #[test]
    fn test_provision_surfaces_failure() {
        let nodes = vec![NodeConfig::default()];
        let mut launcher = MockLauncher::new();
        launcher.fail_with = Some(std::io::ErrorKind::NotFound);
        let err = provision_nodes(&nodes, &mut launcher).unwrap_err();
        assert!(matches!(err, ClusterError::Launch { .. }));
    }

    #[test]
    fn test_local_launcher_missing_executable_fails() {
        let mut launcher = LocalLauncher::new();
        let missing = LaunchCommand {
            host: String::new(),
            executable: "/no/such/lumen-node-binary".into(),
            dir: String::new(),
            args: Vec::new(),
        };
        assert!(matches!(
            launcher.spawn(&missing),
            Err(ClusterError::Launch { .. })
        ));
    }
}
