//! # Bootstrap Configuration
//!
//! The cluster's own startup file: role, ports, window, displays, and the
//! node provisioning table. Loaded once at startup from TOML.
//!
//! Role selection is implicit: a config that names an upstream `server` is
//! a node; one that does not is the root.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClusterError;
use crate::frame::ClockMode;
use crate::integration::Frustum;
use crate::{DEFAULT_PORT, DEFAULT_SYNC_TIMEOUT_MS};

/// The process's role in the cluster, fixed for its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterRole {
    /// Holds authoritative input and timing; drives the event broadcast.
    Root,
    /// Replicates the root's frame by applying the received event stream.
    Node,
}

/// A window or viewport rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Default for WindowRect {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            w: 800,
            h: 600,
        }
    }
}

/// Frame clock configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Run with a fixed step instead of wall-clock time.
    pub benchmark: bool,
    /// Fixed frame rate for movie capture; implies a fixed step.
    pub capture_fps: Option<f64>,
}

impl ClockConfig {
    /// Resolves the configured clock mode.
    #[must_use]
    pub fn mode(&self) -> ClockMode {
        if let Some(fps) = self.capture_fps {
            ClockMode::Capture { fps }
        } else if self.benchmark {
            ClockMode::Benchmark {
                dt: ClockMode::BENCHMARK_DT,
            }
        } else {
            ClockMode::RealTime
        }
    }
}

/// Per-display calibration defaults.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationDefaults {
    /// Display position offset, in world units.
    pub position: [f32; 3],
    /// Display rotation offset, in degrees.
    pub rotation: [f32; 3],
}

/// One display surface driven by this process.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display name, for logs.
    pub name: String,
    /// Viewport rectangle within the window.
    pub viewport: WindowRect,
    /// Renderer channel (eye/pass) index.
    pub channel: u32,
    /// Calibration defaults applied at startup.
    pub calibration: CalibrationDefaults,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            name: "display".into(),
            viewport: WindowRect::default(),
            channel: 0,
            calibration: CalibrationDefaults::default(),
        }
    }
}

/// One remote node to auto-provision at root startup.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Host to launch on. Empty or "localhost" means a local process.
    pub host: String,
    /// Node executable path.
    pub executable: String,
    /// Working directory for the node process.
    pub dir: String,
    /// Arguments passed to the node executable.
    pub args: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            executable: String::new(),
            dir: String::new(),
            args: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Returns true if this node runs on the local machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.host.is_empty() || self.host == "localhost" || self.host == "127.0.0.1"
    }
}

/// The complete cluster bootstrap configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Upstream root host. Present on nodes, absent on the root.
    pub server: Option<String>,
    /// Event-stream port (listen port on the root, connect port on nodes).
    pub port: u16,
    /// Optional control-channel listen port on the root.
    pub script_port: Option<u16>,
    /// Bound on the `sync()` barrier wait, in milliseconds.
    pub sync_timeout_ms: u64,
    /// Window rectangle for this process.
    pub window: WindowRect,
    /// Frame clock settings.
    pub clock: ClockConfig,
    /// Remote-shell launch template; see [`crate::launch`].
    pub launch_template: String,
    /// Displays driven by this process.
    pub displays: Vec<DisplayConfig>,
    /// Nodes the root provisions at startup.
    pub nodes: Vec<NodeConfig>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: DEFAULT_PORT,
            script_port: None,
            sync_timeout_ms: DEFAULT_SYNC_TIMEOUT_MS,
            window: WindowRect::default(),
            clock: ClockConfig::default(),
            launch_template: "cd %d && %e %a".into(),
            displays: vec![DisplayConfig::default()],
            nodes: Vec::new(),
        }
    }
}

impl ClusterConfig {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ClusterError> {
        let text = std::fs::read_to_string(path).map_err(|source| ClusterError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ClusterError> {
        Ok(toml::from_str(text)?)
    }

    /// Returns this process's role: node if an upstream server is named,
    /// root otherwise.
    #[must_use]
    pub fn role(&self) -> ClusterRole {
        if self.server.is_some() {
            ClusterRole::Node
        } else {
            ClusterRole::Root
        }
    }

    /// Returns the barrier wait bound as a duration.
    #[must_use]
    pub const fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Builds the display frustums this process renders.
    #[must_use]
    pub fn frustums(&self) -> Vec<Frustum> {
        self.displays.iter().map(Frustum::from_display).collect()
    }
}
