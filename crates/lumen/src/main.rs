//! # LUMEN Cluster Runtime
//!
//! Loads the bootstrap configuration and runs this process in its
//! configured role. A config that names an upstream `server` runs as a
//! node; one that does not runs as the root and provisions its nodes.
//!
//! ## Usage
//!
//! ```bash
//! lumen root.toml                 # run as configured
//! lumen node.toml --frames 600    # close the session after 600 frames
//! ```
//!
//! The process renders through a console backend that logs frame activity;
//! a real deployment links the core against an actual renderer instead.

use std::path::PathBuf;
use std::process::ExitCode;

use lumen_cluster::launch::{provision_nodes, LaunchCommand, LaunchHandle, Launcher};
use lumen_cluster::{
    ClusterConfig, ClusterError, ClusterRole, Event, EventHandler, Frustum, LocalLauncher,
    NodeClient, RenderBackend, RootServer, SshLauncher,
};
use tracing::{debug, info, trace};

/// Parsed command line.
struct Args {
    config: PathBuf,
    frames: Option<u64>,
}

fn usage() {
    println!("Usage: lumen <CONFIG> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -f, --frames <N>   Close the session after N frames (root only)");
    println!("  -h, --help         Show this help");
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = None;
    let mut frames = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" | "-f" => {
                if i + 1 < args.len() {
                    frames = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                usage();
                return None;
            }
            other => {
                if config.is_none() {
                    config = Some(PathBuf::from(other));
                }
            }
        }
        i += 1;
    }

    match config {
        Some(config) => Some(Args { config, frames }),
        None => {
            usage();
            None
        }
    }
}

/// Renderer stand-in that logs frame activity instead of drawing.
#[derive(Default)]
struct ConsoleBackend {
    frames: u64,
}

impl RenderBackend for ConsoleBackend {
    fn draw(&mut self, frustum_index: usize, frustum: &Frustum, channel: u32) {
        trace!(
            frustum = frustum_index,
            channel,
            position = ?frustum.position,
            "draw"
        );
    }

    fn swap(&mut self) {
        self.frames += 1;
        trace!(frame = self.frames, "swap");
    }

    fn pointer_to_3d(&mut self, _event: &mut Event, _x: i32, _y: i32) -> bool {
        // No projection without a real renderer.
        false
    }
}

/// Application stand-in that logs every event falling through the core.
struct LogHandler;

impl EventHandler for LogHandler {
    fn process_event(&mut self, event: &Event) -> bool {
        debug!(event = ?event, "application event");
        false
    }
}

/// Routes each node launch to the local or remote launcher.
struct ClusterLauncher {
    local: LocalLauncher,
    remote: SshLauncher,
}

impl Launcher for ClusterLauncher {
    fn spawn(&mut self, command: &LaunchCommand) -> Result<LaunchHandle, ClusterError> {
        if command.host.is_empty() || command.host == "localhost" || command.host == "127.0.0.1" {
            self.local.spawn(command)
        } else {
            self.remote.spawn(command)
        }
    }
}

fn run_root(config: &ClusterConfig, frames: Option<u64>) -> Result<(), ClusterError> {
    let mut launcher = ClusterLauncher {
        local: LocalLauncher::new(),
        remote: SshLauncher::new(&config.launch_template),
    };
    let handles = provision_nodes(&config.nodes, &mut launcher)?;
    info!(nodes = handles.len(), "nodes provisioned");

    let mut root = RootServer::bind(config)?;
    let mut backend = ConsoleBackend::default();
    let mut handler = LogHandler;

    let mut frame = 0u64;
    root.run(&mut backend, &mut handler, || {
        frame += 1;
        match frames {
            Some(limit) if frame > limit => vec![Event::Close],
            _ => Vec::new(),
        }
    })
}

fn run_node(config: &ClusterConfig, host: &str) -> Result<(), ClusterError> {
    let mut node = NodeClient::connect(config, host)?;
    let mut backend = ConsoleBackend::default();
    let mut handler = LogHandler;
    node.run(&mut backend, &mut handler)
}

fn run(args: &Args) -> Result<(), ClusterError> {
    let config = ClusterConfig::load(&args.config)?;
    match config.role() {
        ClusterRole::Root => {
            info!(port = config.port, nodes = config.nodes.len(), "starting as root");
            run_root(&config, args.frames)
        }
        ClusterRole::Node => {
            let host = config.server.clone().unwrap_or_default();
            info!(server = %host, "starting as node");
            run_node(&config, &host)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}
