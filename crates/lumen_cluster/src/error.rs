//! # Cluster Error Types
//!
//! All errors that can occur while bootstrapping or running a cluster role.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the cluster layer.
///
/// Bootstrap-time `Resolve`/`Connect`/`Bind` failures are fatal to process
/// startup. A mid-session `Transport` failure is fatal only to the link it
/// occurred on: the root drops that node from the broadcast set, a node
/// exits its loop.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Hostname lookup produced no usable address.
    #[error("could not resolve host {host:?}")]
    Resolve {
        /// The host that failed to resolve.
        host: String,
    },

    /// The upstream root refused or timed out the connection.
    #[error("could not connect to {addr}: {source}")]
    Connect {
        /// The address that was tried.
        addr: String,
        /// The socket-level failure.
        source: std::io::Error,
    },

    /// The listening socket could not be opened.
    #[error("could not listen on port {port}: {source}")]
    Bind {
        /// The requested port.
        port: u16,
        /// The socket-level failure.
        source: std::io::Error,
    },

    /// A live connection failed (refused, reset, EOF) or carried a
    /// malformed frame.
    #[error(transparent)]
    Transport(#[from] lumen_protocol::WireError),

    /// An event frame violated the codec.
    #[error(transparent)]
    Protocol(#[from] lumen_protocol::ProtocolError),

    /// A socket operation outside the framed send/recv path failed.
    #[error("socket operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// The cluster configuration file could not be read.
    #[error("could not read config {path}: {source}")]
    ConfigRead {
        /// The path that was tried.
        path: PathBuf,
        /// The filesystem failure.
        source: std::io::Error,
    },

    /// The cluster configuration file could not be parsed.
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A node process could not be spawned. Reported, never retried here;
    /// retry policy belongs to the caller.
    #[error("could not launch {command:?}: {source}")]
    Launch {
        /// The command that failed.
        command: String,
        /// The process-level failure.
        source: std::io::Error,
    },
}
