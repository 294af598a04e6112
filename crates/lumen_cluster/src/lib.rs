//! # LUMEN Cluster - Root/Node Orchestration
//!
//! Keeps many independent display processes rendering bit-identical frames
//! in lockstep with a single authoritative root process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         ROOT                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ Admission    │  │ Frame Loop   │  │ Broadcast    │       │
//! │  │ (Non-block)  │──│ (Tick/Draw)  │──│ (Ordered)    │       │
//! │  └──────────────┘  └──────────────┘  └──────────────┘       │
//! │                          │                  │               │
//! │                    sync() barrier     per-node TCP          │
//! └──────────────────────────│──────────────────│───────────────┘
//!                            │                  │
//!                 ┌──────────▼─────┐  ┌─────────▼──────┐
//!                 │  NODE (disp 0) │  │  NODE (disp 1) │  ...
//!                 │  recv/dispatch │  │  recv/dispatch │
//!                 └────────────────┘  └────────────────┘
//! ```
//!
//! Every process is single-threaded and cooperative: concurrency across the
//! cluster comes from running one process per display, coordinated purely
//! through the [`lumen_protocol`] event stream. The only suspension points
//! are the root's frame barrier and a node's blocking receive. Shutdown is
//! cooperative, carried by a `Close` event; there is no out-of-band
//! interrupt.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod frame;
pub mod integration;
pub mod launch;
pub mod node;
pub mod root;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use lumen_protocol::Event;

pub use calibration::Calibration;
pub use config::{ClusterConfig, ClusterRole, DisplayConfig, NodeConfig, WindowRect};
pub use error::ClusterError;
pub use frame::{ClockMode, FrameClock};
pub use integration::{EventHandler, Frustum, RenderBackend};
pub use launch::{LaunchCommand, LaunchHandle, Launcher, LocalLauncher, SshLauncher};
pub use node::NodeClient;
pub use root::RootServer;
pub use session::{Session, SessionState};
pub use transport::{Connection, Listener};

/// Default event-stream port for the cluster.
pub const DEFAULT_PORT: u16 = 2847;

/// Default bound on the `sync()` barrier wait, in milliseconds.
///
/// A node that has not acknowledged its frame within this window is treated
/// as lost and dropped from the broadcast set.
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 5_000;
