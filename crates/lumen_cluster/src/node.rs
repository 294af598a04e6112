//! # Node Client
//!
//! The replicating end of the cluster: connects upstream, then does nothing
//! but apply the root's event stream in the order it arrives.
//!
//! ## Receive loop
//!
//! ```text
//! recv ──> Start  : session running
//!      ──> Draw   : render all frustums
//!      ──> Swap   : present, then send Flush upstream   <- the barrier ack
//!      ──> Close  : shutting down, loop exits
//!      ──> other  : shared dispatch (calibration / tick / handler)
//! ```
//!
//! A node never reads a clock and never takes local input; determinism
//! comes from applying exactly what the root emitted, exactly in order.

use lumen_protocol::Event;
use tracing::{debug, info};

use crate::config::{ClusterConfig, ClusterRole};
use crate::error::ClusterError;
use crate::frame::FrameClock;
use crate::integration::{EventHandler, RenderBackend};
use crate::session::{Session, SessionState};
use crate::transport::Connection;

/// A node process: one upstream connection plus the replicated session.
pub struct NodeClient {
    conn: Connection,
    session: Session,
}

impl NodeClient {
    /// Connects to the root named by the configuration.
    ///
    /// Fails fast on resolution or connection errors; a node that cannot
    /// reach its root has nothing to render.
    pub fn connect(config: &ClusterConfig, host: &str) -> Result<Self, ClusterError> {
        let mut session = Session::new(
            ClusterRole::Node,
            FrameClock::new(config.clock.mode()),
            config.frustums(),
        );
        session.transition(SessionState::Connecting);
        let conn = Connection::open(host, config.port)?;
        session.transition(SessionState::Connected);
        info!(peer = %conn.peer(), "connected to root");
        Ok(Self { conn, session })
    }

    /// Returns the node's session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the upstream connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Applies one received event.
    ///
    /// Returns `Ok(false)` once a `Close` event has ended the session.
    fn dispatch(
        &mut self,
        event: &Event,
        backend: &mut dyn RenderBackend,
        handler: &mut dyn EventHandler,
    ) -> Result<bool, ClusterError> {
        match *event {
            Event::Start => {
                self.session.transition(SessionState::Running);
                Ok(true)
            }
            Event::Draw => {
                self.session.draw_all(backend);
                Ok(true)
            }
            Event::Swap => {
                backend.swap();
                // The barrier acknowledgment: the frame is on screen.
                self.conn.send(&Event::Flush)?;
                Ok(true)
            }
            Event::Close => {
                self.session.process_event(event, handler);
                Ok(false)
            }
            _ => {
                self.session.process_event(event, handler);
                Ok(true)
            }
        }
    }

    /// Runs the receive loop until the root closes the session.
    ///
    /// A transport error is fatal: the node cannot resynchronize a broken
    /// stream, so it exits and waits to be relaunched.
    pub fn run(
        &mut self,
        backend: &mut dyn RenderBackend,
        handler: &mut dyn EventHandler,
    ) -> Result<(), ClusterError> {
        loop {
            let event = self.conn.recv()?;
            debug!(event = ?event, "node applying event");
            if !self.dispatch(&event, backend, handler)? {
                break;
            }
        }
        info!(frames = self.session.clock().frame(), "node session closed");
        Ok(())
    }
}
