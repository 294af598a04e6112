//! # Root Server
//!
//! The authoritative end of the cluster: owns input, owns time, and drives
//! every node through the ordered event broadcast.
//!
//! ## Frame loop
//!
//! ```text
//! ┌──> poll admissions / poll script channel
//! │    gather events (script + local input)
//! │    tick clock, append Tick
//! │    broadcast events, then Draw, then Swap
//! │    dispatch locally, draw, swap
//! └─── sync(): one Flush per node, bounded by the sync timeout
//! ```
//!
//! A node that fails mid-broadcast or misses the barrier is dropped from
//! the broadcast set; the session continues with the survivors. The root
//! renders a frame every iteration even with zero nodes connected, so a
//! standalone run and a cluster run are the same code path.

use std::time::Duration;

use lumen_protocol::Event;
use tracing::{debug, info, warn};

use crate::config::{ClusterConfig, ClusterRole};
use crate::error::ClusterError;
use crate::frame::FrameClock;
use crate::integration::{EventHandler, RenderBackend};
use crate::session::{Session, SessionState};
use crate::transport::{Connection, Listener};

/// The root process: event source and frame pacer for the whole cluster.
pub struct RootServer {
    listener: Listener,
    script_listener: Option<Listener>,
    script: Option<Connection>,
    nodes: Vec<Connection>,
    session: Session,
    sync_timeout: Duration,
    pending: Vec<Event>,
}

impl RootServer {
    /// Binds the event-stream listener (and the script-channel listener if
    /// configured) and prepares the root session.
    pub fn bind(config: &ClusterConfig) -> Result<Self, ClusterError> {
        let listener = Listener::bind(config.port)?;
        let script_listener = match config.script_port {
            Some(port) => Some(Listener::bind(port)?),
            None => None,
        };
        let mut session = Session::new(
            ClusterRole::Root,
            FrameClock::new(config.clock.mode()),
            config.frustums(),
        );
        session.transition(SessionState::Listening);
        info!(port = listener.local_port(), "root listening");
        Ok(Self {
            listener,
            script_listener,
            script: None,
            nodes: Vec::new(),
            session,
            sync_timeout: config.sync_timeout(),
            pending: Vec::new(),
        })
    }

    /// Returns the port the event-stream listener is bound to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.listener.local_port()
    }

    /// Returns the number of nodes currently in the broadcast set.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the root's session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Admits every node waiting on the listener.
    ///
    /// Each admitted node gets a `Start` event and the barrier timeout on
    /// its receive side. Admission never blocks the frame loop.
    pub fn poll_admissions(&mut self) -> Result<(), ClusterError> {
        while let Some(mut node) = self.listener.poll_accept()? {
            node.set_recv_timeout(Some(self.sync_timeout))?;
            if let Err(e) = node.send(&Event::Start) {
                warn!(peer = %node.peer(), error = %e, "node lost during admission");
                continue;
            }
            info!(peer = %node.peer(), nodes = self.nodes.len() + 1, "node admitted");
            self.nodes.push(node);
        }
        Ok(())
    }

    /// Polls the script channel for injected events.
    ///
    /// The channel is a single external connection speaking the ordinary
    /// event codec. Its events queue up as pending input for the next
    /// frame, so they enter the broadcast with the same total order as
    /// everything else. A failed channel is dropped; a new controller may
    /// connect later.
    fn poll_script(&mut self) {
        if self.script.is_none() {
            if let Some(listener) = &self.script_listener {
                match listener.poll_accept() {
                    Ok(Some(conn)) => match conn.set_nonblocking(true) {
                        Ok(()) => {
                            info!(peer = %conn.peer(), "script channel connected");
                            self.script = Some(conn);
                        }
                        Err(e) => warn!(error = %e, "script channel rejected"),
                    },
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "script channel accept failed"),
                }
            }
        }

        let mut drop_script = false;
        if let Some(conn) = &mut self.script {
            loop {
                match conn.try_recv() {
                    Ok(Some(event)) => self.pending.push(event),
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "script channel closed");
                        drop_script = true;
                        break;
                    }
                }
            }
        }
        if drop_script {
            self.script = None;
        }
    }

    /// Sends one event to every node, dropping nodes whose link failed.
    fn broadcast(&mut self, event: &Event) {
        self.nodes.retain_mut(|node| match node.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(peer = %node.peer(), error = %e, "node dropped from broadcast");
                false
            }
        });
    }

    /// The frame barrier: waits for one `Flush` from every node.
    ///
    /// A node that errors, times out, or sends anything other than `Flush`
    /// is dropped. The wait is bounded per node by the sync timeout, so a
    /// hung node can never stall the cluster indefinitely.
    fn sync(&mut self) {
        let mut survivors = Vec::with_capacity(self.nodes.len());
        for mut node in self.nodes.drain(..) {
            match node.recv() {
                Ok(Event::Flush) => survivors.push(node),
                Ok(other) => {
                    warn!(peer = %node.peer(), event = ?other, "unexpected barrier reply, node dropped");
                }
                Err(e) => {
                    warn!(peer = %node.peer(), error = %e, "node missed barrier, dropped");
                }
            }
        }
        self.nodes = survivors;
    }

    /// Runs one frame of the cluster.
    ///
    /// `inputs` are this frame's local device events, already in the order
    /// the root observed them. Returns `Ok(false)` once a `Close` event has
    /// ended the session.
    pub fn step(
        &mut self,
        inputs: &[Event],
        backend: &mut dyn RenderBackend,
        handler: &mut dyn EventHandler,
    ) -> Result<bool, ClusterError> {
        if self.session.state() == SessionState::Listening {
            self.session.transition(SessionState::Running);
        }
        self.poll_admissions()?;
        self.poll_script();

        let mut events: Vec<Event> = self.pending.drain(..).collect();
        events.extend_from_slice(inputs);

        if events.contains(&Event::Close) {
            self.broadcast(&Event::Close);
            for event in &events {
                self.session.process_event(event, handler);
            }
            self.session.transition(SessionState::ShuttingDown);
            self.nodes.clear();
            return Ok(false);
        }

        let dt = self.session.clock_mut().tick();
        events.push(Event::tick(dt));

        for event in &events {
            self.broadcast(event);
        }
        self.broadcast(&Event::Draw);
        self.broadcast(&Event::Swap);

        for event in &events {
            self.session.process_event(event, handler);
        }
        self.session.draw_all(backend);
        backend.swap();

        self.sync();
        Ok(true)
    }

    /// Ends the session cooperatively by emitting a `Close` frame.
    pub fn close(
        &mut self,
        backend: &mut dyn RenderBackend,
        handler: &mut dyn EventHandler,
    ) -> Result<(), ClusterError> {
        self.step(&[Event::Close], backend, handler)?;
        Ok(())
    }

    /// Runs the frame loop until a `Close` event ends the session.
    ///
    /// `inputs` is called once per frame to collect local device events.
    pub fn run<F>(
        &mut self,
        backend: &mut dyn RenderBackend,
        handler: &mut dyn EventHandler,
        mut inputs: F,
    ) -> Result<(), ClusterError>
    where
        F: FnMut() -> Vec<Event>,
    {
        while self.step(&inputs(), backend, handler)? {}
        info!(frames = self.session.clock().frame(), "root session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{MockEventHandler, MockRenderBackend};
    use std::net::TcpStream;

    fn test_config(sync_timeout_ms: u64) -> ClusterConfig {
        let mut config = ClusterConfig::default();
        config.port = 0;
        config.sync_timeout_ms = sync_timeout_ms;
        config.clock.benchmark = true;
        config
    }

    #[test]
    fn test_standalone_root_renders_frames() {
        let mut root = RootServer::bind(&test_config(100)).unwrap();
        let mut backend = MockRenderBackend::new();
        let mut handler = MockEventHandler::new();

        assert!(root.step(&[], &mut backend, &mut handler).unwrap());
        assert!(root.step(&[], &mut backend, &mut handler).unwrap());

        assert_eq!(root.session().state(), SessionState::Running);
        assert_eq!(root.session().clock().frame(), 2);
        assert_eq!(backend.swaps, 2);
        assert_eq!(backend.draws.len(), 2);
        // Each frame the handler observes exactly one synthesized tick.
        assert_eq!(handler.events.len(), 2);
        assert!(matches!(handler.events[0], Event::Tick { .. }));
    }

    #[test]
    fn test_close_ends_the_session() {
        let mut root = RootServer::bind(&test_config(100)).unwrap();
        let mut backend = MockRenderBackend::new();
        let mut handler = MockEventHandler::new();

        assert!(!root.step(&[Event::Close], &mut backend, &mut handler).unwrap());
        assert_eq!(root.session().state(), SessionState::ShuttingDown);
        // No frame is rendered on the closing step.
        assert_eq!(backend.swaps, 0);
    }

    #[test]
    fn test_admission_sends_start() {
        let mut root = RootServer::bind(&test_config(100)).unwrap();
        let mut client = Connection::open("127.0.0.1", root.port()).unwrap();

        while root.node_count() == 0 {
            root.poll_admissions().unwrap();
        }
        assert_eq!(client.recv().unwrap(), Event::Start);
    }

    #[test]
    fn test_silent_node_is_dropped_at_the_barrier() {
        let mut root = RootServer::bind(&test_config(100)).unwrap();
        let mut backend = MockRenderBackend::new();
        let mut handler = MockEventHandler::new();

        // Connects but never acknowledges a frame.
        let _silent = TcpStream::connect(("127.0.0.1", root.port())).unwrap();
        while root.node_count() == 0 {
            root.poll_admissions().unwrap();
        }

        assert!(root.step(&[], &mut backend, &mut handler).unwrap());
        assert_eq!(root.node_count(), 0);
        // The root itself keeps rendering.
        assert_eq!(backend.swaps, 1);
    }

    #[test]
    fn test_script_events_precede_frame_inputs() {
        let mut config = test_config(100);
        config.script_port = Some(0);
        let mut root = RootServer::bind(&config).unwrap();
        let script_port = root.script_listener.as_ref().unwrap().local_port();

        let mut controller = Connection::open("127.0.0.1", script_port).unwrap();
        controller.send(&Event::user(7)).unwrap();

        let mut backend = MockRenderBackend::new();
        let mut handler = MockEventHandler::new();
        // Poll until the controller's event has been drained into pending.
        while root.pending.is_empty() {
            root.poll_script();
        }
        assert!(root
            .step(&[Event::user(8)], &mut backend, &mut handler)
            .unwrap());

        assert_eq!(handler.events[0], Event::user(7));
        assert_eq!(handler.events[1], Event::user(8));
        assert!(matches!(handler.events[2], Event::Tick { .. }));
    }
}
