//! # Session State and Shared Dispatch
//!
//! The per-process state machine and the single event dispatch point shared
//! by root and node.
//!
//! ## State machine
//!
//! ```text
//! Unconnected ──(root)──> Listening ───────────────┐
//!      │                                           ▼
//!      └──(node)──> Connecting ──> Connected ──> Running ──> ShuttingDown
//! ```
//!
//! Only a `Close` event moves a process into `ShuttingDown`; it is the sole
//! cooperative cancellation mechanism.

use lumen_protocol::Event;
use tracing::debug;

use crate::calibration::Calibration;
use crate::config::ClusterRole;
use crate::frame::FrameClock;
use crate::integration::{EventHandler, Frustum, RenderBackend};

/// Lifecycle state of a cluster process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet bootstrapped.
    Unconnected,
    /// Root: listening for node admissions.
    Listening,
    /// Node: upstream connection in progress.
    Connecting,
    /// Node: connected, waiting for the session to start.
    Connected,
    /// Frame loop running.
    Running,
    /// Terminal: a `Close` event was observed.
    ShuttingDown,
}

/// Per-process session: role, state, clock, displays, and calibration.
pub struct Session {
    role: ClusterRole,
    state: SessionState,
    clock: FrameClock,
    frustums: Vec<Frustum>,
    calibration: Calibration,
}

impl Session {
    /// Creates a session in the `Unconnected` state.
    #[must_use]
    pub fn new(role: ClusterRole, clock: FrameClock, frustums: Vec<Frustum>) -> Self {
        Self {
            role,
            state: SessionState::Unconnected,
            clock,
            frustums,
            calibration: Calibration::new(),
        }
    }

    /// Returns this process's fixed role.
    #[inline]
    #[must_use]
    pub const fn role(&self) -> ClusterRole {
        self.role
    }

    /// Returns true if this process is the cluster root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> bool {
        self.role == ClusterRole::Root
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the frame clock.
    #[inline]
    #[must_use]
    pub const fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Returns the frame clock for ticking.
    #[inline]
    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    /// Returns the display frustums this process renders.
    #[inline]
    #[must_use]
    pub fn frustums(&self) -> &[Frustum] {
        &self.frustums
    }

    /// Returns the calibration state machine.
    #[inline]
    #[must_use]
    pub const fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Moves to a new lifecycle state.
    pub fn transition(&mut self, to: SessionState) {
        if self.state != to {
            debug!(from = ?self.state, to = ?to, "session transition");
            self.state = to;
        }
    }

    /// Routes one event through the shared dispatch chain.
    ///
    /// Calibration gets the first look; `Tick` updates the frame clock and
    /// `Close` moves the session into `ShuttingDown`; everything not
    /// consumed falls through to the embedding application's handler. The
    /// return value reports whether anything consumed the event.
    pub fn process_event(
        &mut self,
        event: &Event,
        handler: &mut dyn EventHandler,
    ) -> bool {
        if self.calibration.process_event(event, &mut self.frustums) {
            return true;
        }
        match *event {
            Event::Tick { dt } => {
                // The root's clock already ticked when it emitted this
                // event; only a node replicates the received delta.
                if self.role == ClusterRole::Node {
                    self.clock.apply(dt);
                }
                handler.process_event(event);
                true
            }
            Event::Close => {
                self.transition(SessionState::ShuttingDown);
                handler.process_event(event);
                true
            }
            _ => handler.process_event(event),
        }
    }

    /// Synthesizes a pointer event from a 2D window position.
    ///
    /// Root input side: asks the renderer to unproject `(x, y)` through its
    /// frusta. Returns the filled `Point` event when the position falls
    /// inside one.
    pub fn pointer_event(
        &mut self,
        backend: &mut dyn RenderBackend,
        device: u8,
        x: i32,
        y: i32,
    ) -> Option<Event> {
        let mut event = Event::point(device, [0.0; 3], [0.0, 0.0, 0.0, 1.0]);
        backend.pointer_to_3d(&mut event, x, y).then_some(event)
    }

    /// Renders every configured frustum through the backend.
    pub fn draw_all(&self, backend: &mut dyn RenderBackend) {
        for (index, frustum) in self.frustums.iter().enumerate() {
            backend.draw(index, frustum, frustum.channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::keys;
    use crate::integration::{MockEventHandler, MockRenderBackend};

    fn session() -> Session {
        Session::new(
            ClusterRole::Node,
            FrameClock::real_time(),
            vec![Frustum::default()],
        )
    }

    #[test]
    fn test_tick_updates_clock_and_is_consumed() {
        let mut session = session();
        let mut handler = MockEventHandler::new();
        assert!(session.process_event(&Event::tick(0.0166), &mut handler));
        assert_eq!(session.clock().dt(), 0.0166);
        assert_eq!(handler.events, vec![Event::tick(0.0166)]);
    }

    #[test]
    fn test_close_transitions_to_shutting_down() {
        let mut session = session();
        let mut handler = MockEventHandler::new();
        assert!(session.process_event(&Event::Close, &mut handler));
        assert_eq!(session.state(), SessionState::ShuttingDown);
    }

    #[test]
    fn test_unconsumed_events_fall_through_to_handler() {
        let mut session = session();
        let mut handler = MockEventHandler::new();
        assert!(!session.process_event(&Event::click(0, 0, true), &mut handler));
        handler.consume = true;
        assert!(session.process_event(&Event::click(0, 0, true), &mut handler));
        assert_eq!(handler.events.len(), 2);
    }

    #[test]
    fn test_calibration_consumes_before_handler() {
        let mut session = session();
        let mut handler = MockEventHandler::new();
        let toggle = Event::key(0, keys::TOGGLE, 0, true);
        assert!(session.process_event(&toggle, &mut handler));
        assert!(session.process_event(&Event::axis(0, 0, 1.0), &mut handler));
        assert!(handler.events.is_empty());
        assert!(session.frustums()[0].position[0] > 0.0);
    }

    #[test]
    fn test_pointer_event_requires_a_hit() {
        let mut session = session();
        let mut backend = MockRenderBackend::new();
        assert!(session.pointer_event(&mut backend, 0, 5, 5).is_none());
        backend.pointer_hits = true;
        let event = session.pointer_event(&mut backend, 0, 5, 5).unwrap();
        assert!(matches!(event, Event::Point { device: 0, .. }));
        assert_eq!(backend.pointer_queries, vec![(5, 5), (5, 5)]);
    }

    #[test]
    fn test_role_accessors() {
        let session = session();
        assert!(!session.root());
        assert_eq!(session.role(), ClusterRole::Node);
        assert_eq!(session.state(), SessionState::Unconnected);
    }
}
