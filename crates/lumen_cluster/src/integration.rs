//! # Renderer Integration Traits
//!
//! The boundary between the synchronization core and the excluded rendering
//! subsystem.
//!
//! ## Architecture
//!
//! The core never renders. It defines traits here that the embedding
//! renderer implements, and calls through them at fixed points in the frame:
//!
//! ```text
//! Core calls:                 Renderer implements:
//! ┌──────────────────┐        ┌──────────────────┐
//! │ draw(i, f, ch)   │ ─────> │ impl RenderBackend│
//! │ swap()           │ ─────> │                  │
//! │ pointer_to_3d()  │ ─────> │                  │
//! └──────────────────┘        └──────────────────┘
//! ```
//!
//! Mock implementations live here too; tests for the root and node loops
//! run against them.

use lumen_protocol::Event;

use crate::config::DisplayConfig;
use crate::config::WindowRect;

/// The core's record of one display's projection volume.
///
/// The renderer owns the real projection math; the core only carries the
/// viewport, the channel, and the live calibration offsets that the
/// calibration state machine adjusts.
#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
    /// Viewport rectangle within the window.
    pub viewport: WindowRect,
    /// Renderer channel (eye/pass) index.
    pub channel: u32,
    /// Calibration position offset, in world units.
    pub position: [f32; 3],
    /// Calibration rotation offset, in degrees.
    pub rotation: [f32; 3],
}

impl Frustum {
    /// Number of adjustable calibration parameters (position xyz then
    /// rotation xyz).
    pub const PARAM_COUNT: usize = 6;

    /// Builds a frustum from its display configuration.
    #[must_use]
    pub fn from_display(display: &DisplayConfig) -> Self {
        Self {
            viewport: display.viewport,
            channel: display.channel,
            position: display.calibration.position,
            rotation: display.calibration.rotation,
        }
    }

    /// Adjusts one calibration parameter by a delta.
    ///
    /// Indices 0..3 address position xyz, 3..6 rotation xyz; out-of-range
    /// indices are ignored.
    pub fn adjust(&mut self, param: usize, delta: f32) {
        match param {
            0..=2 => self.position[param] += delta,
            3..=5 => self.rotation[param - 3] += delta,
            _ => {}
        }
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::from_display(&DisplayConfig::default())
    }
}

/// Interface to the external renderer.
///
/// The renderer implements this trait; the core invokes it identically on
/// the root and on every node, which is what makes the output bit-identical.
pub trait RenderBackend {
    /// Renders one frustum of the current frame.
    fn draw(&mut self, frustum_index: usize, frustum: &Frustum, channel: u32);

    /// Presents the current frame.
    fn swap(&mut self);

    /// Unprojects a 2D window position into a 3D pointer event.
    ///
    /// Fills `event`'s position and orientation when `(x, y)` falls inside
    /// one of the renderer's frusta and returns whether it did.
    fn pointer_to_3d(&mut self, event: &mut Event, x: i32, y: i32) -> bool;
}

/// Interface to the embedding application's own event handling.
///
/// Events that neither the calibration state machine nor the core consume
/// fall through here. The return value reports whether the handler consumed
/// the event, enabling simple handler chaining.
pub trait EventHandler {
    /// Handles one event; returns true if it was consumed.
    fn process_event(&mut self, event: &Event) -> bool;
}

/// One recorded draw call, for assertions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    /// Frustum index passed to the backend.
    pub frustum_index: usize,
    /// Channel passed to the backend.
    pub channel: u32,
}

/// Mock renderer recording every callback, for testing.
#[derive(Debug, Default)]
pub struct MockRenderBackend {
    /// Recorded draw calls, in order.
    pub draws: Vec<DrawCall>,
    /// Number of swaps performed.
    pub swaps: u64,
    /// Value `pointer_to_3d` reports.
    pub pointer_hits: bool,
    /// Recorded pointer queries as `(x, y)`.
    pub pointer_queries: Vec<(i32, i32)>,
}

impl MockRenderBackend {
    /// Creates a mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for MockRenderBackend {
    fn draw(&mut self, frustum_index: usize, _frustum: &Frustum, channel: u32) {
        self.draws.push(DrawCall {
            frustum_index,
            channel,
        });
    }

    fn swap(&mut self) {
        self.swaps += 1;
    }

    fn pointer_to_3d(&mut self, event: &mut Event, x: i32, y: i32) -> bool {
        self.pointer_queries.push((x, y));
        if self.pointer_hits {
            if let Event::Point { position, .. } = event {
                *position = [x as f32, y as f32, 0.0];
            }
        }
        self.pointer_hits
    }
}

/// Mock event handler recording everything that falls through to it.
#[derive(Debug, Default)]
pub struct MockEventHandler {
    /// Events received, in order.
    pub events: Vec<Event>,
    /// Value `process_event` reports.
    pub consume: bool,
}

impl MockEventHandler {
    /// Creates a mock handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventHandler for MockEventHandler {
    fn process_event(&mut self, event: &Event) -> bool {
        self.events.push(*event);
        self.consume
    }
}
