//! # Display Calibration
//!
//! The sub-state-machine that turns live input into display frustum
//! adjustments.
//!
//! While calibration is enabled, axis and button events are interpreted as
//! adjustments to the selected display parameter instead of navigation
//! input. Entry, exit, and every adjustment arrive through the ordinary
//! event stream, so the state transition replicates to all nodes
//! identically and every display applies the exact same offsets.

use lumen_protocol::Event;
use tracing::debug;

use crate::integration::Frustum;

/// Scancodes understood by the calibration state machine (USB HID usage
/// IDs from the keyboard page).
pub mod keys {
    /// F9 - toggles calibration mode.
    pub const TOGGLE: u32 = 0x42;
    /// Tab - selects the next calibration parameter.
    pub const NEXT_PARAM: u32 = 0x2B;
    /// Digit row 1 - selects display 0; subsequent digits select onward.
    pub const DISPLAY_BASE: u32 = 0x1E;
    /// Digit row 9 - the last selectable display.
    pub const DISPLAY_LAST: u32 = 0x26;
}

/// Gain applied to axis values when adjusting a parameter.
const AXIS_GAIN: f32 = 0.01;

/// Calibration mode state: off/on plus the selected display and parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Calibration {
    enabled: bool,
    display: usize,
    param: usize,
}

impl Calibration {
    /// Creates the state machine, disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while calibration mode is active.
    #[inline]
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the selected display index.
    #[inline]
    #[must_use]
    pub const fn display(&self) -> usize {
        self.display
    }

    /// Returns the selected parameter index.
    #[inline]
    #[must_use]
    pub const fn param(&self) -> usize {
        self.param
    }

    /// Routes one event through the calibration state machine.
    ///
    /// Returns true if the event was consumed as calibration input; false
    /// lets it fall through to navigation handling.
    pub fn process_event(&mut self, event: &Event, frustums: &mut [Frustum]) -> bool {
        match *event {
            Event::Key {
                scancode: keys::TOGGLE,
                down: true,
                ..
            } => {
                self.enabled = !self.enabled;
                debug!(enabled = self.enabled, "calibration toggled");
                true
            }
            _ if !self.enabled => false,
            Event::Key {
                scancode: keys::NEXT_PARAM,
                down: true,
                ..
            } => {
                self.param = (self.param + 1) % Frustum::PARAM_COUNT;
                debug!(param = self.param, "calibration parameter selected");
                true
            }
            Event::Key {
                scancode, down: true, ..
            } if (keys::DISPLAY_BASE..=keys::DISPLAY_LAST).contains(&scancode) => {
                let index = (scancode - keys::DISPLAY_BASE) as usize;
                if index < frustums.len() {
                    self.display = index;
                    debug!(display = self.display, "calibration display selected");
                }
                true
            }
            Event::Axis { value, .. } => {
                if let Some(frustum) = frustums.get_mut(self.display) {
                    frustum.adjust(self.param, value * AXIS_GAIN);
                }
                true
            }
            // While calibrating, swallow the rest of the device input so it
            // cannot double as navigation.
            Event::Button { .. } | Event::Click { .. } | Event::Key { .. } => true,
            _ => false,
        }
    }
}
