//! # Event Definitions
//!
//! The message type broadcast from the root to every node.
//!
//! ## Design
//!
//! One enum variant per event kind, each carrying only its relevant fields.
//! Events are created per occurrence and consumed immediately (encode and
//! send, or decode and dispatch); they are never retained.

use crate::HEADER_SIZE;

/// The type tag of an event, as it appears on the wire.
///
/// Discriminants are part of the protocol and must never be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// No-op placeholder.
    Null = 0,
    /// 6-DOF pointer sample: position plus orientation.
    Point = 1,
    /// Pointer button press or release.
    Click = 2,
    /// Keyboard press or release.
    Key = 3,
    /// Analog axis sample from an input device.
    Axis = 4,
    /// Digital button press or release from an input device.
    Button = 5,
    /// Frame timing: elapsed seconds since the previous tick.
    Tick = 6,
    /// Render the current frame.
    Draw = 7,
    /// Present the current frame.
    Swap = 8,
    /// Opaque application-defined payload.
    User = 9,
    /// Session start marker, sent to a node on admission.
    Start = 10,
    /// Cooperative shutdown; the sole cancellation mechanism.
    Close = 11,
    /// Frame acknowledgment, sent upstream by a node after its swap.
    Flush = 12,
}

impl EventKind {
    /// Parses a wire type byte, returning `None` if unrecognized.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Null),
            1 => Some(Self::Point),
            2 => Some(Self::Click),
            3 => Some(Self::Key),
            4 => Some(Self::Axis),
            5 => Some(Self::Button),
            6 => Some(Self::Tick),
            7 => Some(Self::Draw),
            8 => Some(Self::Swap),
            9 => Some(Self::User),
            10 => Some(Self::Start),
            11 => Some(Self::Close),
            12 => Some(Self::Flush),
            _ => None,
        }
    }

    /// Returns the wire type byte.
    #[inline]
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// All kinds, in tag order. Useful for exhaustive protocol tests.
    pub const ALL: [Self; 13] = [
        Self::Null,
        Self::Point,
        Self::Click,
        Self::Key,
        Self::Axis,
        Self::Button,
        Self::Tick,
        Self::Draw,
        Self::Swap,
        Self::User,
        Self::Start,
        Self::Close,
        Self::Flush,
    ];
}

/// A single cluster event.
///
/// The wire layout of each variant is fixed; see the field order in
/// [`crate::codec`]. Every variant fits comfortably inside
/// [`crate::DATAMAX`] bytes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// No-op placeholder.
    Null,
    /// 6-DOF pointer sample.
    Point {
        /// Input device index.
        device: u8,
        /// 3D position.
        position: [f32; 3],
        /// Orientation quaternion (x, y, z, w).
        orientation: [f32; 4],
    },
    /// Pointer button press or release.
    Click {
        /// Button id.
        button: u8,
        /// Modifier key mask.
        modifiers: u32,
        /// True on press, false on release.
        down: bool,
    },
    /// Keyboard press or release.
    Key {
        /// Unicode character code, 0 if none.
        character: u32,
        /// Platform scancode.
        scancode: u32,
        /// Modifier key mask.
        modifiers: u32,
        /// True on press, false on release.
        down: bool,
    },
    /// Analog axis sample.
    Axis {
        /// Input device index.
        device: u8,
        /// Axis index on the device.
        axis: u8,
        /// Normalized axis value.
        value: f32,
    },
    /// Digital button press or release.
    Button {
        /// Input device index.
        device: u8,
        /// Button index on the device.
        button: u8,
        /// True on press, false on release.
        down: bool,
    },
    /// Frame timing.
    Tick {
        /// Elapsed seconds since the previous tick.
        dt: f64,
    },
    /// Render the current frame.
    Draw,
    /// Present the current frame.
    Swap,
    /// Opaque application-defined payload.
    User {
        /// 64-bit opaque payload.
        payload: u64,
    },
    /// Session start marker.
    Start,
    /// Cooperative shutdown.
    Close,
    /// Frame acknowledgment.
    Flush,
}

impl Event {
    /// Creates a pointer sample event.
    #[inline]
    #[must_use]
    pub const fn point(device: u8, position: [f32; 3], orientation: [f32; 4]) -> Self {
        Self::Point {
            device,
            position,
            orientation,
        }
    }

    /// Creates a pointer button event.
    #[inline]
    #[must_use]
    pub const fn click(button: u8, modifiers: u32, down: bool) -> Self {
        Self::Click {
            button,
            modifiers,
            down,
        }
    }

    /// Creates a keyboard event.
    #[inline]
    #[must_use]
    pub const fn key(character: u32, scancode: u32, modifiers: u32, down: bool) -> Self {
        Self::Key {
            character,
            scancode,
            modifiers,
            down,
        }
    }

    /// Creates an analog axis event.
    #[inline]
    #[must_use]
    pub const fn axis(device: u8, axis: u8, value: f32) -> Self {
        Self::Axis {
            device,
            axis,
            value,
        }
    }

    /// Creates a digital button event.
    #[inline]
    #[must_use]
    pub const fn button(device: u8, button: u8, down: bool) -> Self {
        Self::Button {
            device,
            button,
            down,
        }
    }

    /// Creates a frame timing event.
    #[inline]
    #[must_use]
    pub const fn tick(dt: f64) -> Self {
        Self::Tick { dt }
    }

    /// Creates an application-defined event.
    #[inline]
    #[must_use]
    pub const fn user(payload: u64) -> Self {
        Self::User { payload }
    }

    /// Returns this event's wire type tag.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Null => EventKind::Null,
            Self::Point { .. } => EventKind::Point,
            Self::Click { .. } => EventKind::Click,
            Self::Key { .. } => EventKind::Key,
            Self::Axis { .. } => EventKind::Axis,
            Self::Button { .. } => EventKind::Button,
            Self::Tick { .. } => EventKind::Tick,
            Self::Draw => EventKind::Draw,
            Self::Swap => EventKind::Swap,
            Self::User { .. } => EventKind::User,
            Self::Start => EventKind::Start,
            Self::Close => EventKind::Close,
            Self::Flush => EventKind::Flush,
        }
    }

    /// Returns the fixed payload size of this event's kind, in bytes.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        match self {
            Self::Null | Self::Draw | Self::Swap | Self::Start | Self::Close | Self::Flush => 0,
            Self::Point { .. } => 1 + 3 * 4 + 4 * 4,
            Self::Click { .. } => 1 + 4 + 1,
            Self::Key { .. } => 4 + 4 + 4 + 1,
            Self::Axis { .. } => 1 + 1 + 4,
            Self::Button { .. } => 1 + 1 + 1,
            Self::Tick { .. } | Self::User { .. } => 8,
        }
    }

    /// Returns the total size of this event as framed on the wire.
    #[inline]
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DATAMAX;

    #[test]
    fn test_kind_byte_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_byte(kind.as_byte()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_kind_bytes_rejected() {
        for byte in 13..=u8::MAX {
            assert_eq!(EventKind::from_byte(byte), None);
        }
    }

    #[test]
    fn test_constructors_carry_fields() {
        let event = Event::axis(2, 1, -0.5);
        assert_eq!(event.kind(), EventKind::Axis);
        assert_eq!(
            event,
            Event::Axis {
                device: 2,
                axis: 1,
                value: -0.5
            }
        );
    }

    #[test]
    fn test_payload_sizes_within_bound() {
        let samples = [
            Event::Null,
            Event::point(0, [0.0; 3], [0.0, 0.0, 0.0, 1.0]),
            Event::click(0, 0, true),
            Event::key(0, 0, 0, false),
            Event::axis(0, 0, 0.0),
            Event::button(0, 0, true),
            Event::tick(0.016),
            Event::Draw,
            Event::Swap,
            Event::user(u64::MAX),
            Event::Start,
            Event::Close,
            Event::Flush,
        ];
        for event in samples {
            assert!(event.payload_len() <= DATAMAX, "{event:?}");
        }
        // Point is the widest event in the protocol.
        assert_eq!(
            Event::point(0, [0.0; 3], [0.0; 4]).payload_len(),
            29
        );
    }
}
