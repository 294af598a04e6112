//! # Event Serialization
//!
//! Bounded-cursor encoding and decoding of framed events.
//!
//! ## Design
//!
//! - Pre-allocated fixed buffer, no heap allocations on the encode path
//! - An explicit position cursor that fails with a [`ProtocolError`] on
//!   overflow or underrun rather than silently truncating
//! - Decoding replays the exact field order of encoding; the type tag alone
//!   selects the layout
//!
//! ## Payload layouts (fixed field order)
//!
//! | Kind   | Fields, in order                                         | Bytes |
//! |--------|----------------------------------------------------------|-------|
//! | Point  | device `u8`, position 3x`f32`, orientation 4x`f32`       | 29    |
//! | Click  | button `u8`, modifiers `u32`, down `bool`                | 6     |
//! | Key    | character `u32`, scancode `u32`, modifiers `u32`, `bool` | 13    |
//! | Axis   | device `u8`, axis `u8`, value `f32`                      | 6     |
//! | Button | device `u8`, button `u8`, down `bool`                    | 3     |
//! | Tick   | dt `f64`                                                 | 8     |
//! | User   | payload `u64`                                            | 8     |
//! | others | (empty)                                                  | 0     |

use crate::error::ProtocolError;
use crate::event::{Event, EventKind};
use crate::{DATAMAX, FRAME_MAX, HEADER_SIZE};

/// Event encoder - writes framed events into a bounded buffer.
///
/// Designed to be reused across frames to avoid allocations.
#[derive(Debug)]
pub struct EventEncoder {
    buffer: [u8; FRAME_MAX],
    position: usize,
}

impl EventEncoder {
    /// Creates a new encoder with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; FRAME_MAX],
            position: 0,
        }
    }

    /// Resets the cursor for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns a slice of the written frame.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Encodes a complete event frame, returning the wire bytes.
    pub fn encode(&mut self, event: &Event) -> Result<&[u8], ProtocolError> {
        self.reset();
        self.write_u8(event.kind().as_byte())?;
        // Placeholder; patched once the payload is written.
        self.write_u8(0)?;

        match *event {
            Event::Null
            | Event::Draw
            | Event::Swap
            | Event::Start
            | Event::Close
            | Event::Flush => {}
            Event::Point {
                device,
                position,
                orientation,
            } => {
                self.write_u8(device)?;
                for component in position {
                    self.write_f32(component)?;
                }
                for component in orientation {
                    self.write_f32(component)?;
                }
            }
            Event::Click {
                button,
                modifiers,
                down,
            } => {
                self.write_u8(button)?;
                self.write_u32(modifiers)?;
                self.write_bool(down)?;
            }
            Event::Key {
                character,
                scancode,
                modifiers,
                down,
            } => {
                self.write_u32(character)?;
                self.write_u32(scancode)?;
                self.write_u32(modifiers)?;
                self.write_bool(down)?;
            }
            Event::Axis {
                device,
                axis,
                value,
            } => {
                self.write_u8(device)?;
                self.write_u8(axis)?;
                self.write_f32(value)?;
            }
            Event::Button {
                device,
                button,
                down,
            } => {
                self.write_u8(device)?;
                self.write_u8(button)?;
                self.write_bool(down)?;
            }
            Event::Tick { dt } => self.write_f64(dt)?,
            Event::User { payload } => self.write_u64(payload)?,
        }

        let payload_len = self.position - HEADER_SIZE;
        if payload_len > DATAMAX {
            return Err(ProtocolError::LengthOutOfBounds(payload_len));
        }
        self.buffer[1] = payload_len as u8;
        Ok(self.as_slice())
    }

    fn check(&self, needed: usize) -> Result<(), ProtocolError> {
        let available = self.buffer.len() - self.position;
        if needed > available {
            return Err(ProtocolError::Overflow { needed, available });
        }
        Ok(())
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<(), ProtocolError> {
        self.check(1)?;
        self.buffer[self.position] = value;
        self.position += 1;
        Ok(())
    }

    /// Writes a bool as one byte (1 = true, 0 = false).
    #[inline]
    pub fn write_bool(&mut self, value: bool) -> Result<(), ProtocolError> {
        self.write_u8(u8::from(value))
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an f32 as its IEEE-754 little-endian bit pattern.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an f64 as its IEEE-754 little-endian bit pattern.
    #[inline]
    pub fn write_f64(&mut self, value: f64) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.check(bytes.len())?;
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }
}

impl Default for EventEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Event decoder - reads fields from a payload with a bounded cursor.
pub struct EventDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> EventDecoder<'a> {
    /// Creates a new decoder over a payload buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    fn check(&self, needed: usize) -> Result<(), ProtocolError> {
        let available = self.remaining();
        if needed > available {
            return Err(ProtocolError::Truncated { needed, available });
        }
        Ok(())
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.check(1)?;
        let value = self.buffer[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Reads a one-byte bool (any non-zero value is true).
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian u64.
    #[inline]
    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        let bytes = self.read_array::<8>()?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads an f32 from its IEEE-754 little-endian bit pattern.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        let bytes = self.read_array::<4>()?;
        Ok(f32::from_le_bytes(bytes))
    }

    /// Reads an f64 from its IEEE-754 little-endian bit pattern.
    #[inline]
    pub fn read_f64(&mut self) -> Result<f64, ProtocolError> {
        let bytes = self.read_array::<8>()?;
        Ok(f64::from_le_bytes(bytes))
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    /// Fails if any payload bytes were left unconsumed.
    pub fn finish(&self) -> Result<(), ProtocolError> {
        let remaining = self.remaining();
        if remaining != 0 {
            return Err(ProtocolError::Trailing { remaining });
        }
        Ok(())
    }
}

/// Encodes an event into a freshly allocated frame.
///
/// The reusable [`EventEncoder`] should be preferred on hot paths.
pub fn encode(event: &Event) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = EventEncoder::new();
    Ok(encoder.encode(event)?.to_vec())
}

/// Decodes a complete event frame.
///
/// Fails with [`ProtocolError::UnknownKind`] if the type byte is
/// unrecognized and [`ProtocolError::Truncated`] if the declared length
/// exceeds the buffer.
pub fn decode(frame: &[u8]) -> Result<Event, ProtocolError> {
    if frame.len() < HEADER_SIZE {
        return Err(ProtocolError::Truncated {
            needed: HEADER_SIZE,
            available: frame.len(),
        });
    }
    let kind = EventKind::from_byte(frame[0]).ok_or(ProtocolError::UnknownKind(frame[0]))?;
    let payload_len = frame[1] as usize;
    if payload_len > DATAMAX {
        return Err(ProtocolError::LengthOutOfBounds(payload_len));
    }
    if HEADER_SIZE + payload_len > frame.len() {
        return Err(ProtocolError::Truncated {
            needed: HEADER_SIZE + payload_len,
            available: frame.len(),
        });
    }

    let mut decoder = EventDecoder::new(&frame[HEADER_SIZE..HEADER_SIZE + payload_len]);
    let event = match kind {
        EventKind::Null => Event::Null,
        EventKind::Point => {
            let device = decoder.read_u8()?;
            let mut position = [0.0f32; 3];
            for component in &mut position {
                *component = decoder.read_f32()?;
            }
            let mut orientation = [0.0f32; 4];
            for component in &mut orientation {
                *component = decoder.read_f32()?;
            }
            Event::Point {
                device,
                position,
                orientation,
            }
        }
        EventKind::Click => Event::Click {
            button: decoder.read_u8()?,
            modifiers: decoder.read_u32()?,
            down: decoder.read_bool()?,
        },
        EventKind::Key => Event::Key {
            character: decoder.read_u32()?,
            scancode: decoder.read_u32()?,
            modifiers: decoder.read_u32()?,
            down: decoder.read_bool()?,
        },
        EventKind::Axis => Event::Axis {
            device: decoder.read_u8()?,
            axis: decoder.read_u8()?,
            value: decoder.read_f32()?,
        },
        EventKind::Button => Event::Button {
            device: decoder.read_u8()?,
            button: decoder.read_u8()?,
            down: decoder.read_bool()?,
        },
        EventKind::Tick => Event::Tick {
            dt: decoder.read_f64()?,
        },
        EventKind::User => Event::User {
            payload: decoder.read_u64()?,
        },
        EventKind::Draw => Event::Draw,
        EventKind::Swap => Event::Swap,
        EventKind::Start => Event::Start,
        EventKind::Close => Event::Close,
        EventKind::Flush => Event::Flush,
    };
    decoder.finish()?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn representative_events() -> Vec<Event> {
        vec![
            Event::Null,
            Event::point(1, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]),
            Event::point(u8::MAX, [f32::MAX, f32::MIN, 0.0], [-1.0, 1.0, -0.5, 0.5]),
            Event::click(3, 0x0005, true),
            Event::click(0, 0, false),
            Event::key(u32::from('q'), 24, 0x40, true),
            Event::key(0, u32::MAX, u32::MAX, false),
            Event::axis(0, 1, 0.0),
            Event::axis(2, 3, -1.0),
            Event::axis(2, 3, f32::MAX),
            Event::button(0, 0, true),
            Event::button(u8::MAX, u8::MAX, false),
            Event::tick(0.016_666),
            Event::tick(0.0),
            Event::tick(f64::MAX),
            Event::tick(-1.0),
            Event::user(0),
            Event::user(u64::MAX),
            Event::Draw,
            Event::Swap,
            Event::Start,
            Event::Close,
            Event::Flush,
        ]
    }

    #[test]
    fn test_round_trip_all_kinds() {
        for event in representative_events() {
            let frame = encode(&event).unwrap();
            let decoded = decode(&frame).unwrap();
            assert_eq!(decoded, event, "round trip mismatch for {event:?}");
        }
    }

    #[test]
    fn test_payload_bound_holds() {
        for event in representative_events() {
            let frame = encode(&event).unwrap();
            assert!(frame.len() - HEADER_SIZE <= DATAMAX);
            assert_eq!(frame.len(), event.encoded_len());
            assert_eq!(frame[1] as usize, event.payload_len());
        }
    }

    #[test]
    fn test_point_round_trip_exact_bytes() {
        let event = Event::point(1, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]);
        let frame = encode(&event).unwrap();

        assert_eq!(frame[0], EventKind::Point.as_byte());
        assert_eq!(frame[1], 29);
        assert_eq!(frame[2], 1); // device
        assert_eq!(&frame[3..7], &1.0f32.to_le_bytes());
        assert_eq!(&frame[7..11], &2.0f32.to_le_bytes());
        assert_eq!(&frame[11..15], &3.0f32.to_le_bytes());
        assert_eq!(&frame[27..31], &1.0f32.to_le_bytes()); // quaternion w

        // Re-encoding the decoded event must reproduce the frame exactly.
        let decoded = decode(&frame).unwrap();
        assert_eq!(encode(&decoded).unwrap(), frame);
    }

    #[test]
    fn test_tick_layout() {
        let frame = encode(&Event::tick(0.0166)).unwrap();
        assert_eq!(frame[0], EventKind::Tick.as_byte());
        assert_eq!(frame[1], 8);
        assert_eq!(&frame[2..10], &0.0166f64.to_le_bytes());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = decode(&[0xee, 0]).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownKind(0xee));
    }

    #[test]
    fn test_declared_length_beyond_buffer_rejected() {
        // Click frame claiming 6 payload bytes but carrying only 2.
        let err = decode(&[2, 6, 1, 0]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                needed: 8,
                available: 4
            }
        );
    }

    #[test]
    fn test_length_out_of_bounds_rejected() {
        let err = decode(&[2, 200]).unwrap_err();
        assert_eq!(err, ProtocolError::LengthOutOfBounds(200));
    }

    #[test]
    fn test_trailing_payload_rejected() {
        // Flush carries no payload; a stray byte is a codec mismatch.
        let err = decode(&[12, 1, 0]).unwrap_err();
        assert_eq!(err, ProtocolError::Trailing { remaining: 1 });
    }

    #[test]
    fn test_short_header_rejected() {
        let err = decode(&[6]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_encoder_reuse() {
        let mut encoder = EventEncoder::new();
        let first = encoder.encode(&Event::user(7)).unwrap().to_vec();
        let second = encoder.encode(&Event::Swap).unwrap().to_vec();
        assert_eq!(decode(&first).unwrap(), Event::user(7));
        assert_eq!(decode(&second).unwrap(), Event::Swap);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_decoder_cursor_bounds() {
        let mut decoder = EventDecoder::new(&[1, 2, 3]);
        assert_eq!(decoder.read_u8().unwrap(), 1);
        let err = decoder.read_u32().unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Truncated {
                needed: 4,
                available: 2
            }
        );
    }
}
