//! # Stream Framing
//!
//! Moves framed events over any `std::io` byte stream.
//!
//! ## Design
//!
//! TCP preserves byte order per connection, so a sequence of frames written
//! here is observed by the peer in exactly the emission order. The reader
//! consumes the two-byte header first, validates the declared length, then
//! reads exactly that many payload bytes - a broken connection surfaces as
//! [`WireError::Io`], a malformed frame as [`WireError::Protocol`].

use std::io::{Read, Write};

use crate::codec::{decode, EventEncoder};
use crate::error::{ProtocolError, WireError};
use crate::event::Event;
use crate::{DATAMAX, FRAME_MAX, HEADER_SIZE};

/// Writes one framed event to a stream.
pub fn write_event<W: Write>(writer: &mut W, event: &Event) -> Result<(), WireError> {
    let mut encoder = EventEncoder::new();
    let frame = encoder.encode(event)?;
    writer.write_all(frame)?;
    Ok(())
}

/// Reads one framed event from a stream, blocking until it is complete.
pub fn read_event<R: Read>(reader: &mut R) -> Result<Event, WireError> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = header[1] as usize;
    if payload_len > DATAMAX {
        return Err(ProtocolError::LengthOutOfBounds(payload_len).into());
    }

    let mut frame = [0u8; FRAME_MAX];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_SIZE..HEADER_SIZE + payload_len])?;

    Ok(decode(&frame[..HEADER_SIZE + payload_len])?)
}
