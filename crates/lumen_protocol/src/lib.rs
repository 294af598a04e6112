//! # LUMEN Protocol - The Cluster Wire Format
//!
//! The compact binary event protocol that keeps every display process in a
//! LUMEN cluster rendering the same frame from the same inputs.
//!
//! ## Architecture
//!
//! ```text
//! ROOT                                NODE
//!   |                                   |
//!   |--- Click, Axis, Tick, ... ------->|  (ordered event stream)
//!   |--- Draw ------------------------->|  <- render the frame
//!   |--- Swap ------------------------->|  <- present the frame
//!   |<-- Flush -------------------------|  <- frame acknowledgment
//!   |                                   |
//! ```
//!
//! Every message on the wire is a single framed event:
//! `[type: 1 byte][payload length: 1 byte][payload: <= 128 bytes]`.
//!
//! No field is self-describing. The type tag alone determines the payload
//! layout, so the encoder and decoder must agree on the field order of every
//! kind - this is the protocol's single most important invariant.
//!
//! ## Numeric encoding
//!
//! Multi-byte integers are little-endian, fixed width. Real values are
//! IEEE-754 little-endian bit patterns: `f32` for spatial fields (positions,
//! orientations, axis values) and `f64` for tick delta time.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod codec;
pub mod error;
pub mod event;
pub mod wire;

// Re-exports for convenience
pub use codec::{decode, encode, EventDecoder, EventEncoder};
pub use error::{ProtocolError, WireError};
pub use event::{Event, EventKind};
pub use wire::{read_event, write_event};

/// Maximum payload size of a single event, in bytes.
///
/// The wire format reserves one byte for the payload length, and every
/// legal event encodes well under this bound (the largest, Point, is
/// 29 bytes).
pub const DATAMAX: usize = 128;

/// Size of the frame header: one type byte plus one length byte.
pub const HEADER_SIZE: usize = 2;

/// Maximum size of a complete frame on the wire.
pub const FRAME_MAX: usize = HEADER_SIZE + DATAMAX;
