//! Decode one 16-byte heatmap record into a typed message.
//!
//! Records come in two variants told apart by the second word: values
//! above 2^30 cannot be a latitude, so the record is an identity update
//! (call sign + squawk); anything else is a position. The decoder never
//! reads past the record's fourth word.

use crate::frame::WordBuffer;
use crate::tracker::AircraftTable;
use crate::types::{format_hex_id, EmittedRecord};

/// Largest second-word value that still encodes a latitude. Anything
/// above is an identity record.
pub const IDENTITY_THRESHOLD: i32 = 1 << 30;

/// Ground-surface altitude sentinel, kept literal through the transform.
pub const GROUND_SENTINEL: i32 = -123;

// ---------------------------------------------------------------------------
// Decoded record types
// ---------------------------------------------------------------------------

/// A decoded position awaiting its frame timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub hex: String,
    pub flight: Option<String>,
    pub squawk: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub alt: i32,
    pub gs: Option<f64>,
    pub type_code: u8,
}

impl PositionFix {
    /// Attach the enclosing frame's timestamp.
    pub fn stamp(self, t: f64) -> EmittedRecord {
        EmittedRecord {
            t,
            hex: self.hex,
            flight: self.flight,
            squawk: self.squawk,
            lat: self.lat,
            lon: self.lon,
            alt: self.alt,
            gs: self.gs,
            type_code: self.type_code,
        }
    }
}

/// An identity record: replaces the state-table tuple for its aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityUpdate {
    pub hex: String,
    /// 8 raw bytes as characters, or `None` when the record carries no
    /// call sign. Replaces any previous value either way.
    pub flight: Option<String>,
    pub squawk: String,
}

/// Union of the two record variants.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    Position(PositionFix),
    Identity(IdentityUpdate),
}

// ---------------------------------------------------------------------------
// Decode functions
// ---------------------------------------------------------------------------

/// Decode a position record at word `i`, with `flight`/`squawk` looked up
/// from the state table. Returns `None` for identity records and for
/// positions whose coordinates fall outside (-90, 90) x (-180, 180).
pub fn decode_position(buf: &WordBuffer, i: usize, table: &AircraftTable) -> Option<PositionFix> {
    if buf.i32_at(i + 1) > IDENTITY_THRESHOLD {
        return None;
    }

    let lat = f64::from(buf.i32_at(i + 1)) / 1e6;
    let lon = f64::from(buf.i32_at(i + 2)) / 1e6;
    if !(lat > -90.0 && lat < 90.0 && lon > -180.0 && lon < 180.0) {
        return None;
    }

    let hex = format_hex_id(buf.i32_at(i));
    let type_code = ((buf.u32_at(i) >> 27) & 0x1F) as u8;

    // Two-step sign extension: low 16 bits, then OR the high half in when
    // bit 15 is set. The ground sentinel is checked on the signed value
    // before the 25-ft scaling.
    let w3 = buf.i32_at(i + 3);
    let mut alt = w3 & 0xFFFF;
    if alt & 0x8000 != 0 {
        alt |= 0xFFFF_0000_u32 as i32;
    }
    let alt = if alt == GROUND_SENTINEL { alt } else { alt * 25 };

    // Arithmetic shift so an all-ones high half reads as -1 ("absent"),
    // not 65535.
    let gs_raw = w3 >> 16;
    let gs = if gs_raw == -1 {
        None
    } else {
        Some(f64::from(gs_raw) / 10.0)
    };

    let (flight, squawk) = table.lookup(&hex);

    Some(PositionFix {
        hex,
        flight,
        squawk,
        lat,
        lon,
        alt,
        gs,
        type_code,
    })
}

/// Decode an identity record at word `i`. Returns `None` for position
/// records.
pub fn decode_identity(buf: &WordBuffer, i: usize) -> Option<IdentityUpdate> {
    let w1 = buf.i32_at(i + 1);
    if w1 <= IDENTITY_THRESHOLD {
        return None;
    }

    let hex = format_hex_id(buf.i32_at(i));

    // The call sign spans words i+2 and i+3: 8 payload bytes, no
    // terminator, trailing spaces significant.
    let base = 4 * (i + 2);
    let raw = &buf.bytes()[base..base + 8];
    let flight = if raw[0] != 0 {
        Some(raw.iter().map(|&b| char::from(b)).collect())
    } else {
        None
    };

    // Pre-rendered decimal squawk; no guard above 9999.
    let squawk = format!("{:04}", w1 & 0xFFFF);

    Some(IdentityUpdate { hex, flight, squawk })
}

/// Decode any record into the appropriate variant. `None` means a
/// position was discarded for out-of-range coordinates.
pub fn decode_record(buf: &WordBuffer, i: usize, table: &AircraftTable) -> Option<DecodedRecord> {
    if buf.i32_at(i + 1) > IDENTITY_THRESHOLD {
        decode_identity(buf, i).map(DecodedRecord::Identity)
    } else {
        decode_position(buf, i, table).map(DecodedRecord::Position)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
