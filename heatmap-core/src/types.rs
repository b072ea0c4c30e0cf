//! Shared types, error enum, and the emitted-record shape for heatmap-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by heatmap-core.
#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error("file length {len} is not a multiple of 4 bytes")]
    Misaligned { len: u64 },
    #[error("truncated record at word {word}")]
    TruncatedRecord { word: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HeatmapError>;

// ---------------------------------------------------------------------------
// Aircraft identifier helpers
// ---------------------------------------------------------------------------

/// Format the low 24 bits of a record's first word as the canonical
/// aircraft identifier: 6 lowercase hex digits, prefixed `~` when bit 24
/// flags a non-ICAO address.
pub fn format_hex_id(word: i32) -> String {
    let hex = format!("{:06x}", word & 0xFF_FFFF);
    if word & (1 << 24) != 0 {
        format!("~{hex}")
    } else {
        hex
    }
}

// ---------------------------------------------------------------------------
// Position sources
// ---------------------------------------------------------------------------

/// The 13 named position sources carried in bits 27..31 of a record's
/// first word. Records keep the numeric code; this enum names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    AdsbIcao,
    AdsbIcaoNt,
    AdsrIcao,
    TisbIcao,
    Adsc,
    Mlat,
    Other,
    ModeS,
    AdsbOther,
    AdsrOther,
    TisbTrackfile,
    TisbOther,
    ModeAc,
}

impl PositionSource {
    /// Look up a 5-bit type code. Returns `None` for codes 13..=31, which
    /// the decoder passes through unnamed.
    pub fn from_code(code: u8) -> Option<PositionSource> {
        match code {
            0 => Some(PositionSource::AdsbIcao),
            1 => Some(PositionSource::AdsbIcaoNt),
            2 => Some(PositionSource::AdsrIcao),
            3 => Some(PositionSource::TisbIcao),
            4 => Some(PositionSource::Adsc),
            5 => Some(PositionSource::Mlat),
            6 => Some(PositionSource::Other),
            7 => Some(PositionSource::ModeS),
            8 => Some(PositionSource::AdsbOther),
            9 => Some(PositionSource::AdsrOther),
            10 => Some(PositionSource::TisbTrackfile),
            11 => Some(PositionSource::TisbOther),
            12 => Some(PositionSource::ModeAc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSource::AdsbIcao => "adsb_icao",
            PositionSource::AdsbIcaoNt => "adsb_icao_nt",
            PositionSource::AdsrIcao => "adsr_icao",
            PositionSource::TisbIcao => "tisb_icao",
            PositionSource::Adsc => "adsc",
            PositionSource::Mlat => "mlat",
            PositionSource::Other => "other",
            PositionSource::ModeS => "mode_s",
            PositionSource::AdsbOther => "adsb_other",
            PositionSource::AdsrOther => "adsr_other",
            PositionSource::TisbTrackfile => "tisb_trackfile",
            PositionSource::TisbOther => "tisb_other",
            PositionSource::ModeAc => "mode_ac",
        }
    }
}

impl std::fmt::Display for PositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Emitted records
// ---------------------------------------------------------------------------

/// One down-sampled aircraft position, ready for bulk load.
///
/// Field order matches the staging-table column order; the loader
/// serializes rows positionally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedRecord {
    /// Unix time in seconds, at the resolution of the enclosing frame.
    pub t: f64,
    pub hex: String,
    /// 8-byte call sign as transmitted, trailing spaces included.
    pub flight: Option<String>,
    pub squawk: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Feet, or the literal `-123` ground sentinel.
    pub alt: i32,
    /// Knots; absent when the encoder marked the speed unknown.
    pub gs: Option<f64>,
    #[serde(rename = "type")]
    pub type_code: u8,
}

impl EmittedRecord {
    /// Name the record's position source, if the type code is one of the
    /// 13 known values.
    pub fn source(&self) -> Option<PositionSource> {
        PositionSource::from_code(self.type_code)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
