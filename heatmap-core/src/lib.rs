//! heatmap-core: Pure decode + down-sampling library for tar1090 heatmap
//! archives.
//!
//! No async, no database — just the binary format and the per-file
//! filtering rules. This crate is the shared core used by the
//! `heatmap-ingest` batch loader.

pub mod decode;
pub mod frame;
pub mod pipeline;
pub mod tracker;
pub mod types;

// Re-export commonly used types at crate root
pub use decode::{decode_record, DecodedRecord, IdentityUpdate, PositionFix};
pub use frame::{Frame, WordBuffer, FRAME_SENTINEL};
pub use pipeline::{decode_file, DecodedFile};
pub use tracker::{AircraftTable, Downsampler, DOWNSAMPLE_INTERVAL};
pub use types::*;
