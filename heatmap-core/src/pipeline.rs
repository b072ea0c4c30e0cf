//! Drive a single heatmap file end to end.
//!
//! Reads the file into one buffer, scans for frames, steps each frame's
//! records through the decoder, routes identity updates into the state
//! table, and emits positions that survive the coordinate check and the
//! down-sample gate. State is per-file: it persists across frames and is
//! dropped on return.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::decode::{decode_record, DecodedRecord};
use crate::frame::{WordBuffer, FRAME_SENTINEL, WORDS_PER_RECORD};
use crate::tracker::{AircraftTable, Downsampler, DOWNSAMPLE_INTERVAL};
use crate::types::{EmittedRecord, HeatmapError, Result};

/// Everything one file produced, plus counters for the batch summary.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecodedFile {
    /// Emitted records in arrival order (file order, which is time order).
    pub records: Vec<EmittedRecord>,
    pub frames: u64,
    /// Positions that decoded in range, before down-sampling.
    pub positions: u64,
    /// Positions dropped by the one-per-minute gate.
    pub downsampled: u64,
}

/// Decode one heatmap file. Empty and marker-less files yield an empty
/// result; malformed files (odd length, trailing partial record) are
/// errors for the caller to log and skip.
pub fn decode_file(path: &Path) -> Result<DecodedFile> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        warn!("empty file: {}", path.display());
        return Ok(DecodedFile::default());
    }

    let buf = WordBuffer::from_bytes(bytes)?;
    let mut table = AircraftTable::new();
    let mut gate = Downsampler::new(DOWNSAMPLE_INTERVAL);
    let mut out = DecodedFile::default();

    for frame in buf.frames() {
        out.frames += 1;

        let mut i = frame.start + WORDS_PER_RECORD;
        while i < buf.len_words() && buf.i32_at(i) != FRAME_SENTINEL {
            if i + WORDS_PER_RECORD > buf.len_words() {
                return Err(HeatmapError::TruncatedRecord { word: i });
            }

            match decode_record(&buf, i, &table) {
                Some(DecodedRecord::Identity(update)) => table.apply(update),
                Some(DecodedRecord::Position(fix)) => {
                    out.positions += 1;
                    if gate.admit(&fix.hex, frame.t) {
                        out.records.push(fix.stamp(frame.t));
                    } else {
                        out.downsampled += 1;
                    }
                }
                // Out-of-range coordinates: skip the record, keep the file.
                None => {}
            }

            i += WORDS_PER_RECORD;
        }
    }

    if out.frames == 0 {
        warn!("no frame markers found in file: {}", path.display());
    } else {
        debug!(
            "{}: {} frames, {} positions, {} emitted, {} downsampled",
            path.display(),
            out.frames,
            out.positions,
            out.records.len(),
            out.downsampled
        );
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, words: &[i32]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let mut f = fs::File::create(&path).expect("create");
        f.write_all(&bytes).expect("write");
        path
    }

    fn header(t_ms: u64) -> [i32; 4] {
        [
            FRAME_SENTINEL,
            (t_ms >> 32) as u32 as i32,
            (t_ms & 0xFFFF_FFFF) as u32 as i32,
            0,
        ]
    }

    fn pos(hex: u32, lat_raw: i32, lon_raw: i32, alt_raw: i16, gs_raw: i16) -> [i32; 4] {
        let w3 = (gs_raw as u16 as u32) << 16 | alt_raw as u16 as u32;
        [(hex & 0xFF_FFFF) as i32, lat_raw, lon_raw, w3 as i32]
    }

    fn ident(hex: u32, callsign: &[u8; 8], squawk: u16) -> [i32; 4] {
        let mut lo = [0u8; 4];
        let mut hi = [0u8; 4];
        lo.copy_from_slice(&callsign[..4]);
        hi.copy_from_slice(&callsign[4..]);
        [
            (hex & 0xFF_FFFF) as i32,
            ((0x4002u32 << 16) | u32::from(squawk)) as i32,
            i32::from_le_bytes(lo),
            i32::from_le_bytes(hi),
        ]
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "0", &[]);
        let out = decode_file(&path).unwrap();
        assert_eq!(out, DecodedFile::default());
    }

    #[test]
    fn test_no_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "0", &[1, 2, 3, 4, 5, 6, 7, 8]);
        let out = decode_file(&path).unwrap();
        assert_eq!(out.frames, 0);
        assert!(out.records.is_empty());
    }

    #[test]
    fn test_single_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        words.extend(header(1_000_000));
        words.extend(pos(0x0ABCDE, 47_000_000, 8_000_000, 4, 2500));
        let path = write_file(&dir, "0", &words);

        let out = decode_file(&path).unwrap();
        assert_eq!(out.frames, 1);
        assert_eq!(out.records.len(), 1);

        let rec = &out.records[0];
        assert!((rec.t - 1000.0).abs() < 1e-9);
        assert_eq!(rec.hex, "0abcde");
        assert_eq!(rec.flight, None);
        assert_eq!(rec.squawk, None);
        assert_eq!(rec.lat, 47.0);
        assert_eq!(rec.lon, 8.0);
        assert_eq!(rec.alt, 100);
        assert_eq!(rec.gs, Some(250.0));
        assert_eq!(rec.type_code, 0);
    }

    #[test]
    fn test_identity_before_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        words.extend(header(1_000_000));
        words.extend(ident(0x0ABCDE, b"BAW123  ", 1800));
        words.extend(pos(0x0ABCDE, 47_000_000, 8_000_000, 4, 2500));
        let path = write_file(&dir, "0", &words);

        let out = decode_file(&path).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].flight.as_deref(), Some("BAW123  "));
        assert_eq!(out.records[0].squawk.as_deref(), Some("1800"));
    }

    #[test]
    fn test_identity_carries_across_frames() {
        // Identity in frame 1 still labels a position in frame 2 of the
        // same file.
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        words.extend(header(1_000_000));
        words.extend(ident(0x0ABCDE, b"BAW123  ", 1800));
        words.extend(header(2_000_000));
        words.extend(pos(0x0ABCDE, 47_000_000, 8_000_000, 4, 2500));
        let path = write_file(&dir, "0", &words);

        let out = decode_file(&path).unwrap();
        assert_eq!(out.frames, 2);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].flight.as_deref(), Some("BAW123  "));
    }

    #[test]
    fn test_downsampling_across_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        for t_ms in [1_000_000u64, 1_030_000, 1_061_000] {
            words.extend(header(t_ms));
            words.extend(pos(0x0ABCDE, 47_000_000, 8_000_000, 4, 2500));
        }
        let path = write_file(&dir, "0", &words);

        let out = decode_file(&path).unwrap();
        assert_eq!(out.positions, 3);
        assert_eq!(out.downsampled, 1);
        let times: Vec<f64> = out.records.iter().map(|r| r.t).collect();
        assert_eq!(times.len(), 2);
        assert!((times[0] - 1000.0).abs() < 1e-9);
        assert!((times[1] - 1061.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        words.extend(header(1_000_000));
        words.extend(pos(0x0ABCDE, 95_000_000, 8_000_000, 4, 2500));
        words.extend(pos(0x0ABCDF, 47_000_000, 8_000_000, 4, 2500));
        let path = write_file(&dir, "0", &words);

        let out = decode_file(&path).unwrap();
        assert_eq!(out.positions, 1);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].hex, "0abcdf");
    }

    #[test]
    fn test_misaligned_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0");
        fs::write(&path, [0u8; 18]).unwrap();
        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, HeatmapError::Misaligned { len: 18 }));
    }

    #[test]
    fn test_trailing_partial_record_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        words.extend(header(1_000_000));
        words.extend([1, 2]); // half a record
        let path = write_file(&dir, "0", &words);

        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, HeatmapError::TruncatedRecord { word: 4 }));
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_file(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, HeatmapError::Io(_)));
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = Vec::new();
        words.extend(header(1_000_000));
        words.extend(ident(0x0ABCDE, b"BAW123  ", 1800));
        words.extend(pos(0x0ABCDE, 47_000_000, 8_000_000, 4, 2500));
        words.extend(pos(0x00BEEF, -33_500_000, 151_200_000, -123, -1));
        let path = write_file(&dir, "0", &words);

        let first = decode_file(&path).unwrap();
        let second = decode_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.records.len(), 2);
    }
}
