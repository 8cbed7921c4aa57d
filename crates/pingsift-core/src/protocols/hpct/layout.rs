use std::ops::Range;

/// ASCII `LOVE`, hex encoded.
pub const PROBE_MARKER: &str = "4c4f5645";
/// Start of the ping payload pattern (`0x20 0x21 0x22 0x23`).
pub const ECHO_MARKER: &str = "20212223";

pub const HEX_CHARS_PER_BYTE: usize = 2;

/// Probe header length, in hex characters (16 bytes).
pub const HEADER_HEX_LEN: usize = 32;

// Ranges are relative to the start of the header, in hex characters.
pub const MAGIC_NUMBER_RANGE: Range<usize> = 0..8;
pub const SEND_TTL_RANGE: Range<usize> = 8..10;
pub const ROUND_RANGE: Range<usize> = 10..12;
pub const CHECKSUM_TWEAK_RANGE: Range<usize> = 12..16;
pub const SEND_TIMESTAMP_RANGE: Range<usize> = 16..32;

/// Widest little-endian field the converter accepts (8 bytes).
pub const MAX_LE_HEX_LEN: usize = 16;

pub const MILLIS_PER_SECOND: u64 = 1_000;
