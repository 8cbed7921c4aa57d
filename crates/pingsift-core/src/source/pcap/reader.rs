use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Link type and timestamp resolution announced by a PCAPNG interface block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub linktype: Linktype,
    pub tsresol: u8,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            tsresol: layout::PCAPNG_DEFAULT_TSRESOL,
        }
    }
}

/// Read the magic bytes and rewind the reader to the start.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use pingsift_core::source::pcap::reader::read_magic_and_rewind;
/// use std::io::Cursor;
///
/// let bytes = [0x0a, 0x0d, 0x0d, 0x0a, 0x01];
/// let mut cursor = Cursor::new(bytes);
/// let magic = read_magic_and_rewind(&mut cursor).unwrap();
/// assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
/// ```
///
/// # Errors
/// Returns `PcapSourceError` when the reader cannot be read or rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

/// Check whether the magic bytes match PCAPNG.
pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Check whether a legacy PCAP file stores nanoseconds instead of
/// microseconds in its record headers.
pub fn is_nanosecond_pcap_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAP_NANOS_MAGIC_BE || magic == &layout::PCAP_NANOS_MAGIC_LE
}

/// Resolve the interface for a given interface id, defaulting to Ethernet
/// with microsecond timestamps.
pub fn interface_for(interfaces: &[InterfaceInfo], if_id: u32) -> InterfaceInfo {
    interfaces
        .get(if_id as usize)
        .copied()
        .unwrap_or_default()
}

/// Convert a legacy PCAP record timestamp to seconds.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_frac: u32, nanosecond: bool) -> f64 {
    let scale = if nanosecond { 1e-9 } else { 1e-6 };
    ts_sec as f64 + (ts_frac as f64 * scale)
}

/// Convert PCAPNG high/low timestamp to seconds using the interface
/// `if_tsresol` option.
///
/// # Examples
/// ```text
/// use pingsift_core::source::pcap::reader::pcapng_ts_to_seconds;
///
/// let seconds = pcapng_ts_to_seconds(0, 1_500_000, 6);
/// assert!((seconds - 1.5).abs() < f64::EPSILON);
/// ```
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32, tsresol: u8) -> f64 {
    let ts = ((ts_high as u64) << 32) | (ts_low as u64);
    let unit = tsresol_unit(tsresol);
    (ts / unit) as f64 + (ts % unit) as f64 / unit as f64
}

fn tsresol_unit(tsresol: u8) -> u64 {
    let exponent = (tsresol & !layout::PCAPNG_TSRESOL_BINARY_FLAG) as u32;
    let unit = if tsresol & layout::PCAPNG_TSRESOL_BINARY_FLAG != 0 {
        2u64.checked_pow(exponent)
    } else {
        10u64.checked_pow(exponent)
    };
    unit.unwrap_or(1_000_000)
}
