//! pingsift core library for offline inspection of probe captures.
//!
//! This crate implements the decode pipeline used by the CLI: packet sources
//! feed the frame layer, which keeps frames carrying an IP header and hands
//! them to the HiPerConTracer-style probe decoder (layout/reader/parser).
//! Every frame with an IP layer becomes exactly one [`DecodedRecord`], in
//! capture order. Decoding is side-effect free; all I/O is isolated in
//! `source` modules and export formats live in the CLI crate.
//!
//! Invariants:
//! - Classification is a first-match substring search over the frame hex:
//!   probe marker, then echo marker, then unknown.
//! - Non-probe records never carry probe fields and always carry the capture
//!   timestamp as their fallback time.
//! - A frame that fails decoding is skipped and counted, never fatal.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use pingsift_core::{DecoderConfig, decode_pcap_file};
//!
//! let outcome = decode_pcap_file(Path::new("capture.pcap"), &DecoderConfig::default())?;
//! println!("{} records", outcome.records.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use time::UtcOffset;

mod analysis;
mod frame;
mod protocols;
mod source;

pub use analysis::{
    AnalysisError, DecodeOutcome, RecordStream, decode_frames, decode_frames_parallel,
    decode_pcap_file, decode_source, open_pcap_stream, scan_pcap_file, scan_probe_senders,
    source_name,
};
pub use frame::{FrameError, capture_frame};
pub use protocols::hpct::{
    DecodeError, ProbeHeader, classify, decode_frame, format_send_time, le_hex_to_u64,
    parse_probe_header, swap_hex_byte_order,
};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError};

/// Byte offset of the probe header from the start of the captured frame
/// (IPv4 header plus ICMP echo header on a raw-IP capture).
pub const DEFAULT_HEADER_OFFSET: usize = 28;

/// One captured frame that carries an IP layer.
///
/// # Examples
/// ```
/// use pingsift_core::CapturedFrame;
///
/// let frame = CapturedFrame {
///     source_address: "10.0.0.1".parse().unwrap(),
///     destination_address: "10.0.0.2".parse().unwrap(),
///     capture_timestamp: 1_723_824_576.25,
///     raw_bytes: vec![0x45, 0x00],
/// };
/// assert_eq!(frame.hex(), "4500");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub source_address: IpAddr,
    pub destination_address: IpAddr,
    /// Seconds since the Unix epoch, as stored by the capture source.
    pub capture_timestamp: f64,
    /// Full link-layer frame content.
    pub raw_bytes: Vec<u8>,
}

impl CapturedFrame {
    /// Lowercase hexadecimal rendering of the whole frame.
    pub fn hex(&self) -> String {
        hex::encode(&self.raw_bytes)
    }
}

/// Traffic class of a frame, decided by marker search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficClass {
    /// Carries the `LOVE` probe marker and a measurement header.
    Probe,
    /// Plain ping payload (`20 21 22 23` pattern).
    Echo,
    Unknown,
}

impl TrafficClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficClass::Probe => "probe",
            TrafficClass::Echo => "echo",
            TrafficClass::Unknown => "unknown",
        }
    }
}

/// Structured record emitted for every frame with an IP layer.
///
/// Probe fields are only present for [`TrafficClass::Probe`];
/// `fallback_time` is only present for the other classes.
///
/// # Examples
/// ```
/// use pingsift_core::{CapturedFrame, DecoderConfig, TrafficClass, decode_frame};
///
/// let frame = CapturedFrame {
///     source_address: "10.0.0.1".parse().unwrap(),
///     destination_address: "10.0.0.2".parse().unwrap(),
///     capture_timestamp: 42.5,
///     raw_bytes: vec![0x20, 0x21, 0x22, 0x23],
/// };
/// let record = decode_frame(&frame, &DecoderConfig::default()).unwrap();
/// assert_eq!(record.class, TrafficClass::Echo);
/// assert_eq!(record.fallback_time, Some(42.5));
/// assert!(record.magic_number.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub source_address: IpAddr,
    pub destination_address: IpAddr,
    /// Capture timestamp of the frame (seconds since the Unix epoch).
    pub arrival_time: f64,
    pub class: TrafficClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic_number: Option<u32>,
    /// TTL the probe was sent with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_send_ttl: Option<u8>,
    /// Capture timestamp repeated for non-probe frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_tweak: Option<u16>,
    /// Probe send time as `YYYY-MM-DD HH:MM:SS` in the configured offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_time: Option<String>,
    /// Lowercase hex of the whole frame.
    pub raw_payload_hex: String,
}

/// Time zone used to render probe send times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTimeZone {
    /// System local time, with the zone rule in force at each send time.
    Local,
    Fixed(UtcOffset),
}

impl SendTimeZone {
    pub const UTC: SendTimeZone = SendTimeZone::Fixed(UtcOffset::UTC);
}

/// Decoder settings shared by every frame of a run.
///
/// # Examples
/// ```
/// use pingsift_core::{DEFAULT_HEADER_OFFSET, DecoderConfig, SendTimeZone};
///
/// let config = DecoderConfig::default();
/// assert_eq!(config.header_offset, DEFAULT_HEADER_OFFSET);
/// assert_eq!(config.time_zone, SendTimeZone::UTC);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Byte offset of the probe header within the frame.
    pub header_offset: usize,
    /// Zone used to render `send_time`.
    pub time_zone: SendTimeZone,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            header_offset: DEFAULT_HEADER_OFFSET,
            time_zone: SendTimeZone::UTC,
        }
    }
}

/// Per-class record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub probe: u64,
    pub echo: u64,
    pub unknown: u64,
}

impl ClassCounts {
    pub fn add(&mut self, class: TrafficClass) {
        match class {
            TrafficClass::Probe => self.probe += 1,
            TrafficClass::Echo => self.echo += 1,
            TrafficClass::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.probe + self.echo + self.unknown
    }
}

/// Frame rejected by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFrame {
    /// Zero-based position of the frame in its capture source.
    pub index: u64,
    pub arrival_time: f64,
    pub reason: String,
}

/// Bookkeeping for one capture source.
///
/// # Examples
/// ```
/// use pingsift_core::DecodeSummary;
///
/// let summary = DecodeSummary::new("noise-storm_00000");
/// assert_eq!(summary.frames_total, 0);
/// assert!(summary.skipped.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeSummary {
    /// Capture file name without its extension.
    pub source_name: String,
    /// Frames read from the source.
    pub frames_total: u64,
    /// Frames dropped because they carry no IP layer.
    pub frames_without_ip: u64,
    /// Records emitted, by class.
    pub records: ClassCounts,
    /// Frames rejected by the decoder, in capture order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedFrame>,
}

impl DecodeSummary {
    pub fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            ..Self::default()
        }
    }
}

/// First sighting of a probe sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSighting {
    pub source_address: IpAddr,
    pub destination_address: IpAddr,
    pub ip_identification: u16,
    pub icmp_checksum: u16,
    pub ttl: u8,
    /// Frame bytes from the IP header onward (link layer stripped), rendered
    /// as lossy ASCII.
    pub payload_text: String,
}

/// Unique endpoints of probe echo requests found in a capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderReport {
    /// Sorted, de-duplicated probe sources.
    pub sources: Vec<IpAddr>,
    /// Sorted, de-duplicated probe destinations.
    pub destinations: Vec<IpAddr>,
    /// One entry per newly seen sender, in capture order.
    pub sightings: Vec<ProbeSighting>,
}
