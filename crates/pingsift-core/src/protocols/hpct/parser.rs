use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use super::endian::le_hex_to_u64;
use super::error::DecodeError;
use super::layout;
use super::reader::HeaderReader;
use crate::{CapturedFrame, DecodedRecord, DecoderConfig, SendTimeZone, TrafficClass};

/// Decoded probe measurement header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeHeader {
    pub magic_number: u32,
    pub send_ttl: u8,
    pub round_number: u8,
    pub checksum_tweak: u16,
    /// Send time in milliseconds since the Unix epoch.
    pub send_time_ms: u64,
}

/// Classify a frame from its lowercase hex rendering.
///
/// The markers are searched anywhere in the string, including positions that
/// straddle byte boundaries. The probe marker takes precedence.
///
/// # Examples
/// ```
/// use pingsift_core::{TrafficClass, classify};
///
/// assert_eq!(classify("00004c4f5645"), TrafficClass::Probe);
/// assert_eq!(classify("2021222324"), TrafficClass::Echo);
/// assert_eq!(classify("4c4f5645202122232425"), TrafficClass::Probe);
/// assert_eq!(classify("deadbeef"), TrafficClass::Unknown);
/// ```
pub fn classify(frame_hex: &str) -> TrafficClass {
    if frame_hex.contains(layout::PROBE_MARKER) {
        TrafficClass::Probe
    } else if frame_hex.contains(layout::ECHO_MARKER) {
        TrafficClass::Echo
    } else {
        TrafficClass::Unknown
    }
}

/// Decode the probe header found `header_offset` bytes into the frame.
///
/// # Errors
/// `DecodeError::TruncatedHeader` when the frame is too short to hold the
/// whole header.
pub fn parse_probe_header(
    frame_hex: &str,
    header_offset: usize,
) -> Result<ProbeHeader, DecodeError> {
    let reader = HeaderReader::locate(frame_hex, header_offset)?;

    let magic_number = reader.read_u32_be(layout::MAGIC_NUMBER_RANGE)?;
    let send_ttl = reader.read_u8(layout::SEND_TTL_RANGE)?;
    let round_number = reader.read_u8(layout::ROUND_RANGE)?;
    let checksum_tweak = reader.read_u16_be(layout::CHECKSUM_TWEAK_RANGE)?;
    let send_time_ms = le_hex_to_u64(reader.read_slice(layout::SEND_TIMESTAMP_RANGE)?)?;

    Ok(ProbeHeader {
        magic_number,
        send_ttl,
        round_number,
        checksum_tweak,
        send_time_ms,
    })
}

/// Render epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in `zone`.
///
/// Sub-second precision is truncated. With [`SendTimeZone::Local`] the
/// offset is looked up for the send instant itself, so times on either side
/// of a daylight saving change each get their own offset.
///
/// # Examples
/// ```
/// use pingsift_core::{SendTimeZone, format_send_time};
/// use time::UtcOffset;
///
/// let text = format_send_time(1_723_824_576_789, SendTimeZone::UTC).unwrap();
/// assert_eq!(text, "2024-08-16 16:09:36");
///
/// let east = SendTimeZone::Fixed(UtcOffset::from_hms(2, 0, 0).unwrap());
/// assert_eq!(format_send_time(0, east).unwrap(), "1970-01-01 02:00:00");
/// ```
pub fn format_send_time(millis: u64, zone: SendTimeZone) -> Result<String, DecodeError> {
    let out_of_range = DecodeError::TimestampOutOfRange { millis };
    let seconds = i64::try_from(millis / layout::MILLIS_PER_SECOND)
        .map_err(|_| out_of_range.clone())?;
    let offset = match zone {
        SendTimeZone::Fixed(offset) => offset,
        SendTimeZone::Local => local_offset_at(seconds).ok_or_else(|| out_of_range.clone())?,
    };
    // Offset applied to raw seconds: `to_offset` panics at the calendar edges.
    let shifted = seconds
        .checked_add(i64::from(offset.whole_seconds()))
        .ok_or_else(|| out_of_range.clone())?;
    let shifted = OffsetDateTime::from_unix_timestamp(shifted).map_err(|_| out_of_range.clone())?;
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    shifted.format(&format).map_err(|_| out_of_range)
}

/// Offset of the system zone at `seconds` since the Unix epoch.
fn local_offset_at(seconds: i64) -> Option<UtcOffset> {
    let local = Local.timestamp_opt(seconds, 0).single()?;
    UtcOffset::from_whole_seconds(local.offset().local_minus_utc()).ok()
}

/// Classify one frame and extract the fields its class carries.
///
/// # Errors
/// Probe frames whose header cannot be decoded reject the whole frame.
pub fn decode_frame(
    frame: &CapturedFrame,
    config: &DecoderConfig,
) -> Result<DecodedRecord, DecodeError> {
    let raw_payload_hex = frame.hex();
    let class = classify(&raw_payload_hex);

    let mut record = DecodedRecord {
        source_address: frame.source_address,
        destination_address: frame.destination_address,
        arrival_time: frame.capture_timestamp,
        class,
        magic_number: None,
        probe_send_ttl: None,
        fallback_time: None,
        round_number: None,
        checksum_tweak: None,
        send_time: None,
        raw_payload_hex: String::new(),
    };

    match class {
        TrafficClass::Probe => {
            let header = parse_probe_header(&raw_payload_hex, config.header_offset)?;
            record.magic_number = Some(header.magic_number);
            record.probe_send_ttl = Some(header.send_ttl);
            record.round_number = Some(header.round_number);
            record.checksum_tweak = Some(header.checksum_tweak);
            record.send_time = Some(format_send_time(header.send_time_ms, config.time_zone)?);
        }
        TrafficClass::Echo | TrafficClass::Unknown => {
            record.fallback_time = Some(frame.capture_timestamp);
        }
    }

    record.raw_payload_hex = raw_payload_hex;
    Ok(record)
}
