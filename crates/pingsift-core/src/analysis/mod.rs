use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::frame::capture_frame;
use crate::protocols::hpct::decode_frame;
use crate::source::{PacketEvent, PacketSource, PcapFileSource, SourceError};
use crate::{DecodeSummary, DecodedRecord, DecoderConfig, SkippedFrame};

mod parallel;
mod senders;

pub use parallel::{decode_frames, decode_frames_parallel};
pub use senders::{scan_pcap_file, scan_probe_senders};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// All records of one capture source, in capture order, with its summary.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeOutcome {
    pub summary: DecodeSummary,
    pub records: Vec<DecodedRecord>,
}

/// Name of the output partition for a capture file: its file name without
/// the extension.
///
/// # Examples
/// ```
/// use std::path::Path;
///
/// use pingsift_core::source_name;
///
/// let name = source_name(Path::new("/data/noise-storm-icmp_00003.pcap"));
/// assert_eq!(name, "noise-storm-icmp_00003");
/// ```
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string())
}

/// Open a capture file and stream its records lazily.
pub fn open_pcap_stream(
    path: &Path,
    config: &DecoderConfig,
) -> Result<RecordStream<PcapFileSource>, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    Ok(RecordStream::new(&source_name(path), source, *config))
}

/// Decode a whole capture file into memory.
pub fn decode_pcap_file(
    path: &Path,
    config: &DecoderConfig,
) -> Result<DecodeOutcome, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    decode_source(&source_name(path), source, config)
}

/// Decode every frame of `source`, keeping capture order.
pub fn decode_source<S: PacketSource>(
    name: &str,
    source: S,
    config: &DecoderConfig,
) -> Result<DecodeOutcome, AnalysisError> {
    let mut stream = RecordStream::new(name, source, *config);
    let mut records = Vec::new();
    for record in stream.by_ref() {
        records.push(record?);
    }
    Ok(DecodeOutcome {
        summary: stream.into_summary(),
        records,
    })
}

/// Lazy sequence of [`DecodedRecord`]s for one capture source.
///
/// Frames without an IP layer are dropped and counted; frames the decoder
/// rejects are skipped and listed in the summary. A source error ends the
/// stream after being yielded once.
pub struct RecordStream<S> {
    source: S,
    config: DecoderConfig,
    summary: DecodeSummary,
    finished: bool,
}

impl<S: PacketSource> RecordStream<S> {
    pub fn new(name: &str, source: S, config: DecoderConfig) -> Self {
        Self {
            source,
            config,
            summary: DecodeSummary::new(name),
            finished: false,
        }
    }

    /// Running summary; complete once the stream is exhausted.
    pub fn summary(&self) -> &DecodeSummary {
        &self.summary
    }

    pub fn into_summary(self) -> DecodeSummary {
        self.summary
    }

    fn process(&mut self, event: PacketEvent) -> Option<DecodedRecord> {
        let index = self.summary.frames_total;
        self.summary.frames_total += 1;

        let frame = match capture_frame(event) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(index, "frame without IP layer dropped");
                self.summary.frames_without_ip += 1;
                return None;
            }
            Err(err) => {
                debug!(index, error = %err, "frame could not be sliced");
                self.summary.frames_without_ip += 1;
                return None;
            }
        };

        match decode_frame(&frame, &self.config) {
            Ok(record) => {
                self.summary.records.add(record.class);
                Some(record)
            }
            Err(err) => {
                warn!(
                    source = %self.summary.source_name,
                    index,
                    error = %err,
                    "frame rejected by decoder"
                );
                self.summary.skipped.push(SkippedFrame {
                    index,
                    arrival_time: frame.capture_timestamp,
                    reason: err.to_string(),
                });
                None
            }
        }
    }
}

impl<S: PacketSource> Iterator for RecordStream<S> {
    type Item = Result<DecodedRecord, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.source.next_packet() {
                Ok(Some(event)) => {
                    if let Some(record) = self.process(event) {
                        return Some(Ok(record));
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    info!(
                        source = %self.summary.source_name,
                        frames = self.summary.frames_total,
                        records = self.summary.records.total(),
                        skipped = self.summary.skipped.len(),
                        "capture source decoded"
                    );
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{AnalysisError, RecordStream, decode_source, source_name};
    use crate::source::PacketEvent;
    use crate::source::testing::VecSource;
    use crate::{DecoderConfig, TrafficClass};
    use etherparse::PacketBuilder;
    use pcap_parser::Linktype;
    use std::path::Path;

    fn icmp_event(payload: &[u8], ts: f64) -> PacketEvent {
        let builder =
            PacketBuilder::ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64).icmpv4_echo_request(1, 1);
        let mut data = Vec::new();
        builder.write(&mut data, payload).unwrap();
        PacketEvent {
            ts,
            linktype: Linktype::RAW,
            data,
        }
    }

    fn probe_payload() -> Vec<u8> {
        let mut payload = vec![0, 0, 0, 1, 8, 9, 1, 2];
        payload.extend_from_slice(&1_723_824_576_789u64.to_le_bytes());
        payload.extend_from_slice(b"LOVE");
        payload
    }

    fn arp_event(ts: f64) -> PacketEvent {
        let mut data = vec![0xffu8; 12];
        data.extend_from_slice(&0x0806u16.to_be_bytes());
        data.extend_from_slice(&[0u8; 28]);
        PacketEvent {
            ts,
            linktype: Linktype::ETHERNET,
            data,
        }
    }

    #[test]
    fn source_name_strips_extension_only() {
        assert_eq!(source_name(Path::new("a/b/capture.pcapng")), "capture");
        assert_eq!(source_name(Path::new("pcap.capture.pcap")), "pcap.capture");
    }

    #[test]
    fn decode_keeps_order_and_drops_non_ip() {
        let source = VecSource::new(vec![
            icmp_event(&probe_payload(), 1.0),
            arp_event(2.0),
            icmp_event(&[0x20, 0x21, 0x22, 0x23], 3.0),
            icmp_event(b"libo", 4.0),
        ]);
        let outcome = decode_source("mixed", source, &DecoderConfig::default()).unwrap();

        let classes: Vec<_> = outcome.records.iter().map(|r| r.class).collect();
        assert_eq!(
            classes,
            vec![
                TrafficClass::Probe,
                TrafficClass::Echo,
                TrafficClass::Unknown
            ]
        );
        let times: Vec<_> = outcome.records.iter().map(|r| r.arrival_time).collect();
        assert_eq!(times, vec![1.0, 3.0, 4.0]);

        let summary = outcome.summary;
        assert_eq!(summary.source_name, "mixed");
        assert_eq!(summary.frames_total, 4);
        assert_eq!(summary.frames_without_ip, 1);
        assert_eq!(summary.records.total(), 3);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn rejected_frame_is_counted_and_processing_continues() {
        let source = VecSource::new(vec![
            icmp_event(b"LOVE", 1.0),
            icmp_event(&probe_payload(), 2.0),
        ]);
        let outcome = decode_source("truncated", source, &DecoderConfig::default()).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].arrival_time, 2.0);
        assert_eq!(outcome.summary.skipped.len(), 1);
        let skipped = &outcome.summary.skipped[0];
        assert_eq!(skipped.index, 0);
        assert_eq!(skipped.arrival_time, 1.0);
        assert!(skipped.reason.contains("probe header truncated"));
    }

    #[test]
    fn source_error_is_yielded_once_then_stream_ends() {
        let source = VecSource::new(vec![icmp_event(b"libo", 1.0)]).with_failure("bad block");
        let mut stream = RecordStream::new("broken", source, DecoderConfig::default());

        assert!(matches!(stream.next(), Some(Ok(_))));
        assert!(matches!(stream.next(), Some(Err(AnalysisError::Source(_)))));
        assert!(stream.next().is_none());
        assert_eq!(stream.summary().frames_total, 1);
    }

    #[test]
    fn decode_source_propagates_source_error() {
        let source = VecSource::new(Vec::new()).with_failure("bad header");
        let err = decode_source("broken", source, &DecoderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("bad header"));
    }
}
