use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;

use tracing::{debug, info};

use super::AnalysisError;
use crate::frame::parse_echo_request;
use crate::source::{PacketSource, PcapFileSource};
use crate::{ProbeSighting, SenderReport};

const PROBE_MARKER_ASCII: &[u8; 4] = b"LOVE";

/// Scan a capture file for probe senders.
pub fn scan_pcap_file(path: &Path) -> Result<SenderReport, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    scan_probe_senders(source)
}

/// Collect the endpoints of ICMP echo requests carrying the probe marker.
///
/// A request is reported when its source has not been seen yet, neither as a
/// probe source nor as a probe destination. Only IPv4 requests are
/// considered.
pub fn scan_probe_senders<S: PacketSource>(mut source: S) -> Result<SenderReport, AnalysisError> {
    let mut sources = BTreeSet::new();
    let mut destinations = BTreeSet::new();
    let mut sightings = Vec::new();

    while let Some(event) = source.next_packet()? {
        let echo = match parse_echo_request(event.linktype, &event.data) {
            Ok(Some(echo)) => echo,
            Ok(None) => continue,
            Err(err) => {
                debug!(error = %err, "frame could not be sliced");
                continue;
            }
        };
        if !contains_marker(&event.data) {
            continue;
        }
        let src = IpAddr::V4(echo.src_ip);
        if sources.contains(&src) || destinations.contains(&src) {
            continue;
        }
        let dst = IpAddr::V4(echo.dst_ip);
        sources.insert(src);
        destinations.insert(dst);
        sightings.push(ProbeSighting {
            source_address: src,
            destination_address: dst,
            ip_identification: echo.identification,
            icmp_checksum: echo.icmp_checksum,
            ttl: echo.ttl,
            payload_text: String::from_utf8_lossy(
                event.data.get(echo.ip_offset..).unwrap_or(&event.data),
            )
            .into_owned(),
        });
    }

    info!(
        senders = sources.len(),
        destinations = destinations.len(),
        "probe sender scan complete"
    );
    Ok(SenderReport {
        sources: sources.into_iter().collect(),
        destinations: destinations.into_iter().collect(),
        sightings,
    })
}

fn contains_marker(data: &[u8]) -> bool {
    data.windows(PROBE_MARKER_ASCII.len())
        .any(|window| window == PROBE_MARKER_ASCII)
}

#[cfg(test)]
mod tests {
    use super::scan_probe_senders;
    use crate::source::PacketEvent;
    use crate::source::testing::VecSource;
    use etherparse::PacketBuilder;
    use pcap_parser::Linktype;

    fn icmp(src: [u8; 4], dst: [u8; 4], request: bool, payload: &[u8]) -> PacketEvent {
        let ip = PacketBuilder::ipv4(src, dst, 52);
        let mut data = Vec::new();
        if request {
            ip.icmpv4_echo_request(3, 1).write(&mut data, payload).unwrap();
        } else {
            ip.icmpv4_echo_reply(3, 1).write(&mut data, payload).unwrap();
        }
        PacketEvent {
            ts: 0.0,
            linktype: Linktype::RAW,
            data,
        }
    }

    #[test]
    fn reports_each_sender_once() {
        let source = VecSource::new(vec![
            icmp([10, 0, 0, 1], [10, 0, 0, 9], true, b"xxLOVExx"),
            icmp([10, 0, 0, 1], [10, 0, 0, 8], true, b"LOVE"),
            icmp([10, 0, 0, 2], [10, 0, 0, 9], true, b"LOVE"),
        ]);
        let report = scan_probe_senders(source).unwrap();

        assert_eq!(report.sightings.len(), 2);
        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.destinations.len(), 1);
        assert_eq!(report.sightings[0].ttl, 52);
        assert_eq!(report.sightings[0].destination_address.to_string(), "10.0.0.9");
        assert!(report.sightings[0].payload_text.contains("xxLOVExx"));
    }

    #[test]
    fn ignores_replies_unmarked_requests_and_probed_hosts() {
        let source = VecSource::new(vec![
            icmp([10, 0, 0, 1], [10, 0, 0, 9], true, b"LOVE"),
            icmp([10, 0, 0, 9], [10, 0, 0, 1], false, b"LOVE"),
            icmp([10, 0, 0, 3], [10, 0, 0, 4], true, b"ping"),
            // A probed host sending its own marked request is not a new sender.
            icmp([10, 0, 0, 9], [10, 0, 0, 5], true, b"LOVE"),
        ]);
        let report = scan_probe_senders(source).unwrap();

        assert_eq!(report.sightings.len(), 1);
        assert_eq!(report.sources[0].to_string(), "10.0.0.1");
        assert_eq!(report.destinations[0].to_string(), "10.0.0.9");
    }

    #[test]
    fn payload_text_starts_at_ip_header() {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 9], 52)
            .icmpv4_echo_request(3, 1);
        let mut data = Vec::new();
        builder.write(&mut data, b"LOVE").unwrap();
        let source = VecSource::new(vec![PacketEvent {
            ts: 0.0,
            linktype: Linktype::ETHERNET,
            data,
        }]);
        let report = scan_probe_senders(source).unwrap();

        let text = &report.sightings[0].payload_text;
        // 0x45: IPv4 version and header length.
        assert!(text.starts_with('E'));
        assert!(text.ends_with("LOVE"));
    }

    #[test]
    fn propagates_source_errors() {
        let source = VecSource::new(Vec::new()).with_failure("corrupt");
        assert!(scan_probe_senders(source).is_err());
    }
}
